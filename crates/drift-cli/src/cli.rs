//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use drift_core::ResourceRef;

/// Reconcile GitLab project settings with a YAML configuration document
///
/// Runs as a dry run by default: drift is reported but nothing is written
/// unless --fix is given.
#[derive(Parser, Debug)]
#[command(name = "gitlab-config")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output the report as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Path of the configuration document
    #[arg(
        short,
        long,
        global = true,
        env = "GITLAB_CONFIG_YAML_FILEPATH",
        default_value = "config.yaml"
    )]
    pub config: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Reconcile every project of one or more groups
    ///
    /// Examples:
    ///   gitlab-config groups acme-org               # Direct projects of acme-org
    ///   gitlab-config groups 42 -r --limit 50       # Whole tree, at most 50 projects
    ///   gitlab-config groups acme-org/web --fix     # Write expected values back
    Groups {
        /// Group ids or full paths
        #[arg(required = true)]
        groups: Vec<ResourceRef>,

        /// Also walk subgroups, depth-first
        #[arg(short, long)]
        recursive: bool,

        /// Maximum number of projects across all groups
        #[arg(short, long, value_parser = parse_limit)]
        limit: Option<usize>,

        /// Apply changes instead of only reporting them
        #[arg(short, long)]
        fix: bool,
    },

    /// Reconcile specific projects
    Projects {
        /// Project ids or full paths
        #[arg(required = true)]
        projects: Vec<ResourceRef>,

        /// Apply changes instead of only reporting them
        #[arg(short, long)]
        fix: bool,
    },
}

fn parse_limit(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("limit must be at least 1".to_string()),
        Ok(limit) => Ok(limit),
        Err(_) => Err(format!("'{}' is not a positive integer", value)),
    }
}
