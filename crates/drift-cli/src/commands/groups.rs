//! Groups command implementation
//!
//! Discovers projects under one or more groups and reconciles each of them.

use std::io::Write;

use colored::Colorize;
use drift_core::{
    ConfigDocument, Reconciler, ResolutionPolicy, ResourceClient, ResourceRef, RunContext,
    discover,
};

use crate::error::{CliError, Result};
use crate::render::{OutputFormat, render};

/// Arguments of the groups command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupsArgs {
    pub groups: Vec<ResourceRef>,
    pub recursive: bool,
    pub limit: Option<usize>,
    pub fix: bool,
}

/// Run the groups command
///
/// A group that cannot be walked does not stop the others; the report is
/// still printed and the command then fails naming the groups.
pub fn run_groups<C>(
    client: &C,
    config: &ConfigDocument,
    args: &GroupsArgs,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()>
where
    C: ResourceClient + ?Sized,
{
    let context = RunContext::build(client, config)?;

    let discovery = discover(client, &args.groups, args.recursive, args.limit);
    tracing::info!(
        projects = discovery.projects.len(),
        failed_groups = discovery.failed_seeds.len(),
        "Discovery finished"
    );

    let result = Reconciler::new(client, config, &context)
        .with_fix(args.fix)
        .run(&discovery.targets(), ResolutionPolicy::Skip)?;
    render(out, &result, args.fix, format)?;

    if discovery.failed_seeds.is_empty() {
        return Ok(());
    }

    if format == OutputFormat::Table {
        writeln!(out)?;
        writeln!(out, "{}", "Groups not walked:".red().bold())?;
        for failure in &discovery.failed_seeds {
            writeln!(out, "  {} {}: {}", "!".red(), failure.seed, failure.error)?;
        }
    }
    let names: Vec<String> = discovery
        .failed_seeds
        .iter()
        .map(|f| f.seed.to_string())
        .collect();
    Err(CliError::user(format!(
        "Could not walk {} group(s): {}",
        names.len(),
        names.join(", ")
    )))
}
