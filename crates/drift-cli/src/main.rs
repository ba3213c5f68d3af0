//! GitLab configuration drift CLI
//!
//! Compares project settings with a YAML document and optionally fixes them.

mod cli;
mod commands;
mod error;
mod logging;
mod render;
mod settings;

use clap::Parser;
use colored::Colorize;
use drift_core::ConfigDocument;
use drift_gitlab::GitLabClient;

use cli::{Cli, Commands};
use commands::{GroupsArgs, ProjectsArgs};
use error::{CliError, Result};
use render::OutputFormat;
use settings::Settings;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigDocument::load(&cli.config)?;
    logging::init(cli.verbose, config.log_level())
        .map_err(|e| CliError::user(format!("Could not initialise logging: {}", e)))?;
    tracing::debug!(config = %cli.config.display(), "Configuration loaded");

    let settings = Settings::from_env(&config)?;
    let client = GitLabClient::new(&settings.url, settings.token)?;
    let format = OutputFormat::from_json_flag(cli.json);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Groups {
            groups,
            recursive,
            limit,
            fix,
        } => {
            let args = GroupsArgs {
                groups,
                recursive,
                limit,
                fix,
            };
            commands::run_groups(&client, &config, &args, format, &mut out)
        }
        Commands::Projects { projects, fix } => {
            let args = ProjectsArgs { projects, fix };
            commands::run_projects(&client, &config, &args, format, &mut out)
        }
    }
}
