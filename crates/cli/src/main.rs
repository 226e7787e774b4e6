//! cmdb-sync - reconciles the CMDB export with Jira and Confluence
//!
//! Runs the domain, cascade, service and option-id phases in that order.
//! `DRY_RUN=true` simulates every write.

#![allow(clippy::print_stdout)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use cmdbsync_infra::config::{self, LoadOptions};
use cmdbsync_infra::{init_logging, LogSettings};
use tracing::info;

mod context;
mod phases;

use context::AppContext;
use phases::Phase;

/// Reconcile business domains and services with Jira and Confluence
#[derive(Debug, Parser)]
#[command(name = "cmdb-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Run a single phase instead of the full sequence
    #[arg(long, value_enum)]
    phase: Option<Phase>,

    /// Settings file (JSON or TOML); probed when omitted
    #[arg(long, env = "CMDBSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Env file holding the credentials; `.env` when omitted
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_config = config::load(&LoadOptions { config_path: cli.config, env_file: cli.env_file })
        .context("failed to load configuration")?;
    println!("Mode: {}", app_config.mode.to_string().to_uppercase());

    let _guard = init_logging(&LogSettings::new(&app_config.settings.output.log_dir))
        .context("failed to initialise logging")?;
    info!(
        mode = %app_config.mode,
        project = %app_config.settings.jira.project_key,
        max_workers = app_config.settings.rate_limit.max_workers,
        "cmdb-sync starting"
    );

    let ctx = AppContext::new(app_config).await.context("failed to set up adapters")?;
    let selected = Phase::selection(cli.phase);
    phases::run(&ctx, &selected).await?;

    info!("cmdb-sync finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from([
            "cmdb-sync",
            "--phase",
            "option-ids",
            "--config",
            "settings.toml",
            "--env-file",
            "prod.env",
        ])
        .unwrap();
        assert_eq!(cli.phase, Some(Phase::OptionIds));
        assert_eq!(cli.config, Some(PathBuf::from("settings.toml")));
        assert_eq!(cli.env_file, Some(PathBuf::from("prod.env")));
    }

    #[test]
    fn unknown_phase_is_rejected() {
        assert!(Cli::try_parse_from(["cmdb-sync", "--phase", "labels"]).is_err());
    }
}
