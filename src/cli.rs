//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{self, Context};
use workflow_sync::config;
use workflow_sync::defaults::{default_config_path, default_state_dir};
use workflow_sync::output::OutputConfig;
use workflow_sync::persistence::JsonStateStore;
use workflow_sync::suggestions;

/// workflow-sync - Mirror workflow versions from source control
#[derive(Parser, Debug)]
#[command(name = "workflow-sync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file.
    #[arg(long, global = true, value_name = "FILE", env = "WORKFLOW_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding registered entries.
    #[arg(long, global = true, value_name = "DIR", env = "WORKFLOW_SYNC_STATE")]
    state_dir: Option<PathBuf>,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile an entry's versions with its repository and save the result
    Refresh(commands::refresh::RefreshArgs),
    /// Register an entry without fetching any version
    Stub(commands::stub::StubArgs),
    /// Drop every version of an entry, returning it to a stub
    Restub(commands::stub::RestubArgs),
    /// Show an entry's versions, validity and diagnostics
    Status(commands::status::StatusArgs),
    /// Set the default version of an entry
    DefaultVersion(commands::default_version::DefaultVersionArgs),
    /// Publish or unpublish an entry
    Publish(commands::publish::PublishArgs),
    /// Show the import graph of a version as a tree
    Imports(commands::imports::ImportsArgs),
    /// List the repositories a provider token can see
    Repos(commands::repos::ReposArgs),
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let config_path = match &self.config {
            Some(path) if !path.exists() => return Err(suggestions::config_not_found(path)),
            Some(path) => path.clone(),
            None => default_config_path(),
        };
        let sync_config = config::load(&config_path).map_err(|e| {
            anyhow::anyhow!("Failed to load config from {}: {}", config_path.display(), e)
        })?;
        let state_dir = self.state_dir.unwrap_or_else(default_state_dir);
        log::debug!("Using state directory {}", state_dir.display());

        let ctx = Context {
            config: sync_config,
            state: JsonStateStore::new(state_dir),
            output: OutputConfig::from_env_and_flag(&self.color),
        };

        match self.command {
            Commands::Refresh(args) => commands::refresh::execute(args, &ctx),
            Commands::Stub(args) => commands::stub::execute(args, &ctx),
            Commands::Restub(args) => commands::stub::execute_restub(args, &ctx),
            Commands::Status(args) => commands::status::execute(args, &ctx),
            Commands::DefaultVersion(args) => commands::default_version::execute(args, &ctx),
            Commands::Publish(args) => commands::publish::execute(args, &ctx),
            Commands::Imports(args) => commands::imports::execute(args, &ctx),
            Commands::Repos(args) => commands::repos::execute(args, &ctx),
        }
    }
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
