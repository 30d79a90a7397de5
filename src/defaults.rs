//! Default values for workflow-sync configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Name of the application directory under the platform config/data dirs.
pub const APP_DIR: &str = "workflow-sync";

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_BITBUCKET_API_URL: &str = "https://api.bitbucket.org/2.0";
pub const DEFAULT_GITLAB_API_URL: &str = "https://gitlab.com/api/v4";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_MAX_IMPORT_DEPTH: usize = 32;
pub const DEFAULT_MAX_IMPORT_FILES: usize = 256;

/// Returns the default configuration file path.
///
/// Uses the platform-appropriate config directory:
/// - Linux: `~/.config/workflow-sync/config.yaml` (XDG Base Directory)
/// - macOS: `~/Library/Application Support/workflow-sync/config.yaml`
/// - Windows: `{FOLDERID_RoamingAppData}\workflow-sync\config.yaml`
///
/// This can be overridden by the `--config` CLI flag or the
/// `WORKFLOW_SYNC_CONFIG` environment variable.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".workflow-sync"))
        .join(APP_DIR)
        .join("config.yaml")
}

/// Returns the default directory holding reconciled entries.
///
/// Falls back to `.workflow-sync-state` in the current directory if the
/// platform data directory cannot be determined. Overridden by `--state-dir`
/// or `WORKFLOW_SYNC_STATE`.
pub fn default_state_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".workflow-sync-state"))
        .join(APP_DIR)
}
