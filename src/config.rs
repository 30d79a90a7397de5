//! # Configuration Schema and Parsing
//!
//! This module defines the data structures that represent the
//! `workflow-sync` configuration file, as well as the logic for parsing it.
//!
//! ## Key Components
//!
//! - **`SyncConfig`**: The whole file. Every section is optional and falls
//!   back to the values in [`crate::defaults`].
//! - **`ProviderConfig`**: Credentials and API base URL for one
//!   source-control provider.
//! - **`HttpConfig`**: The per-call time box applied to every remote request.
//! - **`ReconcileConfig`**: Worker pool size and the import-resolution ceiling.
//!
//! ## Example
//!
//! ```yaml
//! providers:
//!   github:
//!     token: ghp_xxx
//!   gitlab:
//!     token: glpat-xxx
//!     api_url: https://gitlab.example.org/api/v4
//! http:
//!   timeout_secs: 10
//! reconcile:
//!   workers: 8
//! ```
//!
//! Tokens missing from the file are read from `GITHUB_TOKEN`,
//! `BITBUCKET_TOKEN` and `GITLAB_TOKEN`.

use crate::defaults;
use crate::error::{Error, Result};
use crate::model::SourceControl;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Credentials and endpoint for one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Bitbucket app passwords authenticate as `username:token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub github: ProviderConfig,
    #[serde(default)]
    pub bitbucket: ProviderConfig,
    #[serde(default)]
    pub gitlab: ProviderConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_max_import_depth")]
    pub max_import_depth: usize,
    #[serde(default = "default_max_import_files")]
    pub max_import_files: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            workers: defaults::DEFAULT_WORKERS,
            max_import_depth: defaults::DEFAULT_MAX_IMPORT_DEPTH,
            max_import_files: defaults::DEFAULT_MAX_IMPORT_FILES,
        }
    }
}

fn default_timeout_secs() -> u64 {
    defaults::DEFAULT_TIMEOUT_SECS
}

fn default_workers() -> usize {
    defaults::DEFAULT_WORKERS
}

fn default_max_import_depth() -> usize {
    defaults::DEFAULT_MAX_IMPORT_DEPTH
}

fn default_max_import_files() -> usize {
    defaults::DEFAULT_MAX_IMPORT_FILES
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl SyncConfig {
    pub fn provider(&self, source_control: SourceControl) -> &ProviderConfig {
        match source_control {
            SourceControl::GitHub => &self.providers.github,
            SourceControl::Bitbucket => &self.providers.bitbucket,
            SourceControl::GitLab => &self.providers.gitlab,
        }
    }

    fn provider_mut(&mut self, source_control: SourceControl) -> &mut ProviderConfig {
        match source_control {
            SourceControl::GitHub => &mut self.providers.github,
            SourceControl::Bitbucket => &mut self.providers.bitbucket,
            SourceControl::GitLab => &mut self.providers.gitlab,
        }
    }

    /// API base URL for a provider, without trailing slash.
    pub fn api_url(&self, source_control: SourceControl) -> String {
        let configured = self.provider(source_control).api_url.as_deref();
        let url = configured.unwrap_or(match source_control {
            SourceControl::GitHub => defaults::DEFAULT_GITHUB_API_URL,
            SourceControl::Bitbucket => defaults::DEFAULT_BITBUCKET_API_URL,
            SourceControl::GitLab => defaults::DEFAULT_GITLAB_API_URL,
        });
        url.trim_end_matches('/').to_string()
    }

    /// Fills tokens missing from the file using `lookup` on the provider's
    /// environment variable name.
    pub fn apply_env_tokens<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for source_control in SourceControl::ALL {
            let provider = self.provider_mut(source_control);
            if provider.token.is_none() {
                provider.token = lookup(token_env_var(source_control)).filter(|t| !t.is_empty());
            }
        }
    }

    fn check(&self) -> Result<()> {
        if self.reconcile.workers == 0 {
            return Err(Error::ConfigParse {
                message: "reconcile.workers must be at least 1".to_string(),
                hint: Some("Remove the setting to use the default of 4".to_string()),
            });
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::ConfigParse {
                message: "http.timeout_secs must be at least 1".to_string(),
                hint: None,
            });
        }
        Ok(())
    }
}

/// Environment variable holding a provider's token.
pub fn token_env_var(source_control: SourceControl) -> &'static str {
    match source_control {
        SourceControl::GitHub => "GITHUB_TOKEN",
        SourceControl::Bitbucket => "BITBUCKET_TOKEN",
        SourceControl::GitLab => "GITLAB_TOKEN",
    }
}

/// Parses a YAML string into a `SyncConfig`.
///
/// An empty document yields the defaults.
pub fn parse(yaml_content: &str) -> Result<SyncConfig> {
    if yaml_content.trim().is_empty() {
        return Ok(SyncConfig::default());
    }
    let config: SyncConfig = serde_yaml::from_str(yaml_content).map_err(|e| {
        let message = e.to_string();
        let hint = if message.contains("unknown field") {
            Some(
                "Known sections are providers.{github,bitbucket,gitlab}, http and reconcile"
                    .to_string(),
            )
        } else {
            None
        };
        Error::ConfigParse { message, hint }
    })?;
    config.check()?;
    Ok(config)
}

/// Parses a configuration file from disk.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SyncConfig> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}

/// Loads the configuration the CLI runs with.
///
/// A missing file yields the defaults. Tokens are completed from the
/// environment.
pub fn load(path: &Path) -> Result<SyncConfig> {
    let mut config = if path.exists() {
        log::debug!("Loading configuration from {}", path.display());
        from_file(path)?
    } else {
        log::debug!("No configuration at {}, using defaults", path.display());
        SyncConfig::default()
    };
    config.apply_env_tokens(|name| std::env::var(name).ok());
    Ok(config)
}
