//! # CLI Command Implementations
//!
//! One module per subcommand. Each holds an `Args` struct derived with
//! `clap` and an `execute` function that loads what it needs from the state
//! directory, calls into the `workflow_sync` library and prints the result.

pub mod default_version;
pub mod imports;
pub mod publish;
pub mod refresh;
pub mod repos;
pub mod status;
pub mod stub;

use anyhow::Result;

use workflow_sync::config::SyncConfig;
use workflow_sync::model::{Entry, RepositoryReference};
use workflow_sync::output::OutputConfig;
use workflow_sync::persistence::{JsonStateStore, VersionPersistence};
use workflow_sync::suggestions;

/// What every command runs with, built once from the global flags.
pub struct Context {
    pub config: SyncConfig,
    pub state: JsonStateStore,
    pub output: OutputConfig,
}

impl Context {
    /// The registered entry for `git_url`, if any.
    pub fn find_entry(&self, git_url: &str) -> Result<(RepositoryReference, Option<Entry>)> {
        let reference = RepositoryReference::from_git_url(git_url).map_err(suggestions::explain)?;
        let entry = self.state.load_entry(&reference.path())?;
        Ok((reference, entry))
    }

    /// The registered entry for `git_url`, or an error telling how to
    /// register it.
    pub fn load_entry(&self, git_url: &str) -> Result<Entry> {
        match self.find_entry(git_url)? {
            (_, Some(entry)) => Ok(entry),
            (_, None) => Err(suggestions::entry_not_registered(git_url)),
        }
    }

    pub fn save(&self, entry: &Entry) -> Result<()> {
        self.state.save(entry)?;
        Ok(())
    }
}
