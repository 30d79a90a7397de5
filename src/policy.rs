//! Publishability and default-version policy
//!
//! Pure decisions over already-reconciled state. Every rejecting operation
//! leaves the entry exactly as it found it.

use crate::error::{Error, Result};
use crate::model::{Entry, EntryMode};

/// Whether `entry` may be published.
///
/// Requires at least one valid version and either a git URL or a hosted
/// entry.
pub fn can_publish(entry: &Entry) -> bool {
    entry.has_valid_version() && (!entry.git_url.trim().is_empty() || entry.mode == EntryMode::Hosted)
}

/// Makes `name` the default version and re-derives entry metadata from it.
///
/// Metadata is copied from the version even where the version has none.
pub fn set_default_version(entry: &mut Entry, name: &str) -> Result<()> {
    if !entry.versions.contains_key(name) {
        return Err(Error::policy(
            "set default version",
            format!("{} has no version named '{}'", entry.path(), name),
        ));
    }
    entry.default_version = Some(name.to_string());
    entry.sync_metadata_with_default();
    log::info!("Default version of {} is now {}", entry.path(), name);
    Ok(())
}

/// Flips the published flag. Unpublishing always succeeds.
pub fn publish(entry: &mut Entry, publish: bool) -> Result<()> {
    if publish && !can_publish(entry) {
        return Err(Error::policy(
            "publish",
            format!("{} has no valid version to publish", entry.path()),
        ));
    }
    entry.is_published = publish;
    Ok(())
}
