//! # Version Reconciliation
//!
//! A [`Reconciler`] takes an entry, lists its repository's refs and builds one
//! version per ref on a bounded worker pool. Each version is merged with its
//! persisted counterpart from a [`VersionSnapshot`]:
//!
//! 1. Frozen versions are carried over untouched.
//! 2. The descriptor path follows the dirty-bit rule.
//! 3. The primary descriptor, its imports, test parameters and (for tools)
//!    the Dockerfile are fetched.
//! 4. The file set is validated and metadata extracted.
//!
//! Afterwards the entry's last-modified time, mode, default version and
//! metadata are derived from the merged versions.
//!
//! Only the ref listing can abort a pass. Every other fetch failure degrades
//! the affected version.

pub mod metadata;
pub mod version_build;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::config::ReconcileConfig;
use crate::error::{Error, Result};
use crate::languages::{ImportLimits, LanguageRegistry};
use crate::model::{DescriptorLanguage, Entry, EntryKind, EntryMode, Metadata, RepositoryReference, ValidationReport, Version};
use crate::persistence::{ExistingVersionLookup, VersionSnapshot};
use crate::policy;
use crate::store::DescriptorStore;

pub use version_build::{Stage, VersionBuilder};

/// Tuning for a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Versions built concurrently.
    pub workers: usize,
    pub limits: ImportLimits,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            workers: crate::defaults::DEFAULT_WORKERS,
            limits: ImportLimits::default(),
        }
    }
}

impl From<&ReconcileConfig> for ReconcileOptions {
    fn from(config: &ReconcileConfig) -> Self {
        Self {
            workers: config.workers.max(1),
            limits: ImportLimits {
                max_depth: config.max_import_depth,
                max_files: config.max_import_files,
            },
        }
    }
}

/// Result of a pass, ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledEntry {
    pub entry: Entry,
    /// Validation summary per version name.
    pub reports: BTreeMap<String, ValidationReport>,
}

/// A STUB entry for a repository: registered, with no versions yet.
pub fn create_stub(reference: RepositoryReference, language: DescriptorLanguage, kind: EntryKind) -> Entry {
    Entry::new(reference, language, kind)
}

/// Drops every version and the metadata derived from them.
///
/// Rejected for published entries and for entries with a frozen version.
pub fn restub(entry: &mut Entry) -> Result<()> {
    if entry.is_published {
        return Err(Error::policy(
            "restub",
            format!("{} is published, unpublish it first", entry.path()),
        ));
    }
    if let Some(frozen) = entry.versions.values().find(|v| v.frozen) {
        return Err(Error::policy(
            "restub",
            format!("{} has frozen version '{}'", entry.path(), frozen.name),
        ));
    }
    entry.versions.clear();
    entry.default_version = None;
    entry.metadata = Metadata::default();
    entry.last_modified = None;
    entry.mode = EntryMode::Stub;
    Ok(())
}

/// Reconciles entries of one provider against its repositories.
pub struct Reconciler<'a> {
    store: &'a dyn DescriptorStore,
    lookup: &'a dyn ExistingVersionLookup,
    registry: &'a LanguageRegistry,
    options: ReconcileOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        store: &'a dyn DescriptorStore,
        lookup: &'a dyn ExistingVersionLookup,
        registry: &'a LanguageRegistry,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            store,
            lookup,
            registry,
            options,
        }
    }

    /// Runs one reconciliation pass over `entry`.
    ///
    /// Persisted versions come from the lookup; when it knows none, the
    /// versions already on `entry` are used.
    pub fn refresh(&self, entry: &Entry) -> Result<ReconciledEntry> {
        if entry.mode == EntryMode::Hosted {
            return Err(Error::policy(
                "refresh",
                format!("{} is hosted and not synced from source control", entry.path()),
            ));
        }
        let handler = self
            .registry
            .get(entry.descriptor_language)
            .ok_or_else(|| Error::UnsupportedLanguage {
                language: entry.descriptor_language.to_string(),
            })?;
        let repository_id = entry.reference.repository_id();

        let mut snapshot = self.lookup.existing_versions(&entry.path())?;
        if snapshot.is_empty() {
            snapshot = VersionSnapshot::from_entry(entry);
        }

        let refs = self.store.list_refs(&repository_id).map_err(|e| {
            log::error!("Cannot list refs of {}: {}", entry.path(), e);
            e
        })?;
        log::info!("Reconciling {} ({} refs)", entry.path(), refs.len());

        let builder = VersionBuilder {
            store: self.store,
            handler,
            entry,
            repository_id: &repository_id,
            limits: self.options.limits,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.workers.max(1))
            .build()
            .map_err(|e| Error::WorkerPool { message: e.to_string() })?;
        let built: Vec<Version> = pool.install(|| {
            refs.par_iter()
                .map(|git_ref| builder.build(git_ref, snapshot.get(&git_ref.name)))
                .collect()
        });

        let mut versions: BTreeMap<String, Version> = built.into_iter().map(|v| (v.name.clone(), v)).collect();
        for frozen in snapshot.iter().filter(|v| v.frozen) {
            versions
                .entry(frozen.name.clone())
                .or_insert_with(|| frozen.clone());
        }
        for name in versions.keys() {
            version_build::trace_stage(&repository_id, name, Stage::Merged);
        }

        let mut reconciled = entry.clone();
        reconciled.versions = versions;
        reconciled.last_modified = latest_modification(&reconciled.versions);
        reconciled.last_updated = Some(Utc::now());
        if reconciled.mode == EntryMode::Stub {
            reconciled.mode = EntryMode::Full;
        }
        self.settle_default_version(&mut reconciled, &repository_id)?;

        let reports = reconciled
            .versions
            .values()
            .map(|v| {
                (
                    v.name.clone(),
                    ValidationReport {
                        version: v.name.clone(),
                        valid: v.valid,
                        validations: v.validations.clone(),
                    },
                )
            })
            .collect();
        let valid = reconciled.versions.values().filter(|v| v.valid).count();
        log::info!(
            "Reconciled {}: {} versions, {} valid",
            reconciled.path(),
            reconciled.versions.len(),
            valid
        );
        Ok(ReconciledEntry {
            entry: reconciled,
            reports,
        })
    }

    /// Keeps the default version pointing at an existing version and entry
    /// metadata in step with it.
    fn settle_default_version(&self, entry: &mut Entry, repository_id: &str) -> Result<()> {
        if let Some(name) = entry.default_version.clone() {
            if entry.versions.contains_key(&name) {
                entry.sync_metadata_with_default();
                return Ok(());
            }
            log::warn!("Default version {} of {} no longer exists", name, entry.path());
            entry.default_version = None;
        }

        let branch = match self.store.default_branch(repository_id) {
            Ok(branch) => branch,
            Err(e) => {
                log::warn!("Could not look up the main branch of {}: {}", entry.path(), e);
                None
            }
        };
        let Some(branch) = branch else {
            return Ok(());
        };
        let chosen = entry
            .versions
            .values()
            .find(|v| v.reference == branch)
            .map(|v| v.name.clone());
        match chosen {
            Some(name) => policy::set_default_version(entry, &name),
            None => Ok(()),
        }
    }
}

/// Latest commit time across versions. Versions without one count as the
/// epoch; no versions means no time.
fn latest_modification(versions: &BTreeMap<String, Version>) -> Option<DateTime<Utc>> {
    versions
        .values()
        .map(|v| v.last_modified.unwrap_or(DateTime::<Utc>::UNIX_EPOCH))
        .max()
}
