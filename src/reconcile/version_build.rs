//! Building one version from one ref
//!
//! A version moves through the stages of [`Stage`] in order; the reconciler
//! marks it `MERGED` once it is filed under its entry. Frozen versions are
//! detected before anything else and left untouched.

use std::collections::BTreeSet;
use std::fmt;

use super::metadata::attach_metadata;
use crate::languages::{ImportContext, ImportLimits, LanguageHandler};
use crate::model::{Entry, EntryKind, FileType, ReferenceType, SourceFile, Validation, Version};
use crate::path::normalize;
use crate::store::{read_source_file, DescriptorStore, GitRef, RefKind};

pub const MISSING_DOCKERFILE: &str = "Missing a Dockerfile.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    New,
    PathResolved,
    ContentFetched,
    ImportsResolved,
    Validated,
    Merged,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::New => "NEW",
            Stage::PathResolved => "PATH_RESOLVED",
            Stage::ContentFetched => "CONTENT_FETCHED",
            Stage::ImportsResolved => "IMPORTS_RESOLVED",
            Stage::Validated => "VALIDATED",
            Stage::Merged => "MERGED",
        };
        f.write_str(name)
    }
}

pub(crate) fn trace_stage(repository_id: &str, version: &str, stage: Stage) {
    log::debug!("{}@{}: {}", repository_id, version, stage);
}

impl From<RefKind> for ReferenceType {
    fn from(kind: RefKind) -> Self {
        match kind {
            RefKind::Branch => ReferenceType::Branch,
            RefKind::Tag => ReferenceType::Tag,
        }
    }
}

/// Everything one pass needs to build versions of a single entry.
pub struct VersionBuilder<'a> {
    pub store: &'a dyn DescriptorStore,
    pub handler: &'a dyn LanguageHandler,
    pub entry: &'a Entry,
    pub repository_id: &'a str,
    pub limits: ImportLimits,
}

impl<'a> VersionBuilder<'a> {
    /// Runs every stage for `git_ref`. Never fails: fetch problems degrade
    /// into an invalid version.
    pub fn build(&self, git_ref: &GitRef, persisted: Option<&Version>) -> Version {
        if let Some(frozen) = persisted.filter(|v| v.frozen) {
            return frozen.clone();
        }
        self.trace(&git_ref.name, Stage::New);

        let mut version = self.resolve_path(git_ref, persisted);
        self.trace(&version.name, Stage::PathResolved);

        let primary = self.fetch_primary(&mut version);
        self.trace(&version.name, Stage::ContentFetched);

        self.fetch_dependents(&mut version, primary.as_ref(), persisted);
        self.trace(&version.name, Stage::ImportsResolved);

        self.validate(&mut version);
        attach_metadata(self, &mut version, primary.as_ref());
        self.trace(&version.name, Stage::Validated);

        version
    }

    fn trace(&self, version: &str, stage: Stage) {
        trace_stage(self.repository_id, version, stage);
    }

    /// Dirty-bit rule: only versions nobody customized follow the entry's
    /// default descriptor path.
    fn resolve_path(&self, git_ref: &GitRef, persisted: Option<&Version>) -> Version {
        let default_path = self.entry.default_paths.descriptor.as_str();
        let mut version = match persisted {
            Some(previous) => {
                let path = if previous.dirty {
                    previous.workflow_path.as_str()
                } else {
                    default_path
                };
                let mut version = Version::new(&git_ref.name, path);
                version.dirty = previous.dirty;
                version.reference_type = previous.reference_type;
                version
            }
            None => Version::new(&git_ref.name, default_path),
        };
        version.resolve_reference_type(git_ref.kind.into());
        version.commit_id = git_ref.commit_id.clone();
        version.last_modified = git_ref.last_modified;
        version
    }

    fn read(&self, version: &Version, file_type: FileType, path: &str) -> Option<SourceFile> {
        match read_source_file(
            self.store,
            self.repository_id,
            &version.reference,
            file_type,
            path,
            &normalize(path),
        ) {
            Ok(file) => file,
            Err(e) => {
                log::warn!(
                    "Could not read {} from {}@{}: {}",
                    path,
                    self.repository_id,
                    version.reference,
                    e
                );
                None
            }
        }
    }

    fn fetch_primary(&self, version: &mut Version) -> Option<SourceFile> {
        let file_type = self.entry.descriptor_language.descriptor_type();
        let path = version.workflow_path.clone();
        let primary = self.read(version, file_type, &path);
        if let Some(file) = &primary {
            version.add_source_file(file.clone());
        }
        primary
    }

    fn fetch_dependents(&self, version: &mut Version, primary: Option<&SourceFile>, persisted: Option<&Version>) {
        if let Some(content) = primary.and_then(|p| p.content.as_deref()) {
            let ctx = ImportContext {
                store: self.store,
                repository_id: self.repository_id,
                reference: &version.reference,
                limits: self.limits,
            };
            match self.handler.resolve_imports(&ctx, content, &version.workflow_path) {
                Ok(imports) => {
                    for file in imports.into_values() {
                        version.add_source_file(file);
                    }
                }
                Err(e) => log::warn!(
                    "Could not resolve imports of {}@{}: {}",
                    self.repository_id,
                    version.reference,
                    e
                ),
            }
        }

        let test_type = self.entry.descriptor_language.test_parameter_type();
        let mut test_paths = BTreeSet::new();
        if let Some(previous) = persisted {
            test_paths.extend(previous.files_of_type(test_type).map(|f| f.absolute_path.clone()));
        }
        if !version.dirty {
            test_paths.insert(normalize(&self.entry.default_paths.test_parameter));
        }
        for path in test_paths {
            if version.source_file(&path).is_some() {
                continue;
            }
            if let Some(file) = self.read(version, test_type, &path) {
                version.add_source_file(file);
            }
        }

        if let Some(dockerfile) = self.entry.default_paths.dockerfile.as_deref() {
            if let Some(file) = self.read(version, FileType::Dockerfile, dockerfile) {
                version.add_source_file(file);
            }
        }
    }

    fn validate(&self, version: &mut Version) {
        let primary = self
            .handler
            .validate_primary_set(&version.source_files, &version.workflow_path, self.entry.kind);
        version.add_or_update_validation(primary);

        let tests = self.handler.validate_test_parameter_set(&version.source_files);
        version.add_or_update_validation(tests);

        if self.entry.kind == EntryKind::Tool {
            let path = self
                .entry
                .default_paths
                .dockerfile
                .as_deref()
                .unwrap_or(crate::model::entry::DEFAULT_DOCKERFILE_PATH);
            let dockerfile = if version.files_of_type(FileType::Dockerfile).next().is_some() {
                Validation::valid(FileType::Dockerfile)
            } else {
                Validation::invalid(FileType::Dockerfile, path, MISSING_DOCKERFILE)
            };
            version.add_or_update_validation(dockerfile);
        }
    }
}
