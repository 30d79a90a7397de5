//! Entries: the registrable workflow or tool and its versions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::language::{DescriptorLanguage, FileType};
use super::repository::RepositoryReference;
use super::version::{Metadata, Version};
use crate::error::{Error, Result};

/// Default test-parameter path for every language.
pub const DEFAULT_TEST_PARAMETER_PATH: &str = "/test.json";

/// Default Dockerfile path for tools.
pub const DEFAULT_DOCKERFILE_PATH: &str = "/Dockerfile";

/// How an entry's versions are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryMode {
    /// Registered, no versions fetched yet.
    #[default]
    Stub,
    /// Versions reconciled from source control.
    Full,
    /// Versions uploaded directly; never reconciled.
    Hosted,
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryMode::Stub => "STUB",
            EntryMode::Full => "FULL",
            EntryMode::Hosted => "HOSTED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Workflow,
    Tool,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Workflow => f.write_str("workflow"),
            EntryKind::Tool => f.write_str("tool"),
        }
    }
}

impl FromStr for EntryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "workflow" => Ok(EntryKind::Workflow),
            "tool" => Ok(EntryKind::Tool),
            other => Err(Error::ConfigParse {
                message: format!("unknown entry kind '{}'", other),
                hint: Some("Use one of: workflow, tool".to_string()),
            }),
        }
    }
}

/// Default file locations new versions start from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPaths {
    pub descriptor: String,
    pub test_parameter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
}

impl DefaultPaths {
    pub fn for_language(language: DescriptorLanguage, kind: EntryKind) -> Self {
        Self {
            descriptor: language.default_descriptor_path().to_string(),
            test_parameter: DEFAULT_TEST_PARAMETER_PATH.to_string(),
            dockerfile: match kind {
                EntryKind::Tool => Some(DEFAULT_DOCKERFILE_PATH.to_string()),
                EntryKind::Workflow => None,
            },
        }
    }

    /// Default path for a file type, if the entry has one.
    pub fn path_for(&self, file_type: FileType) -> Option<&str> {
        match file_type {
            FileType::Dockerfile => self.dockerfile.as_deref(),
            t if t.is_test_parameter() => Some(self.test_parameter.as_str()),
            FileType::Nextflow => None,
            _ => Some(self.descriptor.as_str()),
        }
    }
}

/// A registered workflow or tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub reference: RepositoryReference,
    #[serde(default)]
    pub kind: EntryKind,
    pub descriptor_language: DescriptorLanguage,
    #[serde(default)]
    pub mode: EntryMode,
    /// Empty for hosted entries.
    #[serde(default)]
    pub git_url: String,
    pub default_paths: DefaultPaths,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_version: Option<String>,
    #[serde(default)]
    pub versions: BTreeMap<String, Version>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Path of the entry this one checks, for checker workflows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checker_for: Option<String>,
}

impl Entry {
    /// A stub entry for a repository, with default paths for the language.
    pub fn new(reference: RepositoryReference, language: DescriptorLanguage, kind: EntryKind) -> Self {
        let git_url = reference.git_url();
        Self {
            reference,
            kind,
            descriptor_language: language,
            mode: EntryMode::Stub,
            git_url,
            default_paths: DefaultPaths::for_language(language, kind),
            default_version: None,
            versions: BTreeMap::new(),
            metadata: Metadata::default(),
            is_published: false,
            last_modified: None,
            last_updated: None,
            checker_for: None,
        }
    }

    /// Registry path, `<host>/<org>/<repo>[/<name>]`.
    pub fn path(&self) -> String {
        self.reference.path()
    }

    pub fn version(&self, name: &str) -> Option<&Version> {
        self.versions.get(name)
    }

    pub fn default_version(&self) -> Option<&Version> {
        self.default_version
            .as_deref()
            .and_then(|name| self.versions.get(name))
    }

    /// Whether any version is marked valid.
    pub fn has_valid_version(&self) -> bool {
        self.versions.values().any(|v| v.valid)
    }

    /// Copies the default version's metadata onto the entry, absent values included.
    ///
    /// No-op when no default version is set or it names a missing version.
    pub fn sync_metadata_with_default(&mut self) {
        if let Some(metadata) = self.default_version().map(|v| v.metadata.clone()) {
            self.metadata = metadata;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DescriptionSource, SourceControl};

    fn entry() -> Entry {
        Entry::new(
            RepositoryReference::new(SourceControl::GitHub, "org", "repo"),
            DescriptorLanguage::Cwl,
            EntryKind::Workflow,
        )
    }

    #[test]
    fn test_new_entry_is_stub() {
        let entry = entry();
        assert_eq!(entry.mode, EntryMode::Stub);
        assert!(entry.versions.is_empty());
        assert_eq!(entry.git_url, "git@github.com:org/repo.git");
        assert_eq!(entry.default_paths.descriptor, "/Dockstore.cwl");
        assert_eq!(entry.default_paths.dockerfile, None);
        assert_eq!(entry.path(), "github.com/org/repo");
    }

    #[test]
    fn test_tool_has_dockerfile_default() {
        let paths = DefaultPaths::for_language(DescriptorLanguage::Wdl, EntryKind::Tool);
        assert_eq!(paths.path_for(FileType::Dockerfile), Some("/Dockerfile"));
        assert_eq!(paths.path_for(FileType::WdlTestJson), Some("/test.json"));
        assert_eq!(paths.path_for(FileType::DockstoreWdl), Some("/Dockstore.wdl"));
    }

    #[test]
    fn test_sync_metadata_overwrites_with_absent_values() {
        let mut entry = entry();
        entry.metadata.author = Some("old author".to_string());
        let mut version = Version::new("master", "/Dockstore.cwl");
        version.metadata.description = Some("from readme".to_string());
        version.metadata.description_source = Some(DescriptionSource::Readme);
        entry.versions.insert("master".to_string(), version);
        entry.default_version = Some("master".to_string());

        entry.sync_metadata_with_default();
        assert_eq!(entry.metadata.author, None);
        assert_eq!(entry.metadata.description.as_deref(), Some("from readme"));
    }

    #[test]
    fn test_entry_kind_from_str() {
        assert_eq!("Tool".parse::<EntryKind>().unwrap(), EntryKind::Tool);
        assert!("service".parse::<EntryKind>().is_err());
    }
}
