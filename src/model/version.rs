//! Versions: one branch or tag snapshot of an entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::language::FileType;
use super::source_file::SourceFile;
use super::validation::Validation;

/// Kind of git ref a version was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    #[default]
    Unset,
    Branch,
    Tag,
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceType::Unset => "UNSET",
            ReferenceType::Branch => "BRANCH",
            ReferenceType::Tag => "TAG",
        };
        f.write_str(name)
    }
}

/// Where a version's description came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DescriptionSource {
    Descriptor,
    Readme,
}

/// Human metadata carried by versions and entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_source: Option<DescriptionSource>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.author.is_none() && self.email.is_none() && self.description.is_none()
    }
}

/// One branch/tag snapshot of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub name: String,
    /// Raw git reference the version was read at.
    pub reference: String,
    #[serde(default)]
    pub reference_type: ReferenceType,
    pub workflow_path: String,
    #[serde(default)]
    pub dirty: bool,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    /// Keyed by absolute path.
    #[serde(default)]
    pub source_files: BTreeMap<String, SourceFile>,
    #[serde(default)]
    pub validations: Vec<Validation>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Version {
    /// A bare version for a newly observed ref.
    pub fn new(name: &str, workflow_path: &str) -> Self {
        Self {
            name: name.to_string(),
            reference: name.to_string(),
            reference_type: ReferenceType::Unset,
            workflow_path: workflow_path.to_string(),
            dirty: false,
            valid: false,
            frozen: false,
            last_modified: None,
            commit_id: None,
            source_files: BTreeMap::new(),
            validations: Vec::new(),
            metadata: Metadata::default(),
        }
    }

    /// Sets the reference type unless one was already resolved.
    ///
    /// Returns whether the value changed.
    pub fn resolve_reference_type(&mut self, reference_type: ReferenceType) -> bool {
        if self.reference_type == ReferenceType::Unset && reference_type != ReferenceType::Unset {
            self.reference_type = reference_type;
            true
        } else {
            false
        }
    }

    /// Adds a file unless one with the same absolute path is already present.
    ///
    /// Returns whether the file was inserted.
    pub fn add_source_file(&mut self, file: SourceFile) -> bool {
        if self.source_files.contains_key(&file.absolute_path) {
            return false;
        }
        self.source_files.insert(file.absolute_path.clone(), file);
        true
    }

    pub fn source_file(&self, absolute_path: &str) -> Option<&SourceFile> {
        self.source_files.get(absolute_path)
    }

    /// Files of one type, ordered by absolute path.
    pub fn files_of_type(&self, file_type: FileType) -> impl Iterator<Item = &SourceFile> {
        self.source_files
            .values()
            .filter(move |f| f.file_type == file_type)
    }

    /// Replaces the record for the same file type, or appends it.
    pub fn add_or_update_validation(&mut self, validation: Validation) {
        match self
            .validations
            .iter_mut()
            .find(|v| v.file_type == validation.file_type)
        {
            Some(existing) => *existing = validation,
            None => self.validations.push(validation),
        }
        self.recompute_validity();
    }

    /// Folds a record into the existing one for its file type.
    pub fn merge_validation(&mut self, validation: Validation) {
        match self
            .validations
            .iter_mut()
            .find(|v| v.file_type == validation.file_type)
        {
            Some(existing) => existing.merge(validation),
            None => self.validations.push(validation),
        }
        self.recompute_validity();
    }

    pub fn validation(&self, file_type: FileType) -> Option<&Validation> {
        self.validations.iter().find(|v| v.file_type == file_type)
    }

    /// Validity is the AND of every record; a version with no records is invalid.
    pub fn recompute_validity(&mut self) {
        self.valid = !self.validations.is_empty() && self.validations.iter().all(|v| v.valid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_type_is_set_once() {
        let mut version = Version::new("master", "/Dockstore.cwl");
        assert!(!version.resolve_reference_type(ReferenceType::Unset));
        assert!(version.resolve_reference_type(ReferenceType::Branch));
        assert!(!version.resolve_reference_type(ReferenceType::Tag));
        assert_eq!(version.reference_type, ReferenceType::Branch);
    }

    #[test]
    fn test_duplicate_absolute_path_is_ignored() {
        let mut version = Version::new("master", "/Dockstore.cwl");
        let first = SourceFile::new(FileType::DockstoreCwl, "a.cwl", "/a.cwl", Some("one".into()));
        let second = SourceFile::new(FileType::DockstoreCwl, "./a.cwl", "/a.cwl", Some("two".into()));
        assert!(version.add_source_file(first));
        assert!(!version.add_source_file(second));
        assert_eq!(version.source_files.len(), 1);
        assert_eq!(
            version.source_file("/a.cwl").and_then(|f| f.content.as_deref()),
            Some("one")
        );
    }

    #[test]
    fn test_validity_is_and_of_records() {
        let mut version = Version::new("master", "/Dockstore.cwl");
        assert!(!version.valid);
        version.add_or_update_validation(Validation::valid(FileType::DockstoreCwl));
        assert!(version.valid);
        version.add_or_update_validation(Validation::invalid(FileType::CwlTestJson, "/test.json", "bad"));
        assert!(!version.valid);
        version.add_or_update_validation(Validation::valid(FileType::CwlTestJson));
        assert!(version.valid);
        assert_eq!(version.validations.len(), 2);
    }

    #[test]
    fn test_merge_validation_extends_messages() {
        let mut version = Version::new("master", "/Dockstore.wdl");
        version.add_or_update_validation(Validation::valid(FileType::DockstoreWdl));
        version.merge_validation(Validation::invalid(
            FileType::DockstoreWdl,
            "/Dockstore.wdl",
            "WDL file is malformed or missing, cannot extract metadata",
        ));
        assert!(!version.valid);
        assert_eq!(version.validation(FileType::DockstoreWdl).map(|v| v.messages.len()), Some(1));
    }

    #[test]
    fn test_reference_type_serializes_screaming() {
        let json = serde_json::to_string(&ReferenceType::Tag).unwrap();
        assert_eq!(json, "\"TAG\"");
    }
}
