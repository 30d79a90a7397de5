//! Validation records attached to versions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::language::FileType;

/// Result of checking all files of one type within a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub file_type: FileType,
    pub valid: bool,
    /// Diagnostic per file path. Empty when valid.
    #[serde(default)]
    pub messages: BTreeMap<String, String>,
}

impl Validation {
    pub fn valid(file_type: FileType) -> Self {
        Self {
            file_type,
            valid: true,
            messages: BTreeMap::new(),
        }
    }

    /// An invalid record with a single diagnostic for `path`.
    pub fn invalid(file_type: FileType, path: &str, message: impl Into<String>) -> Self {
        let mut messages = BTreeMap::new();
        messages.insert(path.to_string(), message.into());
        Self {
            file_type,
            valid: false,
            messages,
        }
    }

    /// Folds another record for the same file type into this one.
    ///
    /// The result is valid only if both are, and messages from `other`
    /// replace messages for the same path.
    pub fn merge(&mut self, other: Validation) {
        self.valid = self.valid && other.valid;
        self.messages.extend(other.messages);
    }
}

/// Per-version summary handed to callers after a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub version: String,
    pub valid: bool,
    pub validations: Vec<Validation>,
}

impl ValidationReport {
    /// All diagnostics across the version's records, as `(path, message)`.
    pub fn messages(&self) -> Vec<(&str, &str)> {
        self.validations
            .iter()
            .flat_map(|v| v.messages.iter().map(|(p, m)| (p.as_str(), m.as_str())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_invalid() {
        let mut base = Validation::valid(FileType::DockstoreCwl);
        base.merge(Validation::invalid(FileType::DockstoreCwl, "/a.cwl", "bad"));
        assert!(!base.valid);
        assert_eq!(base.messages.get("/a.cwl").map(String::as_str), Some("bad"));

        let mut invalid = Validation::invalid(FileType::DockstoreCwl, "/a.cwl", "first");
        invalid.merge(Validation::valid(FileType::DockstoreCwl));
        assert!(!invalid.valid);
    }

    #[test]
    fn test_report_messages() {
        let report = ValidationReport {
            version: "master".to_string(),
            valid: false,
            validations: vec![
                Validation::valid(FileType::CwlTestJson),
                Validation::invalid(FileType::DockstoreCwl, "/Dockstore.cwl", "Requires class: Workflow."),
            ],
        };
        assert_eq!(
            report.messages(),
            vec![("/Dockstore.cwl", "Requires class: Workflow.")]
        );
    }
}
