//! Descriptor languages and the file types they own

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A workflow/tool description language understood by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorLanguage {
    Cwl,
    Wdl,
    Nextflow,
}

impl DescriptorLanguage {
    /// All supported languages, in registry order.
    pub const ALL: [DescriptorLanguage; 3] = [
        DescriptorLanguage::Cwl,
        DescriptorLanguage::Wdl,
        DescriptorLanguage::Nextflow,
    ];

    /// The file type of this language's primary descriptor.
    pub fn descriptor_type(self) -> FileType {
        match self {
            DescriptorLanguage::Cwl => FileType::DockstoreCwl,
            DescriptorLanguage::Wdl => FileType::DockstoreWdl,
            DescriptorLanguage::Nextflow => FileType::NextflowConfig,
        }
    }

    /// The file type of this language's test-parameter files.
    pub fn test_parameter_type(self) -> FileType {
        match self {
            DescriptorLanguage::Cwl => FileType::CwlTestJson,
            DescriptorLanguage::Wdl => FileType::WdlTestJson,
            DescriptorLanguage::Nextflow => FileType::NextflowTestParams,
        }
    }

    /// Default path of the primary descriptor in a fresh entry.
    pub fn default_descriptor_path(self) -> &'static str {
        match self {
            DescriptorLanguage::Cwl => "/Dockstore.cwl",
            DescriptorLanguage::Wdl => "/Dockstore.wdl",
            DescriptorLanguage::Nextflow => "/nextflow.config",
        }
    }

    /// Short human name used in diagnostics ("CWL", "WDL", "Nextflow").
    pub fn display_name(self) -> &'static str {
        match self {
            DescriptorLanguage::Cwl => "CWL",
            DescriptorLanguage::Wdl => "WDL",
            DescriptorLanguage::Nextflow => "Nextflow",
        }
    }
}

impl fmt::Display for DescriptorLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for DescriptorLanguage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cwl" => Ok(DescriptorLanguage::Cwl),
            "wdl" => Ok(DescriptorLanguage::Wdl),
            "nextflow" | "nfl" => Ok(DescriptorLanguage::Nextflow),
            other => Err(Error::ConfigParse {
                message: format!("unknown descriptor language '{}'", other),
                hint: Some("Use one of: cwl, wdl, nextflow".to_string()),
            }),
        }
    }
}

/// The role a stored file plays within a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    DockstoreCwl,
    DockstoreWdl,
    NextflowConfig,
    /// Secondary Nextflow files: scripts, modules, lib/ and bin/ content.
    Nextflow,
    CwlTestJson,
    WdlTestJson,
    NextflowTestParams,
    Dockerfile,
}

impl FileType {
    /// Whether files of this type carry test parameters.
    pub fn is_test_parameter(self) -> bool {
        matches!(
            self,
            FileType::CwlTestJson | FileType::WdlTestJson | FileType::NextflowTestParams
        )
    }

    /// The language owning this file type, if any.
    pub fn language(self) -> Option<DescriptorLanguage> {
        match self {
            FileType::DockstoreCwl | FileType::CwlTestJson => Some(DescriptorLanguage::Cwl),
            FileType::DockstoreWdl | FileType::WdlTestJson => Some(DescriptorLanguage::Wdl),
            FileType::NextflowConfig | FileType::Nextflow | FileType::NextflowTestParams => {
                Some(DescriptorLanguage::Nextflow)
            }
            FileType::Dockerfile => None,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileType::DockstoreCwl => "DOCKSTORE_CWL",
            FileType::DockstoreWdl => "DOCKSTORE_WDL",
            FileType::NextflowConfig => "NEXTFLOW_CONFIG",
            FileType::Nextflow => "NEXTFLOW",
            FileType::CwlTestJson => "CWL_TEST_JSON",
            FileType::WdlTestJson => "WDL_TEST_JSON",
            FileType::NextflowTestParams => "NEXTFLOW_TEST_PARAMS",
            FileType::Dockerfile => "DOCKERFILE",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_file_types_round_trip() {
        for language in DescriptorLanguage::ALL {
            assert_eq!(language.descriptor_type().language(), Some(language));
            assert_eq!(language.test_parameter_type().language(), Some(language));
            assert!(language.test_parameter_type().is_test_parameter());
            assert!(!language.descriptor_type().is_test_parameter());
        }
    }

    #[test]
    fn test_parse_language() {
        assert_eq!("CWL".parse::<DescriptorLanguage>().unwrap(), DescriptorLanguage::Cwl);
        assert_eq!("nfl".parse::<DescriptorLanguage>().unwrap(), DescriptorLanguage::Nextflow);
        let err = "galaxy".parse::<DescriptorLanguage>().unwrap_err();
        assert!(err.to_string().contains("galaxy"));
    }

    #[test]
    fn test_file_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&FileType::CwlTestJson).unwrap();
        assert_eq!(json, "\"CWL_TEST_JSON\"");
        assert_eq!(FileType::CwlTestJson.to_string(), "CWL_TEST_JSON");
    }

    #[test]
    fn test_dockerfile_has_no_language() {
        assert_eq!(FileType::Dockerfile.language(), None);
    }
}
