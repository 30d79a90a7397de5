//! Common Workflow Language handler
//!
//! CWL documents are YAML. Imports are any of `$import`, `$include`,
//! `$mixin`, `import`, `include`, `mixin` anywhere in the document, plus
//! `run:` given either as a path or as a nested map.

use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::{DeclaredImport, LanguageHandler, MetadataOutcome};
use crate::model::{DescriptionSource, DescriptorLanguage, EntryKind, FileType, Metadata, SourceFile, Validation};
use crate::path::{convert_relative_path_to_absolute, normalize};

const IMPORT_KEYWORDS: [&str; 6] = ["$import", "$include", "$mixin", "import", "include", "mixin"];

pub const MISSING_PRIMARY: &str = "Primary CWL descriptor is not present.";
pub const REQUIRES_WORKFLOW: &str = "Requires class: Workflow.";
pub const REQUIRES_TOOL: &str = "Requires class: CommandLineTool or ExpressionTool.";
pub const INVALID_VERSION: &str = "Invalid CWL version.";

#[derive(Debug, Clone, Copy, Default)]
pub struct CwlHandler;

fn class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"(?m)^\s*class:\s*["']?([A-Za-z]+)"#).expect("static regex"))
}

fn get<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(Value::String(key.to_string()))
}

fn get_str<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
    get(map, key).and_then(Value::as_str)
}

/// Classes declared at the top level, or by each `$graph` member.
fn declared_classes(content: &str) -> Vec<String> {
    match serde_yaml::from_str::<Value>(content) {
        Ok(Value::Mapping(map)) => {
            let mut classes: Vec<String> = get_str(&map, "class").map(str::to_string).into_iter().collect();
            if let Some(Value::Sequence(graph)) = get(&map, "$graph") {
                classes.extend(
                    graph
                        .iter()
                        .filter_map(Value::as_mapping)
                        .filter_map(|m| get_str(m, "class"))
                        .map(str::to_string),
                );
            }
            classes
        }
        _ => class_pattern()
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .collect(),
    }
}

fn has_supported_version(content: &str) -> bool {
    match serde_yaml::from_str::<Value>(content) {
        Ok(Value::Mapping(map)) => get_str(&map, "cwlVersion")
            .map(|v| v.starts_with("v1"))
            .unwrap_or(false),
        _ => false,
    }
}

fn import_target(current_path: &str, raw: &str) -> Option<DeclaredImport> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') || raw.contains("://") {
        return None;
    }
    let path = raw.split('#').next().unwrap_or(raw);
    Some(DeclaredImport {
        path: path.to_string(),
        absolute_path: convert_relative_path_to_absolute(current_path, path),
        file_type: FileType::DockstoreCwl,
    })
}

fn collect_imports(current_path: &str, value: &Value, out: &mut Vec<DeclaredImport>) {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                let key = key.as_str().map(str::to_ascii_lowercase).unwrap_or_default();
                if IMPORT_KEYWORDS.contains(&key.as_str()) {
                    if let Some(import) = child.as_str().and_then(|s| import_target(current_path, s)) {
                        out.push(import);
                    }
                } else if key == "run" {
                    match child {
                        Value::String(s) => out.extend(import_target(current_path, s)),
                        Value::Mapping(_) => collect_imports(current_path, child, out),
                        _ => {}
                    }
                } else {
                    collect_imports(current_path, child, out);
                }
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_imports(current_path, item, out);
            }
        }
        Value::Tagged(tagged) => collect_imports(current_path, &tagged.value, out),
        _ => {}
    }
}

/// `doc` as a string, an `$include` of another file, or a list of lines.
fn doc_text(path: &str, value: &Value, files: &BTreeMap<String, SourceFile>) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Mapping(map) => get_str(map, "$include").and_then(|include| {
            let absolute = convert_relative_path_to_absolute(path, include);
            files.get(&absolute).and_then(|f| f.content.clone())
        }),
        Value::Sequence(items) => {
            let lines: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if lines.is_empty() {
                None
            } else {
                Some(lines.join("\n"))
            }
        }
        _ => None,
    }
}

fn first_mapping(value: &Value) -> Option<&Mapping> {
    match value {
        Value::Mapping(map) => Some(map),
        Value::Sequence(items) => items.iter().find_map(Value::as_mapping),
        _ => None,
    }
}

fn author_and_email(map: &Mapping) -> (Option<String>, Option<String>) {
    if let Some(author) = get(map, "s:author").and_then(first_mapping) {
        return (
            get_str(author, "s:name").map(str::to_string),
            get_str(author, "s:email").map(strip_mailto),
        );
    }
    if let Some(creator) = get(map, "dct:creator").and_then(first_mapping) {
        return (
            get_str(creator, "foaf:name").map(str::to_string),
            get_str(creator, "foaf:mbox").map(strip_mailto),
        );
    }
    (None, None)
}

fn strip_mailto(email: &str) -> String {
    email.trim().trim_start_matches("mailto:").to_string()
}

fn malformed(path: &str, reason: impl std::fmt::Display) -> MetadataOutcome {
    MetadataOutcome::failed(Validation::invalid(
        FileType::DockstoreCwl,
        path,
        format!("CWL file is malformed or missing, cannot extract metadata: {}", reason),
    ))
}

impl LanguageHandler for CwlHandler {
    fn language(&self) -> DescriptorLanguage {
        DescriptorLanguage::Cwl
    }

    fn direct_imports(&self, current_path: &str, content: &str) -> Vec<DeclaredImport> {
        let Ok(value) = serde_yaml::from_str::<Value>(content) else {
            return Vec::new();
        };
        let mut imports = Vec::new();
        collect_imports(current_path, &value, &mut imports);
        let mut seen = std::collections::HashSet::new();
        imports.retain(|i| seen.insert(i.absolute_path.clone()));
        imports
    }

    fn parse_metadata(&self, path: &str, content: &str, files: &BTreeMap<String, SourceFile>) -> MetadataOutcome {
        let map = match serde_yaml::from_str::<Value>(content) {
            Ok(Value::Mapping(map)) => map,
            Ok(_) => return malformed(path, "document is not a mapping"),
            Err(e) => return malformed(path, e),
        };

        let description = get(&map, "doc")
            .and_then(|doc| doc_text(path, doc, files))
            .or_else(|| get_str(&map, "description").map(str::to_string))
            .or_else(|| get_str(&map, "label").map(str::to_string));
        let (author, email) = author_and_email(&map);

        MetadataOutcome::parsed(Metadata {
            author,
            email,
            description_source: description.as_ref().map(|_| DescriptionSource::Descriptor),
            description,
        })
    }

    fn validate_primary_set(&self, files: &BTreeMap<String, SourceFile>, primary_path: &str, kind: EntryKind) -> Validation {
        let primary_key = normalize(primary_path);
        let primary_path = primary_key.as_str();
        let primary = files
            .get(primary_path)
            .filter(|f| f.file_type == FileType::DockstoreCwl);
        let Some(primary) = primary else {
            return Validation::invalid(FileType::DockstoreCwl, primary_path, MISSING_PRIMARY);
        };
        let content = primary.content.as_deref().unwrap_or("");
        if content.is_empty() {
            let message = match kind {
                EntryKind::Workflow => "Primary descriptor is empty.",
                EntryKind::Tool => "Primary CWL descriptor is empty.",
            };
            return Validation::invalid(FileType::DockstoreCwl, primary_path, message);
        }

        let classes = declared_classes(content);
        let has_construct = match kind {
            EntryKind::Workflow => classes.iter().any(|c| c == "Workflow"),
            EntryKind::Tool => classes
                .iter()
                .any(|c| c == "CommandLineTool" || c == "ExpressionTool"),
        };
        if !has_construct {
            let message = match kind {
                EntryKind::Workflow => REQUIRES_WORKFLOW,
                EntryKind::Tool => REQUIRES_TOOL,
            };
            return Validation::invalid(FileType::DockstoreCwl, primary_path, message);
        }
        if !has_supported_version(content) {
            return Validation::invalid(FileType::DockstoreCwl, primary_path, INVALID_VERSION);
        }
        Validation::valid(FileType::DockstoreCwl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKFLOW: &str = r#"
cwlVersion: v1.0
class: Workflow
doc: Aligns reads
s:author:
  - class: s:Person
    s:name: Ada
    s:email: mailto:ada@example.org
inputs: []
outputs: []
steps:
  align:
    run: tools/align.cwl
  sort:
    run:
      $import: tools/sort.cwl
  remote:
    run: https://example.org/tool.cwl
requirements:
  - $import: types.yml
"#;

    fn files(entries: &[(&str, FileType, &str)]) -> BTreeMap<String, SourceFile> {
        entries
            .iter()
            .map(|(path, t, content)| {
                (
                    path.to_string(),
                    SourceFile::new(*t, path, path, Some(content.to_string())),
                )
            })
            .collect()
    }

    #[test]
    fn test_direct_imports() {
        let imports = CwlHandler.direct_imports("/Dockstore.cwl", WORKFLOW);
        let paths: Vec<&str> = imports.iter().map(|i| i.absolute_path.as_str()).collect();
        assert!(paths.contains(&"/tools/align.cwl"));
        assert!(paths.contains(&"/tools/sort.cwl"));
        assert!(paths.contains(&"/types.yml"));
        assert_eq!(paths.len(), 3);
        let align = imports.iter().find(|i| i.absolute_path == "/tools/align.cwl").unwrap();
        assert_eq!(align.path, "tools/align.cwl");
    }

    #[test]
    fn test_no_directives_no_imports() {
        let content = "cwlVersion: v1.0\nclass: CommandLineTool\nbaseCommand: echo\n";
        assert!(CwlHandler.direct_imports("/tool.cwl", content).is_empty());
        assert!(CwlHandler.direct_imports("/x.cwl", "not: [valid").is_empty());
    }

    #[test]
    fn test_metadata_from_doc_and_schema_author() {
        let outcome = CwlHandler.parse_metadata("/Dockstore.cwl", WORKFLOW, &BTreeMap::new());
        assert!(outcome.failure.is_none());
        assert_eq!(outcome.metadata.description.as_deref(), Some("Aligns reads"));
        assert_eq!(outcome.metadata.author.as_deref(), Some("Ada"));
        assert_eq!(outcome.metadata.email.as_deref(), Some("ada@example.org"));
        assert_eq!(outcome.metadata.description_source, Some(DescriptionSource::Descriptor));
    }

    #[test]
    fn test_metadata_doc_include_and_dct_creator() {
        let content = r#"
cwlVersion: v1.0
class: CommandLineTool
doc:
  $include: docs/about.md
dct:creator:
  foaf:name: Grace
  foaf:mbox: mailto:grace@example.org
"#;
        let known = files(&[("/docs/about.md", FileType::DockstoreCwl, "Long description")]);
        let outcome = CwlHandler.parse_metadata("/Dockstore.cwl", content, &known);
        assert_eq!(outcome.metadata.description.as_deref(), Some("Long description"));
        assert_eq!(outcome.metadata.author.as_deref(), Some("Grace"));
        assert_eq!(outcome.metadata.email.as_deref(), Some("grace@example.org"));
    }

    #[test]
    fn test_metadata_fallbacks() {
        let draft3 = "class: Workflow\ndescription: old style\nlabel: short\n";
        let outcome = CwlHandler.parse_metadata("/a.cwl", draft3, &BTreeMap::new());
        assert_eq!(outcome.metadata.description.as_deref(), Some("old style"));

        let labelled = "class: Workflow\nlabel: short\n";
        let outcome = CwlHandler.parse_metadata("/a.cwl", labelled, &BTreeMap::new());
        assert_eq!(outcome.metadata.description.as_deref(), Some("short"));

        let listed = "class: Workflow\ndoc:\n  - line one\n  - line two\n";
        let outcome = CwlHandler.parse_metadata("/a.cwl", listed, &BTreeMap::new());
        assert_eq!(outcome.metadata.description.as_deref(), Some("line one\nline two"));
    }

    #[test]
    fn test_malformed_metadata_fails_soft() {
        let outcome = CwlHandler.parse_metadata("/a.cwl", "class: [Workflow", &BTreeMap::new());
        assert!(outcome.metadata.is_empty());
        let failure = outcome.failure.unwrap();
        assert!(!failure.valid);
        assert!(failure.messages["/a.cwl"].starts_with("CWL file is malformed or missing"));
    }

    #[test]
    fn test_validation_order() {
        let empty = BTreeMap::new();
        let v = CwlHandler.validate_primary_set(&empty, "/Dockstore.cwl", EntryKind::Workflow);
        assert_eq!(v.messages["/Dockstore.cwl"], MISSING_PRIMARY);

        let blank = files(&[("/Dockstore.cwl", FileType::DockstoreCwl, "")]);
        let v = CwlHandler.validate_primary_set(&blank, "/Dockstore.cwl", EntryKind::Workflow);
        assert_eq!(v.messages["/Dockstore.cwl"], "Primary descriptor is empty.");

        let tool = files(&[("/Dockstore.cwl", FileType::DockstoreCwl, "cwlVersion: v1.0\nclass: CommandLineTool\n")]);
        let v = CwlHandler.validate_primary_set(&tool, "/Dockstore.cwl", EntryKind::Workflow);
        assert_eq!(v.messages["/Dockstore.cwl"], REQUIRES_WORKFLOW);
        assert!(CwlHandler.validate_primary_set(&tool, "/Dockstore.cwl", EntryKind::Tool).valid);

        let draft = files(&[("/Dockstore.cwl", FileType::DockstoreCwl, "cwlVersion: draft-3\nclass: Workflow\n")]);
        let v = CwlHandler.validate_primary_set(&draft, "/Dockstore.cwl", EntryKind::Workflow);
        assert_eq!(v.messages["/Dockstore.cwl"], INVALID_VERSION);

        let good = files(&[("/Dockstore.cwl", FileType::DockstoreCwl, WORKFLOW)]);
        let v = CwlHandler.validate_primary_set(&good, "/Dockstore.cwl", EntryKind::Workflow);
        assert!(v.valid);
        assert!(v.messages.is_empty());
    }

    #[test]
    fn test_messages_keyed_by_absolute_path() {
        let v = CwlHandler.validate_primary_set(&BTreeMap::new(), "Dockstore.cwl", EntryKind::Workflow);
        assert_eq!(v.messages.keys().collect::<Vec<_>>(), vec!["/Dockstore.cwl"]);

        let draft = files(&[("/Dockstore.cwl", FileType::DockstoreCwl, "cwlVersion: draft-3\nclass: Workflow\n")]);
        let v = CwlHandler.validate_primary_set(&draft, "Dockstore.cwl", EntryKind::Workflow);
        assert_eq!(v.messages["/Dockstore.cwl"], INVALID_VERSION);
    }

    #[test]
    fn test_packed_graph_classes() {
        let packed = "cwlVersion: v1.2\n$graph:\n  - class: CommandLineTool\n    id: '#tool'\n  - class: Workflow\n    id: '#main'\n";
        let set = files(&[("/packed.cwl", FileType::DockstoreCwl, packed)]);
        assert!(CwlHandler.validate_primary_set(&set, "/packed.cwl", EntryKind::Workflow).valid);
        assert!(CwlHandler.validate_primary_set(&set, "/packed.cwl", EntryKind::Tool).valid);
    }
}
