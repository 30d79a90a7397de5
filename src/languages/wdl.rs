//! Workflow Description Language handler
//!
//! Parsing is structural only: import lines, `meta` blocks, brace balance,
//! and the `version` statement. Remote (`http://`, `https://`) imports are
//! left to the WDL runtime and never fetched.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::{build_dependency_graph, DeclaredImport, LanguageHandler, MetadataOutcome};
use crate::model::{DescriptionSource, DescriptorLanguage, EntryKind, FileType, Metadata, SourceFile, Validation};
use crate::path::{convert_relative_path_to_absolute, normalize};

pub const MISSING_PRIMARY: &str = "Primary WDL descriptor is not present.";
pub const MALFORMED: &str = "WDL file is malformed or missing, cannot extract metadata";

const SUPPORTED_VERSIONS: [&str; 3] = ["draft-2", "1.0", "1.1"];

#[derive(Debug, Clone, Copy, Default)]
pub struct WdlHandler;

fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"(?m)^\s*import\s+"(\S+)""#).expect("static regex"))
}

fn meta_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\bmeta\s*\{").expect("static regex"))
}

fn meta_entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"(?m)^\s*(\w+)\s*:\s*(.+?)\s*$"#).expect("static regex"))
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^\s*version\s+(\S+)").expect("static regex"))
}

fn workflow_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^\s*workflow\s+\w+\s*\{").expect("static regex"))
}

fn task_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^\s*task\s+\w+\s*\{").expect("static regex"))
}

/// Drops `#` comments and the contents of string literals.
fn strip_comments_and_strings(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for line in content.lines() {
        let mut quote: Option<char> = None;
        let mut escaped = false;
        for ch in line.chars() {
            match quote {
                Some(q) => {
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == q {
                        quote = None;
                        out.push(ch);
                    }
                }
                None => match ch {
                    '#' => break,
                    '"' | '\'' => {
                        quote = Some(ch);
                        out.push(ch);
                    }
                    _ => out.push(ch),
                },
            }
        }
        out.push('\n');
    }
    out
}

fn braces_balanced(content: &str) -> bool {
    let mut depth: i64 = 0;
    for ch in strip_comments_and_strings(content).chars() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Bodies of every `meta { ... }` block.
fn meta_blocks(content: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    for found in meta_pattern().find_iter(content) {
        let start = found.end();
        let mut depth = 1;
        for (offset, ch) in content[start..].char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        blocks.push(&content[start..start + offset]);
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    blocks
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"').trim_matches('\'').trim()
}

fn push_unique_split(target: &mut Vec<String>, value: &str) {
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !target.iter().any(|existing| existing == part) {
            target.push(part.to_string());
        }
    }
}

fn joined(values: Vec<String>) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

fn invalid(primary_path: &str, message: impl Into<String>) -> Validation {
    Validation::invalid(FileType::DockstoreWdl, primary_path, message)
}

impl LanguageHandler for WdlHandler {
    fn language(&self) -> DescriptorLanguage {
        DescriptorLanguage::Wdl
    }

    fn direct_imports(&self, current_path: &str, content: &str) -> Vec<DeclaredImport> {
        let mut imports: Vec<DeclaredImport> = Vec::new();
        for captures in import_pattern().captures_iter(content) {
            let target = &captures[1];
            if target.starts_with("http://") || target.starts_with("https://") {
                continue;
            }
            let path = target.strip_prefix("file://").unwrap_or(target);
            let absolute_path = convert_relative_path_to_absolute(current_path, path);
            if imports.iter().any(|i| i.absolute_path == absolute_path) {
                continue;
            }
            imports.push(DeclaredImport {
                path: path.to_string(),
                absolute_path,
                file_type: FileType::DockstoreWdl,
            });
        }
        imports
    }

    fn parse_metadata(&self, path: &str, content: &str, _files: &BTreeMap<String, SourceFile>) -> MetadataOutcome {
        if content.trim().is_empty() || !braces_balanced(content) {
            return MetadataOutcome::failed(Validation::invalid(FileType::DockstoreWdl, path, MALFORMED));
        }

        let mut authors = Vec::new();
        let mut emails = Vec::new();
        let mut description = None;
        for block in meta_blocks(content) {
            for captures in meta_entry_pattern().captures_iter(block) {
                let value = unquote(&captures[2]);
                match &captures[1] {
                    "author" => push_unique_split(&mut authors, value),
                    "email" => push_unique_split(&mut emails, value),
                    "description" if !value.is_empty() => description = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        MetadataOutcome::parsed(Metadata {
            author: joined(authors),
            email: joined(emails),
            description_source: description.as_ref().map(|_| DescriptionSource::Descriptor),
            description,
        })
    }

    fn validate_primary_set(&self, files: &BTreeMap<String, SourceFile>, primary_path: &str, kind: EntryKind) -> Validation {
        let primary_key = normalize(primary_path);
        let primary_path = primary_key.as_str();
        let wdl_files: BTreeMap<String, SourceFile> = files
            .iter()
            .filter(|(_, f)| f.file_type == FileType::DockstoreWdl)
            .map(|(p, f)| (p.clone(), f.clone()))
            .collect();
        if wdl_files.is_empty() {
            return invalid(primary_path, MISSING_PRIMARY);
        }

        let Some(primary) = wdl_files.get(primary_path) else {
            return invalid(
                primary_path,
                format!("The primary descriptor '{}' could not be found.", primary_path),
            );
        };
        if !primary.has_content() {
            return invalid(
                primary_path,
                format!(
                    "The primary descriptor '{}' has no content. Please make it a valid WDL document if you want to save.",
                    primary_path
                ),
            );
        }
        let content = primary.content.as_deref().unwrap_or("");

        for (path, file) in &wdl_files {
            if path != primary_path && file.content.is_some() && !file.has_content() {
                return invalid(
                    primary_path,
                    format!(
                        "File '{}' has no content. Either delete the file or make it a valid WDL document.",
                        file.path
                    ),
                );
            }
        }

        if let Some(node) = build_dependency_graph(self, &wdl_files, primary_path).find_cycle() {
            return invalid(primary_path, format!("Recursive local import detected: {}", node));
        }

        for (path, file) in &wdl_files {
            if !braces_balanced(file.content.as_deref().unwrap_or("")) {
                return invalid(
                    primary_path,
                    format!("WDL file '{}' is malformed: unbalanced braces.", path),
                );
            }
        }

        let has_construct = match kind {
            EntryKind::Workflow => workflow_pattern().is_match(content),
            EntryKind::Tool => task_pattern().is_match(content),
        };
        if !has_construct {
            let message = match kind {
                EntryKind::Workflow => "Primary WDL descriptor must declare a workflow.",
                EntryKind::Tool => "Primary WDL descriptor must declare a task.",
            };
            return invalid(primary_path, message);
        }

        let version = version_pattern()
            .captures(&strip_comments_and_strings(content))
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| "draft-2".to_string());
        if !SUPPORTED_VERSIONS.contains(&version.as_str()) {
            return invalid(
                primary_path,
                format!(
                    "Unsupported WDL version '{}'. Supported versions are draft-2, 1.0 and 1.1.",
                    version
                ),
            );
        }

        Validation::valid(FileType::DockstoreWdl)
    }
}
