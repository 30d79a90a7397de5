//! Nextflow handler
//!
//! The primary descriptor is `nextflow.config`. Its `manifest` names the
//! main script (default `main.nf`); `includeConfig` pulls in further config
//! files, DSL2 `include { … } from '…'` statements pull in modules, and the
//! `lib/` and `bin/` directories beside the config are always shipped.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use super::{build_dependency_graph, DeclaredImport, DependencyGraph, ImportContext, LanguageHandler, MetadataOutcome};
use crate::error::Result;
use crate::model::{DescriptionSource, DescriptorLanguage, EntryKind, FileType, Metadata, SourceFile, Validation};
use crate::path::{convert_relative_path_to_absolute, normalize, parent_dir};

pub const DEFAULT_MAIN_SCRIPT: &str = "main.nf";
pub const MISSING_PRIMARY: &str = "Primary Nextflow descriptor is not present.";
pub const MALFORMED: &str = "Nextflow config is malformed or missing, cannot extract metadata";

const LAYOUT_DIRECTORIES: [&str; 2] = ["lib", "bin"];

#[derive(Debug, Clone, Copy, Default)]
pub struct NextflowHandler;

fn manifest_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\bmanifest\s*\{").expect("static regex"))
}

fn assignment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?m)^\s*(\w+)\s*=\s*(?:'([^']*)'|"([^"]*)")"#).expect("static regex")
    })
}

fn dotted_manifest_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?m)^\s*manifest\.(\w+)\s*=\s*(?:'([^']*)'|"([^"]*)")"#).expect("static regex")
    })
}

fn include_config_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"(?m)^\s*includeConfig\s+['"]([^'"]+)['"]"#).expect("static regex"))
}

fn dsl2_include_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?m)^\s*include\s*\{[^}]*\}\s*from\s*['"]([^'"]+)['"]"#).expect("static regex")
    })
}

fn dsl_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"nextflow\.enable\.dsl\s*=\s*(\d+)").expect("static regex"))
}

fn is_config(path: &str) -> bool {
    path.ends_with(".config")
}

/// Body of the `manifest { ... }` block, or `None` if its braces never close.
fn manifest_block(content: &str) -> Option<Option<&str>> {
    let Some(found) = manifest_block_pattern().find(content) else {
        return Some(None);
    };
    let start = found.end();
    let mut depth = 1;
    for (offset, ch) in content[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(Some(&content[start..start + offset]));
                }
            }
            _ => {}
        }
    }
    None
}

fn braces_balanced(content: &str) -> bool {
    let mut depth: i64 = 0;
    for line in content.lines() {
        let code = line.split("//").next().unwrap_or("");
        for ch in code.chars() {
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
    }
    depth == 0
}

/// Manifest settings from the block form and the dotted form.
fn manifest(content: &str) -> Option<BTreeMap<String, String>> {
    let block = manifest_block(content)?;
    let mut values = BTreeMap::new();
    if let Some(block) = block {
        for captures in assignment_pattern().captures_iter(block) {
            let value = captures.get(2).or_else(|| captures.get(3)).map(|m| m.as_str());
            values.insert(captures[1].to_string(), value.unwrap_or("").to_string());
        }
    }
    for captures in dotted_manifest_pattern().captures_iter(content) {
        let value = captures.get(2).or_else(|| captures.get(3)).map(|m| m.as_str());
        values.insert(captures[1].to_string(), value.unwrap_or("").to_string());
    }
    Some(values)
}

fn main_script(config_path: &str, content: &str) -> String {
    let declared = manifest(content)
        .and_then(|m| m.get("mainScript").cloned())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MAIN_SCRIPT.to_string());
    convert_relative_path_to_absolute(config_path, &declared)
}

fn import(current_path: &str, path: &str, file_type: FileType) -> DeclaredImport {
    DeclaredImport {
        path: path.to_string(),
        absolute_path: convert_relative_path_to_absolute(current_path, path),
        file_type,
    }
}

impl LanguageHandler for NextflowHandler {
    fn language(&self) -> DescriptorLanguage {
        DescriptorLanguage::Nextflow
    }

    fn direct_imports(&self, current_path: &str, content: &str) -> Vec<DeclaredImport> {
        let mut imports = Vec::new();
        if is_config(current_path) {
            for captures in include_config_pattern().captures_iter(content) {
                imports.push(import(current_path, &captures[1], FileType::NextflowConfig));
            }
        } else {
            for captures in dsl2_include_pattern().captures_iter(content) {
                let target = &captures[1];
                if target.starts_with("plugin/") {
                    continue;
                }
                let target = if target.ends_with(".nf") {
                    target.to_string()
                } else {
                    format!("{}.nf", target)
                };
                imports.push(import(current_path, &target, FileType::Nextflow));
            }
        }
        let mut seen = BTreeSet::new();
        imports.retain(|i| seen.insert(i.absolute_path.clone()));
        imports
    }

    /// The main script named by the primary config, then `lib/` and `bin/`.
    fn layout_imports(&self, ctx: &ImportContext<'_>, primary_path: &str, content: &str) -> Result<Vec<DeclaredImport>> {
        let base = parent_dir(primary_path);
        let main = main_script(primary_path, content);
        let mut imports = vec![DeclaredImport {
            path: main.clone(),
            absolute_path: main,
            file_type: FileType::Nextflow,
        }];
        for directory in LAYOUT_DIRECTORIES {
            let dir = normalize(&format!("{}/{}", base, directory));
            let names = match ctx.store.list_files(ctx.repository_id, &dir, ctx.reference) {
                Ok(names) => names,
                Err(e) => {
                    log::warn!("Could not list {} at {}: {}", dir, ctx.reference, e);
                    continue;
                }
            };
            for name in names {
                let relative = format!("{}/{}", directory, name);
                imports.push(import(primary_path, &relative, FileType::Nextflow));
            }
        }
        Ok(imports)
    }

    fn parse_metadata(&self, path: &str, content: &str, _files: &BTreeMap<String, SourceFile>) -> MetadataOutcome {
        let manifest = if braces_balanced(content) { manifest(content) } else { None };
        let Some(manifest) = manifest else {
            return MetadataOutcome::failed(Validation::invalid(FileType::NextflowConfig, path, MALFORMED));
        };
        let pick = |key: &str| {
            manifest
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let description = pick("description");
        MetadataOutcome::parsed(Metadata {
            author: pick("author"),
            email: None,
            description_source: description.as_ref().map(|_| DescriptionSource::Descriptor),
            description,
        })
    }

    fn validate_primary_set(&self, files: &BTreeMap<String, SourceFile>, primary_path: &str, kind: EntryKind) -> Validation {
        let primary_key = normalize(primary_path);
        let primary_path = primary_key.as_str();
        let primary = files
            .get(primary_path)
            .filter(|f| f.file_type == FileType::NextflowConfig);
        let Some(primary) = primary else {
            return Validation::invalid(FileType::NextflowConfig, primary_path, MISSING_PRIMARY);
        };
        if !primary.has_content() {
            return Validation::invalid(FileType::NextflowConfig, primary_path, "Primary descriptor is empty.");
        }
        if kind == EntryKind::Tool {
            return Validation::invalid(
                FileType::NextflowConfig,
                primary_path,
                "Nextflow entries must be workflows.",
            );
        }
        let content = primary.content.as_deref().unwrap_or("");

        let main = main_script(primary_path, content);
        let main_file = files.get(&main).filter(|f| f.has_content());
        let Some(main_file) = main_file else {
            return Validation::invalid(
                FileType::NextflowConfig,
                primary_path,
                format!("Main script '{}' is not present.", main),
            );
        };

        let declared_dsl = dsl_pattern()
            .captures(content)
            .or_else(|| main_file.content.as_deref().and_then(|c| dsl_pattern().captures(c)))
            .map(|c| c[1].to_string());
        if let Some(dsl) = declared_dsl {
            if dsl != "1" && dsl != "2" {
                return Validation::invalid(
                    FileType::NextflowConfig,
                    primary_path,
                    format!("Unsupported Nextflow DSL version: {}.", dsl),
                );
            }
        }

        Validation::valid(FileType::NextflowConfig)
    }

    /// Layout files have no importer in the documents; they hang off the config.
    fn dependency_graph(&self, files: &BTreeMap<String, SourceFile>, primary_path: &str) -> DependencyGraph {
        let mut graph = build_dependency_graph(self, files, primary_path);
        let imported: BTreeSet<String> = graph.edges.iter().map(|(_, to)| to.clone()).collect();
        let orphans: Vec<String> = graph
            .nodes
            .iter()
            .filter(|n| **n != graph.root && !imported.contains(*n))
            .cloned()
            .collect();
        for orphan in orphans {
            graph.edges.insert((graph.root.clone(), orphan));
        }
        graph
    }
}
