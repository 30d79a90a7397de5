//! # Descriptor Language Handlers
//!
//! One [`LanguageHandler`] per [`DescriptorLanguage`]. A handler knows how to:
//!
//! - find the imports a document declares ([`LanguageHandler::direct_imports`]),
//! - pull the transitive import closure from a [`DescriptorStore`]
//!   ([`LanguageHandler::resolve_imports`]),
//! - extract human metadata without failing the caller
//!   ([`LanguageHandler::parse_metadata`]),
//! - validate the primary descriptor set and the test-parameter set.
//!
//! Handlers are looked up through a [`LanguageRegistry`], which the
//! reconciliation engine receives by injection.
//!
//! Import resolution de-duplicates by absolute path and stops at the limits
//! in [`ImportLimits`]; neither a cycle nor a pathological chain can make it
//! run away.

pub mod cwl;
pub mod nextflow;
pub mod wdl;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::Result;
use crate::model::{DescriptorLanguage, EntryKind, FileType, Metadata, SourceFile, Validation};
use crate::path::normalize;
use crate::store::DescriptorStore;

pub use cwl::CwlHandler;
pub use nextflow::NextflowHandler;
pub use wdl::WdlHandler;

/// Ceiling on transitive import resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportLimits {
    /// Import hops from the primary descriptor.
    pub max_depth: usize,
    /// Files fetched for one version.
    pub max_files: usize,
}

impl Default for ImportLimits {
    fn default() -> Self {
        Self {
            max_depth: crate::defaults::DEFAULT_MAX_IMPORT_DEPTH,
            max_files: crate::defaults::DEFAULT_MAX_IMPORT_FILES,
        }
    }
}

/// Where imports are fetched from.
pub struct ImportContext<'a> {
    pub store: &'a dyn DescriptorStore,
    pub repository_id: &'a str,
    pub reference: &'a str,
    pub limits: ImportLimits,
}

/// An import found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredImport {
    /// Path as written in the importing document.
    pub path: String,
    pub absolute_path: String,
    pub file_type: FileType,
}

/// Metadata extracted from a descriptor, plus the invalid record to merge
/// into the version when extraction failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataOutcome {
    pub metadata: Metadata,
    pub failure: Option<Validation>,
}

impl MetadataOutcome {
    pub fn parsed(metadata: Metadata) -> Self {
        Self {
            metadata,
            failure: None,
        }
    }

    pub fn failed(validation: Validation) -> Self {
        Self {
            metadata: Metadata::default(),
            failure: Some(validation),
        }
    }
}

/// File-level import graph of one version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    pub root: String,
    pub nodes: BTreeSet<String>,
    /// importer -> imported
    pub edges: BTreeSet<(String, String)>,
}

impl DependencyGraph {
    pub fn children<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .iter()
            .filter(move |(from, _)| from == node)
            .map(|(_, to)| to.as_str())
    }

    /// Whether following edges from any node leads back to it.
    ///
    /// Returns the first node found on a cycle.
    pub fn find_cycle(&self) -> Option<String> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }
        fn visit(graph: &DependencyGraph, node: &str, marks: &mut HashMap<String, Mark>) -> Option<String> {
            match marks.get(node) {
                Some(Mark::Visiting) => return Some(node.to_string()),
                Some(Mark::Done) => return None,
                None => {}
            }
            marks.insert(node.to_string(), Mark::Visiting);
            for child in graph.children(node) {
                if let Some(found) = visit(graph, child, marks) {
                    return Some(found);
                }
            }
            marks.insert(node.to_string(), Mark::Done);
            None
        }

        let mut marks = HashMap::new();
        self.nodes.iter().find_map(|node| visit(self, node, &mut marks))
    }
}

/// Per-language parsing, import resolution and validation.
pub trait LanguageHandler: Send + Sync {
    fn language(&self) -> DescriptorLanguage;

    /// Imports written directly in `content`, resolved against `current_path`.
    ///
    /// Unparseable content declares no imports.
    fn direct_imports(&self, current_path: &str, content: &str) -> Vec<DeclaredImport>;

    /// Imports that come from the repository layout rather than the document.
    fn layout_imports(&self, _ctx: &ImportContext<'_>, _primary_path: &str, _content: &str) -> Result<Vec<DeclaredImport>> {
        Ok(Vec::new())
    }

    /// Best-effort metadata. Never fails; problems land in `failure`.
    fn parse_metadata(&self, path: &str, content: &str, files: &BTreeMap<String, SourceFile>) -> MetadataOutcome;

    /// Checks the primary descriptor and its dependents.
    fn validate_primary_set(&self, files: &BTreeMap<String, SourceFile>, primary_path: &str, kind: EntryKind) -> Validation;

    /// Every test-parameter file must parse as JSON or YAML.
    fn validate_test_parameter_set(&self, files: &BTreeMap<String, SourceFile>) -> Validation {
        check_valid_json_and_yaml_files(files, self.language().test_parameter_type())
    }

    /// Transitive imports of the primary descriptor, keyed by absolute path.
    ///
    /// The primary itself is never part of the result.
    fn resolve_imports(&self, ctx: &ImportContext<'_>, content: &str, primary_path: &str) -> Result<BTreeMap<String, SourceFile>> {
        resolve_transitively(self, ctx, content, primary_path)
    }

    /// Import graph over the files already in a version.
    fn dependency_graph(&self, files: &BTreeMap<String, SourceFile>, primary_path: &str) -> DependencyGraph {
        build_dependency_graph(self, files, primary_path)
    }
}

fn resolve_transitively<H: LanguageHandler + ?Sized>(
    handler: &H,
    ctx: &ImportContext<'_>,
    content: &str,
    primary_path: &str,
) -> Result<BTreeMap<String, SourceFile>> {
    let primary = normalize(primary_path);
    let mut resolved = BTreeMap::new();
    let mut pending: Vec<(DeclaredImport, usize)> = Vec::new();

    let mut first = handler.direct_imports(&primary, content);
    first.extend(handler.layout_imports(ctx, &primary, content)?);
    pending.extend(first.into_iter().rev().map(|i| (i, 1)));

    let mut ceiling_logged = false;
    while let Some((import, depth)) = pending.pop() {
        if import.absolute_path == primary || resolved.contains_key(&import.absolute_path) {
            continue;
        }
        if depth > ctx.limits.max_depth || resolved.len() >= ctx.limits.max_files {
            if !ceiling_logged {
                log::warn!(
                    "Import ceiling reached in {} at {} (depth {}, {} files), skipping {}",
                    ctx.repository_id,
                    ctx.reference,
                    depth,
                    resolved.len(),
                    import.absolute_path
                );
                ceiling_logged = true;
            }
            continue;
        }

        let content = match ctx
            .store
            .read_file(ctx.repository_id, &import.absolute_path, ctx.reference)
        {
            Ok(Some(content)) => content,
            Ok(None) => {
                log::warn!("Could not read {} at {}", import.absolute_path, ctx.reference);
                continue;
            }
            Err(e) => {
                log::warn!("Could not read {} at {}: {}", import.absolute_path, ctx.reference, e);
                continue;
            }
        };

        let file = SourceFile::new(import.file_type, &import.path, &import.absolute_path, Some(content));
        let nested = file
            .content
            .as_deref()
            .map(|c| handler.direct_imports(&import.absolute_path, c))
            .unwrap_or_default();
        pending.extend(nested.into_iter().rev().map(|i| (i, depth + 1)));
        resolved.insert(import.absolute_path.clone(), file);
    }

    Ok(resolved)
}

fn build_dependency_graph<H: LanguageHandler + ?Sized>(
    handler: &H,
    files: &BTreeMap<String, SourceFile>,
    primary_path: &str,
) -> DependencyGraph {
    let root = normalize(primary_path);
    let mut graph = DependencyGraph {
        root: root.clone(),
        ..DependencyGraph::default()
    };
    graph.nodes.insert(root);
    for (path, file) in files {
        if file.file_type.is_test_parameter() || file.file_type == FileType::Dockerfile {
            continue;
        }
        graph.nodes.insert(path.clone());
        if let Some(content) = file.content.as_deref() {
            for import in handler.direct_imports(path, content) {
                if files.contains_key(&import.absolute_path) {
                    graph.edges.insert((path.clone(), import.absolute_path));
                }
            }
        }
    }
    graph
}

/// Validates every file of `file_type` as JSON, falling back to YAML.
///
/// A set without such files is valid.
pub fn check_valid_json_and_yaml_files(files: &BTreeMap<String, SourceFile>, file_type: FileType) -> Validation {
    let mut validation = Validation::valid(file_type);
    for file in files.values().filter(|f| f.file_type == file_type) {
        let content = file.content.as_deref().unwrap_or("");
        if content.trim().is_empty() {
            validation.valid = false;
            validation
                .messages
                .insert(file.path.clone(), "File has no content.".to_string());
            continue;
        }
        if serde_json::from_str::<serde_json::Value>(content).is_ok() {
            continue;
        }
        if let Err(e) = serde_yaml::from_str::<serde_yaml::Value>(content) {
            validation.valid = false;
            validation
                .messages
                .insert(file.path.clone(), format!("Is not valid JSON or YAML: {}", e));
        }
    }
    validation
}

/// Maps each language to its handler.
pub struct LanguageRegistry {
    handlers: BTreeMap<DescriptorLanguage, Box<dyn LanguageHandler>>,
}

impl LanguageRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Adds or replaces the handler for its language.
    pub fn register(&mut self, handler: Box<dyn LanguageHandler>) {
        self.handlers.insert(handler.language(), handler);
    }

    pub fn get(&self, language: DescriptorLanguage) -> Option<&dyn LanguageHandler> {
        self.handlers.get(&language).map(|h| h.as_ref())
    }

    pub fn languages(&self) -> impl Iterator<Item = DescriptorLanguage> + '_ {
        self.handlers.keys().copied()
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(CwlHandler));
        registry.register(Box::new(WdlHandler));
        registry.register(Box::new(NextflowHandler));
        registry
    }
}
