//! # Imports Command Implementation
//!
//! Prints the import graph of one version as a tree rooted at its primary
//! descriptor. A file imported from several places appears under each
//! importer; an import that leads back into its own ancestry is shown once
//! and marked.
//!
//! Read-only: works on the stored entry and never contacts the provider.

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};
use std::borrow::Cow;

use super::Context;
use workflow_sync::languages::{DependencyGraph, LanguageRegistry};
use workflow_sync::suggestions;

#[derive(Args, Debug)]
pub struct ImportsArgs {
    /// Repository git URL of a registered entry.
    pub git_url: String,

    /// Version whose imports to show.
    pub version: String,

    /// Maximum depth to display. 0 shows only the primary descriptor.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

pub fn execute(args: ImportsArgs, ctx: &Context) -> Result<()> {
    let entry = ctx.load_entry(&args.git_url)?;
    let Some(version) = entry.version(&args.version) else {
        let names: Vec<&str> = entry.versions.keys().map(String::as_str).collect();
        return Err(suggestions::unknown_version(&args.version, &names));
    };
    let registry = LanguageRegistry::default();
    let handler = registry
        .get(entry.descriptor_language)
        .ok_or_else(|| anyhow::anyhow!("No handler for {}", entry.descriptor_language))?;

    let graph = handler.dependency_graph(&version.source_files, &version.workflow_path);
    let root = build_tree_node(&graph, &graph.root, args.depth.unwrap_or(usize::MAX), &mut Vec::new());
    print_tree(&root).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    Ok(())
}

fn build_tree_node(graph: &DependencyGraph, node: &str, max_depth: usize, ancestors: &mut Vec<String>) -> TreeNode {
    if ancestors.iter().any(|a| a == node) {
        return TreeNode {
            label: format!("{} (cycle)", node),
            children: vec![],
        };
    }
    if ancestors.len() >= max_depth {
        return TreeNode {
            label: node.to_string(),
            children: vec![],
        };
    }
    ancestors.push(node.to_string());
    let children = graph
        .children(node)
        .map(|child| build_tree_node(graph, child, max_depth, ancestors))
        .collect();
    ancestors.pop();
    TreeNode {
        label: node.to_string(),
        children,
    }
}

#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _style: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph {
            root: "/main.wdl".to_string(),
            ..DependencyGraph::default()
        };
        for (from, to) in edges {
            graph.nodes.insert(from.to_string());
            graph.nodes.insert(to.to_string());
            graph.edges.insert((from.to_string(), to.to_string()));
        }
        graph
    }

    #[test]
    fn test_tree_follows_edges() {
        let graph = graph(&[("/main.wdl", "/a.wdl"), ("/a.wdl", "/b.wdl"), ("/main.wdl", "/b.wdl")]);
        let tree = build_tree_node(&graph, "/main.wdl", usize::MAX, &mut Vec::new());
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].label, "/a.wdl");
        assert_eq!(tree.children[0].children[0].label, "/b.wdl");
    }

    #[test]
    fn test_cycle_is_marked() {
        let graph = graph(&[("/main.wdl", "/a.wdl"), ("/a.wdl", "/main.wdl")]);
        let tree = build_tree_node(&graph, "/main.wdl", usize::MAX, &mut Vec::new());
        assert_eq!(tree.children[0].children[0].label, "/main.wdl (cycle)");
    }

    #[test]
    fn test_depth_limit() {
        let graph = graph(&[("/main.wdl", "/a.wdl")]);
        let tree = build_tree_node(&graph, "/main.wdl", 0, &mut Vec::new());
        assert!(tree.children.is_empty());
    }
}
