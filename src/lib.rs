//! # workflow-sync
//!
//! Mirrors CWL, WDL and Nextflow workflows and tools from GitHub, Bitbucket
//! and GitLab into a version model: one version per branch or tag, each with
//! its descriptor files, their transitive imports, test parameters and
//! validation results.
//!
//! ## Quick Example
//!
//! ```
//! use workflow_sync::languages::LanguageRegistry;
//! use workflow_sync::model::{DescriptorLanguage, EntryKind, RepositoryReference, SourceControl};
//! use workflow_sync::persistence::MemoryVersionStore;
//! use workflow_sync::reconcile::{create_stub, ReconcileOptions, Reconciler};
//! use workflow_sync::store::{GitRef, MemoryStore};
//!
//! let store = MemoryStore::new(SourceControl::GitHub);
//! store.add_ref("org/repo", GitRef::branch("master"));
//! store.add_file(
//!     "org/repo",
//!     "master",
//!     "/Dockstore.cwl",
//!     "cwlVersion: v1.0\nclass: Workflow\ninputs: []\noutputs: []\nsteps: []\n",
//! );
//!
//! let entry = create_stub(
//!     RepositoryReference::new(SourceControl::GitHub, "org", "repo"),
//!     DescriptorLanguage::Cwl,
//!     EntryKind::Workflow,
//! );
//! let lookup = MemoryVersionStore::new();
//! let registry = LanguageRegistry::default();
//! let reconciler = Reconciler::new(&store, &lookup, &registry, ReconcileOptions::default());
//!
//! let result = reconciler.refresh(&entry).unwrap();
//! assert!(result.reports["master"].valid);
//! assert!(workflow_sync::policy::can_publish(&result.entry));
//! ```
//!
//! ## Modules
//!
//! - **`store`**: one [`store::DescriptorStore`] per provider, reading files
//!   and listing refs over each provider's REST API, plus an in-memory store.
//! - **`languages`**: one [`languages::LanguageHandler`] per descriptor
//!   language for imports, metadata and validation.
//! - **`reconcile`**: the engine that turns refs into versions and merges
//!   them with what was persisted before.
//! - **`policy`**: publishability and default-version decisions.
//! - **`persistence`**: where versions are looked up and saved.
//! - **`config`**, **`defaults`**, **`output`**, **`suggestions`**: the
//!   ambient pieces the CLI is built from.

pub mod config;
pub mod defaults;
pub mod error;
pub mod languages;
pub mod model;
pub mod output;
pub mod path;
pub mod persistence;
pub mod policy;
pub mod reconcile;
pub mod store;
pub mod suggestions;

#[cfg(test)]
mod path_proptest;
