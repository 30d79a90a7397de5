//! # Domain Model
//!
//! Plain data types shared by the stores, language handlers and the
//! reconciliation engine. Nothing here performs I/O.
//!
//! - [`RepositoryReference`] identifies a remote repository.
//! - [`Entry`] is the registrable workflow or tool, owning its [`Version`]s.
//! - [`SourceFile`] and [`Validation`] are attached to versions during a pass.

pub mod entry;
pub mod language;
pub mod repository;
pub mod source_file;
pub mod validation;
pub mod version;

pub use entry::{DefaultPaths, Entry, EntryKind, EntryMode};
pub use language::{DescriptorLanguage, FileType};
pub use repository::{parse_git_url, ParsedGitUrl, RepositoryReference, SourceControl};
pub use source_file::SourceFile;
pub use validation::{Validation, ValidationReport};
pub use version::{DescriptionSource, Metadata, ReferenceType, Version};
