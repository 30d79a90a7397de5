//! # Descriptor Stores
//!
//! A [`DescriptorStore`] reads files and refs from one source-control
//! provider. The reconciliation engine only ever talks to this trait, which
//! keeps provider quirks (pagination, raw-content endpoints, auth headers)
//! inside the adapters:
//!
//! - [`github::GitHubStore`]: `Link: <…>; rel="next"` pagination.
//! - [`bitbucket::BitbucketStore`]: JSON `next` field pagination.
//! - [`gitlab::GitLabStore`]: `X-Next-Page` header pagination.
//! - [`memory::MemoryStore`]: in-process refs and files, for tests and embedders.
//!
//! Missing files and directories are `Ok(None)` / empty listings, never
//! errors. Transport failures surface as `Error::ServiceUnavailable` and
//! rejected credentials as `Error::ReconnectAccount`.

pub mod bitbucket;
pub mod github;
pub mod gitlab;
pub mod http;
pub mod memory;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::config::SyncConfig;
use crate::error::Result;
use crate::model::{FileType, RepositoryReference, SourceControl, SourceFile};
use crate::path::{is_readme, strip_leading_slash};

pub use bitbucket::BitbucketStore;
pub use github::GitHubStore;
pub use gitlab::GitLabStore;
pub use memory::MemoryStore;

/// Whether a ref is a branch or a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Branch,
    Tag,
}

/// One branch or tag with its tip commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRef {
    pub name: String,
    pub kind: RefKind,
    pub commit_id: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl GitRef {
    pub fn branch(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: RefKind::Branch,
            commit_id: None,
            last_modified: None,
        }
    }

    pub fn tag(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: RefKind::Tag,
            commit_id: None,
            last_modified: None,
        }
    }

    pub fn with_commit(mut self, commit_id: &str, last_modified: Option<DateTime<Utc>>) -> Self {
        self.commit_id = Some(commit_id.to_string());
        self.last_modified = last_modified;
        self
    }
}

/// Read access to one provider's repositories.
///
/// `repository_id` is the provider-side `organization/repository` string and
/// `reference` a branch or tag name. Paths may carry a leading slash.
pub trait DescriptorStore: Send + Sync {
    fn source_control(&self) -> SourceControl;

    /// Raw text of a file, or `None` when it does not exist at `reference`.
    fn read_file(&self, repository_id: &str, path: &str, reference: &str) -> Result<Option<String>>;

    /// Names of the files directly inside `directory`. Empty when the
    /// directory does not exist.
    fn list_files(&self, repository_id: &str, directory: &str, reference: &str) -> Result<Vec<String>>;

    /// Every branch and tag, fully drained across pages.
    fn list_refs(&self, repository_id: &str) -> Result<Vec<GitRef>>;

    /// Canonical git URL to repository id, for every repository the
    /// credentials can see.
    fn git_url_to_repository_id(&self) -> Result<BTreeMap<String, String>>;

    /// The provider's main branch for a repository.
    fn default_branch(&self, repository_id: &str) -> Result<Option<String>>;
}

/// Reads a file and wraps it as a [`SourceFile`].
///
/// Oversized or binary content is replaced by a placeholder. Returns
/// `Ok(None)` when the file is absent.
pub fn read_source_file(
    store: &dyn DescriptorStore,
    repository_id: &str,
    reference: &str,
    file_type: FileType,
    path: &str,
    absolute_path: &str,
) -> Result<Option<SourceFile>> {
    Ok(store
        .read_file(repository_id, absolute_path, reference)?
        .map(|content| SourceFile::new(file_type, path, absolute_path, Some(content))))
}

/// Content of the first README at the repository root, if any.
pub fn readme_content(store: &dyn DescriptorStore, repository_id: &str, reference: &str) -> Result<Option<String>> {
    let names = store.list_files(repository_id, "/", reference)?;
    match names.iter().find(|name| is_readme(name)) {
        Some(name) => store.read_file(repository_id, &format!("/{}", strip_leading_slash(name)), reference),
        None => Ok(None),
    }
}

/// Builds the adapter for a provider from configuration.
pub fn for_provider(source_control: SourceControl, config: &SyncConfig) -> Result<Box<dyn DescriptorStore>> {
    let store: Box<dyn DescriptorStore> = match source_control {
        SourceControl::GitHub => Box::new(GitHubStore::from_config(config)?),
        SourceControl::Bitbucket => Box::new(BitbucketStore::from_config(config)?),
        SourceControl::GitLab => Box::new(GitLabStore::from_config(config)?),
    };
    Ok(store)
}

/// Picks the adapter from the host segment of a git URL.
pub fn for_git_url(git_url: &str, config: &SyncConfig) -> Result<(Box<dyn DescriptorStore>, RepositoryReference)> {
    let reference = RepositoryReference::from_git_url(git_url)?;
    let store = for_provider(reference.source_control, config)?;
    Ok((store, reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::source_file::BINARY_CONTENT_MESSAGE;

    fn store() -> MemoryStore {
        let store = MemoryStore::new(SourceControl::GitHub);
        store.add_ref("org/repo", GitRef::branch("main"));
        store.add_file("org/repo", "main", "/Readme.md", "# Hello");
        store.add_file("org/repo", "main", "/docs/README.md", "# Nested");
        store.add_file("org/repo", "main", "/blob.bin", "a\0b");
        store
    }

    #[test]
    fn test_readme_found_at_root_only() {
        let store = store();
        assert_eq!(
            readme_content(&store, "org/repo", "main").unwrap().as_deref(),
            Some("# Hello")
        );
        assert_eq!(readme_content(&store, "org/repo", "missing").unwrap(), None);
    }

    #[test]
    fn test_read_source_file_sanitizes() {
        let store = store();
        let file = read_source_file(&store, "org/repo", "main", FileType::Dockerfile, "blob.bin", "/blob.bin")
            .unwrap()
            .unwrap();
        assert_eq!(file.content.as_deref(), Some(BINARY_CONTENT_MESSAGE));
        assert_eq!(file.path, "blob.bin");
        assert!(read_source_file(&store, "org/repo", "main", FileType::Dockerfile, "x", "/x")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_for_git_url_picks_adapter() {
        let config = SyncConfig::default();
        let (store, reference) = for_git_url("git@gitlab.com:group/sub/project.git", &config).unwrap();
        assert_eq!(store.source_control(), SourceControl::GitLab);
        assert_eq!(reference.repository_id(), "group/sub/project");

        let (store, _) = for_git_url("git://bitbucket.org/org/repo.git", &config).unwrap();
        assert_eq!(store.source_control(), SourceControl::Bitbucket);
    }

    #[test]
    fn test_for_git_url_rejects_unknown_host() {
        let config = SyncConfig::default();
        let err = for_git_url("git@example.org:a/b.git", &config).err().unwrap();
        assert!(matches!(err, Error::UnsupportedSource { .. }));
    }
}
