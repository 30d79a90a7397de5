//! In-memory descriptor store

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{DescriptorStore, GitRef};
use crate::error::{Error, Result};
use crate::model::SourceControl;
use crate::path::{normalize, parent_dir};

#[derive(Debug, Default)]
struct State {
    refs: BTreeMap<String, Vec<GitRef>>,
    /// (repository id, reference) -> absolute path -> content
    files: HashMap<(String, String), BTreeMap<String, String>>,
    default_branches: HashMap<String, String>,
    /// Absolute paths whose reads fail with a transport error.
    failing_paths: HashSet<String>,
    unavailable: bool,
    reads: HashMap<String, usize>,
}

/// Refs and files held in process memory.
///
/// Clones share the same state, so a test can keep a handle and change
/// upstream content between reconciliation passes.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    source_control: SourceControl,
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new(source_control: SourceControl) -> Self {
        Self {
            source_control,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| Error::LockPoisoned {
            context: "memory store".to_string(),
        })
    }

    fn with_state<F: FnOnce(&mut State)>(&self, f: F) {
        // Setup helpers ignore poisoning.
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard);
    }

    /// Registers a branch or tag, replacing one with the same name.
    pub fn add_ref(&self, repository_id: &str, git_ref: GitRef) {
        self.with_state(|state| {
            let refs = state.refs.entry(repository_id.to_string()).or_default();
            refs.retain(|r| r.name != git_ref.name);
            refs.push(git_ref);
        });
    }

    pub fn remove_ref(&self, repository_id: &str, name: &str) {
        self.with_state(|state| {
            if let Some(refs) = state.refs.get_mut(repository_id) {
                refs.retain(|r| r.name != name);
            }
        });
    }

    /// Adds or replaces a file at a reference.
    pub fn add_file(&self, repository_id: &str, reference: &str, path: &str, content: &str) {
        self.with_state(|state| {
            state
                .files
                .entry((repository_id.to_string(), reference.to_string()))
                .or_default()
                .insert(normalize(path), content.to_string());
        });
    }

    pub fn remove_file(&self, repository_id: &str, reference: &str, path: &str) {
        self.with_state(|state| {
            if let Some(files) = state
                .files
                .get_mut(&(repository_id.to_string(), reference.to_string()))
            {
                files.remove(&normalize(path));
            }
        });
    }

    pub fn set_default_branch(&self, repository_id: &str, branch: &str) {
        self.with_state(|state| {
            state
                .default_branches
                .insert(repository_id.to_string(), branch.to_string());
        });
    }

    /// Makes reads of `path` fail as if the provider timed out.
    pub fn fail_reads_of(&self, path: &str) {
        self.with_state(|state| {
            state.failing_paths.insert(normalize(path));
        });
    }

    /// Makes every call fail as if the provider were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.with_state(|state| state.unavailable = unavailable);
    }

    /// How many times `path` was read, across all refs.
    pub fn read_count(&self, path: &str) -> usize {
        self.lock()
            .map(|state| state.reads.get(&normalize(path)).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn check_available(&self, state: &State) -> Result<()> {
        if state.unavailable {
            Err(Error::ServiceUnavailable {
                provider: self.source_control.to_string(),
                message: "in-memory provider marked unavailable".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl DescriptorStore for MemoryStore {
    fn source_control(&self) -> SourceControl {
        self.source_control
    }

    fn read_file(&self, repository_id: &str, path: &str, reference: &str) -> Result<Option<String>> {
        let mut state = self.lock()?;
        self.check_available(&state)?;
        let path = normalize(path);
        *state.reads.entry(path.clone()).or_insert(0) += 1;
        if state.failing_paths.contains(&path) {
            return Err(Error::ServiceUnavailable {
                provider: self.source_control.to_string(),
                message: format!("timed out reading {}", path),
            });
        }
        Ok(state
            .files
            .get(&(repository_id.to_string(), reference.to_string()))
            .and_then(|files| files.get(&path))
            .cloned())
    }

    fn list_files(&self, repository_id: &str, directory: &str, reference: &str) -> Result<Vec<String>> {
        let state = self.lock()?;
        self.check_available(&state)?;
        let directory = normalize(directory);
        let wanted = directory.trim_end_matches('/');
        let names = state
            .files
            .get(&(repository_id.to_string(), reference.to_string()))
            .map(|files| {
                files
                    .keys()
                    .filter(|path| parent_dir(path) == wanted)
                    .map(|path| path[wanted.len() + 1..].to_string())
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }

    fn list_refs(&self, repository_id: &str) -> Result<Vec<GitRef>> {
        let state = self.lock()?;
        self.check_available(&state)?;
        Ok(state.refs.get(repository_id).cloned().unwrap_or_default())
    }

    fn git_url_to_repository_id(&self) -> Result<BTreeMap<String, String>> {
        let state = self.lock()?;
        self.check_available(&state)?;
        Ok(state
            .refs
            .keys()
            .map(|id| (self.source_control.git_url(id), id.clone()))
            .collect())
    }

    fn default_branch(&self, repository_id: &str) -> Result<Option<String>> {
        let state = self.lock()?;
        self.check_available(&state)?;
        Ok(state.default_branches.get(repository_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_and_list() {
        let store = MemoryStore::new(SourceControl::GitHub);
        store.add_file("o/r", "main", "Dockstore.cwl", "cwl");
        store.add_file("o/r", "main", "/lib/util.groovy", "groovy");
        store.add_file("o/r", "main", "/lib/sub/deep.groovy", "deep");

        assert_eq!(
            store.read_file("o/r", "/Dockstore.cwl", "main").unwrap().as_deref(),
            Some("cwl")
        );
        assert_eq!(store.read_file("o/r", "/Dockstore.cwl", "dev").unwrap(), None);
        assert_eq!(store.list_files("o/r", "/", "main").unwrap(), vec!["Dockstore.cwl"]);
        assert_eq!(store.list_files("o/r", "lib", "main").unwrap(), vec!["util.groovy"]);
        assert!(store.list_files("o/r", "/nothing", "main").unwrap().is_empty());
        assert_eq!(store.read_count("/Dockstore.cwl"), 2);
    }

    #[test]
    fn test_refs_and_urls() {
        let store = MemoryStore::new(SourceControl::Bitbucket);
        store.add_ref("o/r", GitRef::branch("main"));
        store.add_ref("o/r", GitRef::tag("1.0"));
        store.add_ref("o/r", GitRef::tag("1.0"));
        assert_eq!(store.list_refs("o/r").unwrap().len(), 2);
        store.remove_ref("o/r", "main");
        assert_eq!(store.list_refs("o/r").unwrap().len(), 1);

        let urls = store.git_url_to_repository_id().unwrap();
        assert_eq!(urls.get("git@bitbucket.org:o/r.git").map(String::as_str), Some("o/r"));
    }

    #[test]
    fn test_failures() {
        let store = MemoryStore::new(SourceControl::GitLab);
        store.add_file("o/r", "main", "/a.wdl", "x");
        store.fail_reads_of("/a.wdl");
        assert!(store.read_file("o/r", "/a.wdl", "main").unwrap_err().is_retryable());

        store.set_unavailable(true);
        assert!(store.list_refs("o/r").unwrap_err().is_retryable());
        store.set_unavailable(false);
        assert!(store.list_refs("o/r").is_ok());
    }
}
