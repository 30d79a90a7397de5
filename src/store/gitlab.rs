//! GitLab REST v4 adapter

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::http::{parse_timestamp, ApiClient, Auth, MAX_PAGES};
use super::{DescriptorStore, GitRef, RefKind};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::model::SourceControl;
use crate::path::strip_leading_slash;

const PER_PAGE: &str = "100";

#[derive(Debug, Deserialize)]
struct RefItem {
    name: String,
    commit: Option<Commit>,
}

#[derive(Debug, Deserialize)]
struct Commit {
    id: String,
    committed_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Project {
    path_with_namespace: String,
    #[serde(default)]
    default_branch: Option<String>,
}

/// Descriptor store backed by the GitLab API.
///
/// The project id is sent URL-encoded (`group%2Fproject`), so subgroups work.
#[derive(Debug, Clone)]
pub struct GitLabStore {
    api: ApiClient,
}

impl GitLabStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let provider = config.provider(SourceControl::GitLab);
        let api = ApiClient::new(
            SourceControl::GitLab,
            &config.api_url(SourceControl::GitLab),
            Auth::from_parts(None, provider.token.as_deref()),
            config.http.timeout(),
        )?;
        Ok(Self::new(api))
    }

    /// Drains a listing by following the `X-Next-Page` header.
    fn paged<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = "1".to_string();
        for _ in 0..MAX_PAGES {
            let mut pairs = query.to_vec();
            pairs.push(("per_page", PER_PAGE));
            pairs.push(("page", page.as_str()));
            let url = self.api.endpoint(segments, &pairs)?;
            let Some((values, response)) = self.api.get_json::<Vec<T>>(url)? else {
                return Ok(items);
            };
            items.extend(values);
            match response.header("x-next-page").map(str::trim) {
                Some(next) if !next.is_empty() => page = next.to_string(),
                _ => return Ok(items),
            }
        }
        log::warn!("GitLab listing stopped after {} pages", MAX_PAGES);
        Ok(items)
    }

    fn refs_of_kind(&self, repository_id: &str, kind: RefKind) -> Result<Vec<GitRef>> {
        let collection = match kind {
            RefKind::Branch => "branches",
            RefKind::Tag => "tags",
        };
        let items: Vec<RefItem> = self.paged(&["projects", repository_id, "repository", collection], &[])?;
        Ok(items
            .into_iter()
            .map(|item| {
                let (commit_id, last_modified) = match item.commit {
                    Some(commit) => {
                        let date = commit.committed_date.as_deref().and_then(parse_timestamp);
                        (Some(commit.id), date)
                    }
                    None => (None, None),
                };
                GitRef {
                    name: item.name,
                    kind,
                    commit_id,
                    last_modified,
                }
            })
            .collect())
    }
}

impl DescriptorStore for GitLabStore {
    fn source_control(&self) -> SourceControl {
        SourceControl::GitLab
    }

    fn read_file(&self, repository_id: &str, path: &str, reference: &str) -> Result<Option<String>> {
        let url = self.api.endpoint(
            &[
                "projects",
                repository_id,
                "repository",
                "files",
                strip_leading_slash(path),
                "raw",
            ],
            &[("ref", reference)],
        )?;
        Ok(self.api.get(url, None)?.map(|r| r.body))
    }

    fn list_files(&self, repository_id: &str, directory: &str, reference: &str) -> Result<Vec<String>> {
        let directory = strip_leading_slash(directory).trim_end_matches('/');
        let mut query = vec![("ref", reference)];
        if !directory.is_empty() {
            query.push(("path", directory));
        }
        let items: Vec<TreeItem> =
            self.paged(&["projects", repository_id, "repository", "tree"], &query)?;
        Ok(items
            .into_iter()
            .filter(|item| item.kind == "blob")
            .map(|item| item.name)
            .collect())
    }

    fn list_refs(&self, repository_id: &str) -> Result<Vec<GitRef>> {
        let mut refs = self.refs_of_kind(repository_id, RefKind::Branch)?;
        refs.extend(self.refs_of_kind(repository_id, RefKind::Tag)?);
        log::debug!("GitLab {} has {} refs", repository_id, refs.len());
        Ok(refs)
    }

    fn git_url_to_repository_id(&self) -> Result<BTreeMap<String, String>> {
        let projects: Vec<Project> = self.paged(&["projects"], &[("membership", "true")])?;
        Ok(projects
            .into_iter()
            .map(|p| (SourceControl::GitLab.git_url(&p.path_with_namespace), p.path_with_namespace))
            .collect())
    }

    fn default_branch(&self, repository_id: &str) -> Result<Option<String>> {
        let url = self.api.endpoint(&["projects", repository_id], &[])?;
        Ok(self
            .api
            .get_json::<Project>(url)?
            .and_then(|(project, _)| project.default_branch))
    }
}
