//! GitHub REST v3 adapter

use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::http::{parse_timestamp, ApiClient, Auth, MAX_PAGES};
use super::{DescriptorStore, GitRef, RefKind};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::model::SourceControl;
use crate::path::strip_leading_slash;

const RAW_ACCEPT: &str = "application/vnd.github.raw";
const PER_PAGE: &str = "100";

#[derive(Debug, Deserialize)]
struct NamedRef {
    name: String,
    commit: CommitPointer,
}

#[derive(Debug, Deserialize)]
struct CommitPointer {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    commit: CommitBody,
}

#[derive(Debug, Deserialize)]
struct CommitBody {
    committer: Option<Signature>,
    author: Option<Signature>,
}

#[derive(Debug, Deserialize)]
struct Signature {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryInfo {
    full_name: String,
    #[serde(default)]
    default_branch: Option<String>,
}

/// Descriptor store backed by the GitHub API.
#[derive(Debug, Clone)]
pub struct GitHubStore {
    api: ApiClient,
}

impl GitHubStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let provider = config.provider(SourceControl::GitHub);
        let api = ApiClient::new(
            SourceControl::GitHub,
            &config.api_url(SourceControl::GitHub),
            Auth::from_parts(None, provider.token.as_deref()),
            config.http.timeout(),
        )?;
        Ok(Self::new(api))
    }

    fn repo_segments<'a>(repository_id: &'a str, rest: &[&'a str]) -> Vec<&'a str> {
        let mut segments = vec!["repos"];
        segments.extend(repository_id.split('/'));
        segments.extend_from_slice(rest);
        segments
    }

    /// Drains a paginated JSON array listing by following `rel="next"` links.
    fn paged<T: serde::de::DeserializeOwned>(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut url = Some(self.api.endpoint(segments, query)?);
        let mut pages = 0;
        while let Some(current) = url.take() {
            pages += 1;
            let Some((page, response)) = self.api.get_json::<Vec<T>>(current)? else {
                break;
            };
            items.extend(page);
            if pages >= MAX_PAGES {
                log::warn!("GitHub listing stopped after {} pages", MAX_PAGES);
                break;
            }
            url = next_link(&response.headers).map(|u| url::Url::parse(&u)).transpose()?;
        }
        Ok(items)
    }

    fn commit_date(&self, repository_id: &str, sha: &str) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
        let url = self
            .api
            .endpoint(&Self::repo_segments(repository_id, &["commits", sha]), &[])?;
        Ok(self.api.get_json::<CommitDetail>(url)?.and_then(|(detail, _)| {
            detail
                .commit
                .committer
                .or(detail.commit.author)
                .and_then(|s| s.date)
                .and_then(|d| parse_timestamp(&d))
        }))
    }

    fn refs_of_kind(&self, repository_id: &str, kind: RefKind) -> Result<Vec<GitRef>> {
        let collection = match kind {
            RefKind::Branch => "branches",
            RefKind::Tag => "tags",
        };
        let named: Vec<NamedRef> = self.paged(
            &Self::repo_segments(repository_id, &[collection]),
            &[("per_page", PER_PAGE)],
        )?;
        named
            .into_iter()
            .map(|r| {
                let date = self.commit_date(repository_id, &r.commit.sha)?;
                Ok(GitRef {
                    name: r.name,
                    kind,
                    commit_id: Some(r.commit.sha),
                    last_modified: date,
                })
            })
            .collect()
    }
}

/// Extracts the `rel="next"` target from a `Link` header.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    let link = headers.get("link")?.to_str().ok()?;
    link.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| p.trim() == "rel=\"next\"");
        if is_next {
            Some(target.trim_start_matches('<').trim_end_matches('>').to_string())
        } else {
            None
        }
    })
}

impl DescriptorStore for GitHubStore {
    fn source_control(&self) -> SourceControl {
        SourceControl::GitHub
    }

    fn read_file(&self, repository_id: &str, path: &str, reference: &str) -> Result<Option<String>> {
        let mut segments = Self::repo_segments(repository_id, &["contents"]);
        segments.extend(strip_leading_slash(path).split('/'));
        let url = self.api.endpoint(&segments, &[("ref", reference)])?;
        Ok(self.api.get(url, Some(RAW_ACCEPT))?.map(|r| r.body))
    }

    fn list_files(&self, repository_id: &str, directory: &str, reference: &str) -> Result<Vec<String>> {
        let mut segments = Self::repo_segments(repository_id, &["contents"]);
        let directory = strip_leading_slash(directory).trim_end_matches('/');
        if !directory.is_empty() {
            segments.extend(directory.split('/'));
        }
        let url = self.api.endpoint(&segments, &[("ref", reference)])?;
        let Some(response) = self.api.get(url, Some("application/json"))? else {
            return Ok(Vec::new());
        };
        // A file path answers with a single object instead of an array.
        let items: Vec<ContentItem> = serde_json::from_str(&response.body).unwrap_or_default();
        Ok(items
            .into_iter()
            .filter(|item| item.kind == "file")
            .map(|item| item.name)
            .collect())
    }

    fn list_refs(&self, repository_id: &str) -> Result<Vec<GitRef>> {
        let mut refs = self.refs_of_kind(repository_id, RefKind::Branch)?;
        refs.extend(self.refs_of_kind(repository_id, RefKind::Tag)?);
        log::debug!("GitHub {} has {} refs", repository_id, refs.len());
        Ok(refs)
    }

    fn git_url_to_repository_id(&self) -> Result<BTreeMap<String, String>> {
        let repos: Vec<RepositoryInfo> = self.paged(&["user", "repos"], &[("per_page", PER_PAGE)])?;
        Ok(repos
            .into_iter()
            .map(|r| (SourceControl::GitHub.git_url(&r.full_name), r.full_name))
            .collect())
    }

    fn default_branch(&self, repository_id: &str) -> Result<Option<String>> {
        let url = self.api.endpoint(&Self::repo_segments(repository_id, &[]), &[])?;
        Ok(self
            .api
            .get_json::<RepositoryInfo>(url)?
            .and_then(|(info, _)| info.default_branch))
    }
}
