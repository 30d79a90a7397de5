//! Bitbucket Cloud 2.0 adapter

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use url::Url;

use super::http::{parse_timestamp, ApiClient, Auth, MAX_PAGES};
use super::{DescriptorStore, GitRef, RefKind};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::model::SourceControl;
use crate::path::strip_leading_slash;

const PAGE_LEN: &str = "100";

/// Bitbucket wraps every listing in `{ values, next }`.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    values: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefItem {
    name: String,
    target: Option<Target>,
}

#[derive(Debug, Deserialize)]
struct Target {
    hash: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SrcItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryItem {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryDetail {
    mainbranch: Option<MainBranch>,
}

#[derive(Debug, Deserialize)]
struct MainBranch {
    name: String,
}

/// Descriptor store backed by the Bitbucket API.
#[derive(Debug, Clone)]
pub struct BitbucketStore {
    api: ApiClient,
}

impl BitbucketStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let provider = config.provider(SourceControl::Bitbucket);
        let api = ApiClient::new(
            SourceControl::Bitbucket,
            &config.api_url(SourceControl::Bitbucket),
            Auth::from_parts(provider.username.as_deref(), provider.token.as_deref()),
            config.http.timeout(),
        )?;
        Ok(Self::new(api))
    }

    fn repo_segments<'a>(repository_id: &'a str, rest: &[&'a str]) -> Vec<&'a str> {
        let mut segments = vec!["repositories"];
        segments.extend(repository_id.split('/'));
        segments.extend_from_slice(rest);
        segments
    }

    /// Drains a listing by following the `next` URL in each page body.
    fn paged<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut url = Some(first);
        let mut pages = 0;
        while let Some(current) = url.take() {
            pages += 1;
            let Some((page, _)) = self.api.get_json::<Page<T>>(current)? else {
                break;
            };
            items.extend(page.values);
            if pages >= MAX_PAGES {
                log::warn!("Bitbucket listing stopped after {} pages", MAX_PAGES);
                break;
            }
            url = page.next.map(|n| Url::parse(&n)).transpose()?;
        }
        Ok(items)
    }

    fn refs_of_kind(&self, repository_id: &str, kind: RefKind) -> Result<Vec<GitRef>> {
        let collection = match kind {
            RefKind::Branch => "branches",
            RefKind::Tag => "tags",
        };
        let url = self.api.endpoint(
            &Self::repo_segments(repository_id, &["refs", collection]),
            &[("pagelen", PAGE_LEN)],
        )?;
        let items: Vec<RefItem> = self.paged(url)?;
        Ok(items
            .into_iter()
            .map(|item| {
                let (commit_id, last_modified) = match item.target {
                    Some(target) => (target.hash, target.date.as_deref().and_then(parse_timestamp)),
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

impl DescriptorStore for BitbucketStore {
    fn source_control(&self) -> SourceControl {
        SourceControl::Bitbucket
    }

    fn read_file(&self, repository_id: &str, path: &str, reference: &str) -> Result<Option<String>> {
        let mut segments = Self::repo_segments(repository_id, &["src", reference]);
        segments.extend(strip_leading_slash(path).split('/'));
        let url = self.api.endpoint(&segments, &[])?;
        Ok(self.api.get(url, None)?.map(|r| r.body))
    }

    fn list_files(&self, repository_id: &str, directory: &str, reference: &str) -> Result<Vec<String>> {
        let mut segments = Self::repo_segments(repository_id, &["src", reference]);
        let directory = strip_leading_slash(directory).trim_end_matches('/');
        if !directory.is_empty() {
            segments.extend(directory.split('/'));
        }
        segments.push("");
        let url = self.api.endpoint(&segments, &[("pagelen", PAGE_LEN)])?;
        let items: Vec<SrcItem> = self.paged(url)?;
        Ok(items
            .into_iter()
            .filter(|item| item.kind == "commit_file")
            .filter_map(|item| item.path.rsplit('/').next().map(str::to_string))
            .collect())
    }

    fn list_refs(&self, repository_id: &str) -> Result<Vec<GitRef>> {
        let mut refs = self.refs_of_kind(repository_id, RefKind::Branch)?;
        refs.extend(self.refs_of_kind(repository_id, RefKind::Tag)?);
        log::debug!("Bitbucket {} has {} refs", repository_id, refs.len());
        Ok(refs)
    }

    fn git_url_to_repository_id(&self) -> Result<BTreeMap<String, String>> {
        let url = self.api.endpoint(
            &["repositories"],
            &[("role", "contributor"), ("pagelen", PAGE_LEN)],
        )?;
        let repos: Vec<RepositoryItem> = self.paged(url)?;
        Ok(repos
            .into_iter()
            .map(|r| (SourceControl::Bitbucket.git_url(&r.full_name), r.full_name))
            .collect())
    }

    fn default_branch(&self, repository_id: &str) -> Result<Option<String>> {
        let url = self.api.endpoint(&Self::repo_segments(repository_id, &[]), &[])?;
        Ok(self
            .api
            .get_json::<RepositoryDetail>(url)?
            .and_then(|(detail, _)| detail.mainbranch.map(|b| b.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_deserializes_without_next() {
        let page: Page<RepositoryItem> =
            serde_json::from_str(r#"{"values":[{"full_name":"o/r"}],"pagelen":10}"#).unwrap();
        assert_eq!(page.values.len(), 1);
        assert!(page.next.is_none());
    }

    #[test]
    fn test_ref_item_without_target() {
        let item: RefItem = serde_json::from_str(r#"{"name":"develop"}"#).unwrap();
        assert_eq!(item.name, "develop");
        assert!(item.target.is_none());
    }
}
