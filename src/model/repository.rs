//! Source-control providers and canonical repository identities

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// A source-control provider hosting descriptor repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceControl {
    GitHub,
    Bitbucket,
    GitLab,
}

impl SourceControl {
    pub const ALL: [SourceControl; 3] = [
        SourceControl::GitHub,
        SourceControl::Bitbucket,
        SourceControl::GitLab,
    ];

    /// Host segment used in canonical git URLs.
    pub fn host(self) -> &'static str {
        match self {
            SourceControl::GitHub => "github.com",
            SourceControl::Bitbucket => "bitbucket.org",
            SourceControl::GitLab => "gitlab.com",
        }
    }

    /// Looks a provider up by the host segment of a git URL.
    pub fn from_host(host: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|sc| sc.host().eq_ignore_ascii_case(host))
    }

    /// Canonical SSH-style git URL for a repository id (`org/repo`).
    pub fn git_url(self, repository_id: &str) -> String {
        format!("git@{}:{}.git", self.host(), repository_id)
    }
}

impl fmt::Display for SourceControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceControl::GitHub => "GitHub",
            SourceControl::Bitbucket => "Bitbucket",
            SourceControl::GitLab => "GitLab",
        };
        f.write_str(name)
    }
}

impl FromStr for SourceControl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "github" | "github.com" => Ok(SourceControl::GitHub),
            "bitbucket" | "bitbucket.org" => Ok(SourceControl::Bitbucket),
            "gitlab" | "gitlab.com" => Ok(SourceControl::GitLab),
            _ => Err(Error::UnsupportedSource { url: s.to_string() }),
        }
    }
}

/// The pieces of a git URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGitUrl {
    pub host: String,
    pub organization: String,
    pub repository: String,
}

fn ssh_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // git@github.com:dockstore/dockstore-ui.git
    PATTERN.get_or_init(|| Regex::new(r"^git@(\S+?):(\S+)/(\S+?)\.git$").expect("static regex"))
}

fn git_protocol_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // git://github.com/denis-yuen/dockstore-whalesay.git
    PATTERN.get_or_init(|| Regex::new(r"^git://(\S+?)/(\S+)/(\S+?)\.git$").expect("static regex"))
}

/// Splits a git URL into host, organization and repository.
///
/// Both `git@host:org/repo.git` and `git://host/org/repo.git` are accepted.
/// The organization may contain slashes (GitLab subgroups).
pub fn parse_git_url(url: &str) -> Result<ParsedGitUrl> {
    let url = url.trim();
    let captures = ssh_pattern()
        .captures(url)
        .or_else(|| git_protocol_pattern().captures(url))
        .ok_or_else(|| Error::GitUrlParse {
            url: url.to_string(),
        })?;
    Ok(ParsedGitUrl {
        host: captures[1].to_string(),
        organization: captures[2].to_string(),
        repository: captures[3].to_string(),
    })
}

/// Canonical identity of a remote repository, and optionally of one named
/// entry inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepositoryReference {
    pub source_control: SourceControl,
    pub organization: String,
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_name: Option<String>,
}

impl RepositoryReference {
    pub fn new(source_control: SourceControl, organization: &str, repository: &str) -> Self {
        Self {
            source_control,
            organization: organization.to_string(),
            repository: repository.to_string(),
            entry_name: None,
        }
    }

    /// Same repository, naming one entry within it.
    pub fn with_entry_name(mut self, entry_name: &str) -> Self {
        self.entry_name = Some(entry_name.to_string());
        self
    }

    /// Resolves a git URL into a reference using the host to pick the provider.
    pub fn from_git_url(url: &str) -> Result<Self> {
        let parsed = parse_git_url(url)?;
        let source_control =
            SourceControl::from_host(&parsed.host).ok_or_else(|| Error::UnsupportedSource {
                url: url.to_string(),
            })?;
        Ok(Self::new(
            source_control,
            &parsed.organization,
            &parsed.repository,
        ))
    }

    /// Provider-side identifier, `organization/repository`.
    pub fn repository_id(&self) -> String {
        format!("{}/{}", self.organization, self.repository)
    }

    pub fn git_url(&self) -> String {
        self.source_control.git_url(&self.repository_id())
    }

    /// Registry path: `<host>/<org>/<repo>[/<entry name>]`.
    pub fn path(&self) -> String {
        let base = format!(
            "{}/{}/{}",
            self.source_control.host(),
            self.organization,
            self.repository
        );
        match &self.entry_name {
            Some(name) if !name.is_empty() => format!("{}/{}", base, name),
            _ => base,
        }
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ssh_git_url() {
        let parsed = parse_git_url("git@github.com:dockstore/dockstore-ui.git").unwrap();
        assert_eq!(parsed.host, "github.com");
        assert_eq!(parsed.organization, "dockstore");
        assert_eq!(parsed.repository, "dockstore-ui");
    }

    #[test]
    fn test_parse_git_protocol_url() {
        let parsed = parse_git_url("git://github.com/denis-yuen/dockstore-whalesay.git").unwrap();
        assert_eq!(parsed.host, "github.com");
        assert_eq!(parsed.organization, "denis-yuen");
        assert_eq!(parsed.repository, "dockstore-whalesay");
    }

    #[test]
    fn test_parse_gitlab_subgroup() {
        let parsed = parse_git_url("git@gitlab.com:group/subgroup/project.git").unwrap();
        assert_eq!(parsed.organization, "group/subgroup");
        assert_eq!(parsed.repository, "project");
    }

    #[test]
    fn test_parse_invalid_git_url() {
        assert!(matches!(
            parse_git_url("https://github.com/a/b"),
            Err(Error::GitUrlParse { .. })
        ));
    }

    #[test]
    fn test_reference_round_trip() {
        let reference = RepositoryReference::from_git_url("git@bitbucket.org:org/repo.git").unwrap();
        assert_eq!(reference.source_control, SourceControl::Bitbucket);
        assert_eq!(reference.repository_id(), "org/repo");
        assert_eq!(reference.git_url(), "git@bitbucket.org:org/repo.git");
        assert_eq!(reference.path(), "bitbucket.org/org/repo");
        let named = reference.with_entry_name("checker");
        assert_eq!(named.path(), "bitbucket.org/org/repo/checker");
    }

    #[test]
    fn test_unknown_host_is_unsupported() {
        let err = RepositoryReference::from_git_url("git@example.org:org/repo.git").unwrap_err();
        assert!(matches!(err, Error::UnsupportedSource { .. }));
    }

    #[test]
    fn test_source_control_from_str() {
        assert_eq!("GitLab".parse::<SourceControl>().unwrap(), SourceControl::GitLab);
        assert_eq!("github.com".parse::<SourceControl>().unwrap(), SourceControl::GitHub);
        assert!("svn".parse::<SourceControl>().is_err());
    }
}
