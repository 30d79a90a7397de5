//! Shared HTTP plumbing for the provider adapters
//!
//! Every remote call goes through [`ApiClient`], which applies the configured
//! time box and maps HTTP outcomes onto the crate's error taxonomy:
//!
//! | Outcome                         | Result                      |
//! |---------------------------------|-----------------------------|
//! | 2xx                             | `Ok(Some(response))`        |
//! | 404                             | `Ok(None)`                  |
//! | 401, 403                        | `Error::ReconnectAccount`   |
//! | transport error, timeout, other | `Error::ServiceUnavailable` |

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::model::SourceControl;

/// Upper bound on pages drained from one paginated listing.
pub const MAX_PAGES: usize = 1000;

/// How requests authenticate against the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    Anonymous,
    Bearer(String),
    Basic { username: String, password: String },
}

impl Auth {
    /// Picks bearer or basic auth from optional config values.
    pub fn from_parts(username: Option<&str>, token: Option<&str>) -> Self {
        match (username, token) {
            (Some(user), Some(token)) => Auth::Basic {
                username: user.to_string(),
                password: token.to_string(),
            },
            (None, Some(token)) => Auth::Bearer(token.to_string()),
            _ => Auth::Anonymous,
        }
    }
}

/// A successful response body with its headers.
#[derive(Debug)]
pub struct ApiResponse {
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json<T: DeserializeOwned>(&self, provider: SourceControl) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| Error::ServiceUnavailable {
            provider: provider.to_string(),
            message: format!("unexpected response body: {}", e),
        })
    }
}

/// Blocking client bound to one provider's API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    provider: SourceControl,
    base_url: Url,
    auth: Auth,
}

impl ApiClient {
    pub fn new(provider: SourceControl, base_url: &str, auth: Auth, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ServiceUnavailable {
                provider: provider.to_string(),
                message: format!("cannot build HTTP client: {}", e),
            })?;
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        Ok(Self {
            client,
            provider,
            base_url,
            auth,
        })
    }

    pub fn provider(&self) -> SourceControl {
        self.provider
    }

    /// Builds an endpoint URL from path segments and query pairs.
    ///
    /// Each segment is percent-encoded on its own, `/` included, so a
    /// segment like `group/project` becomes `group%2Fproject`. An empty
    /// trailing segment yields a trailing slash.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| Error::ConfigParse {
                message: format!("API url {} cannot be a base", self.base_url),
                hint: None,
            })?;
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Issues a GET and maps the outcome per the module table.
    pub fn get(&self, url: Url, accept: Option<&str>) -> Result<Option<ApiResponse>> {
        log::debug!("{} GET {}", self.provider, url);
        let mut request = self
            .client
            .get(url.clone())
            .header(USER_AGENT, concat!("workflow-sync/", env!("CARGO_PKG_VERSION")));
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        request = match &self.auth {
            Auth::Anonymous => request,
            Auth::Bearer(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        };

        let response = request.send().map_err(|e| self.unavailable(&url, e))?;
        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::ReconnectAccount {
                provider: self.provider.to_string(),
                message: format!("{} answered {}", url, status),
            }),
            s if s.is_success() => {
                let headers = response.headers().clone();
                let body = response.text().map_err(|e| self.unavailable(&url, e))?;
                Ok(Some(ApiResponse { headers, body }))
            }
            s => Err(Error::ServiceUnavailable {
                provider: self.provider.to_string(),
                message: format!("{} answered {}", url, s),
            }),
        }
    }

    /// GET and decode JSON. `Ok(None)` on 404.
    pub fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<(T, ApiResponse)>> {
        match self.get(url, Some("application/json"))? {
            Some(response) => {
                let value = response.json(self.provider)?;
                Ok(Some((value, response)))
            }
            None => Ok(None),
        }
    }

    fn unavailable(&self, url: &Url, error: reqwest::Error) -> Error {
        let message = if error.is_timeout() {
            format!("request to {} timed out", url)
        } else {
            format!("request to {} failed: {}", url, error)
        };
        Error::ServiceUnavailable {
            provider: self.provider.to_string(),
            message,
        }
    }
}

/// Parses an RFC 3339 timestamp as sent by the provider APIs.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
