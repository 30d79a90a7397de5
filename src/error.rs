//! # Error Handling
//!
//! This module defines the centralized error type for `workflow-sync`. It uses
//! the `thiserror` library to build a single `Error` enum covering every
//! failure a reconciliation pass can surface to its caller.
//!
//! ## Taxonomy
//!
//! - **Transport/Auth**: `ServiceUnavailable` (retryable) and
//!   `ReconnectAccount` (the token must be relinked). Both abort the current
//!   repository's reconciliation pass.
//! - **Policy violations**: `PolicyViolation`, returned when an operation is
//!   rejected and the entry is left untouched.
//! - **Setup**: `UnsupportedSource`, `GitUrlParse`, `ConfigParse`.
//! - **Ambient**: I/O, YAML, JSON, regex and URL errors wrapped via `#[from]`.
//!
//! Two outcomes are deliberately *not* errors: a missing file (modelled as
//! `Ok(None)` by the descriptor stores) and a malformed descriptor (modelled
//! as an invalid `Validation` record).

use thiserror::Error;

/// Main error type for workflow-sync operations
#[derive(Error, Debug)]
pub enum Error {
    /// The remote provider could not be reached, timed out, or answered with
    /// a server-side failure. The caller may retry later.
    #[error("{provider} is unavailable: {message}")]
    ServiceUnavailable { provider: String, message: String },

    /// The provider rejected the stored credentials.
    #[error("{provider} rejected the token, please reconnect the account: {message}")]
    ReconnectAccount { provider: String, message: String },

    /// A requested operation is not allowed in the entry's current state.
    #[error("Policy violation in {operation}: {message}")]
    PolicyViolation { operation: String, message: String },

    /// No adapter exists for the host named in a git URL.
    #[error("Unsupported source control for {url}")]
    UnsupportedSource { url: String },

    /// A git URL could not be split into host, organization and repository.
    #[error("Cannot parse git url: {url}")]
    GitUrlParse { url: String },

    /// An error occurred while parsing the configuration file.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// No language handler is registered for the entry's descriptor language.
    #[error("No handler registered for {language}")]
    UnsupportedLanguage { language: String },

    /// The reconciliation thread pool could not be built.
    #[error("Cannot start worker pool: {message}")]
    WorkerPool { message: String },

    /// The version persistence layer failed to load or save state.
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },
}

impl Error {
    /// Builds a `PolicyViolation` for the named operation.
    pub fn policy(operation: &str, message: impl Into<String>) -> Self {
        Error::PolicyViolation {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Whether the failure is transient and the pass may be retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ServiceUnavailable { .. })
    }

    /// Whether the failure was caused by a rejected operation rather than an
    /// infrastructure problem. The HTTP layer maps these to 4xx responses.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Error::PolicyViolation { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
