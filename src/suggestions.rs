//! # Error Suggestions
//!
//! Errors shown by the CLI say what went wrong and how to fix it.
//!
//! ```rust,ignore
//! return Err(suggestions::entry_not_registered(git_url));
//! ```

use std::path::Path;

use crate::config::token_env_var;
use crate::error::Error;
use crate::model::SourceControl;

/// The file named by `--config` does not exist.
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Configuration file not found: {path}\n\n\
         hint: Drop --config to use the defaults\n\
         hint: Unset the WORKFLOW_SYNC_CONFIG environment variable",
        path = path.display()
    )
}

/// No entry for the repository in the state directory.
pub fn entry_not_registered(git_url: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "No entry registered for {git_url}\n\n\
         hint: Run 'workflow-sync refresh {git_url}' to register and sync it\n\
         hint: Run 'workflow-sync stub {git_url}' to register it without syncing\n\
         hint: Check --state-dir points at the right state directory"
    )
}

/// The requested version is not on the entry.
pub fn unknown_version(name: &str, available: &[&str]) -> anyhow::Error {
    let did_you_mean = find_similar(name, available)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();
    let known = if available.is_empty() {
        "none, run 'workflow-sync refresh' first".to_string()
    } else {
        available.join(", ")
    };
    anyhow::anyhow!("Unknown version: {name}{did_you_mean}\n\nKnown versions: {known}")
}

/// Adds the fix for provider errors to a library error.
pub fn explain(error: Error) -> anyhow::Error {
    let hint = match &error {
        Error::ReconnectAccount { provider, .. } => provider
            .parse::<SourceControl>()
            .map(|sc| {
                format!(
                    "hint: Set providers.{}.token in the config file or the {} environment variable",
                    sc.to_string().to_lowercase(),
                    token_env_var(sc)
                )
            })
            .unwrap_or_else(|_| "hint: Check the provider token".to_string()),
        Error::ServiceUnavailable { .. } => {
            "hint: The provider may be down or rate limiting, try again later\n\
             hint: Raise http.timeout_secs for slow connections"
                .to_string()
        }
        Error::UnsupportedSource { .. } | Error::GitUrlParse { .. } => {
            "hint: Use git@<host>:<org>/<repo>.git with github.com, bitbucket.org or gitlab.com".to_string()
        }
        _ => return anyhow::Error::new(error),
    };
    anyhow::anyhow!("{error}\n\n{hint}")
}

/// Closest candidate within an edit distance of 2.
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Levenshtein distance.
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, a_char) in a_chars.iter().enumerate() {
        let mut current = vec![i + 1; b_chars.len() + 1];
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        previous = current;
    }
    previous[b_chars.len()]
}
