//! # Output Configuration
//!
//! Controls how the CLI renders reconciliation results.
//!
//! Color follows `--color=always|never|auto`. In auto mode it is disabled by
//! `NO_COLOR`, `CLICOLOR=0` and `TERM=dumb`, forced by `CLICOLOR_FORCE=1`,
//! and otherwise left to the terminal.

use console::style;
use std::env;

use crate::model::{Entry, ValidationReport};

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    /// `valid` / `invalid`, green or red when color is on.
    pub fn validity(&self, valid: bool) -> String {
        let word = if valid { "valid" } else { "invalid" };
        if !self.use_color {
            return word.to_string();
        }
        if valid {
            style(word).green().to_string()
        } else {
            style(word).red().bold().to_string()
        }
    }

    pub fn heading(&self, text: &str) -> String {
        if self.use_color {
            style(text).bold().to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// One header line for the entry followed by a line per version.
pub fn entry_summary(config: &OutputConfig, entry: &Entry) -> String {
    let mut out = format!(
        "{} [{} {} {}]",
        config.heading(&entry.path()),
        entry.descriptor_language,
        entry.kind,
        entry.mode
    );
    if let Some(default) = &entry.default_version {
        out.push_str(&format!(" default={}", default));
    }
    if entry.is_published {
        out.push_str(" published");
    }
    out.push('\n');
    for version in entry.versions.values() {
        out.push_str(&format!(
            "  {:<24} {:<8} {} {}{}\n",
            version.name,
            version.reference_type,
            config.validity(version.valid),
            version.workflow_path,
            if version.frozen { " (frozen)" } else { "" }
        ));
    }
    out
}

/// Diagnostics of a report, one `path: message` line each.
pub fn report_details(report: &ValidationReport) -> String {
    report
        .messages()
        .into_iter()
        .map(|(path, message)| format!("    {}: {}\n", path, message))
        .collect()
}
