//! Path manipulation utilities for descriptor files

use regex::Regex;
use std::sync::OnceLock;

/// Resolves an import path against the file that declared it.
///
/// Absolute imports are kept as-is. Relative imports resolve against the
/// directory of `parent_path`. `.` and `..` segments collapse, `..` never
/// climbs above the repository root, and the result always starts with `/`.
pub fn convert_relative_path_to_absolute(parent_path: &str, relative_path: &str) -> String {
    let joined = if relative_path.starts_with('/') {
        relative_path.to_string()
    } else {
        format!("{}/{}", parent_dir(parent_path), relative_path)
    };
    normalize(&joined)
}

/// Collapses `.`, `..` and repeated separators into a rooted path.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Directory part of a rooted file path, without trailing slash.
///
/// `"/a/b.cwl"` gives `"/a"`, `"/b.cwl"` gives `""`.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(index) => &path[..index],
        None => "",
    }
}

/// Provider APIs take repository-relative paths without the leading slash.
pub fn strip_leading_slash(path: &str) -> &str {
    path.trim_start_matches('/')
}

fn readme_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^/?readme(\.md)?$").expect("static regex"))
}

/// Whether a repository-root file name is a README.
pub fn is_readme(name: &str) -> bool {
    readme_pattern().is_match(name)
}

/// Encode an entry path to be filesystem-safe
///
/// This converts characters that are problematic for filesystems
/// into safe alternatives.
pub fn encode_entry_path(path: &str) -> String {
    path.chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_import_resolves_against_parent() {
        assert_eq!(
            convert_relative_path_to_absolute("/workflows/main.cwl", "tools/align.cwl"),
            "/workflows/tools/align.cwl"
        );
        assert_eq!(
            convert_relative_path_to_absolute("/Dockstore.cwl", "./tool.cwl"),
            "/tool.cwl"
        );
    }

    #[test]
    fn test_parent_segments_collapse() {
        assert_eq!(
            convert_relative_path_to_absolute("/a/b/main.wdl", "../lib/tasks.wdl"),
            "/a/lib/tasks.wdl"
        );
        assert_eq!(
            convert_relative_path_to_absolute("/main.wdl", "../../escape.wdl"),
            "/escape.wdl"
        );
    }

    #[test]
    fn test_absolute_import_is_kept() {
        assert_eq!(
            convert_relative_path_to_absolute("/a/b/main.cwl", "/shared/tool.cwl"),
            "/shared/tool.cwl"
        );
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("/a/b.cwl"), "/a");
        assert_eq!(parent_dir("/b.cwl"), "");
        assert_eq!(parent_dir("b.cwl"), "");
    }

    #[test]
    fn test_is_readme() {
        assert!(is_readme("README.md"));
        assert!(is_readme("/readme"));
        assert!(is_readme("ReadMe.MD"));
        assert!(!is_readme("README.txt"));
        assert!(!is_readme("docs/README.md"));
    }

    #[test]
    fn test_encode_entry_path() {
        assert_eq!(
            encode_entry_path("github.com/org/repo/checker"),
            "github.com-org-repo-checker"
        );
        assert_eq!(encode_entry_path("gitlab.com/a b"), "gitlab.com-a_b");
    }
}
