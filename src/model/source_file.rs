//! Retrieved file snapshots

use serde::{Deserialize, Serialize};

use super::language::FileType;

/// Files at or above this many bytes are not stored verbatim.
pub const MAX_FILE_SIZE: usize = 1024 * 1024;

/// Stored in place of content that is too large.
pub const OVERSIZED_CONTENT_MESSAGE: &str = "Dockstore does not store files over 1MB in size";

/// Stored in place of content that contains a NUL byte.
pub const BINARY_CONTENT_MESSAGE: &str = "Dockstore does not store binary files";

/// One file retrieved from source control for a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub file_type: FileType,
    /// Path as declared (by an import statement or the entry defaults).
    pub path: String,
    /// Resolved path, unique within a version.
    pub absolute_path: String,
    pub content: Option<String>,
}

impl SourceFile {
    /// Builds a file, replacing oversized or binary content with a placeholder.
    pub fn new(file_type: FileType, path: &str, absolute_path: &str, content: Option<String>) -> Self {
        Self {
            file_type,
            path: path.to_string(),
            absolute_path: absolute_path.to_string(),
            content: content.map(sanitize_content),
        }
    }

    /// Whether the file has any non-whitespace content.
    pub fn has_content(&self) -> bool {
        self.content
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Replaces content that must not be stored verbatim.
pub fn sanitize_content(content: String) -> String {
    if content.len() >= MAX_FILE_SIZE {
        OVERSIZED_CONTENT_MESSAGE.to_string()
    } else if content.contains('\0') {
        BINARY_CONTENT_MESSAGE.to_string()
    } else {
        content
    }
}
