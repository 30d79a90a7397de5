//! Version metadata and the README fallback

use super::version_build::VersionBuilder;
use crate::model::{DescriptionSource, SourceFile, Version};
use crate::store::readme_content;

/// Parses metadata out of the primary descriptor after validation.
///
/// A parse failure is merged into the descriptor's validation record. When
/// the descriptor carries no description the repository README is used.
pub(crate) fn attach_metadata(builder: &VersionBuilder<'_>, version: &mut Version, primary: Option<&SourceFile>) {
    if let Some(content) = primary.and_then(|p| p.content.as_deref()) {
        let path = primary.map(|p| p.absolute_path.as_str()).unwrap_or_default();
        let outcome = builder
            .handler
            .parse_metadata(path, content, &version.source_files);
        if let Some(failure) = outcome.failure {
            log::debug!("{}@{}: metadata not extracted", builder.repository_id, version.name);
            version.merge_validation(failure);
        }
        version.metadata = outcome.metadata;
    }

    if version.metadata.description.is_none() {
        match readme_content(builder.store, builder.repository_id, &version.reference) {
            Ok(Some(readme)) if !readme.trim().is_empty() => {
                version.metadata.description = Some(readme);
                version.metadata.description_source = Some(DescriptionSource::Readme);
            }
            Ok(_) => {}
            Err(e) => log::warn!(
                "Could not read README of {}@{}: {}",
                builder.repository_id,
                version.reference,
                e
            ),
        }
    }
}
