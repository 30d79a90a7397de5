//! Property-based tests for path manipulation functions.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{convert_relative_path_to_absolute, encode_entry_path, normalize};
    use proptest::prelude::*;

    fn segment() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-zA-Z0-9_-]{1,8}(\\.cwl|\\.wdl|\\.nf)?",
            Just(".".to_string()),
            Just("..".to_string()),
        ]
    }

    fn relative_path() -> impl Strategy<Value = String> {
        prop::collection::vec(segment(), 1..6).prop_map(|segments| segments.join("/"))
    }

    // ============================================================================
    // convert_relative_path_to_absolute property tests
    // ============================================================================

    proptest! {
        /// Property: resolved paths are always rooted and contain no dot segments
        #[test]
        fn resolved_path_is_rooted_and_normal(parent in relative_path(), import in relative_path()) {
            let parent = format!("/{}", parent);
            let result = convert_relative_path_to_absolute(&parent, &import);
            prop_assert!(result.starts_with('/'));
            for part in result.split('/').skip(1) {
                prop_assert!(part != "." && part != "..", "dot segment in {}", result);
            }
            prop_assert!(!result.contains("//"));
        }

        /// Property: normalizing twice is the same as normalizing once
        #[test]
        fn normalize_is_idempotent(path in relative_path()) {
            let once = normalize(&path);
            let twice = normalize(&once);
            prop_assert_eq!(once, twice);
        }

        /// Property: an absolute import ignores the parent path
        #[test]
        fn absolute_import_ignores_parent(
            parent_a in relative_path(),
            parent_b in relative_path(),
            import in relative_path()
        ) {
            let import = format!("/{}", import);
            let a = convert_relative_path_to_absolute(&format!("/{}", parent_a), &import);
            let b = convert_relative_path_to_absolute(&format!("/{}", parent_b), &import);
            prop_assert_eq!(a, b);
        }

        /// Property: a plain file name lands beside its parent
        #[test]
        fn sibling_import_shares_directory(
            dir in "[a-z]{1,6}",
            parent_name in "[a-z]{1,6}\\.cwl",
            name in "[a-z]{1,6}\\.cwl"
        ) {
            let parent = format!("/{}/{}", dir, parent_name);
            let result = convert_relative_path_to_absolute(&parent, &name);
            prop_assert_eq!(result, format!("/{}/{}", dir, name));
        }
    }

    // ============================================================================
    // encode_entry_path property tests
    // ============================================================================

    proptest! {
        /// Property: encoded paths never contain separators
        #[test]
        fn encode_entry_path_has_no_separators(input in ".*") {
            let result = encode_entry_path(&input);
            prop_assert!(!result.contains('/'));
            prop_assert!(!result.contains('\\'));
            prop_assert!(!result.contains(':'));
        }

        /// Property: encoding preserves character count
        #[test]
        fn encode_entry_path_preserves_char_count(input in ".+") {
            let result = encode_entry_path(&input);
            prop_assert_eq!(result.chars().count(), input.chars().count());
        }
    }
}
