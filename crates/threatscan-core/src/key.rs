//! Source identifiers and the result-file names derived from them.
//!
//! A result file is keyed only by the source name: editing a source document
//! after it has been classified does not invalidate its cached result.

use std::path::{Component, Path};

use thiserror::Error;

/// Suffix appended to the cache key to name a result file.
pub const RESULT_SUFFIX: &str = "_processed.json";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceIdError {
    #[error("source id is empty")]
    Empty,
    #[error("source id must be relative to the data root: {0}")]
    Absolute(String),
    #[error("source id must not leave the data root: {0}")]
    ParentComponent(String),
}

/// Replace every path separator with `_`. Not reversible.
pub fn cache_key(source_id: &str) -> String {
    source_id.replace(['/', '\\'], "_")
}

/// File name of the result set for `source_id`.
pub fn result_file_name(source_id: &str) -> String {
    format!("{}{RESULT_SUFFIX}", cache_key(source_id))
}

/// Check that `source_id` names a file below the data root.
pub fn validate_source_id(source_id: &str) -> Result<(), SourceIdError> {
    if source_id.trim().is_empty() {
        return Err(SourceIdError::Empty);
    }
    let path = Path::new(source_id);
    if path.is_absolute() || source_id.starts_with(['/', '\\']) {
        return Err(SourceIdError::Absolute(source_id.to_string()));
    }
    let escapes = path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        || source_id.split(['/', '\\']).any(|seg| seg == "..");
    if escapes {
        return Err(SourceIdError::ParentComponent(source_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_replaces_separators() {
        assert_eq!(cache_key("4chan/pol/thread_1.txt"), "4chan_pol_thread_1.txt");
        assert_eq!(cache_key("quora\\answers.txt"), "quora_answers.txt");
        assert_eq!(cache_key("flat.txt"), "flat.txt");
    }

    #[test]
    fn result_file_name_has_suffix() {
        assert_eq!(result_file_name("raw/a.txt"), "raw_a.txt_processed.json");
    }

    #[test]
    fn distinct_ids_can_share_a_key() {
        assert_eq!(cache_key("a/b.txt"), cache_key("a_b.txt"));
    }

    #[test]
    fn validation() {
        assert!(validate_source_id("raw/thread.txt").is_ok());
        assert_eq!(validate_source_id("  "), Err(SourceIdError::Empty));
        assert!(matches!(
            validate_source_id("/etc/passwd"),
            Err(SourceIdError::Absolute(_))
        ));
        assert!(matches!(
            validate_source_id("raw/../../etc/passwd"),
            Err(SourceIdError::ParentComponent(_))
        ));
        assert!(matches!(
            validate_source_id("raw\\..\\secret"),
            Err(SourceIdError::ParentComponent(_))
        ));
    }
}
