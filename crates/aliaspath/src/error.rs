//! Error types for the aliaspath crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by alias-path formatting and joining.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AliasPathError {
    /// The absolute path is not a descendant of the base location's root.
    #[error("path {} is not under base {}", path.display(), base.display())]
    NotUnderBase {
        /// Root of the base location.
        base: PathBuf,
        /// The path that fell outside it.
        path: PathBuf,
    },

    /// A path segment is empty or contains a path separator.
    #[error("invalid path segment: {0:?}")]
    InvalidSegment(String),
}
