//! Error types for the navigation engine.

use std::path::PathBuf;

use aliaspath::AliasPathError;
use thiserror::Error;

/// Navigation error type covering all user-visible failure modes.
///
/// None of these are fatal to a browsing session: navigation failures roll
/// the state back to the last good value, and enumeration failures skip a
/// reconciliation cycle.
#[derive(Debug, Error)]
pub enum NavError {
    // Alias resolution errors
    /// The alias name is not registered.
    #[error("unknown alias: %{0}%")]
    UnknownAlias(String),

    /// Formatting or joining an alias path failed.
    #[error(transparent)]
    AliasPath(#[from] AliasPathError),

    // Policy errors
    /// Relative input contains a parent token or is a rooted path.
    #[error("invalid relative input: {0:?}")]
    InvalidRelativeInput(String),

    /// The resolved path is forbidden by the access policy.
    #[error("path is not allowed: {}", .0.display())]
    PathNotAllowed(PathBuf),

    // Lookup errors
    /// The resolved path does not exist on the filesystem.
    #[error("path could not be resolved: {}", .0.display())]
    ResolutionFailure(PathBuf),

    /// The named location is no longer registered.
    #[error("location is no longer registered: {0}")]
    MissingLocation(String),

    // Device errors
    /// Enumerating devices failed; the cycle is retried on the next tick.
    #[error("device enumeration failed: {0}")]
    EnumerationFailure(String),

    /// A shared lock was poisoned by a panicking writer.
    #[error("internal error: {0}")]
    Internal(String),
}
