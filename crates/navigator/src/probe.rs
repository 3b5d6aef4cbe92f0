//! Filesystem probe boundary.
//!
//! The engine never touches `std::fs` directly; everything goes through
//! the [`FilesystemProbe`] trait so tests and embedding hosts can supply
//! their own view of the filesystem and the attached drives.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from the probing boundary.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Listing the attached drives failed.
    #[error("drive enumeration failed: {0}")]
    Enumeration(String),
}

/// Kind of an attached drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveKind {
    /// Fixed local disk.
    Fixed,
    /// Network-mounted drive.
    Network,
    /// Removable media not surfaced through the USB slot aliases.
    Removable,
}

/// One attached drive as reported by the host.
#[derive(Debug, Clone)]
pub struct DriveInfo {
    /// Root directory of the drive.
    pub root: PathBuf,
    /// Drive kind.
    pub kind: DriveKind,
    /// Whether the drive currently answers (network drives may not).
    pub reachable: bool,
}

/// Read-only filesystem questions the engine is allowed to ask.
pub trait FilesystemProbe: Send + Sync {
    /// Whether the path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Whether the path exists and is a directory.
    fn is_directory(&self, path: &Path) -> bool;

    /// Parent directory of the path, or `None` at a filesystem root.
    fn parent_of(&self, path: &Path) -> Option<PathBuf>;

    /// Lists the attached fixed/network/removable drives.
    fn list_drives(&self) -> Result<Vec<DriveInfo>, ProbeError>;
}

/// Probe backed by the real OS filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsProbe;

impl FilesystemProbe for OsProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn parent_of(&self, path: &Path) -> Option<PathBuf> {
        path.parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }

    fn list_drives(&self) -> Result<Vec<DriveInfo>, ProbeError> {
        // Drive letters are not a Unix concept, and system-drive probing is
        // gated off there anyway. Non-Unix hosts embed the engine with their
        // own probe implementation.
        Ok(Vec::new())
    }
}
