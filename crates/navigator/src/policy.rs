//! Access policy over capability flags.
//!
//! Pure predicates deciding what the navigation engine may touch. The
//! flags come from configuration and the platform; the policy itself never
//! performs I/O.

use std::path::Path;

/// Capability flags controlling filesystem and network-drive access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether browsing outside the registered locations is permitted.
    pub full_filesystem: bool,
    /// Whether network-mounted drives may be browsed.
    pub network_drives: bool,
    /// Whether the platform supports free navigation at all.
    pub supports_free_navigation: bool,
    /// Whether the host platform is in the Unix family.
    pub is_unix: bool,
}

impl Capabilities {
    /// Detects platform capabilities for the given access flags.
    pub fn detect(full_filesystem: bool, network_drives: bool) -> Self {
        Self {
            full_filesystem,
            network_drives,
            supports_free_navigation: true,
            is_unix: cfg!(unix),
        }
    }
}

/// Pure predicate set evaluated before any navigation commit.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    caps: Capabilities,
}

impl AccessPolicy {
    /// Creates a policy over the given capability flags.
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    /// Returns the underlying capability flags.
    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    /// Whether the navigation feature is usable at all.
    ///
    /// False exactly when full-filesystem access is requested on a platform
    /// that does not support free navigation; in that case no registry or
    /// reconciliation work is performed.
    pub fn module_enabled(&self) -> bool {
        !(self.caps.full_filesystem && !self.caps.supports_free_navigation)
    }

    /// Whether a raw absolute path may be browsed.
    ///
    /// Alias paths that resolve through a registered location are implicitly
    /// allowed; this predicate gates free navigation only.
    pub fn is_path_allowed(&self, path: &Path) -> bool {
        if !self.caps.full_filesystem || !self.caps.supports_free_navigation {
            return false;
        }
        if is_network_path(path) && !self.caps.network_drives {
            return false;
        }
        true
    }

    /// Whether a relative-text edit is acceptable input.
    ///
    /// Rejects any text containing a parent-directory token and any rooted
    /// path: relative navigation must stay within the selected base.
    pub fn is_relative_input_allowed(&self, text: &str) -> bool {
        if text.contains("..") {
            return false;
        }
        !is_rooted(text)
    }
}

/// Whether a path looks like a network mount (UNC-style prefix).
fn is_network_path(path: &Path) -> bool {
    let text = path.to_string_lossy();
    text.starts_with("\\\\") || text.starts_with("//")
}

/// Whether a textual path is absolute or otherwise rooted.
fn is_rooted(text: &str) -> bool {
    if text.starts_with('/') || text.starts_with('\\') {
        return true;
    }
    // Windows drive prefix, e.g. "C:".
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        return true;
    }
    Path::new(text).is_absolute()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(full: bool, network: bool, supported: bool) -> Capabilities {
        Capabilities {
            full_filesystem: full,
            network_drives: network,
            supports_free_navigation: supported,
            is_unix: true,
        }
    }

    #[test]
    fn test_module_enabled_default() {
        let policy = AccessPolicy::new(caps(false, false, true));
        assert!(policy.module_enabled());
    }

    #[test]
    fn test_module_disabled_when_unsupported() {
        let policy = AccessPolicy::new(caps(true, false, false));
        assert!(!policy.module_enabled());
    }

    #[test]
    fn test_module_enabled_without_full_access_on_unsupported_platform() {
        // Restricted browsing still works where free navigation does not.
        let policy = AccessPolicy::new(caps(false, false, false));
        assert!(policy.module_enabled());
    }

    #[test]
    fn test_path_allowed_requires_full_filesystem() {
        let policy = AccessPolicy::new(caps(false, false, true));
        assert!(!policy.is_path_allowed(Path::new("/mnt/disk")));

        let policy = AccessPolicy::new(caps(true, false, true));
        assert!(policy.is_path_allowed(Path::new("/mnt/disk")));
    }

    #[test]
    fn test_network_path_requires_network_drives() {
        let policy = AccessPolicy::new(caps(true, false, true));
        assert!(!policy.is_path_allowed(Path::new("//fileserver/share")));
        assert!(!policy.is_path_allowed(Path::new("\\\\fileserver\\share")));

        let policy = AccessPolicy::new(caps(true, true, true));
        assert!(policy.is_path_allowed(Path::new("//fileserver/share")));
    }

    #[test]
    fn test_relative_input_rejects_parent_tokens() {
        let policy = AccessPolicy::new(caps(true, true, true));
        assert!(!policy.is_relative_input_allowed(".."));
        assert!(!policy.is_relative_input_allowed("a/../b"));
        assert!(!policy.is_relative_input_allowed("..\\escape"));
    }

    #[test]
    fn test_relative_input_rejects_rooted_paths() {
        let policy = AccessPolicy::new(caps(true, true, true));
        assert!(!policy.is_relative_input_allowed("/etc"));
        assert!(!policy.is_relative_input_allowed("\\share"));
        assert!(!policy.is_relative_input_allowed("C:\\Users"));
    }

    #[test]
    fn test_relative_input_accepts_plain_relative() {
        let policy = AccessPolicy::new(caps(false, false, true));
        assert!(policy.is_relative_input_allowed("sub/dir"));
        assert!(policy.is_relative_input_allowed("logs"));
        assert!(policy.is_relative_input_allowed(""));
    }

    #[test]
    fn test_detect_uses_platform() {
        let caps = Capabilities::detect(true, false);
        assert!(caps.full_filesystem);
        assert!(!caps.network_drives);
        assert_eq!(caps.is_unix, cfg!(unix));
    }
}
