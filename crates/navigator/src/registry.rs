//! Location registry: the named jump-targets a user can browse from.
//!
//! The registry is the alias lookup table. It is deliberately not
//! synchronized internally: the device reconciler is the sole mutator of
//! `System`/`Usb` entries and serializes all mutation inside its cycle,
//! while navigation reads through a shared lock owned by the session.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use aliaspath::AliasPath;
use tracing::warn;

use crate::config::LocationEntry;
use crate::error::NavError;

/// Kind tag for a registered location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    /// Configured at startup, never removed.
    Standard,
    /// Fixed or network drive discovered by the reconciler.
    System,
    /// USB slot discovered by the reconciler.
    Usb,
}

/// One jump-target in the registry.
#[derive(Debug, Clone)]
pub struct Location {
    /// Unique browse key, e.g. `"ProjectDir"`, `"USB3"`, or a drive root.
    pub name: String,
    /// Kind tag; immutable after creation.
    pub kind: LocationKind,
    /// Resolved target; always `Absolute` for registered locations.
    pub target: AliasPath,
    /// Localization key for the display label; opaque to the engine.
    pub display_key: String,
    /// Fallback display label shown to the user.
    pub display_value: String,
}

impl Location {
    /// Creates a location with an absolute target.
    pub fn new(
        name: impl Into<String>,
        kind: LocationKind,
        target: impl Into<PathBuf>,
        display_key: impl Into<String>,
        display_value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target: AliasPath::absolute(target),
            display_key: display_key.into(),
            display_value: display_value.into(),
        }
    }

    /// The location's root directory.
    pub fn root(&self) -> &Path {
        // Registered targets are always absolute; see `add_or_update`.
        self.target.as_absolute().unwrap_or_else(|| Path::new(""))
    }
}

/// Insertion-ordered set of locations, unique by name.
#[derive(Debug, Default)]
pub struct LocationRegistry {
    entries: Vec<Location>,
}

impl LocationRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the configured standard locations.
    ///
    /// Relative configured paths are rewritten against the application
    /// anchor; absolute paths are kept as-is. An entry without a locale is
    /// warned about and kept without one.
    pub fn seed_standard(&mut self, entries: &[LocationEntry], app_root: &Path) {
        for entry in entries {
            let configured = Path::new(&entry.path);
            let root = if configured.is_absolute() {
                configured.to_path_buf()
            } else if entry.path.is_empty() {
                app_root.to_path_buf()
            } else {
                app_root.join(configured)
            };

            if entry.locale.is_empty() {
                warn!(name = %entry.name, "no locale configured for location display name");
            }

            self.add_or_update(Location::new(
                &entry.name,
                LocationKind::Standard,
                root,
                &entry.display_key,
                &entry.display_value,
            ));
        }
    }

    /// Inserts the location if its name is not present.
    ///
    /// Idempotent: re-adding an already-registered name is a no-op, so a
    /// still-valid device is neither duplicated nor reset. Returns whether
    /// an insert happened.
    pub fn add_or_update(&mut self, location: Location) -> bool {
        if self.find(&location.name).is_some() {
            return false;
        }
        self.entries.push(location);
        true
    }

    /// Removes a location by name; no-op if absent.
    pub fn remove(&mut self, name: &str) -> Option<Location> {
        let index = self.entries.iter().position(|loc| loc.name == name)?;
        Some(self.entries.remove(index))
    }

    /// Looks up a location by name.
    pub fn find(&self, name: &str) -> Option<&Location> {
        self.entries.iter().find(|loc| loc.name == name)
    }

    /// Names of all locations of the given kind.
    pub fn names_of_kind(&self, kind: LocationKind) -> BTreeSet<String> {
        self.entries
            .iter()
            .filter(|loc| loc.kind == kind)
            .map(|loc| loc.name.clone())
            .collect()
    }

    /// Iterates locations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.entries.iter()
    }

    /// Number of registered locations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expands an alias path to a concrete path using the current entries.
    pub fn resolve(&self, path: &AliasPath) -> Result<PathBuf, NavError> {
        match path {
            AliasPath::Absolute(concrete) => Ok(concrete.clone()),
            AliasPath::Alias { name, remainder } => {
                let location = self
                    .find(name)
                    .ok_or_else(|| NavError::UnknownAlias(name.clone()))?;
                let base = location
                    .target
                    .as_absolute()
                    .ok_or_else(|| NavError::MissingLocation(name.clone()))?;
                if remainder.is_empty() {
                    return Ok(base.to_path_buf());
                }
                Ok(remainder.split('/').fold(base.to_path_buf(), |acc, seg| acc.join(seg)))
            }
        }
    }

    /// Longest-prefix match: the registered location whose root best
    /// contains `path`, used when reformatting a concrete path back into
    /// alias form.
    pub fn best_base_for(&self, path: &Path) -> Option<&Location> {
        self.entries
            .iter()
            .filter(|loc| path.starts_with(loc.root()))
            .max_by_key(|loc| loc.root().as_os_str().len())
    }
}
