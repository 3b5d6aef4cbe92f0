//! Path navigation state machine.
//!
//! [`PathNavigator`] holds the single mutable cursor of a browsing session
//! and implements the UI-driven transitions: entry selection, parent and
//! child navigation, base-location changes, and relative-text edits. Every
//! transition either commits a fully consistent state or leaves the prior
//! state untouched and returns the error for the UI to display.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use aliaspath::{combine, AliasPath};
use tracing::{error, info};

use crate::error::NavError;
use crate::policy::AccessPolicy;
use crate::probe::FilesystemProbe;
use crate::registry::{LocationKind, LocationRegistry};

/// The base location currently selected in the UI, published by the
/// navigator for the reconciler's invalidation decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedBase {
    /// Browse key of the base location.
    pub name: String,
    /// Kind of the base location.
    pub kind: LocationKind,
}

/// Shared view of the current selection.
pub type SelectionWatch = Arc<RwLock<Option<SelectedBase>>>;

/// The navigation cursor.
///
/// Invariant: `current_absolute` equals the resolution of `current_alias`
/// immediately after every committed mutation.
#[derive(Debug, Clone)]
pub struct NavigationState {
    /// Alias-form path shown and persisted.
    pub current_alias: AliasPath,
    /// Its resolution, kept in sync.
    pub current_absolute: PathBuf,
    /// Full path of the last selected entry (file or directory).
    pub full_path: PathBuf,
    /// Last relative text the user successfully committed.
    pub last_good_relative: String,
}

/// State machine over [`NavigationState`].
pub struct PathNavigator {
    registry: Arc<RwLock<LocationRegistry>>,
    policy: AccessPolicy,
    probe: Arc<dyn FilesystemProbe>,
    default_location: String,
    selection: SelectionWatch,
    base_name: String,
    state: NavigationState,
}

impl PathNavigator {
    /// Creates a navigator positioned at the configured start path.
    ///
    /// Falls back to the default root when the start path is disallowed by
    /// policy or fails to resolve.
    pub fn new(
        registry: Arc<RwLock<LocationRegistry>>,
        policy: AccessPolicy,
        probe: Arc<dyn FilesystemProbe>,
        default_location: &str,
        start_path: &AliasPath,
        selection: SelectionWatch,
    ) -> Result<Self, NavError> {
        let (current_alias, current_absolute, base_name) = {
            let reg = registry
                .read()
                .map_err(|_| NavError::Internal("location registry lock poisoned".to_string()))?;

            match Self::accept_start(&reg, &policy, start_path) {
                Some((alias, absolute)) => {
                    let base = alias
                        .alias_name()
                        .map(str::to_string)
                        .or_else(|| reg.best_base_for(&absolute).map(|loc| loc.name.clone()))
                        .unwrap_or_else(|| default_location.to_string());
                    (alias, absolute, base)
                }
                None => {
                    info!(start = %start_path, "start path rejected, falling back to default root");
                    let root = AliasPath::alias(default_location, "");
                    let absolute = reg.resolve(&root)?;
                    (root, absolute, default_location.to_string())
                }
            }
        };

        let last_good_relative = match &current_alias {
            AliasPath::Alias { remainder, .. } => remainder.clone(),
            AliasPath::Absolute(_) => String::new(),
        };

        let navigator = Self {
            registry,
            policy,
            probe,
            default_location: default_location.to_string(),
            selection,
            base_name,
            state: NavigationState {
                full_path: current_absolute.clone(),
                current_alias,
                current_absolute,
                last_good_relative,
            },
        };
        navigator.publish_selection();
        Ok(navigator)
    }

    /// Whether the start path resolves and is permitted.
    fn accept_start(
        registry: &LocationRegistry,
        policy: &AccessPolicy,
        start: &AliasPath,
    ) -> Option<(AliasPath, PathBuf)> {
        let absolute = registry.resolve(start).ok()?;
        if start.alias_name().is_none() && !policy.is_path_allowed(&absolute) {
            return None;
        }
        Some((start.clone(), absolute))
    }

    /// Current navigation state.
    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Name of the currently selected base location.
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Last committed relative text, used to restore a rejected edit.
    pub fn relative_text(&self) -> &str {
        &self.state.last_good_relative
    }

    /// Entry selection from the file list: `".."` navigates to the parent,
    /// anything else navigates to that child.
    pub fn select_entry(&mut self, name: &str) -> Result<(), NavError> {
        if name == ".." {
            self.navigate_to_parent()
        } else {
            self.navigate_to_child(name)
        }
    }

    /// Moves the cursor to the parent directory.
    ///
    /// A no-op at a registry root location and at a filesystem root.
    pub fn navigate_to_parent(&mut self) -> Result<(), NavError> {
        if self.state.current_alias.is_alias_root() {
            return Ok(());
        }

        let reg = self.read_registry()?;
        let absolute = reg.resolve(&self.state.current_alias)?;
        let Some(parent) = self.probe.parent_of(&absolute) else {
            return Ok(());
        };
        let (alias, base) = self.alias_for(&reg, &parent)?;
        drop(reg);

        self.commit(alias, parent.clone(), parent, base);
        Ok(())
    }

    /// Moves the cursor onto a child entry.
    ///
    /// The full-path output is always committed; the browsable directory
    /// path changes only when the target is a directory (selecting a file
    /// leaves the current directory in place).
    pub fn navigate_to_child(&mut self, child: &str) -> Result<(), NavError> {
        let reg = self.read_registry()?;
        let absolute = reg.resolve(&self.state.current_alias)?;
        let target = combine(&absolute, child)?;

        if !self.probe.is_directory(&target) {
            drop(reg);
            self.state.full_path = target;
            return Ok(());
        }

        let (alias, base) = self.alias_for(&reg, &target)?;
        drop(reg);

        self.commit(alias, target.clone(), target, base);
        Ok(())
    }

    /// Jumps to the resolved target of a registered location and clears the
    /// relative-text memo.
    pub fn change_base_location(&mut self, name: &str) -> Result<(), NavError> {
        let reg = self.read_registry()?;
        let location = reg
            .find(name)
            .ok_or_else(|| NavError::MissingLocation(name.to_string()))?;
        let absolute = reg.resolve(&location.target)?;

        // System drives browse by their concrete root; everything else by alias.
        let alias = match location.kind {
            LocationKind::System => location.target.clone(),
            _ => AliasPath::alias(&location.name, ""),
        };
        let base = location.name.clone();
        drop(reg);

        self.state.last_good_relative.clear();
        self.commit(alias, absolute.clone(), absolute, base);
        Ok(())
    }

    /// Commits a user edit of the relative-path text.
    ///
    /// On any failure the state is left untouched; the caller restores the
    /// textbox from [`Self::relative_text`] and surfaces the error.
    pub fn edit_relative_text(&mut self, text: &str) -> Result<(), NavError> {
        if !self.policy.is_relative_input_allowed(text) {
            error!(input = text, "rejected relative path input");
            return Err(NavError::InvalidRelativeInput(text.to_string()));
        }

        let reg = self.read_registry()?;
        let base = self.base_alias(&reg)?;
        let candidate = base.join_relative(text);
        let absolute = reg.resolve(&candidate)?;

        if !self.probe.is_directory(&absolute) {
            error!(path = %absolute.display(), "relative path does not exist");
            return Err(NavError::ResolutionFailure(absolute));
        }
        if candidate.alias_name().is_none() && !self.policy.is_path_allowed(&absolute) {
            return Err(NavError::PathNotAllowed(absolute));
        }
        let base_name = self.base_name.clone();
        drop(reg);

        self.commit(candidate, absolute.clone(), absolute, base_name);
        Ok(())
    }

    /// Applies a selection-invalidated signal from the reconciler: a single
    /// atomic fallback to the default root.
    pub fn on_selection_invalidated(&mut self) {
        info!("selection invalidated, falling back to default root");
        let default = self.default_location.clone();
        if let Err(err) = self.change_base_location(&default) {
            error!(error = %err, "failed to fall back to default root");
        }
    }

    /// Alias form of the current base location.
    fn base_alias(&self, registry: &LocationRegistry) -> Result<AliasPath, NavError> {
        let location = registry
            .find(&self.base_name)
            .ok_or_else(|| NavError::MissingLocation(self.base_name.clone()))?;
        Ok(match location.kind {
            LocationKind::System => location.target.clone(),
            _ => AliasPath::alias(&location.name, ""),
        })
    }

    /// Alias form of a concrete path, preferring the best-matching base.
    fn alias_for(
        &self,
        registry: &LocationRegistry,
        path: &Path,
    ) -> Result<(AliasPath, String), NavError> {
        if let Some(location) = registry.best_base_for(path) {
            let alias = AliasPath::format_under(&location.name, location.root(), path)?;
            return Ok((alias, location.name.clone()));
        }
        if self.policy.is_path_allowed(path) {
            return Ok((AliasPath::absolute(path), self.base_name.clone()));
        }
        Err(NavError::PathNotAllowed(path.to_path_buf()))
    }

    /// Commits a consistent alias/absolute pair and publishes the selection.
    fn commit(&mut self, alias: AliasPath, absolute: PathBuf, full: PathBuf, base: String) {
        self.state.last_good_relative = match &alias {
            AliasPath::Alias { remainder, .. } => remainder.clone(),
            AliasPath::Absolute(_) => String::new(),
        };
        self.state.current_alias = alias;
        self.state.current_absolute = absolute;
        self.state.full_path = full;
        self.base_name = base;
        self.publish_selection();
    }

    /// Publishes the current base into the shared selection watch.
    fn publish_selection(&self) {
        let kind = self
            .registry
            .read()
            .ok()
            .and_then(|reg| reg.find(&self.base_name).map(|loc| loc.kind));
        if let Ok(mut selection) = self.selection.write() {
            *selection = kind.map(|kind| SelectedBase {
                name: self.base_name.clone(),
                kind,
            });
        }
    }

    fn read_registry(&self) -> Result<RwLockReadGuard<'_, LocationRegistry>, NavError> {
        self.registry
            .read()
            .map_err(|_| NavError::Internal("location registry lock poisoned".to_string()))
    }
}
