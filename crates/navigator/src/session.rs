//! Session lifecycle: wiring the registry, reconciler and navigator
//! together and running the background tasks.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use aliaspath::AliasPath;

use crate::config::Config;
use crate::nav::{PathNavigator, SelectionWatch};
use crate::policy::{AccessPolicy, Capabilities};
use crate::probe::{FilesystemProbe, OsProbe};
use crate::reconciler::{DeviceReconciler, EngineEvent, ReconcilerSettings};
use crate::registry::LocationRegistry;

/// Capacity of the engine event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A running browse session.
///
/// Owns the shared registry, the navigator and the reconciliation loop.
/// Created from configuration, started once, stopped on shutdown.
pub struct BrowseSession {
    registry: Arc<RwLock<LocationRegistry>>,
    navigator: Arc<Mutex<PathNavigator>>,
    events: broadcast::Sender<EngineEvent>,
    shutdown: CancellationToken,
    poll_period: Duration,
    reconciler: Option<DeviceReconciler>,
    tasks: Vec<JoinHandle<()>>,
    enabled: bool,
}

impl BrowseSession {
    /// Builds a session from configuration, using the host filesystem.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_probe(config, Arc::new(OsProbe))
    }

    /// Builds a session with an explicit filesystem probe.
    pub fn with_probe(config: &Config, probe: Arc<dyn FilesystemProbe>) -> Result<Self> {
        config
            .validate()
            .context("invalid browse configuration")?;

        let caps = Capabilities::detect(
            config.access.full_filesystem,
            config.access.network_drives,
        );
        let policy = AccessPolicy::new(caps);
        let enabled = policy.module_enabled();
        if !enabled {
            warn!("full filesystem access is not supported on this platform, module disabled");
        }

        let mut registry = LocationRegistry::new();
        registry.seed_standard(&config.locations, &config.engine.app_root);
        let registry = Arc::new(RwLock::new(registry));

        let selection: SelectionWatch = Arc::new(RwLock::new(None));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let mut reconciler = DeviceReconciler::new(
            Arc::clone(&registry),
            Arc::clone(&probe),
            policy.clone(),
            ReconcilerSettings {
                max_usb_slots: config.browse.max_usb_slots,
                usb_mount_template: config.browse.usb_mount_template.clone(),
            },
            Arc::clone(&selection),
            events.clone(),
        );
        // Seed cycle: devices attached at startup must be registered before
        // the start path is resolved.
        if enabled {
            reconciler.reconcile();
        }

        let start_path = AliasPath::parse(&config.browse.start_path);
        let navigator = PathNavigator::new(
            Arc::clone(&registry),
            policy,
            probe,
            &config.browse.default_location,
            &start_path,
            selection,
        )
        .context("unable to initialize the path navigator")?;

        Ok(Self {
            registry,
            navigator: Arc::new(Mutex::new(navigator)),
            events,
            shutdown: CancellationToken::new(),
            poll_period: Duration::from_secs(config.browse.poll_period_secs),
            reconciler: Some(reconciler),
            tasks: Vec::new(),
            enabled,
        })
    }

    /// Whether browsing is enabled under the current capabilities.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Starts the background tasks. Idempotent once the reconciler has
    /// been taken; a no-op when the module is disabled.
    pub fn start(&mut self) {
        if !self.enabled {
            warn!("browse session disabled, not starting background tasks");
            return;
        }
        let Some(reconciler) = self.reconciler.take() else {
            return;
        };

        info!(period_secs = self.poll_period.as_secs(), "starting browse session");

        self.tasks.push(tokio::spawn(
            reconciler.run(self.poll_period, self.shutdown.clone()),
        ));

        // Selection invalidation is applied to the navigator under its lock
        // so the fallback is a single atomic transition.
        let navigator = Arc::clone(&self.navigator);
        let mut rx = self.events.subscribe();
        let shutdown = self.shutdown.clone();
        self.tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = rx.recv() => match event {
                        Ok(EngineEvent::SelectionInvalidated) => {
                            navigator.lock().await.on_selection_invalidated();
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(missed)) => {
                            error!(missed, "event forwarder lagged behind");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!("selection forwarder stopped");
        }));
    }

    /// Stops the background tasks and waits for them to finish.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                error!(error = %err, "background task panicked");
            }
        }
        info!("browse session stopped");
    }

    /// Subscribes to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Shared access to the navigator.
    pub fn navigator(&self) -> Arc<Mutex<PathNavigator>> {
        Arc::clone(&self.navigator)
    }

    /// Snapshot of the registered locations, in insertion order.
    pub fn locations(&self) -> Vec<LocationSnapshot> {
        match self.registry.read() {
            Ok(registry) => registry
                .iter()
                .map(|loc| LocationSnapshot {
                    name: loc.name.clone(),
                    kind: format!("{:?}", loc.kind),
                    root: loc.root().to_path_buf(),
                    display_value: loc.display_value.clone(),
                })
                .collect(),
            Err(_) => {
                error!("location registry lock poisoned");
                Vec::new()
            }
        }
    }

    /// Resolves an alias or absolute path string against the registry.
    pub fn resolve(&self, input: &str) -> Result<PathBuf> {
        let path = AliasPath::parse(input);
        let registry = self
            .registry
            .read()
            .map_err(|_| anyhow::anyhow!("location registry lock poisoned"))?;
        Ok(registry.resolve(&path)?)
    }
}

/// Serializable view of a registered location.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LocationSnapshot {
    /// Browse key.
    pub name: String,
    /// Location kind.
    pub kind: String,
    /// Resolved root directory.
    pub root: PathBuf,
    /// Human-readable label.
    pub display_value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocationEntry;
    use tempfile::TempDir;

    fn test_config(root: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.engine.app_root = root.to_path_buf();
        config.browse.usb_mount_template = root
            .join("usb{n}")
            .to_string_lossy()
            .to_string();
        config.browse.poll_period_secs = 1;
        config.locations = vec![
            LocationEntry::new("AppDir", "", "Location_AppDir", "Application", "en-US"),
            LocationEntry::new("ProjectDir", "project", "Location_ProjectDir", "Project", "en-US"),
        ];
        config.browse.start_path = "%ProjectDir%".to_string();
        config.browse.default_location = "ProjectDir".to_string();
        config
    }

    #[tokio::test]
    async fn test_session_builds_and_resolves() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("project")).unwrap();
        let config = test_config(dir.path());

        let session = BrowseSession::new(&config).unwrap();
        assert!(session.is_enabled());

        let resolved = session.resolve("%ProjectDir%/data").unwrap();
        assert_eq!(resolved, dir.path().join("project").join("data"));

        let locations = session.locations();
        let names: Vec<&str> = locations.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["AppDir", "ProjectDir"]);
    }

    #[tokio::test]
    async fn test_session_seed_cycle_registers_usb() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("project")).unwrap();
        std::fs::create_dir_all(dir.path().join("usb1")).unwrap();
        let config = test_config(dir.path());

        let session = BrowseSession::new(&config).unwrap();
        let locations = session.locations();
        assert!(locations.iter().any(|l| l.name == "USB1"));
    }

    #[tokio::test]
    async fn test_session_rejects_empty_locations() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.locations.clear();

        assert!(BrowseSession::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_session_stop_is_clean() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("project")).unwrap();
        let config = test_config(dir.path());

        let mut session = BrowseSession::new(&config).unwrap();
        session.start();
        session.stop().await;
        assert!(session.tasks.is_empty());
    }
}
