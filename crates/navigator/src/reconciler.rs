//! Device reconciliation: keeping the location registry in step with the
//! attached devices.
//!
//! The reconciler is the sole mutator of `System` and `Usb` registry
//! entries. Each cycle probes the USB slots and the system drives, diffs
//! the result against the registry, applies the changes (System entries
//! first, then USB, so positional consumers see a deterministic order),
//! and decides whether the current selection must be invalidated.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::nav::SelectionWatch;
use crate::policy::AccessPolicy;
use crate::probe::{DriveKind, FilesystemProbe};
use crate::registry::{Location, LocationKind, LocationRegistry};

/// Events emitted by the engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A location was added to the registry.
    LocationAdded {
        /// Browse key of the new location.
        name: String,
    },
    /// A location was removed from the registry.
    LocationRemoved {
        /// Browse key of the removed location.
        name: String,
    },
    /// A system drive appeared.
    DriveConnected {
        /// Root of the drive.
        root: PathBuf,
    },
    /// A system drive disappeared.
    DriveDisconnected {
        /// Root of the drive.
        root: PathBuf,
    },
    /// The selected base location is no longer valid; the navigator must
    /// fall back to the default root.
    SelectionInvalidated,
}

/// Reconciler tuning taken from configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Highest USB slot index probed each cycle.
    pub max_usb_slots: u32,
    /// Mount root template for USB slots; `{n}` is the slot index.
    pub usb_mount_template: String,
}

/// Periodic device prober and registry reconciler.
pub struct DeviceReconciler {
    registry: Arc<RwLock<LocationRegistry>>,
    probe: Arc<dyn FilesystemProbe>,
    policy: AccessPolicy,
    settings: ReconcilerSettings,
    selection: SelectionWatch,
    events: broadcast::Sender<EngineEvent>,
    /// Drive roots seen in the previous cycle.
    connected_drives: BTreeSet<PathBuf>,
    /// USB slot count seen in the previous cycle.
    connected_usb_slots: u32,
}

impl DeviceReconciler {
    /// Creates a reconciler over the shared registry.
    pub fn new(
        registry: Arc<RwLock<LocationRegistry>>,
        probe: Arc<dyn FilesystemProbe>,
        policy: AccessPolicy,
        settings: ReconcilerSettings,
        selection: SelectionWatch,
        events: broadcast::Sender<EngineEvent>,
    ) -> Self {
        Self {
            registry,
            probe,
            policy,
            settings,
            selection,
            events,
            connected_drives: BTreeSet::new(),
            connected_usb_slots: 0,
        }
    }

    /// Runs one reconciliation cycle.
    ///
    /// Any enumeration failure makes this cycle a no-op; the loop retries
    /// on the next tick.
    pub fn reconcile(&mut self) {
        let caps = self.policy.capabilities();

        let usb_slots = self.probe_usb_slots();
        let usb_roots: BTreeSet<PathBuf> =
            usb_slots.iter().map(|(_, root)| root.clone()).collect();

        // Probe system drives before touching the registry, so a failed
        // enumeration leaves the whole cycle unapplied.
        let mut staged_system: Vec<Location> = Vec::new();
        let mut drive_roots = BTreeSet::new();
        let probe_drives = caps.full_filesystem && !caps.is_unix;
        if probe_drives {
            let drives = match self.probe.list_drives() {
                Ok(drives) => drives,
                Err(err) => {
                    error!(error = %err, "unable to get the list of system drives, skipping cycle");
                    return;
                }
            };

            for drive in drives {
                // Skip roots already claimed by a USB slot probe so a USB
                // mass-storage device is not double-listed as a fixed drive.
                if usb_roots.contains(&drive.root) {
                    continue;
                }
                let is_network = drive.kind == DriveKind::Network;
                if drive.kind != DriveKind::Fixed && !is_network {
                    continue;
                }
                if is_network && !caps.network_drives {
                    continue;
                }
                if is_network && !drive.reachable {
                    continue;
                }

                // Assumption: within one polling period no drive root is
                // removed and replaced by a different disk under the same
                // name. Drive identity beyond the root is unavailable.
                let name = drive.root.to_string_lossy().to_string();
                drive_roots.insert(drive.root.clone());
                staged_system.push(Location::new(
                    &name,
                    LocationKind::System,
                    drive.root,
                    format!("WindowsDrive_{name}"),
                    name.clone(),
                ));
            }
        }

        let Ok(mut registry) = self.registry.write() else {
            error!("location registry lock poisoned, skipping cycle");
            return;
        };

        // Disconnected system drives.
        if probe_drives {
            for root in self.connected_drives.difference(&drive_roots) {
                let name = root.to_string_lossy().to_string();
                info!("Drive {} has been disconnected", name);
                if registry.remove(&name).is_some() {
                    let _ = self.events.send(EngineEvent::LocationRemoved { name });
                }
                let _ = self
                    .events
                    .send(EngineEvent::DriveDisconnected { root: root.clone() });
            }
            for root in drive_roots.difference(&self.connected_drives) {
                info!("Drive {} has been connected", root.display());
                let _ = self
                    .events
                    .send(EngineEvent::DriveConnected { root: root.clone() });
            }
        }

        // Disconnected USB slots.
        for name in registry.names_of_kind(LocationKind::Usb) {
            let still_valid = usb_slots
                .iter()
                .any(|(index, _)| name == format!("USB{index}"));
            if !still_valid && registry.remove(&name).is_some() {
                let _ = self.events.send(EngineEvent::LocationRemoved { name });
            }
        }

        // Apply additions, System kind first, then USB.
        for location in staged_system {
            let name = location.name.clone();
            if registry.add_or_update(location) {
                let _ = self.events.send(EngineEvent::LocationAdded { name });
            }
        }
        for (index, root) in &usb_slots {
            let name = format!("USB{index}");
            let display_value = if caps.is_unix {
                format!("USB {index}")
            } else {
                format!("USB {index} ({})", root.display())
            };
            let location = Location::new(
                &name,
                LocationKind::Usb,
                root.clone(),
                "ComboBoxFileSelectorUSBDisplayName",
                display_value,
            );
            if registry.add_or_update(location) {
                let _ = self.events.send(EngineEvent::LocationAdded { name });
            }
        }

        let current_usb = usb_slots.len() as u32;
        let usb_changed = current_usb != self.connected_usb_slots;
        if usb_changed {
            let status = if current_usb > self.connected_usb_slots {
                "connected"
            } else {
                "disconnected"
            };
            info!("USB mass storage device has been {}", status);
        }

        // A USB change invalidates a USB-kind selection even when the name
        // survives: slot promotion can silently rebind USB<k> to a different
        // physical device.
        let invalidate = match self.selection.read() {
            Ok(selection) => match selection.as_ref() {
                Some(base) => {
                    (base.kind == LocationKind::Usb && usb_changed)
                        || registry.find(&base.name).is_none()
                }
                None => false,
            },
            Err(_) => false,
        };
        drop(registry);

        self.connected_drives = drive_roots;
        self.connected_usb_slots = current_usb;

        if invalidate {
            let _ = self.events.send(EngineEvent::SelectionInvalidated);
        }
        debug!(
            usb_slots = current_usb,
            drives = self.connected_drives.len(),
            "reconcile cycle complete"
        );
    }

    /// Probes the USB slots in index order, stopping at the first invalid
    /// index (the host packs slots densely; gaps are not supported).
    fn probe_usb_slots(&self) -> Vec<(u32, PathBuf)> {
        let mut slots = Vec::new();
        for index in 1..=self.settings.max_usb_slots {
            let root = self.usb_slot_root(index);
            if !self.probe.is_directory(&root) {
                break;
            }
            slots.push((index, root));
        }
        slots
    }

    /// Mount root for a USB slot index.
    fn usb_slot_root(&self, index: u32) -> PathBuf {
        PathBuf::from(
            self.settings
                .usb_mount_template
                .replace("{n}", &index.to_string()),
        )
    }

    /// Runs the periodic reconciliation loop until cancelled.
    ///
    /// Ticks are single-flight: each cycle completes before the next tick
    /// is taken, and a missed tick is delayed rather than bursted.
    pub async fn run(mut self, period: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick; the session runs a seed cycle.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("reconciler received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    self.reconcile();
                }
            }
        }
    }
}
