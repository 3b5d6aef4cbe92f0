//! File-browser panel engine.
//!
//! The engine keeps a registry of named jump targets (configured standard
//! locations, system drives, USB slots), reconciles it periodically against
//! the attached devices, and drives a navigation cursor whose position is
//! stored in portable alias form alongside its absolute resolution.
//!
//! Pure path types live in the `aliaspath` crate; this crate adds the
//! stateful pieces: the access policy, the location registry, the device
//! reconciler, the navigator and the session glue that wires them together
//! with the background tasks.

pub mod config;
pub mod error;
pub mod nav;
pub mod policy;
pub mod probe;
pub mod reconciler;
pub mod registry;
pub mod session;

pub use config::Config;
pub use error::NavError;
pub use nav::{NavigationState, PathNavigator, SelectedBase, SelectionWatch};
pub use policy::{AccessPolicy, Capabilities};
pub use probe::{DriveInfo, DriveKind, FilesystemProbe, OsProbe, ProbeError};
pub use reconciler::{DeviceReconciler, EngineEvent, ReconcilerSettings};
pub use registry::{Location, LocationKind, LocationRegistry};
pub use session::BrowseSession;
