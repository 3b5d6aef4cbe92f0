//! End-to-end integration tests for fsbrowse.
//!
//! These tests verify complete flows work correctly:
//! - Session startup and shutdown
//! - Device reconciliation against a real directory tree
//! - Navigation through the shared navigator
//! - Selection invalidation fallback

use std::time::Duration;

use navigator::config::{Config, LocationEntry};
use navigator::reconciler::EngineEvent;
use navigator::registry::LocationKind;
use navigator::session::BrowseSession;
use tempfile::TempDir;

/// Create a test configuration over a temporary directory tree.
fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("project").join("data")).unwrap();

    let mut config = Config::default();
    config.engine.app_root = root.clone();
    config.browse.usb_mount_template = root.join("usb{n}").to_string_lossy().to_string();
    config.browse.poll_period_secs = 1;
    config.browse.start_path = "%ProjectDir%".to_string();
    config.browse.default_location = "ProjectDir".to_string();
    config.locations = vec![
        LocationEntry::new("AppDir", "", "Location_AppDir", "Application", "en-US"),
        LocationEntry::new(
            "ProjectDir",
            "project",
            "Location_ProjectDir",
            "Project",
            "en-US",
        ),
    ];
    (config, temp_dir)
}

// =============================================================================
// Session Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_session_starts_and_stops() {
    let (config, _temp_dir) = create_test_config();

    let mut session = BrowseSession::new(&config).unwrap();
    assert!(session.is_enabled());

    session.start();
    session.stop().await;
}

#[tokio::test]
async fn test_stop_without_start_is_clean() {
    let (config, _temp_dir) = create_test_config();

    let mut session = BrowseSession::new(&config).unwrap();
    session.stop().await;
}

#[tokio::test]
async fn test_navigator_starts_at_configured_path() {
    let (config, _temp_dir) = create_test_config();
    let session = BrowseSession::new(&config).unwrap();

    let navigator = session.navigator();
    let nav = navigator.lock().await;
    assert_eq!(nav.base_name(), "ProjectDir");
    assert_eq!(nav.state().current_alias.to_string(), "%ProjectDir%");
}

// =============================================================================
// Navigation Flow Tests
// =============================================================================

#[tokio::test]
async fn test_navigate_down_and_back_up() {
    let (config, temp_dir) = create_test_config();
    let root = temp_dir.path().canonicalize().unwrap();
    let session = BrowseSession::new(&config).unwrap();

    let navigator = session.navigator();
    let mut nav = navigator.lock().await;

    nav.select_entry("data").unwrap();
    assert_eq!(nav.state().current_alias.to_string(), "%ProjectDir%/data");
    assert_eq!(nav.state().current_absolute, root.join("project").join("data"));

    nav.select_entry("..").unwrap();
    assert_eq!(nav.state().current_alias.to_string(), "%ProjectDir%");

    // At the base root the parent step is a no-op.
    nav.select_entry("..").unwrap();
    assert_eq!(nav.state().current_alias.to_string(), "%ProjectDir%");
}

#[tokio::test]
async fn test_relative_edit_commits_against_base() {
    let (config, temp_dir) = create_test_config();
    let root = temp_dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("project").join("sub").join("dir")).unwrap();
    let session = BrowseSession::new(&config).unwrap();

    let navigator = session.navigator();
    let mut nav = navigator.lock().await;

    nav.edit_relative_text("sub/dir").unwrap();
    assert_eq!(nav.state().current_alias.to_string(), "%ProjectDir%/sub/dir");
    assert_eq!(
        nav.state().current_absolute,
        root.join("project").join("sub").join("dir")
    );
}

#[tokio::test]
async fn test_rejected_edit_keeps_state() {
    let (config, _temp_dir) = create_test_config();
    let session = BrowseSession::new(&config).unwrap();

    let navigator = session.navigator();
    let mut nav = navigator.lock().await;

    let before = nav.state().clone();
    assert!(nav.edit_relative_text("../escape").is_err());
    assert_eq!(nav.state().current_alias, before.current_alias);
    assert_eq!(nav.state().current_absolute, before.current_absolute);
    assert_eq!(nav.relative_text(), before.last_good_relative);
}

// =============================================================================
// Device Reconciliation Tests
// =============================================================================

#[tokio::test]
async fn test_usb_attached_at_startup_is_registered() {
    let (config, temp_dir) = create_test_config();
    let root = temp_dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("usb1")).unwrap();

    let session = BrowseSession::new(&config).unwrap();
    let locations = session.locations();
    assert!(locations.iter().any(|l| l.name == "USB1"));
}

#[tokio::test]
async fn test_usb_hotplug_is_picked_up_by_poll_loop() {
    let (config, temp_dir) = create_test_config();
    let root = temp_dir.path().canonicalize().unwrap();

    let mut session = BrowseSession::new(&config).unwrap();
    let mut events = session.subscribe();
    session.start();

    std::fs::create_dir_all(root.join("usb1")).unwrap();

    let added = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(EngineEvent::LocationAdded { name }) if name == "USB1" => break true,
                Ok(_) => continue,
                Err(_) => break false,
            }
        }
    })
    .await
    .unwrap();
    assert!(added);

    session.stop().await;
}

#[tokio::test]
async fn test_usb_removal_falls_back_to_default_location() {
    let (config, temp_dir) = create_test_config();
    let root = temp_dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("usb1")).unwrap();

    let mut session = BrowseSession::new(&config).unwrap();
    let mut events = session.subscribe();
    session.start();

    {
        let navigator = session.navigator();
        let mut nav = navigator.lock().await;
        nav.change_base_location("USB1").unwrap();
        assert_eq!(nav.base_name(), "USB1");
    }

    std::fs::remove_dir(root.join("usb1")).unwrap();

    let invalidated = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(EngineEvent::SelectionInvalidated) => break true,
                Ok(_) => continue,
                Err(_) => break false,
            }
        }
    })
    .await
    .unwrap();
    assert!(invalidated);

    // The forwarder applies the fallback; give it a moment to take the lock.
    let navigator = session.navigator();
    let fell_back = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if navigator.lock().await.base_name() == "ProjectDir" {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(fell_back.is_ok());

    let nav = navigator.lock().await;
    assert_eq!(nav.state().current_alias.to_string(), "%ProjectDir%");

    session.stop().await;
}

#[tokio::test]
async fn test_locations_snapshot_reports_kinds() {
    let (config, temp_dir) = create_test_config();
    let root = temp_dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(root.join("usb1")).unwrap();

    let session = BrowseSession::new(&config).unwrap();
    let locations = session.locations();

    let app = locations.iter().find(|l| l.name == "AppDir").unwrap();
    assert_eq!(app.kind, format!("{:?}", LocationKind::Standard));
    let usb = locations.iter().find(|l| l.name == "USB1").unwrap();
    assert_eq!(usb.kind, format!("{:?}", LocationKind::Usb));
}

#[tokio::test]
async fn test_resolve_rejects_unknown_alias() {
    let (config, _temp_dir) = create_test_config();
    let session = BrowseSession::new(&config).unwrap();

    assert!(session.resolve("%Nope%/x").is_err());
}
