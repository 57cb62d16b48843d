//! Integration tests for the filesystem store against a temp directory.

use std::fs;

use kilnctl::adapters::storage::FsStore;
use kilnctl::app::ports::{ConfigError, ConfigPort, ProfileError, ProfileStore};
use kilnctl::config::ControllerConfig;
use kilnctl::control::kernel::ControlKernel;
use kilnctl::control::profile::{Profile, Waypoint};
use kilnctl::runtime::TaskExecutor;
use kilnctl::sensors::current::CurrentReading;

use crate::mock_hw::{ManualClock, RecordingRelay};

fn glaze() -> Profile {
    Profile::new(
        "glaze",
        &[
            Waypoint::new(200.0, 3600.0),
            Waypoint::new(1220.0, 18000.0),
            Waypoint::new(1220.0, 18600.0),
        ],
    )
    .unwrap()
}

// ── Config ────────────────────────────────────────────────────

#[test]
fn config_roundtrips_through_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsStore::new(dir.path());
    let config = ControllerConfig {
        kp: 0.2,
        period_secs: 5.0,
        max_duty: 0.9,
        ..Default::default()
    };

    ConfigPort::save(&mut store, &config).unwrap();
    assert!(dir.path().join("settings.json").exists());
    assert_eq!(ConfigPort::load(&store), Ok(config));
}

#[test]
fn config_load_reports_missing_and_corrupt_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    assert_eq!(ConfigPort::load(&store), Err(ConfigError::NotFound));

    fs::write(dir.path().join("settings.json"), b"{ not json").unwrap();
    assert_eq!(ConfigPort::load(&store), Err(ConfigError::Corrupted));
}

#[test]
fn config_load_rejects_out_of_range_values() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    fs::write(dir.path().join("settings.json"), br#"{"Period": 0}"#).unwrap();
    assert!(matches!(ConfigPort::load(&store), Err(ConfigError::ValidationFailed(_))));
}

#[test]
fn invalid_config_is_never_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsStore::new(dir.path());
    let bad = ControllerConfig {
        max_duty: 2.0,
        ..Default::default()
    };
    assert!(matches!(
        ConfigPort::save(&mut store, &bad),
        Err(ConfigError::ValidationFailed(_))
    ));
    assert!(!dir.path().join("settings.json").exists());
}

#[test]
fn hand_edited_settings_keep_defaults_for_missing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    fs::write(dir.path().join("settings.json"), br#"{"Kp": 0.3, "MinOnTime": 0.1}"#).unwrap();
    let config = ConfigPort::load(&store).unwrap();
    assert_eq!(config.kp, 0.3);
    assert_eq!(config.min_on_time_secs, 0.1);
    assert_eq!(config.period_secs, ControllerConfig::default().period_secs);
}

// ── Profiles ──────────────────────────────────────────────────

#[test]
fn profile_save_load_list_delete() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsStore::new(dir.path());
    assert_eq!(store.list(), Ok(vec![]));

    ProfileStore::save(&mut store, "glaze", &glaze()).unwrap();
    ProfileStore::save(&mut store, "bisque.json", &glaze()).unwrap();
    assert!(dir.path().join("prog/glaze.json").exists());
    assert!(dir.path().join("prog/bisque.json").exists());

    assert_eq!(store.list(), Ok(vec!["bisque".to_owned(), "glaze".to_owned()]));
    assert_eq!(ProfileStore::load(&store, "glaze"), Ok(glaze()));
    assert_eq!(ProfileStore::load(&store, "glaze.json"), Ok(glaze()));

    store.delete("glaze").unwrap();
    assert_eq!(store.list(), Ok(vec!["bisque".to_owned()]));
    assert_eq!(store.delete("glaze"), Err(ProfileError::NotFound));
    assert_eq!(ProfileStore::load(&store, "glaze"), Err(ProfileError::NotFound));
}

#[test]
fn list_ignores_non_profile_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsStore::new(dir.path());
    ProfileStore::save(&mut store, "glaze", &glaze()).unwrap();
    fs::write(dir.path().join("prog/notes.txt"), b"cone 6").unwrap();
    assert_eq!(store.list(), Ok(vec!["glaze".to_owned()]));
}

#[test]
fn profile_names_cannot_escape_directory() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsStore::new(dir.path());
    for name in ["", "../settings", "nested/glaze"] {
        assert_eq!(ProfileStore::load(&store, name), Err(ProfileError::InvalidName));
        assert_eq!(
            ProfileStore::save(&mut store, name, &glaze()),
            Err(ProfileError::InvalidName)
        );
    }
    assert!(!dir.path().join("settings.json").exists());
}

#[test]
fn malformed_profile_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());
    fs::create_dir_all(dir.path().join("prog")).unwrap();
    fs::write(dir.path().join("prog/broken.json"), br#"{"name":"broken","instructions":7}"#).unwrap();
    assert_eq!(ProfileStore::load(&store, "broken"), Err(ProfileError::Malformed));
}

#[test]
fn kernel_degrades_to_manual_on_malformed_profile() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FsStore::new(dir.path());
    ProfileStore::save(&mut store, "glaze", &glaze()).unwrap();
    fs::write(dir.path().join("prog/broken.json"), b"[]").unwrap();

    let executor = TaskExecutor::new();
    let mut kernel = ControlKernel::new(
        &executor,
        ControllerConfig::default(),
        RecordingRelay::default(),
        ManualClock::at(0),
        CurrentReading::default(),
    );

    kernel.set_program(Some("glaze"), &store);
    assert_eq!(kernel.profile().map(|p| p.name.as_str()), Some("glaze"));

    kernel.set_program(Some("broken"), &store);
    assert!(kernel.profile().is_none());
}
