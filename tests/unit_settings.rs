use nightride::domain::catalog::StationCatalog;
use nightride::storage::settings::{clamp_volume, JsonSettingsStore, Settings, SettingsStore};

#[test]
fn missing_file_loads_defaults() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let store = JsonSettingsStore::new(dir.path().join("settings.json"));

    let settings = store.load().expect("load defaults");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.volume, 0.5);
}

#[test]
fn save_creates_directories_and_round_trips() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("nested").join("settings.json");
    let mut store = JsonSettingsStore::new(&path);
    let settings = Settings {
        volume: 0.8,
        station: Some("spacesynth".to_string()),
    };

    store.save(&settings).expect("save settings");

    assert!(path.exists());
    assert_eq!(store.load().expect("load settings"), settings);
}

#[test]
fn partial_file_fills_in_defaults() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"station":"ebsm"}"#).expect("write settings");

    let settings = JsonSettingsStore::new(&path).load().expect("load settings");
    assert_eq!(settings.volume, 0.5);
    assert_eq!(settings.station.as_deref(), Some("ebsm"));
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().expect("create tempdir");
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{not json").expect("write settings");

    let err = JsonSettingsStore::new(&path)
        .load()
        .expect_err("corrupt settings");
    assert!(err.to_string().contains("failed to parse settings file"));
}

#[test]
fn sanitized_replaces_unknown_station_and_clamps_volume() {
    let catalog = StationCatalog::new();
    let settings = Settings {
        volume: -3.0,
        station: Some("vaporwave".to_string()),
    }
    .sanitized(&catalog);

    assert_eq!(settings.volume, 0.0);
    assert_eq!(settings.station.as_deref(), Some("nightride"));
}

#[test]
fn clamp_volume_handles_nan() {
    assert_eq!(clamp_volume(f64::NAN), 0.0);
    assert_eq!(clamp_volume(0.42), 0.42);
    assert_eq!(clamp_volume(7.0), 1.0);
}
