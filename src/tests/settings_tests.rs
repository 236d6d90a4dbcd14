use super::*;

use std::env;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_root(name: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    env::temp_dir().join(format!("invoice_form_settings_{name}_{suffix}"))
}

#[test]
fn missing_file_gives_defaults() {
    let path = temp_root("missing").join("settings.toml");
    let settings = read_settings_file(&path).expect("defaults");
    assert_eq!(settings, AppSettings::default());
    assert_eq!(settings.api_base_url, "http://localhost:8000/api");
    assert_eq!(settings.schema, SchemaRevision::Nested);
    assert_eq!(settings.timeout(), Duration::from_secs(30));
}

#[test]
fn settings_round_trip_through_file() {
    let root = temp_root("roundtrip");
    let path = root.join("nested").join("settings.toml");
    let settings = AppSettings {
        api_base_url: "https://invoices.example.com/api".into(),
        schema: SchemaRevision::Flat,
        timeout_secs: 5,
        clients_file: Some("/tmp/clients.toml".into()),
    };

    save_settings(&path, &settings).expect("save");
    assert_eq!(read_settings_file(&path).expect("read"), settings);

    fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn partial_file_fills_defaults() {
    let root = temp_root("partial");
    fs::create_dir_all(&root).expect("mkdir");
    let path = root.join("settings.toml");
    fs::write(&path, "schema = \"flat\"\n").expect("write");

    let settings = read_settings_file(&path).expect("read");
    assert_eq!(settings.schema, SchemaRevision::Flat);
    assert_eq!(settings.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(settings.timeout_secs, 30);

    fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn zero_timeout_is_rejected_on_load() {
    let root = temp_root("zero_timeout");
    fs::create_dir_all(&root).expect("mkdir");
    let path = root.join("settings.toml");
    fs::write(&path, "timeout_secs = 0\n").expect("write");

    let err = load_settings(&path).expect_err("must reject");
    assert!(matches!(err, SettingsError::Invalid { .. }));
    assert!(err.to_string().contains("timeout_secs must be greater than zero"));

    // `config` still reads the raw file so the value can be corrected.
    assert_eq!(read_settings_file(&path).expect("raw read").timeout_secs, 0);

    fs::remove_dir_all(root).expect("cleanup");
}

#[test]
fn positive_timeout_passes_check() {
    let settings = AppSettings { timeout_secs: 1, ..AppSettings::default() };
    assert!(settings.check(Path::new("settings.toml")).is_ok());
}

#[test]
fn environment_overrides_file_values() {
    let mut settings = AppSettings::default();
    settings.apply_env([
        (API_URL_ENV, "http://10.0.0.5:9000/api"),
        (SCHEMA_ENV, "flat"),
        ("UNRELATED", "x"),
    ]);
    assert_eq!(settings.api_base_url, "http://10.0.0.5:9000/api");
    assert_eq!(settings.schema, SchemaRevision::Flat);
}

#[test]
fn blank_or_unknown_env_values_are_ignored() {
    let mut settings = AppSettings::default();
    settings.apply_env([(API_URL_ENV, "  "), (SCHEMA_ENV, "v9")]);
    assert_eq!(settings, AppSettings::default());
}

#[test]
fn explicit_clients_file_wins() {
    let settings = AppSettings {
        clients_file: Some("/srv/invoices/clients.toml".into()),
        ..AppSettings::default()
    };
    assert_eq!(settings.clients_path(), PathBuf::from("/srv/invoices/clients.toml"));
    assert!(AppSettings::default().clients_path().ends_with("clients.toml"));
}

#[test]
fn home_prefix_is_expanded() {
    assert_eq!(expand_home_dir("/abs/path"), "/abs/path");
    if BaseDirs::new().is_some() {
        assert!(!expand_home_dir("~/clients.toml").starts_with('~'));
    }
}
