use super::{apply_env_overrides, load_settings_from, prepare_base_url, ClientSettings};

use std::{collections::HashMap, fs, path::PathBuf};

fn temp_settings_file(contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("client_settings_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("client.toml");
    fs::write(&path, contents).expect("write settings");
    path
}

#[test]
fn defaults_point_at_local_api() {
    let settings = ClientSettings::default();
    assert_eq!(settings.api_base_url, "http://localhost:8081");
    assert_eq!(settings.request_timeout_secs, 30);
    assert_eq!(settings.notification_ttl().as_millis(), 5000);
}

#[test]
fn strips_trailing_slash_from_base_url() {
    assert_eq!(
        prepare_base_url("http://api.example.test:9000/").expect("valid"),
        "http://api.example.test:9000"
    );
    assert_eq!(
        prepare_base_url("  ").expect("blank falls back"),
        "http://localhost:8081"
    );
}

#[test]
fn rejects_non_http_base_url() {
    assert!(prepare_base_url("ftp://files.example.test").is_err());
    assert!(prepare_base_url("not a url").is_err());
}

#[test]
fn file_values_override_defaults() {
    let path = temp_settings_file(
        r#"
api_base_url = "https://students.example.test/"
download_dir = "/tmp/student-downloads"
request_timeout_secs = 5
notification_ttl_ms = 1500
"#,
    );

    let settings = load_settings_from(&path).expect("load settings");
    assert_eq!(settings.api_base_url, "https://students.example.test");
    assert_eq!(settings.download_dir, PathBuf::from("/tmp/student-downloads"));
    assert_eq!(settings.request_timeout_secs, 5);
    assert_eq!(settings.notification_ttl_ms, 1500);

    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn invalid_file_values_are_reported() {
    let path = temp_settings_file("request_timeout_secs = -3\n");
    let err = load_settings_from(&path).expect_err("negative timeout");
    assert!(err.to_string().contains("request_timeout_secs"));
    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn prefixed_env_wins_over_plain_env() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("API_BASE_URL", "http://plain.example.test"),
        ("APP__API_BASE_URL", "http://prefixed.example.test"),
        ("APP__DOWNLOAD_DIR", "/data/out"),
        ("APP__REQUEST_TIMEOUT_SECS", "12"),
        ("APP__LOG_LEVEL", "debug"),
    ]);
    let mut settings = ClientSettings::default();
    apply_env_overrides(&mut settings, |key| env.get(key).map(|v| v.to_string()))
        .expect("apply env");

    assert_eq!(settings.api_base_url, "http://prefixed.example.test");
    assert_eq!(settings.download_dir, PathBuf::from("/data/out"));
    assert_eq!(settings.request_timeout_secs, 12);
    assert_eq!(settings.log_level, "debug");
}

#[test]
fn non_numeric_env_timeout_is_an_error() {
    let mut settings = ClientSettings::default();
    let err = apply_env_overrides(&mut settings, |key| {
        (key == "APP__REQUEST_TIMEOUT_SECS").then(|| "soon".to_string())
    })
    .expect_err("must fail");
    assert!(err.to_string().contains("APP__REQUEST_TIMEOUT_SECS"));
}

#[test]
fn zero_env_durations_are_rejected_like_file_values() {
    for key in ["APP__REQUEST_TIMEOUT_SECS", "APP__NOTIFICATION_TTL_MS"] {
        let mut settings = ClientSettings::default();
        let err = apply_env_overrides(&mut settings, |name| (name == key).then(|| "0".to_string()))
            .expect_err("zero is not a usable duration");
        assert!(err.to_string().contains(key));
    }
}
