use super::*;

use std::{
    collections::HashMap,
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn keeps_memory_and_explicit_urls() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(
        normalize_database_url("sqlite://./shop.db"),
        "sqlite://./shop.db"
    );
}

#[test]
fn empty_database_url_falls_back_to_default() {
    assert_eq!(
        normalize_database_url("   "),
        Settings::default().database_url
    );
}

#[test]
fn creates_parent_dir_for_sqlite_url() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("storefront_server_test_{suffix}"));
    let db_path = temp_root.join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.join("data").exists());

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn app_prefixed_env_wins_over_bare_name() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        lookup_from(&[
            ("SERVER_BIND", "0.0.0.0:1"),
            ("APP__BIND_ADDR", "0.0.0.0:2"),
            ("DATABASE_URL", "sqlite::memory:"),
        ]),
    );
    assert_eq!(settings.server_bind, "0.0.0.0:2");
    assert_eq!(settings.database_url, "sqlite::memory:");
}

#[test]
fn seed_flag_and_body_limit_parse_from_env() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        lookup_from(&[("APP__SEED_DEFAULTS", "off"), ("APP__MAX_BODY_BYTES", "1024")]),
    );
    assert!(!settings.seed_default_categories);
    assert_eq!(settings.max_body_bytes, 1024);
}

#[test]
fn invalid_seed_flag_keeps_default() {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings, lookup_from(&[("APP__SEED_DEFAULTS", "maybe")]));
    assert!(settings.seed_default_categories);
}

#[test]
fn file_settings_accept_typed_values() {
    let file_cfg: FileSettings = toml::from_str(
        r#"
        bind_addr = "127.0.0.1:9000"
        seed_default_categories = false
        max_body_bytes = 2048
        "#,
    )
    .expect("toml");
    let mut settings = Settings::default();
    apply_file_settings(&mut settings, file_cfg);
    assert_eq!(settings.server_bind, "127.0.0.1:9000");
    assert!(!settings.seed_default_categories);
    assert_eq!(settings.max_body_bytes, 2048);
    assert_eq!(settings.database_url, Settings::default().database_url);
}
