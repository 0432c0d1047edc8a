//! Configuration loading tests
//!
//! Loading reads process environment variables, so every test that loads
//! holds `ENV_LOCK` to keep overrides from leaking between tests.

use std::sync::Mutex;

use shortvault::config::{StaticConfig, get_config, init_config};
use shortvault::errors::StoreError;
use tempfile::TempDir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn write_config(dir: &TempDir, content: &str) -> String {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).expect("Failed to write config");
    path.to_string_lossy().into_owned()
}

#[test]
fn test_defaults() {
    let config = StaticConfig::default();

    assert_eq!(config.store.backend, "redb");
    assert_eq!(config.store.data_dir, "data");
    assert_eq!(config.store.db_file, "main.db");
    assert_eq!(config.store.id_length, 4);
    assert_eq!(config.store.max_id_attempts, 10);
    assert!(config.store.secret.is_none());
    assert_eq!(config.redis.url, "redis://127.0.0.1:6379/");
    assert_eq!(config.redis.key_prefix, "");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_load_from_file() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[store]
backend = "redis"
id_length = 6

[redis]
url = "redis://:pw@10.0.0.5:6380/2"
key_prefix = "links:"
"#,
    );

    let config = StaticConfig::load_from(Some(path.as_str())).unwrap();

    assert_eq!(config.store.backend, "redis");
    assert_eq!(config.store.id_length, 6);
    // unspecified keys keep their defaults
    assert_eq!(config.store.max_id_attempts, 10);
    assert_eq!(config.store.data_dir, "data");
    assert_eq!(config.redis.url, "redis://:pw@10.0.0.5:6380/2");
    assert_eq!(config.redis.key_prefix, "links:");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_missing_file_uses_defaults() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let config = StaticConfig::load_from(path.to_str()).unwrap();
    assert_eq!(config.store.id_length, 4);
    assert_eq!(config.store.backend, "redb");
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[store]\nid_length = 6\n");

    // SAFETY: ENV_LOCK serializes every test that reads the environment
    unsafe { std::env::set_var("SV__STORE__ID_LENGTH", "9") };
    let result = StaticConfig::load_from(Some(path.as_str()));
    unsafe { std::env::remove_var("SV__STORE__ID_LENGTH") };

    assert_eq!(result.unwrap().store.id_length, 9);
}

#[test]
fn test_unknown_backend_rejected() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[store]\nbackend = \"sled\"\n");

    let result = StaticConfig::load_from(Some(path.as_str()));
    assert!(matches!(result, Err(StoreError::StorageBackendNotFound(_))));
}

#[test]
fn test_zero_attempts_rejected() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[store]\nmax_id_attempts = 0\n");

    let result = StaticConfig::load_from(Some(path.as_str()));
    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[test]
fn test_malformed_file_rejected() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[store\nid_length = ");

    let result = StaticConfig::load_from(Some(path.as_str()));
    assert!(matches!(result, Err(StoreError::Config(_))));
}

#[test]
fn test_sample_config_parses_back() {
    let sample = StaticConfig::generate_sample_config();
    assert!(sample.contains("[store]"));
    assert!(sample.contains("[redis]"));
    assert!(sample.contains("[logging]"));

    let parsed: StaticConfig = toml::from_str(&sample).unwrap();
    assert_eq!(parsed.store.id_length, 4);
    assert_eq!(parsed.store.backend, "redb");
}

#[test]
fn test_save_and_reload() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("saved.toml");

    let mut config = StaticConfig::default();
    config.store.id_length = 7;
    config.store.data_dir = "/var/lib/shortvault".to_string();
    config.save_to_file(&path).unwrap();

    let loaded = StaticConfig::load_from(path.to_str()).unwrap();
    assert_eq!(loaded.store.id_length, 7);
    assert_eq!(loaded.store.data_dir, "/var/lib/shortvault");
}

#[test]
fn test_global_config() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[store]\nid_length = 5\n");

    let loaded = init_config(Some(path.as_str())).unwrap();
    assert_eq!(loaded.store.id_length, 5);
    assert_eq!(get_config().store.id_length, 5);

    let path = write_config(&dir, "[store]\nid_length = 8\n");
    init_config(Some(path.as_str())).unwrap();
    assert_eq!(get_config().store.id_length, 8);
}

#[test]
fn test_concurrent_init_keeps_a_loaded_config() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = TempDir::new().unwrap();
    let paths: Vec<(usize, String)> = (3..=10)
        .map(|len| {
            let path = dir.path().join(format!("config-{}.toml", len));
            std::fs::write(&path, format!("[store]\nid_length = {}\n", len)).unwrap();
            (len, path.to_string_lossy().into_owned())
        })
        .collect();

    let handles: Vec<_> = paths
        .into_iter()
        .map(|(len, path)| {
            std::thread::spawn(move || {
                let loaded = init_config(Some(path.as_str())).unwrap();
                assert_eq!(loaded.store.id_length, len);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let active = get_config().store.id_length;
    assert!((3..=10).contains(&active));
}
