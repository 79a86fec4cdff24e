//! Shared test utilities
#![allow(dead_code)]

use rest_cli::config::manager::ServiceManager;
use rest_cli::config::settings::Settings;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Cached binary path for the rest CLI to avoid repeated lookups
#[allow(deprecated)]
pub static REST_BIN: std::sync::LazyLock<PathBuf> =
    std::sync::LazyLock::new(|| assert_cmd::cargo::cargo_bin("rest"));

/// Command for the rest binary bound to `db`, with logging quiet.
pub fn rest_cmd(db: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(&*REST_BIN);
    cmd.env("REST_DB", db)
        .env_remove("REST_LOG")
        .env_remove("REST_LOG_FILE")
        .env_remove("REST_LOG_FORMAT");
    cmd
}

/// A fresh store inside its own temporary directory.
pub fn temp_db() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("rest.db");
    (dir, db)
}

/// Settings pointing at a local plain-HTTP server with fast, deterministic retries.
pub fn local_settings(port: u16) -> Settings {
    Settings {
        scheme: Some("http".into()),
        host: Some("127.0.0.1".into()),
        port: Some(port),
        retry_delay: Some(Duration::from_millis(5)),
        jitter: Some(false),
        ..Settings::new()
    }
}

/// Opens `db` and creates the service `api` pointing at `port`.
pub fn init_local_service(db: &Path, port: u16, extra: &Settings) -> ServiceManager {
    let manager = ServiceManager::open(db).unwrap();
    manager
        .init("api", &local_settings(port).merge(extra), false)
        .unwrap();
    manager
}
