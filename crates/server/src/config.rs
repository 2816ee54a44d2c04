use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use storage::{StorageConfig, DEFAULT_MENU_PATH, DEFAULT_RESERVATION_PATH};
use tracing::warn;

pub const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    pub menu_path: PathBuf,
    pub reservation_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8501".into(),
            menu_path: PathBuf::from(DEFAULT_MENU_PATH),
            reservation_path: PathBuf::from(DEFAULT_RESERVATION_PATH),
        }
    }
}

impl Settings {
    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            menu_path: self.menu_path.clone(),
            reservation_path: self.reservation_path.clone(),
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then `file` (if present), then environment variables; later
/// sources win.
pub fn load_settings_from(file: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        match toml::from_str::<HashMap<String, String>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("bind_addr") {
                    settings.server_bind = v.clone();
                }
                if let Some(v) = file_cfg.get("menu_path") {
                    settings.menu_path = data_path(v, DEFAULT_MENU_PATH);
                }
                if let Some(v) = file_cfg.get("reservation_path") {
                    settings.reservation_path = data_path(v, DEFAULT_RESERVATION_PATH);
                }
            }
            Err(error) => {
                warn!(path = %file.display(), %error, "ignoring unparseable settings file");
            }
        }
    }

    for key in ["SERVER_BIND", "APP__BIND_ADDR"] {
        if let Some(v) = env(key) {
            settings.server_bind = v;
        }
    }
    for key in ["MENU_PATH", "APP__MENU_PATH"] {
        if let Some(v) = env(key) {
            settings.menu_path = data_path(&v, DEFAULT_MENU_PATH);
        }
    }
    for key in ["RESERVATION_PATH", "APP__RESERVATION_PATH"] {
        if let Some(v) = env(key) {
            settings.reservation_path = data_path(&v, DEFAULT_RESERVATION_PATH);
        }
    }

    settings
}

fn data_path(raw: &str, fallback: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() {
        PathBuf::from(fallback)
    } else {
        PathBuf::from(raw)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
