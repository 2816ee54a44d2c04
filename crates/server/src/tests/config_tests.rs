use super::{data_path, load_settings_from, Settings};

use std::{collections::HashMap, fs, path::PathBuf};

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_when_nothing_is_configured() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = load_settings_from(&dir.path().join("missing.toml"), env_of(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.menu_path, PathBuf::from("menu.csv"));
    assert_eq!(settings.reservation_path, PathBuf::from("reservations.csv"));
}

#[test]
fn settings_file_overrides_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("server.toml");
    fs::write(
        &file,
        "bind_addr = \"0.0.0.0:9000\"\nmenu_path = \"data/menu.csv\"\nreservation_path = \"data/res.csv\"\n",
    )
    .expect("write");

    let settings = load_settings_from(&file, env_of(&[]));
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.menu_path, PathBuf::from("data/menu.csv"));
    assert_eq!(settings.reservation_path, PathBuf::from("data/res.csv"));
}

#[test]
fn environment_overrides_settings_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("server.toml");
    fs::write(&file, "menu_path = \"file-menu.csv\"\n").expect("write");

    let settings = load_settings_from(
        &file,
        env_of(&[
            ("MENU_PATH", "env-menu.csv"),
            ("APP__RESERVATION_PATH", "env-res.csv"),
            ("SERVER_BIND", "127.0.0.1:7000"),
        ]),
    );
    assert_eq!(settings.menu_path, PathBuf::from("env-menu.csv"));
    assert_eq!(settings.reservation_path, PathBuf::from("env-res.csv"));
    assert_eq!(settings.server_bind, "127.0.0.1:7000");
}

#[test]
fn unparseable_settings_file_is_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("server.toml");
    fs::write(&file, "menu_path = [").expect("write");

    let settings = load_settings_from(&file, env_of(&[]));
    assert_eq!(settings, Settings::default());
}

#[test]
fn blank_data_path_falls_back_to_default() {
    assert_eq!(data_path("  ", "menu.csv"), PathBuf::from("menu.csv"));
    assert_eq!(
        data_path(" /srv/menu.csv ", "menu.csv"),
        PathBuf::from("/srv/menu.csv")
    );
}

#[test]
fn storage_config_carries_both_paths() {
    let settings = Settings {
        server_bind: "127.0.0.1:0".into(),
        menu_path: PathBuf::from("a.csv"),
        reservation_path: PathBuf::from("b.csv"),
    };
    let config = settings.storage_config();
    assert_eq!(config.menu_path, PathBuf::from("a.csv"));
    assert_eq!(config.reservation_path, PathBuf::from("b.csv"));
}
