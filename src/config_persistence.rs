use std::path::{Path, PathBuf};

use log::warn;
use toml_edit::{value, DocumentMut, Item, Table};

use crate::config::{Config, OsdConfig};

const OSD_TABLE: &str = "OSD";

/// Source of persisted OSD settings, re-read on every reload.
pub trait OsdSettingsSource {
    fn load_osd_config(&self) -> OsdConfig;
}

/// Settings stored in a `config.toml` file.
pub struct ConfigFileSettings {
    path: PathBuf,
}

impl ConfigFileSettings {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl OsdSettingsSource for ConfigFileSettings {
    fn load_osd_config(&self) -> OsdConfig {
        load_config_file(&self.path).osd
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|path| path.join("roqtune-osd"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

fn set_table_value_preserving_decor(table: &mut Table, key: &str, item: Item) {
    let existing_value_decor = table
        .get(key)
        .and_then(|current| current.as_value().map(|value| value.decor().clone()));
    table[key] = item;
    if let Some(existing_value_decor) = existing_value_decor {
        if let Some(next_value) = table[key].as_value_mut() {
            *next_value.decor_mut() = existing_value_decor;
        }
    }
}

fn set_table_scalar_if_changed<T, F>(
    table: &mut Table,
    key: &str,
    previous_value: T,
    next_value: T,
    to_item: F,
) where
    T: PartialEq + Copy,
    F: FnOnce(T) -> Item,
{
    if table.contains_key(key) && previous_value == next_value {
        return;
    }
    set_table_value_preserving_decor(table, key, to_item(next_value));
}

fn ensure_section_table<'a>(document: &'a mut DocumentMut, key: &str) -> Option<&'a mut Table> {
    let root = document.as_table_mut();
    let should_replace = !matches!(root.get(key), Some(item) if item.is_table());
    if should_replace {
        root.insert(key, Item::Table(Table::new()));
    }
    root.get_mut(key).and_then(Item::as_table_mut)
}

fn write_config_to_document(document: &mut DocumentMut, previous: &Config, config: &Config) {
    let Some(osd) = ensure_section_table(document, OSD_TABLE) else {
        warn!("Config document has no usable [{}] table", OSD_TABLE);
        return;
    };
    set_table_scalar_if_changed(
        osd,
        "Behaviour",
        i64::from(previous.osd.behaviour),
        i64::from(config.osd.behaviour),
        value,
    );
    set_table_scalar_if_changed(
        osd,
        "Timeout",
        i64::from(previous.osd.timeout_ms),
        i64::from(config.osd.timeout_ms),
        value,
    );
    set_table_scalar_if_changed(
        osd,
        "ShowOnVolumeChange",
        previous.osd.show_on_volume_change,
        config.osd.show_on_volume_change,
        value,
    );
    set_table_scalar_if_changed(
        osd,
        "ShowArt",
        previous.osd.show_art,
        config.osd.show_art,
        value,
    );
    set_table_scalar_if_changed(
        osd,
        "ShowOnPlayModeChange",
        previous.osd.show_on_play_mode_change,
        config.osd.show_on_play_mode_change,
        value,
    );
}

pub fn serialize_config_with_preserved_comments(
    existing_text: &str,
    config: &Config,
) -> Result<String, String> {
    let previous = toml::from_str::<Config>(existing_text)
        .map_err(|err| format!("failed to parse existing config as Config: {}", err))?;
    let mut document = existing_text
        .parse::<DocumentMut>()
        .map_err(|err| format!("failed to parse existing config as TOML document: {}", err))?;
    write_config_to_document(&mut document, &previous, config);
    Ok(document.to_string())
}

pub fn persist_config_file(config: &Config, path: &Path) {
    let existing_text = std::fs::read_to_string(path).ok();
    let config_text = if let Some(existing_text) = existing_text {
        match serialize_config_with_preserved_comments(&existing_text, config) {
            Ok(updated_text) => Some(updated_text),
            Err(err) => {
                warn!(
                    "Failed to preserve config comments for {} ({}). Falling back to plain serialization.",
                    path.display(),
                    err
                );
                toml::to_string(config).ok()
            }
        }
    } else {
        toml::to_string(config).ok()
    };

    let Some(config_text) = config_text else {
        log::error!("Failed to serialize config for {}", path.display());
        return;
    };

    if let Some(parent) = path.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            log::error!(
                "Failed to create config directory {}: {}",
                parent.display(),
                err
            );
            return;
        }
    }

    if let Err(err) = std::fs::write(path, config_text) {
        log::error!("Failed to persist config to {}: {}", path.display(), err);
    }
}

/// Reads `config.toml`, falling back to defaults when it is absent or invalid.
pub fn load_config_file(path: &Path) -> Config {
    let config_content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Config::default();
        }
        Err(err) => {
            warn!(
                "Failed to read config file {}. Using defaults. error={}",
                path.display(),
                err
            );
            return Config::default();
        }
    };

    match toml::from_str::<Config>(&config_content) {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "Failed to parse config file {}. Using defaults. error={}",
                path.display(),
                err
            );
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        load_config_file, persist_config_file, serialize_config_with_preserved_comments,
        ConfigFileSettings, OsdSettingsSource,
    };
    use crate::config::{Config, OsdBehaviour, OsdConfig};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_config_path(name: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be valid")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("roqtune_osd_{name}_{nonce}"))
            .join("config.toml")
    }

    #[test]
    fn test_serialize_preserves_comments_and_updates_changed_keys() {
        let existing = "# notification settings\n[OSD]\n# 0 native, 1 tray, 2 pretty, 3 off\nBehaviour = 0\nTimeout = 5000 # ms\n";
        let config = Config {
            osd: OsdConfig {
                behaviour: OsdBehaviour::Pretty,
                ..OsdConfig::default()
            },
        };

        let updated = serialize_config_with_preserved_comments(existing, &config)
            .expect("serialization should succeed");

        assert!(updated.contains("# notification settings"));
        assert!(updated.contains("# 0 native, 1 tray, 2 pretty, 3 off"));
        assert!(updated.contains("Behaviour = 2"));
        assert!(updated.contains("Timeout = 5000 # ms"));
        assert!(updated.contains("ShowArt = true"));
        let reparsed: Config = toml::from_str(&updated).expect("updated config should parse");
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_serialize_adds_missing_osd_table() {
        let updated = serialize_config_with_preserved_comments("", &Config::default())
            .expect("serialization should succeed");
        let reparsed: Config = toml::from_str(&updated).expect("updated config should parse");
        assert_eq!(reparsed, Config::default());
        assert!(updated.contains("[OSD]"));
    }

    #[test]
    fn test_serialize_adds_osd_table_next_to_foreign_sections() {
        let existing = "# player settings\n[player]\nvolume = 40\n";
        let config = Config {
            osd: OsdConfig {
                timeout_ms: 1_200,
                ..OsdConfig::default()
            },
        };

        let updated = serialize_config_with_preserved_comments(existing, &config)
            .expect("serialization should succeed");

        assert!(updated.contains("# player settings"));
        assert!(updated.contains("[player]\nvolume = 40"));
        assert!(updated.contains("[OSD]"));
        assert!(updated.contains("Timeout = 1200"));
        let reparsed: Config = toml::from_str(&updated).expect("updated config should parse");
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_load_keeps_valid_keys_next_to_invalid_ones() {
        let path = unique_temp_config_path("partially_invalid");
        fs::create_dir_all(path.parent().expect("path should have a parent"))
            .expect("temp dir should be creatable");
        fs::write(&path, "[OSD]\nBehaviour = 2\nTimeout = -1\nShowOnVolumeChange = true\n")
            .expect("fixture should be writable");

        let config = load_config_file(&path);

        assert_eq!(config.osd.behaviour, OsdBehaviour::Pretty);
        assert_eq!(config.osd.timeout_ms, 5_000);
        assert!(config.osd.show_on_volume_change);

        fs::remove_file(&path).expect("fixture should be removable");
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = unique_temp_config_path("missing");
        assert_eq!(load_config_file(&path), Config::default());
    }

    #[test]
    fn test_load_invalid_file_returns_defaults() {
        let path = unique_temp_config_path("invalid");
        fs::create_dir_all(path.parent().expect("path should have a parent"))
            .expect("temp dir should be creatable");
        fs::write(&path, "[OSD\nBehaviour = ").expect("fixture should be writable");

        assert_eq!(load_config_file(&path), Config::default());

        fs::remove_file(&path).expect("fixture should be removable");
    }

    #[test]
    fn test_persist_then_reload_through_settings_source() {
        let path = unique_temp_config_path("persist");
        let config = Config {
            osd: OsdConfig {
                behaviour: OsdBehaviour::TrayPopup,
                timeout_ms: 2_500,
                show_on_volume_change: true,
                show_art: false,
                show_on_play_mode_change: false,
            },
        };

        persist_config_file(&config, &path);
        let settings = ConfigFileSettings::new(path.clone());

        assert_eq!(settings.load_osd_config(), config.osd);

        fs::remove_file(&path).expect("fixture should be removable");
    }
}
