//! Persistent OSD configuration model and defaults.

use log::warn;

use crate::platform::PlatformCapabilities;

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(rename = "OSD", default)]
    /// Notification preferences.
    pub osd: OsdConfig,
}

/// Which presentation backend shows notifications.
///
/// Persisted as an integer so existing settings files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(from = "i64", into = "i64")]
pub enum OsdBehaviour {
    #[default]
    Native,
    TrayPopup,
    Pretty,
    Disabled,
}

impl From<i64> for OsdBehaviour {
    fn from(value: i64) -> Self {
        match value {
            0 => OsdBehaviour::Native,
            1 => OsdBehaviour::TrayPopup,
            2 => OsdBehaviour::Pretty,
            3 => OsdBehaviour::Disabled,
            other => {
                warn!(
                    "Unknown OSD behaviour value {} in settings. Using native notifications.",
                    other
                );
                OsdBehaviour::Native
            }
        }
    }
}

impl From<OsdBehaviour> for i64 {
    fn from(value: OsdBehaviour) -> Self {
        match value {
            OsdBehaviour::Native => 0,
            OsdBehaviour::TrayPopup => 1,
            OsdBehaviour::Pretty => 2,
            OsdBehaviour::Disabled => 3,
        }
    }
}

/// Notification preferences persisted under the `[OSD]` table.
///
/// Each key is read on its own: a malformed value falls back to that key's
/// default without discarding its neighbours.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "PascalCase", from = "RawOsdConfig")]
pub struct OsdConfig {
    pub behaviour: OsdBehaviour,
    #[serde(rename = "Timeout")]
    pub timeout_ms: u32,
    pub show_on_volume_change: bool,
    pub show_art: bool,
    pub show_on_play_mode_change: bool,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawOsdConfig {
    behaviour: Option<toml::Value>,
    timeout: Option<toml::Value>,
    show_on_volume_change: Option<toml::Value>,
    show_art: Option<toml::Value>,
    show_on_play_mode_change: Option<toml::Value>,
}

fn setting_or_default<T>(key: &str, raw: Option<toml::Value>, default: T) -> T
where
    T: serde::de::DeserializeOwned,
{
    let Some(raw) = raw else {
        return default;
    };
    let parsed: Result<T, _> = raw.clone().try_into();
    match parsed {
        Ok(value) => value,
        Err(err) => {
            warn!(
                "Invalid OSD setting {} = {}. Using the default. error={}",
                key, raw, err
            );
            default
        }
    }
}

impl From<RawOsdConfig> for OsdConfig {
    fn from(raw: RawOsdConfig) -> Self {
        let defaults = OsdConfig::default();
        Self {
            behaviour: setting_or_default("Behaviour", raw.behaviour, defaults.behaviour),
            timeout_ms: setting_or_default("Timeout", raw.timeout, defaults.timeout_ms),
            show_on_volume_change: setting_or_default(
                "ShowOnVolumeChange",
                raw.show_on_volume_change,
                defaults.show_on_volume_change,
            ),
            show_art: setting_or_default("ShowArt", raw.show_art, defaults.show_art),
            show_on_play_mode_change: setting_or_default(
                "ShowOnPlayModeChange",
                raw.show_on_play_mode_change,
                defaults.show_on_play_mode_change,
            ),
        }
    }
}

impl Default for OsdConfig {
    fn default() -> Self {
        Self {
            behaviour: OsdBehaviour::Native,
            timeout_ms: default_timeout_ms(),
            show_on_volume_change: false,
            show_art: default_true(),
            show_on_play_mode_change: default_true(),
        }
    }
}

impl OsdConfig {
    /// Demotes backends the platform cannot provide.
    pub fn normalized(mut self, capabilities: PlatformCapabilities) -> Self {
        if !capabilities.native_notifications && self.behaviour == OsdBehaviour::Native {
            self.behaviour = OsdBehaviour::Pretty;
        }
        if !capabilities.tray_popups && self.behaviour == OsdBehaviour::TrayPopup {
            self.behaviour = OsdBehaviour::Disabled;
        }
        self
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u32 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::{Config, OsdBehaviour, OsdConfig};
    use crate::platform::PlatformCapabilities;

    const ALL_BEHAVIOURS: [OsdBehaviour; 4] = [
        OsdBehaviour::Native,
        OsdBehaviour::TrayPopup,
        OsdBehaviour::Pretty,
        OsdBehaviour::Disabled,
    ];

    fn capabilities(native_notifications: bool, tray_popups: bool) -> PlatformCapabilities {
        PlatformCapabilities {
            native_notifications,
            tray_popups,
        }
    }

    fn with_behaviour(behaviour: OsdBehaviour) -> OsdConfig {
        OsdConfig {
            behaviour,
            ..OsdConfig::default()
        }
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: Config = toml::from_str("").expect("empty config should parse");
        assert_eq!(config.osd, OsdConfig::default());
        assert_eq!(config.osd.behaviour, OsdBehaviour::Native);
        assert_eq!(config.osd.timeout_ms, 5_000);
        assert!(config.osd.show_art);
        assert!(config.osd.show_on_play_mode_change);
        assert!(!config.osd.show_on_volume_change);
    }

    #[test]
    fn test_reads_pascal_case_keys() {
        let config: Config = toml::from_str(
            "[OSD]\nBehaviour = 2\nTimeout = 1500\nShowOnVolumeChange = true\nShowArt = false\n",
        )
        .expect("config should parse");
        assert_eq!(config.osd.behaviour, OsdBehaviour::Pretty);
        assert_eq!(config.osd.timeout_ms, 1_500);
        assert!(config.osd.show_on_volume_change);
        assert!(!config.osd.show_art);
        assert!(config.osd.show_on_play_mode_change);
    }

    #[test]
    fn test_unknown_behaviour_falls_back_to_native() {
        let config: Config =
            toml::from_str("[OSD]\nBehaviour = 9\n").expect("config should parse");
        assert_eq!(config.osd.behaviour, OsdBehaviour::Native);
    }

    #[test]
    fn test_invalid_values_fall_back_one_key_at_a_time() {
        let config: Config = toml::from_str(
            "[OSD]\nBehaviour = 3\nTimeout = -1\nShowArt = 1\nShowOnVolumeChange = true\nShowOnPlayModeChange = \"no\"\n",
        )
        .expect("config with bad values should still parse");
        assert_eq!(config.osd.behaviour, OsdBehaviour::Disabled);
        assert_eq!(config.osd.timeout_ms, 5_000);
        assert!(config.osd.show_art);
        assert!(config.osd.show_on_volume_change);
        assert!(config.osd.show_on_play_mode_change);
    }

    #[test]
    fn test_behaviour_serializes_as_integer() {
        let text = toml::to_string(&Config {
            osd: with_behaviour(OsdBehaviour::Disabled),
        })
        .expect("config should serialize");
        assert!(text.contains("Behaviour = 3"), "unexpected output: {text}");
    }

    #[test]
    fn test_never_resolves_to_native_without_native_support() {
        for tray_popups in [true, false] {
            for behaviour in ALL_BEHAVIOURS {
                let normalized =
                    with_behaviour(behaviour).normalized(capabilities(false, tray_popups));
                assert_ne!(normalized.behaviour, OsdBehaviour::Native);
            }
        }
        assert_eq!(
            with_behaviour(OsdBehaviour::Native)
                .normalized(capabilities(false, true))
                .behaviour,
            OsdBehaviour::Pretty
        );
    }

    #[test]
    fn test_never_resolves_to_tray_popup_without_tray_support() {
        for native_notifications in [true, false] {
            for behaviour in ALL_BEHAVIOURS {
                let normalized =
                    with_behaviour(behaviour).normalized(capabilities(native_notifications, false));
                assert_ne!(normalized.behaviour, OsdBehaviour::TrayPopup);
            }
        }
        assert_eq!(
            with_behaviour(OsdBehaviour::TrayPopup)
                .normalized(capabilities(true, false))
                .behaviour,
            OsdBehaviour::Disabled
        );
    }

    #[test]
    fn test_supported_behaviour_is_kept() {
        for behaviour in ALL_BEHAVIOURS {
            assert_eq!(
                with_behaviour(behaviour)
                    .normalized(capabilities(true, true))
                    .behaviour,
                behaviour
            );
        }
    }
}
