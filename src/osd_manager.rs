//! On-screen-display notifications for playback events.
//!
//! The manager turns bus events into notifications, routes each one to the
//! backend selected by `OsdBehaviour`, and holds song notifications back
//! until their cover art arrives from the loader.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info, warn};
use tokio::sync::broadcast::Receiver;

use crate::backends::{NativeNotifier, PrettyPopup, TrayIcon};
use crate::config::{OsdBehaviour, OsdConfig};
use crate::config_persistence::OsdSettingsSource;
use crate::cover_art::CoverArtProvider;
use crate::platform::PlatformCapabilities;
use crate::protocol::{
    ConfigMessage, CoverArtMessage, CoverArtToken, CoverImage, Message, PlaybackMessage,
    RepeatMode, ShuffleMode, Song,
};

pub const APP_NAME: &str = "roqtune-osd";
const SONG_CHANGED_ICON: &str = "notification-audio-play";
const PREVIEW_MESSAGE: &str = "This is a preview of the notification style";

/// Song notification waiting for its cover image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingNotification {
    pub summary: String,
    pub message: String,
    /// Theme icon name, may be empty.
    pub icon: String,
}

impl PendingNotification {
    /// Builds the "Artist - Title" / "Album, disc N, track N" notification.
    pub fn for_song(song: &Song) -> Self {
        let title = song.pretty_title();
        let summary = if song.artist.is_empty() {
            title
        } else {
            format!("{} - {}", song.artist, title)
        };

        let mut message_parts = Vec::new();
        if !song.album.is_empty() {
            message_parts.push(song.album.clone());
        }
        if song.disc > 0 {
            message_parts.push(format!("disc {}", song.disc));
        }
        if song.track > 0 {
            message_parts.push(format!("track {}", song.track));
        }

        Self {
            summary,
            message: message_parts.join(", "),
            icon: SONG_CHANGED_ICON.to_string(),
        }
    }
}

/// The presentation backends a manager can route to.
pub struct OsdBackends {
    pub native: Box<dyn NativeNotifier>,
    pub tray: Box<dyn TrayIcon>,
    pub pretty_popup: Box<dyn PrettyPopup>,
}

pub struct OsdManager {
    app_name: String,
    capabilities: PlatformCapabilities,
    settings: Box<dyn OsdSettingsSource>,
    config: OsdConfig,
    art_provider: Box<dyn CoverArtProvider>,
    backends: OsdBackends,
    waiting_for_art: HashMap<CoverArtToken, PendingNotification>,
    force_show_next: bool,
    ignore_next_stopped: bool,
    shutdown_requested: bool,
}

impl OsdManager {
    /// Creates a manager and loads the persisted settings.
    pub fn new(
        app_name: &str,
        capabilities: PlatformCapabilities,
        settings: Box<dyn OsdSettingsSource>,
        art_provider: Box<dyn CoverArtProvider>,
        backends: OsdBackends,
    ) -> Self {
        let mut manager = Self {
            app_name: app_name.to_string(),
            capabilities,
            settings,
            config: OsdConfig::default(),
            art_provider,
            backends,
            waiting_for_art: HashMap::new(),
            force_show_next: false,
            ignore_next_stopped: false,
            shutdown_requested: false,
        };
        manager.reload_config();
        manager
    }

    #[cfg(test)]
    pub fn config(&self) -> &OsdConfig {
        &self.config
    }

    /// Re-reads persisted settings and pushes the timeout to the popup.
    pub fn reload_config(&mut self) {
        let loaded = self.settings.load_osd_config();
        let requested_behaviour = loaded.behaviour;
        self.config = loaded.normalized(self.capabilities);
        if self.config.behaviour != requested_behaviour {
            info!(
                "OsdManager: {:?} notifications are unavailable here, using {:?}",
                requested_behaviour, self.config.behaviour
            );
        }

        self.backends
            .pretty_popup
            .set_popup_duration(self.config.timeout_ms);
        self.backends.pretty_popup.reload_settings();
        debug!("OsdManager: settings loaded {:?}", self.config);
    }

    /// Shows the next message even if notifications are disabled.
    pub fn force_show_next(&mut self) {
        self.force_show_next = true;
    }

    /// Shows a sample message in the pretty popup style.
    pub fn show_preview(&mut self) {
        self.force_show_next();
        let summary = self.app_name.clone();
        self.dispatch(&summary, PREVIEW_MESSAGE, "", None);
    }

    pub fn on_song_changed(&mut self, song: &Song) {
        // Art for the tray arrives separately via `on_cover_art_path_ready`.
        self.backends.tray.set_now_playing(song, None);

        let pending = PendingNotification::for_song(song);
        if self.config.show_art {
            let token = self.art_provider.request_async(song);
            self.waiting_for_art.insert(token, pending);
        } else {
            self.dispatch(&pending.summary, &pending.message, &pending.icon, None);
        }
    }

    pub fn on_art_loaded(&mut self, token: CoverArtToken, image: Option<CoverImage>) {
        let Some(pending) = self.waiting_for_art.remove(&token) else {
            debug!("OsdManager: ignoring art for unknown token {}", token);
            return;
        };
        self.dispatch(
            &pending.summary,
            &pending.message,
            &pending.icon,
            image.as_ref(),
        );
    }

    pub fn on_cover_art_path_ready(&mut self, song: &Song, path: &Path) {
        self.backends.tray.set_now_playing(song, Some(path));
    }

    pub fn on_paused(&mut self) {
        self.show_status("Paused");
    }

    pub fn on_stopped(&mut self) {
        self.backends.tray.clear_now_playing();
        if self.ignore_next_stopped {
            self.ignore_next_stopped = false;
            return;
        }
        self.show_status("Stopped");
    }

    pub fn on_playlist_finished(&mut self) {
        // The player follows PlaylistFinished with a Stopped.
        self.ignore_next_stopped = true;
        self.show_status("Playlist finished");
    }

    pub fn on_volume_changed(&mut self, value: i32) {
        if !self.config.show_on_volume_change {
            return;
        }
        self.show_status(&format!("Volume {}%", value));
    }

    pub fn on_shuffle_mode_changed(&mut self, mode: ShuffleMode) {
        if self.config.show_on_play_mode_change {
            self.show_status(mode.label());
        }
    }

    pub fn on_repeat_mode_changed(&mut self, mode: RepeatMode) {
        if self.config.show_on_play_mode_change {
            self.show_status(mode.label());
        }
    }

    fn show_status(&mut self, message: &str) {
        let summary = self.app_name.clone();
        self.dispatch(&summary, message, "", None);
    }

    /// Routes one notification to the active backend.
    pub fn dispatch(
        &mut self,
        summary: &str,
        message: &str,
        icon: &str,
        image: Option<&CoverImage>,
    ) {
        match self.config.behaviour {
            OsdBehaviour::Native => {
                let result = match image {
                    None => self.backends.native.show(
                        summary,
                        message,
                        icon,
                        None,
                        self.config.timeout_ms,
                    ),
                    Some(image) => self.backends.native.show(
                        summary,
                        message,
                        "",
                        Some(image),
                        self.config.timeout_ms,
                    ),
                };
                if let Err(err) = result {
                    warn!("OsdManager: native notification failed: {}", err);
                }
            }
            OsdBehaviour::TrayPopup => {
                if let Err(err) =
                    self.backends
                        .tray
                        .show_popup(summary, message, self.config.timeout_ms)
                {
                    warn!("OsdManager: tray popup failed: {}", err);
                }
            }
            OsdBehaviour::Disabled => {
                if !self.force_show_next {
                    return;
                }
                self.force_show_next = false;
                self.show_pretty(summary, message, image);
            }
            OsdBehaviour::Pretty => self.show_pretty(summary, message, image),
        }
    }

    fn show_pretty(&mut self, summary: &str, message: &str, image: Option<&CoverImage>) {
        self.backends
            .pretty_popup
            .set_message(summary, message, image);
        self.backends.pretty_popup.show();
    }

    fn handle_message(&mut self, message: Message) {
        match message {
            Message::Playback(PlaybackMessage::SongChanged(song)) => self.on_song_changed(&song),
            Message::Playback(PlaybackMessage::Paused) => self.on_paused(),
            Message::Playback(PlaybackMessage::Stopped) => self.on_stopped(),
            Message::Playback(PlaybackMessage::PlaylistFinished) => self.on_playlist_finished(),
            Message::Playback(PlaybackMessage::VolumeChanged(value)) => {
                self.on_volume_changed(value)
            }
            Message::Playback(PlaybackMessage::ShuffleModeChanged(mode)) => {
                self.on_shuffle_mode_changed(mode)
            }
            Message::Playback(PlaybackMessage::RepeatModeChanged(mode)) => {
                self.on_repeat_mode_changed(mode)
            }
            Message::CoverArt(CoverArtMessage::ArtLoaded { token, image }) => {
                self.on_art_loaded(token, image)
            }
            Message::CoverArt(CoverArtMessage::CoverArtPathReady { song, path }) => {
                self.on_cover_art_path_ready(&song, &path)
            }
            Message::Config(ConfigMessage::ReloadOsdSettings) => self.reload_config(),
            Message::Config(ConfigMessage::PreviewOsd) => self.show_preview(),
            Message::Shutdown => {
                debug!(
                    "OsdManager: shutdown requested, {} notification(s) waiting for art",
                    self.waiting_for_art.len()
                );
                self.shutdown_requested = true;
            }
        }
    }

    fn is_finished(&self) -> bool {
        self.shutdown_requested && self.waiting_for_art.is_empty()
    }

    /// Starts the blocking manager loop.
    ///
    /// Returns when the bus closes, or after `Message::Shutdown` once every
    /// song notification still waiting for art has been shown.
    pub fn run(&mut self, mut bus_consumer: Receiver<Message>) {
        info!("OsdManager: started");
        while !self.is_finished() {
            match bus_consumer.blocking_recv() {
                Ok(message) => self.handle_message(message),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("OsdManager: bus lagged by {} messages", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
        info!(
            "OsdManager: stopped with {} notification(s) still waiting for art",
            self.waiting_for_art.len()
        );
    }
}
