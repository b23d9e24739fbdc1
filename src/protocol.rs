//! Event-bus protocol shared by all runtime components.
//!
//! This module defines the message payloads exchanged between the playback
//! event source, the cover-art loader, and the OSD manager.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;

/// Decoded cover image shared between bus subscribers.
pub type CoverImage = Arc<DynamicImage>;

/// Opaque id pairing an async cover-art request with its result.
pub type CoverArtToken = u64;

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Playback(PlaybackMessage),
    CoverArt(CoverArtMessage),
    Config(ConfigMessage),
    /// The event source is done. Subscribers finish outstanding work and exit.
    Shutdown,
}

/// Track metadata carried by song-change notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Song {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Disc number, `0` when unknown.
    pub disc: i32,
    /// Track number, `0` when unknown.
    pub track: i32,
    /// Media file backing this song, if local.
    pub path: Option<PathBuf>,
    /// Explicit cover image chosen by the user or the library.
    pub art_path: Option<PathBuf>,
}

impl Song {
    /// Returns the display title, falling back to the file name.
    pub fn pretty_title(&self) -> String {
        let title = self.title.trim();
        if !title.is_empty() {
            return title.to_string();
        }
        self.path
            .as_deref()
            .and_then(Path::file_stem)
            .and_then(|name| name.to_str())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| "Unknown Title".to_string())
    }
}

/// Shuffle behavior reported by the playlist sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleMode {
    Off,
    All,
    Album,
}

impl ShuffleMode {
    pub fn label(self) -> &'static str {
        match self {
            ShuffleMode::Off => "Don't shuffle",
            ShuffleMode::All => "Shuffle all",
            ShuffleMode::Album => "Shuffle by album",
        }
    }
}

/// Repeat behavior reported by the playlist sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    Off,
    Track,
    Album,
    Playlist,
}

impl RepeatMode {
    pub fn label(self) -> &'static str {
        match self {
            RepeatMode::Off => "Don't repeat",
            RepeatMode::Track => "Repeat track",
            RepeatMode::Album => "Repeat album",
            RepeatMode::Playlist => "Repeat playlist",
        }
    }
}

/// Playback-state notifications emitted by the player.
#[derive(Debug, Clone)]
pub enum PlaybackMessage {
    SongChanged(Song),
    Paused,
    Stopped,
    /// Emitted at the end of the queue; the engine follows it with `Stopped`.
    PlaylistFinished,
    /// Volume in percent.
    VolumeChanged(i32),
    ShuffleModeChanged(ShuffleMode),
    RepeatModeChanged(RepeatMode),
}

/// Cover-art loader results.
#[derive(Debug, Clone)]
pub enum CoverArtMessage {
    /// Published exactly once per token. `image` is `None` when no art was found.
    ArtLoaded {
        token: CoverArtToken,
        image: Option<CoverImage>,
    },
    /// A file on disk now holds the art for `song`.
    CoverArtPathReady { song: Song, path: PathBuf },
}

/// Settings-surface commands.
#[derive(Debug, Clone)]
pub enum ConfigMessage {
    /// Persisted OSD settings changed; re-read them.
    ReloadOsdSettings,
    /// Show a sample notification regardless of the disabled state.
    PreviewOsd,
}
