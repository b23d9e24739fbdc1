//! Tray icon backend that tracks now-playing state and logs balloon popups.

use std::path::{Path, PathBuf};

use log::info;

use super::TrayIcon;
use crate::protocol::Song;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub song: Song,
    pub image_path: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct LogTrayIcon {
    now_playing: Option<NowPlaying>,
}

impl LogTrayIcon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tooltip text for the current state.
    pub fn tooltip(&self) -> String {
        match &self.now_playing {
            Some(now_playing) if !now_playing.song.artist.is_empty() => format!(
                "{} - {}",
                now_playing.song.artist,
                now_playing.song.pretty_title()
            ),
            Some(now_playing) => now_playing.song.pretty_title(),
            None => String::new(),
        }
    }
}

impl TrayIcon for LogTrayIcon {
    fn set_now_playing(&mut self, song: &Song, image_path: Option<&Path>) {
        self.now_playing = Some(NowPlaying {
            song: song.clone(),
            image_path: image_path.map(Path::to_path_buf),
        });
        info!("Tray: now playing '{}'", self.tooltip());
    }

    fn clear_now_playing(&mut self) {
        self.now_playing = None;
    }

    fn show_popup(&mut self, summary: &str, message: &str, timeout_ms: u32) -> Result<(), String> {
        info!("Tray popup ({} ms): {} | {}", timeout_ms, summary, message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LogTrayIcon;
    use crate::backends::TrayIcon;
    use crate::protocol::Song;
    use std::path::Path;

    #[test]
    fn test_tooltip_follows_now_playing() {
        let mut tray = LogTrayIcon::new();
        let song = Song {
            title: "Starlight".to_string(),
            artist: "Muse".to_string(),
            ..Song::default()
        };

        tray.set_now_playing(&song, Some(Path::new("/tmp/cover.png")));
        assert_eq!(tray.tooltip(), "Muse - Starlight");

        tray.clear_now_playing();
        assert_eq!(tray.tooltip(), "");
    }
}
