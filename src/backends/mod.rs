//! Notification presentation backends.
//!
//! The OSD manager routes every notification to exactly one of these,
//! chosen by `OsdBehaviour`.

pub mod native;
pub mod pretty_popup;
pub mod tray;

use std::path::Path;

use crate::protocol::{CoverImage, Song};

/// Desktop notification service (freedesktop daemon, notification center).
pub trait NativeNotifier {
    /// Shows a notification. `icon` is a theme icon name and may be empty.
    fn show(
        &mut self,
        summary: &str,
        message: &str,
        icon: &str,
        image: Option<&CoverImage>,
        timeout_ms: u32,
    ) -> Result<(), String>;
}

/// System tray icon.
pub trait TrayIcon {
    fn set_now_playing(&mut self, song: &Song, image_path: Option<&Path>);
    fn clear_now_playing(&mut self);
    fn show_popup(&mut self, summary: &str, message: &str, timeout_ms: u32) -> Result<(), String>;
}

/// Application-drawn popup window.
pub trait PrettyPopup {
    fn set_message(&mut self, summary: &str, message: &str, image: Option<&CoverImage>);
    fn show(&mut self);
    fn set_popup_duration(&mut self, duration_ms: u32);
    /// Re-reads appearance settings.
    fn reload_settings(&mut self);
}
