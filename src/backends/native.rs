//! Native desktop notifications via `notify-rust`.

use std::path::PathBuf;

use log::debug;
use notify_rust::{Notification, Timeout};

use super::NativeNotifier;
use crate::image_pipeline::{notification_images_dir, write_notification_image};
use crate::protocol::CoverImage;

pub struct DesktopNotifier {
    app_name: String,
    image_dir: Option<PathBuf>,
    image_slot: u8,
    /// Id of the last notification, so a new song replaces the old bubble.
    #[cfg(all(unix, not(target_os = "macos")))]
    last_notification_id: Option<u32>,
}

impl DesktopNotifier {
    pub fn new(app_name: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            image_dir: notification_images_dir(),
            image_slot: 0,
            #[cfg(all(unix, not(target_os = "macos")))]
            last_notification_id: None,
        }
    }

    fn image_icon_path(&mut self, image: &CoverImage) -> Option<String> {
        let dir = self.image_dir.as_ref()?;
        // Alternate files so the daemon never reads a half-replaced image.
        self.image_slot ^= 1;
        let path = write_notification_image(dir, &format!("slot-{}", self.image_slot), image)?;
        Some(path.to_string_lossy().into_owned())
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    fn deliver(&mut self, notification: &mut Notification) -> Result<(), String> {
        if let Some(id) = self.last_notification_id {
            notification.id(id);
        }
        let handle = notification.show().map_err(|err| err.to_string())?;
        self.last_notification_id = Some(handle.id());
        Ok(())
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    fn deliver(&mut self, notification: &mut Notification) -> Result<(), String> {
        notification
            .show()
            .map(|_| ())
            .map_err(|err| err.to_string())
    }
}

impl NativeNotifier for DesktopNotifier {
    fn show(
        &mut self,
        summary: &str,
        message: &str,
        icon: &str,
        image: Option<&CoverImage>,
        timeout_ms: u32,
    ) -> Result<(), String> {
        let mut notification = Notification::new();
        notification
            .appname(&self.app_name)
            .summary(summary)
            .body(message)
            .timeout(Timeout::Milliseconds(timeout_ms));

        let image_icon = image.and_then(|image| self.image_icon_path(image));
        match image_icon {
            Some(path) => {
                notification.icon(&path);
            }
            None if !icon.is_empty() => {
                notification.icon(icon);
            }
            None => {
                if image.is_some() {
                    debug!("DesktopNotifier: cover image could not be cached, showing without it");
                }
            }
        }

        self.deliver(&mut notification)
    }
}
