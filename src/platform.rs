//! Host notification capabilities, resolved once at startup.

/// Which presentation backends the host can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Desktop notification daemon / notification center is reachable.
    pub native_notifications: bool,
    /// Tray icon balloons are available.
    pub tray_popups: bool,
}

impl PlatformCapabilities {
    pub fn detect() -> Self {
        Self {
            native_notifications: cfg!(any(
                target_os = "linux",
                target_os = "freebsd",
                target_os = "openbsd",
                target_os = "netbsd",
                target_os = "dragonfly",
                target_os = "macos",
                target_os = "windows"
            )),
            // The macOS status bar has no balloon messages.
            tray_popups: !cfg!(target_os = "macos"),
        }
    }
}
