//! Self-drawn popup rendered as a framed block on a terminal.

use std::io::Write;
use std::time::{Duration, Instant};

use image::GenericImageView;
use log::{debug, warn};

use super::PrettyPopup;
use crate::protocol::CoverImage;

const DEFAULT_POPUP_DURATION_MS: u32 = 5_000;
const MIN_INNER_WIDTH: usize = 24;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PopupContent {
    summary: String,
    message: String,
    image_size: Option<(u32, u32)>,
}

pub struct TerminalPopup<W: Write> {
    out: W,
    content: PopupContent,
    duration: Duration,
    shown_at: Option<Instant>,
    use_color: bool,
}

impl<W: Write> TerminalPopup<W> {
    pub fn new(out: W) -> Self {
        let mut popup = Self {
            out,
            content: PopupContent::default(),
            duration: Duration::from_millis(u64::from(DEFAULT_POPUP_DURATION_MS)),
            shown_at: None,
            use_color: false,
        };
        popup.reload_settings();
        popup
    }

    /// `true` until the popup duration has elapsed since the last `show`.
    pub fn is_visible(&self) -> bool {
        self.shown_at
            .is_some_and(|shown_at| shown_at.elapsed() < self.duration)
    }

    #[cfg(test)]
    pub fn popup_duration(&self) -> Duration {
        self.duration
    }

    fn render(&self) -> String {
        let mut lines = vec![self.content.summary.clone()];
        if !self.content.message.is_empty() {
            lines.push(self.content.message.clone());
        }
        if let Some((width, height)) = self.content.image_size {
            lines.push(format!("[cover {}x{}]", width, height));
        }
        let inner_width = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0)
            .max(MIN_INNER_WIDTH);

        let border = "-".repeat(inner_width + 2);
        let mut rendered = format!("+{border}+\n");
        for (index, line) in lines.iter().enumerate() {
            let padding = " ".repeat(inner_width - line.chars().count());
            if index == 0 && self.use_color {
                rendered.push_str(&format!("| \x1b[1m{line}\x1b[0m{padding} |\n"));
            } else {
                rendered.push_str(&format!("| {line}{padding} |\n"));
            }
        }
        rendered.push_str(&format!("+{border}+\n"));
        rendered
    }
}

impl<W: Write> PrettyPopup for TerminalPopup<W> {
    fn set_message(&mut self, summary: &str, message: &str, image: Option<&CoverImage>) {
        self.content = PopupContent {
            summary: summary.to_string(),
            message: message.to_string(),
            image_size: image.map(|image| image.dimensions()),
        };
    }

    fn show(&mut self) {
        if self.is_visible() {
            debug!("TerminalPopup: replacing the popup still on screen");
        }
        let rendered = self.render();
        if let Err(err) = self
            .out
            .write_all(rendered.as_bytes())
            .and_then(|_| self.out.flush())
        {
            warn!("TerminalPopup: failed to draw popup: {}", err);
            return;
        }
        self.shown_at = Some(Instant::now());
    }

    fn set_popup_duration(&mut self, duration_ms: u32) {
        self.duration = Duration::from_millis(u64::from(duration_ms));
    }

    fn reload_settings(&mut self) {
        self.use_color = std::env::var_os("NO_COLOR").is_none();
    }
}
