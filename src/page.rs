//! The host page as seen by a session.

use crate::protocol::Command;

use std::sync::LazyLock;

use regex::Regex;

static VIDEO_ID: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[?&]v=([^&#]*)").ok());

/// A caption text element placed over the video.
pub trait CaptionLine {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()>;
    fn clear(&mut self) -> anyhow::Result<()>;
}

pub trait Page {
    fn url(&self) -> String;

    fn video_title(&self) -> String;

    /// Playback position of the page's video in seconds, or `None` when the
    /// page has no video element.
    fn video_time(&self) -> Option<f64>;

    /// Appends a caption line to the video player container.
    fn attach_caption_line(&mut self) -> anyhow::Result<Box<dyn CaptionLine>>;

    /// Expands or collapses the control surface.
    fn show_surface(&mut self, shown: bool);
}

/// Visibility of the control surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiState {
    pub shown: bool,
    pub ready: bool,
}

impl UiState {
    /// What the launcher button sends when clicked: hide an open surface,
    /// show a closed one.
    pub fn toggle_command(&self) -> Command {
        if self.shown {
            Command::UiHide
        } else {
            Command::UiShow
        }
    }
}

pub fn has_video(page: &dyn Page) -> bool {
    page.video_time().is_some()
}

/// Seconds to whole milliseconds, rounding down. Negative and NaN positions
/// read as zero.
pub fn playback_ms(seconds: f64) -> u64 {
    (seconds * 1000.0) as u64
}

/// The `v` query parameter of a watch page URL.
pub fn video_id(url: &str) -> Option<String> {
    VIDEO_ID
        .as_ref()?
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launcher_toggles_the_surface() {
        let mut ui = UiState::default();
        assert_eq!(ui.toggle_command(), Command::UiShow);
        ui.shown = true;
        assert_eq!(ui.toggle_command(), Command::UiHide);
    }

    #[test]
    fn finds_video_id_in_query() {
        let cases = [
            ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", Some("dQw4w9WgXcQ")),
            ("https://www.youtube.com/watch?list=x&v=abc&t=10", Some("abc")),
            ("https://www.youtube.com/watch?v=abc#t=10", Some("abc")),
            ("https://www.youtube.com/watch?dev=abc", None),
            ("https://www.youtube.com/watch?v=", None),
            ("https://example.com/", None),
        ];
        for (url, expected) in cases {
            assert_eq!(video_id(url).as_deref(), expected, "{}", url);
        }
    }

    #[test]
    fn playback_position_rounds_down() {
        assert_eq!(playback_ms(0.0), 0);
        assert_eq!(playback_ms(0.9997), 999);
        assert_eq!(playback_ms(1.2), 1200);
        assert_eq!(playback_ms(-3.0), 0);
        assert_eq!(playback_ms(f64::NAN), 0);
    }
}
