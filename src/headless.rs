//! A page without a browser: the video is a clock and everything the overlay
//! does to the DOM is reported as a [`PageEvent`].

use crate::page::{CaptionLine, Page};

use std::cell::Cell;
use std::rc::Rc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PageEvent {
    CaptionAttached { line: usize },
    CaptionText { line: usize, text: String },
    CaptionCleared { line: usize },
    Surface { shown: bool },
}

/// Where the simulated video's position comes from.
#[derive(Debug, Clone)]
pub enum Playback {
    /// Plays from `start_seconds` at `rate`, following the tokio clock.
    Clock {
        origin: Instant,
        start_seconds: f64,
        rate: f64,
    },
    /// Position set by hand through the shared cell.
    Manual(Rc<Cell<f64>>),
}

impl Playback {
    pub fn playing_from(start_seconds: f64, rate: f64) -> Self {
        Playback::Clock {
            origin: Instant::now(),
            start_seconds,
            rate,
        }
    }

    fn seconds(&self) -> f64 {
        match self {
            Playback::Clock {
                origin,
                start_seconds,
                rate,
            } => start_seconds + origin.elapsed().as_secs_f64() * rate,
            Playback::Manual(position) => position.get(),
        }
    }
}

pub struct HeadlessPage {
    url: String,
    title: String,
    video: Option<Playback>,
    lines: usize,
    events: mpsc::UnboundedSender<PageEvent>,
}

impl HeadlessPage {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        video: Option<Playback>,
    ) -> (Self, mpsc::UnboundedReceiver<PageEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let page = Self {
            url: url.into(),
            title: title.into(),
            video,
            lines: 0,
            events,
        };
        (page, rx)
    }

    /// In-page navigation: the address changes, the video element stays.
    pub fn navigate(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    fn emit(&self, event: PageEvent) {
        // Nobody watching is fine for a page.
        let _ = self.events.send(event);
    }
}

impl Page for HeadlessPage {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn video_title(&self) -> String {
        self.title.clone()
    }

    fn video_time(&self) -> Option<f64> {
        self.video.as_ref().map(Playback::seconds)
    }

    fn attach_caption_line(&mut self) -> anyhow::Result<Box<dyn CaptionLine>> {
        let line = self.lines;
        self.lines += 1;
        self.emit(PageEvent::CaptionAttached { line });
        Ok(Box::new(HeadlessLine {
            line,
            events: self.events.clone(),
        }))
    }

    fn show_surface(&mut self, shown: bool) {
        self.emit(PageEvent::Surface { shown });
    }
}

struct HeadlessLine {
    line: usize,
    events: mpsc::UnboundedSender<PageEvent>,
}

impl CaptionLine for HeadlessLine {
    fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.events.send(PageEvent::CaptionText {
            line: self.line,
            text: text.to_string(),
        })?;
        Ok(())
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        self.events
            .send(PageEvent::CaptionCleared { line: self.line })?;
        Ok(())
    }
}
