//! One activation of the overlay on one page.

use crate::config::SessionConfig;
use crate::cue::CaptionSet;
use crate::error::{CaptionError, Result};
use crate::messenger::{InboundEvent, Messenger};
use crate::page::{has_video, playback_ms, video_id, Page, UiState};
use crate::protocol::{BackgroundReply, Command, EditorSync, Outbound, VideoInfo, NO_VIDEO_MESSAGE};
use crate::scheduler::{Scheduler, TaskHandle, TickInfo, TickSummary};
use crate::store::{CaptionStore, LoadFuture};

use std::future::{poll_fn, Future};
use std::pin::Pin;
use std::task::Poll;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// A caption fetch started by `UI_READY` that has not resolved yet.
struct PendingFetch {
    video_id: String,
    title: String,
    future: LoadFuture,
}

/// Per-session context: everything the message handlers and the tick touch.
///
/// # Panics
///
/// The first `LOAD_CAPTION` or `OPEN_EDITOR` that registers a task starts the
/// tick timer, which panics outside a tokio runtime with the time driver
/// enabled. Everything else can be driven without a runtime.
pub struct Session<P: Page> {
    config: SessionConfig,
    page: P,
    store: CaptionStore,
    scheduler: Scheduler,
    messenger: Messenger,
    ui: UiState,
    fetch: Option<PendingFetch>,
    background_replies: Vec<oneshot::Receiver<BackgroundReply>>,
    caption_task: Option<TaskHandle>,
    editor_task: Option<TaskHandle>,
}

impl<P: Page> Session<P> {
    pub fn new(config: SessionConfig, page: P, store: CaptionStore, messenger: Messenger) -> Self {
        let scheduler = Scheduler::new(config.tick_period());
        Self {
            config,
            page,
            store,
            scheduler,
            messenger,
            ui: UiState::default(),
            fetch: None,
            background_replies: Vec::new(),
            caption_task: None,
            editor_task: None,
        }
    }

    pub fn ui(&self) -> UiState {
        self.ui
    }

    pub fn store(&self) -> &CaptionStore {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn fetch_in_flight(&self) -> bool {
        self.fetch.is_some()
    }

    /// Background requests still waiting for their reply.
    pub fn awaiting_background(&self) -> usize {
        self.background_replies.len()
    }

    /// Serves the session until `inbound` closes.
    ///
    /// Inbound messages, caption fetch completion, background replies and
    /// scheduler ticks are handled one at a time, in that order of
    /// preference. A caption fetch still pending when `inbound` closes is
    /// awaited so the control surface gets its answer.
    pub async fn run(&mut self, inbound: &mut mpsc::UnboundedReceiver<InboundEvent>) {
        info!("session started");
        loop {
            tokio::select! {
                biased;
                event = inbound.recv() => match event {
                    Some(event) => self.handle(event),
                    None => {
                        self.settle().await;
                        break;
                    }
                },
                result = poll_fetch(&mut self.fetch) => self.finish_fetch(result),
                reply = next_reply(&mut self.background_replies) => match reply {
                    Ok(reply) => info!(success = reply.success, "background answered OPEN_EDITOR"),
                    Err(_) => warn!("background dropped OPEN_EDITOR without answering"),
                },
                _ = self.scheduler.next_tick() => {
                    self.tick();
                }
            }
        }
        info!("inbound channel closed, session ended");
    }

    pub fn handle(&mut self, event: InboundEvent) {
        if let Some(command) = self.messenger.accept(&event) {
            self.dispatch(command);
        }
    }

    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::UiShow => self.set_shown(true),
            Command::UiHide => self.set_shown(false),
            Command::UiReady => self.ui_ready(),
            Command::LoadCaption => self.load_caption(),
            Command::OpenEditor => self.open_editor(),
        }
    }

    /// Samples the video and runs every task once. `None` when the page has
    /// no video to sample.
    pub fn tick(&mut self) -> Option<TickSummary> {
        let Some(seconds) = self.page.video_time() else {
            debug!("no video element, skipping tick");
            return None;
        };
        Some(self.scheduler.tick(playback_ms(seconds), self.store.cues()))
    }

    /// Waits for the pending caption fetch, if any, and applies its result.
    pub async fn settle(&mut self) {
        if self.fetch.is_some() {
            let result = poll_fetch(&mut self.fetch).await;
            self.finish_fetch(result);
        }
    }

    fn set_shown(&mut self, shown: bool) {
        self.ui.shown = shown;
        self.page.show_surface(shown);
    }

    fn ui_ready(&mut self) {
        if !has_video(&self.page) {
            self.messenger.post_surface(&Outbound::failure(NO_VIDEO_MESSAGE));
        } else {
            let url = self.page.url();
            match video_id(&url) {
                Some(id) => self.start_fetch(id),
                None => {
                    let err = CaptionError::MissingVideoId(url);
                    warn!("{}", err);
                    self.messenger.post_surface(&Outbound::failure(err.to_string()));
                }
            }
        }

        if !self.ui.ready && !self.ui.shown {
            self.set_shown(true);
        }
        self.ui.ready = true;
    }

    fn start_fetch(&mut self, video_id: String) {
        if let Some(pending) = &self.fetch {
            if pending.video_id == video_id {
                debug!(%video_id, "caption fetch already in flight");
                return;
            }
            info!(
                previous = %pending.video_id,
                %video_id,
                "video changed, abandoning caption fetch"
            );
        }
        let future = self.store.load(video_id.clone());
        self.fetch = Some(PendingFetch {
            title: self.page.video_title(),
            video_id,
            future,
        });
    }

    fn finish_fetch(&mut self, result: Result<CaptionSet>) {
        let Some(pending) = self.fetch.take() else {
            return;
        };
        match result {
            Ok(set) => {
                let info = VideoInfo {
                    id: pending.video_id,
                    title: pending.title,
                    caption_length: set.len(),
                };
                self.store.replace(set);
                self.scheduler.reset_active();
                let reply = match serde_json::to_string(&info) {
                    Ok(message) => Outbound::UiInit {
                        success: true,
                        message,
                    },
                    Err(err) => Outbound::failure(format!("Failed to describe video: {}", err)),
                };
                self.messenger.post_surface(&reply);
            }
            Err(err) => {
                error!(video_id = %pending.video_id, "caption fetch failed: {}", err);
                self.messenger
                    .post_surface(&Outbound::failure(format!("Failed to load captions: {}", err)));
            }
        }
    }

    fn load_caption(&mut self) {
        if self.caption_task.is_some() {
            debug!("caption line already attached");
            return;
        }
        if !has_video(&self.page) {
            warn!("LOAD_CAPTION on a page without video");
            return;
        }
        let mut line = match self.page.attach_caption_line() {
            Ok(line) => line,
            Err(err) => {
                warn!("could not attach caption line: {:#}", err);
                return;
            }
        };

        let clear_on_gap = self.config.clear_on_gap;
        let handle = self.scheduler.register(move |info: &TickInfo<'_>| {
            if !info.cue_changed {
                return Ok(());
            }
            match info.current_cue {
                Some(cue) => line.set_text(&cue.text),
                None if clear_on_gap => line.clear(),
                None => Ok(()),
            }
        });
        self.caption_task = Some(handle);
    }

    fn open_editor(&mut self) {
        match self.messenger.request_background(Outbound::OpenEditor) {
            Some(reply) => self.background_replies.push(reply),
            None => warn!("background is not listening, OPEN_EDITOR dropped"),
        }

        if self.editor_task.is_some() {
            return;
        }
        if !has_video(&self.page) {
            warn!("OPEN_EDITOR on a page without video, not syncing the editor");
            return;
        }
        let editor = self.messenger.editor_port();
        let handle = self.scheduler.register(move |info: &TickInfo<'_>| {
            if info.cue_changed {
                editor.post(&Outbound::SyncEditor {
                    message: EditorSync { time: info.time },
                })?;
            }
            Ok(())
        });
        self.editor_task = Some(handle);
    }
}

async fn poll_fetch(fetch: &mut Option<PendingFetch>) -> Result<CaptionSet> {
    match fetch {
        Some(pending) => pending.future.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Resolves with the first background reply to arrive.
async fn next_reply(
    pending: &mut Vec<oneshot::Receiver<BackgroundReply>>,
) -> std::result::Result<BackgroundReply, oneshot::error::RecvError> {
    poll_fn(|cx| {
        for index in 0..pending.len() {
            if let Poll::Ready(result) = Pin::new(&mut pending[index]).poll(cx) {
                pending.swap_remove(index);
                return Poll::Ready(result);
            }
        }
        Poll::Pending
    })
    .await
}
