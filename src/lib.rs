//! Synchronized caption overlay for video pages.
//!
//! A [`Session`] receives protocol messages from the page's frames, loads the
//! captions of the current video and keeps an overlay caption line in step
//! with playback through a periodic [`Scheduler`] tick.

pub mod config;
pub mod cue;
pub mod error;
pub mod headless;
pub mod messenger;
pub mod page;
pub mod parser;
pub mod protocol;
pub mod resolver;
pub mod scheduler;
pub mod serialiser;
pub mod session;
pub mod store;

pub use crate::config::SessionConfig;
pub use crate::cue::{CaptionSet, Cue};
pub use crate::error::CaptionError;
pub use crate::messenger::{InboundEvent, Messenger, Ports};
pub use crate::page::Page;
pub use crate::resolver::{resolve, Resolution};
pub use crate::scheduler::{Scheduler, TaskHandle, TickInfo};
pub use crate::session::Session;
pub use crate::store::{CaptionSource, CaptionStore, HttpCaptionSource, SrtCaptionSource};
