use crate::config::SessionConfig;
use crate::error::{CaptionError, Result};
use crate::protocol::{decode, BackgroundReply, Command, Decoded, Outbound};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// One message received on the page's window message channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundEvent {
    pub origin: String,
    pub data: Value,
}

impl InboundEvent {
    pub fn new(origin: impl Into<String>, data: Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }

    /// Reads either `{"origin": ..., "data": {...}}` or a bare message, which
    /// is given the opaque origin `null`.
    pub fn from_line(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)?;
        let wrapped = value.get("data").is_some_and(Value::is_object)
            && value.get("origin").is_some_and(Value::is_string);
        if wrapped {
            Ok(serde_json::from_value(value)?)
        } else {
            Ok(Self::new("null", value))
        }
    }
}

/// A request to the extension background, answered once.
#[derive(Debug)]
pub struct BackgroundRequest {
    pub message: Outbound,
    pub reply: oneshot::Sender<BackgroundReply>,
}

/// Fire-and-forget channel to an embedded frame.
#[derive(Debug, Clone)]
pub struct FramePort {
    name: String,
    tx: mpsc::UnboundedSender<Value>,
}

impl FramePort {
    pub fn post(&self, message: &Outbound) -> Result<()> {
        debug!(frame = %self.name, ?message, "posting message");
        self.tx
            .send(message.to_wire())
            .map_err(|_| CaptionError::PortClosed(self.name.clone()))
    }
}

/// Receiving ends of everything a [`Messenger`] sends.
#[derive(Debug)]
pub struct Ports {
    pub surface: mpsc::UnboundedReceiver<Value>,
    pub editor: mpsc::UnboundedReceiver<Value>,
    pub background: mpsc::UnboundedReceiver<BackgroundRequest>,
}

/// Filters inbound traffic and carries outbound traffic for one session.
#[derive(Debug, Clone)]
pub struct Messenger {
    allowed_origins: Vec<String>,
    surface: FramePort,
    editor: FramePort,
    background: mpsc::UnboundedSender<BackgroundRequest>,
}

impl Messenger {
    pub fn channel(config: &SessionConfig) -> (Self, Ports) {
        let (surface_tx, surface) = mpsc::unbounded_channel();
        let (editor_tx, editor) = mpsc::unbounded_channel();
        let (background_tx, background) = mpsc::unbounded_channel();

        let mut allowed_origins = config.allowed_origins.clone();
        if allowed_origins.is_empty() {
            warn!("no allowed origins configured; any frame may drive the overlay");
        } else if let Some(origin) = config.extension_origin() {
            allowed_origins.push(origin);
        }

        let messenger = Self {
            allowed_origins,
            surface: FramePort {
                name: "control surface".to_string(),
                tx: surface_tx,
            },
            editor: FramePort {
                name: config.editor_frame(),
                tx: editor_tx,
            },
            background: background_tx,
        };
        let ports = Ports {
            surface,
            editor,
            background,
        };
        (messenger, ports)
    }

    /// Returns the command carried by `event`, or `None` when the event must
    /// be ignored.
    pub fn accept(&self, event: &InboundEvent) -> Option<Command> {
        match decode(&event.data) {
            Decoded::Foreign => None,
            Decoded::Unknown(kind) => {
                debug!(%kind, "ignoring unknown message type");
                None
            }
            Decoded::Command(command) => {
                if !self.origin_allowed(&event.origin) {
                    warn!(origin = %event.origin, ?command, "rejecting message from untrusted origin");
                    return None;
                }
                debug!(?command, "received message");
                Some(command)
            }
        }
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == origin)
    }

    pub fn post_surface(&self, message: &Outbound) {
        if let Err(err) = self.surface.post(message) {
            warn!("{}", err);
        }
    }

    pub fn editor_port(&self) -> FramePort {
        self.editor.clone()
    }

    /// Sends a request to the background. `None` when the background is gone.
    pub fn request_background(&self, message: Outbound) -> Option<oneshot::Receiver<BackgroundReply>> {
        let (reply, rx) = oneshot::channel();
        self.background
            .send(BackgroundRequest { message, reply })
            .ok()
            .map(|_| rx)
    }
}
