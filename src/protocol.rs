//! Messages exchanged between the page, the control surface, the editor frame
//! and the extension background.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value of the `application` field carried by every protocol message.
pub const APPLICATION: &str = "video_caption";

pub const NO_VIDEO_MESSAGE: &str = "This page does not contain a video.";

/// Inbound requests, keyed by the message `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    UiShow,
    UiHide,
    UiReady,
    LoadCaption,
    OpenEditor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Not addressed to us; dropped without a trace.
    Foreign,
    /// Ours, but with a `type` we do not handle.
    Unknown(String),
    Command(Command),
}

/// Classifies a raw message.
pub fn decode(data: &Value) -> Decoded {
    if data.get("application").and_then(Value::as_str) != Some(APPLICATION) {
        return Decoded::Foreign;
    }
    match Command::deserialize(data) {
        Ok(command) => Decoded::Command(command),
        Err(_) => Decoded::Unknown(
            data.get("type")
                .map(|t| t.as_str().map_or_else(|| t.to_string(), String::from))
                .unwrap_or_default(),
        ),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outbound {
    /// Answer to `UI_READY`. On success `message` holds the serialized
    /// [`VideoInfo`], otherwise a human-readable reason.
    UiInit { success: bool, message: String },
    SyncEditor { message: EditorSync },
    OpenEditor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EditorSync {
    pub time: u64,
}

#[derive(Serialize)]
struct Envelope<'a> {
    application: &'static str,
    #[serde(flatten)]
    body: &'a Outbound,
}

impl Outbound {
    pub fn failure(message: impl Into<String>) -> Self {
        Outbound::UiInit {
            success: false,
            message: message.into(),
        }
    }

    /// The message as posted on the wire, tagged with [`APPLICATION`].
    pub fn to_wire(&self) -> Value {
        let envelope = Envelope {
            application: APPLICATION,
            body: self,
        };
        serde_json::to_value(envelope).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    pub caption_length: usize,
}

/// Reply expected from the extension background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundReply {
    pub success: bool,
}
