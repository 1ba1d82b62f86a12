use crate::error::Result;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CAPTION_SERVICE: &str = "https://datascience.ischool.syr.edu";
pub const DEFAULT_TICK_PERIOD_MS: u64 = 1000;

/// Settings for one overlay session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Extension id; names the editor frame and gives the extension origin.
    pub extension_id: String,
    /// Base URL of the caption service, without the `/api/caption` path.
    pub caption_service: String,
    pub tick_period_ms: u64,
    /// Blank the caption line while playback sits between cues. When off the
    /// last caption stays up until the next one starts.
    pub clear_on_gap: bool,
    /// Origins allowed to send protocol messages. Empty accepts any sender.
    pub allowed_origins: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            extension_id: String::new(),
            caption_service: DEFAULT_CAPTION_SERVICE.to_string(),
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
            clear_on_gap: true,
            allowed_origins: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms.max(1))
    }

    /// Name of the editor frame, `video_caption_editor_<id>`.
    pub fn editor_frame(&self) -> String {
        if self.extension_id.is_empty() {
            "video_caption_editor".to_string()
        } else {
            format!("video_caption_editor_{}", self.extension_id)
        }
    }

    pub fn extension_origin(&self) -> Option<String> {
        if self.extension_id.is_empty() {
            None
        } else {
            Some(format!("chrome-extension://{}", self.extension_id))
        }
    }
}
