use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("{0}")]
    ParseError(String),
    #[error("caption request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("caption service answered with status {0}")]
    Status(u16),
    #[error("caption payload is not a valid cue list: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("cue #{index} ends before it starts ({start} > {end})")]
    InvalidCue { index: usize, start: u64, end: u64 },
    #[error("{0} is no longer listening")]
    PortClosed(String),
    #[error("no video id in page url '{0}'")]
    MissingVideoId(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = CaptionError> = std::result::Result<T, E>;
