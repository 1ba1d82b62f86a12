use crate::error::{CaptionError, Result};

use serde::{Deserialize, Serialize};

/// A caption text span shown over `[start, end)`, both in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    pub start: u64,
    pub end: u64,
    pub text: String,
}

impl Cue {
    pub fn new(start: u64, end: u64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn contains(&self, time_ms: u64) -> bool {
        time_ms >= self.start && time_ms < self.end
    }
}

/// The cues loaded for one video. Replaced wholesale on every load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionSet {
    video_id: String,
    cues: Vec<Cue>,
}

impl CaptionSet {
    pub fn new(video_id: impl Into<String>, cues: Vec<Cue>) -> Result<Self> {
        if let Some((index, cue)) = cues.iter().enumerate().find(|(_, c)| c.start > c.end) {
            return Err(CaptionError::InvalidCue {
                index,
                start: cue.start,
                end: cue.end,
            });
        }
        Ok(Self {
            video_id: video_id.into(),
            cues,
        })
    }

    /// Parses the caption service payload: a JSON array of `{start, end, text}`.
    pub fn from_json(video_id: impl Into<String>, payload: &str) -> Result<Self> {
        let cues: Vec<Cue> = serde_json::from_str(payload)?;
        Self::new(video_id, cues)
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_window_is_half_open() {
        let cue = Cue::new(1000, 2500, "b");
        assert!(!cue.contains(999));
        assert!(cue.contains(1000));
        assert!(cue.contains(2499));
        assert!(!cue.contains(2500));
    }

    #[test]
    fn parses_service_payload() {
        let payload = r#"[{"start":0,"end":1000,"text":"a"},{"start":1000,"end":2500,"text":"b"}]"#;
        let set = CaptionSet::from_json("abc123", payload).unwrap();

        assert_eq!(set.video_id(), "abc123");
        assert_eq!(set.len(), 2);
        assert_eq!(set.cues()[1], Cue::new(1000, 2500, "b"));
    }

    #[test]
    fn rejects_malformed_payload() {
        let err = CaptionSet::from_json("abc123", "<html>502</html>").unwrap_err();
        assert!(matches!(err, CaptionError::Payload(_)));

        let err = CaptionSet::from_json("abc123", r#"[{"start":-5,"end":10,"text":"x"}]"#)
            .unwrap_err();
        assert!(matches!(err, CaptionError::Payload(_)));
    }

    #[test]
    fn rejects_cue_ending_before_start() {
        let err = CaptionSet::from_json(
            "abc123",
            r#"[{"start":0,"end":10,"text":"ok"},{"start":50,"end":20,"text":"bad"}]"#,
        )
        .unwrap_err();

        match err {
            CaptionError::InvalidCue { index, start, end } => {
                assert_eq!((index, start, end), (1, 50, 20));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn zero_length_cue_is_allowed() {
        let set = CaptionSet::new("v", vec![Cue::new(10, 10, "")]).unwrap();
        assert!(!set.cues()[0].contains(10));
    }
}
