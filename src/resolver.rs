use crate::cue::Cue;

/// Result of looking up the active cue for a playback time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub cue: Option<&'a Cue>,
    pub changed: bool,
}

/// Finds the cue active at `time_ms`.
///
/// While `previous` still covers the time it is returned as-is without
/// scanning. Otherwise the first cue in `cues` whose window contains the time
/// wins. Losing the previous cue without finding a new one counts as a change.
pub fn resolve<'a>(time_ms: u64, previous: Option<&'a Cue>, cues: &'a [Cue]) -> Resolution<'a> {
    if let Some(prev) = previous {
        if prev.contains(time_ms) {
            return Resolution {
                cue: Some(prev),
                changed: false,
            };
        }
    }

    match cues.iter().find(|c| c.contains(time_ms)) {
        Some(cue) => Resolution {
            cue: Some(cue),
            changed: true,
        },
        None => Resolution {
            cue: None,
            changed: previous.is_some(),
        },
    }
}
