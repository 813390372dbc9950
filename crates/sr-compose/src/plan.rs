//! Layer planners: how generated text is split into timed overlays.
//!
//! Each planner returns [`LayerSlot`]s holding the text and its window. The
//! caller rasterises every slot to an image and turns it into a
//! [`Layer`](crate::timeline::Layer) with [`LayerSlot::into_layer`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sr_core::{Error, Result};

use crate::timeline::Layer;

/// Length of the opening hook in the three-part layout.
pub const HOOK_SECS: f64 = 1.5;
/// Length of the closing trigger in the three-part layout.
pub const TRIGGER_SECS: f64 = 2.0;
/// Words per chunk in the word-by-word layout.
pub const WORDS_PER_CHUNK: usize = 3;

/// How text is distributed across overlays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// One overlay for the whole duration.
    #[default]
    Classic,
    /// Hook, body and trigger shown one after another.
    ThreeParts,
    /// A few words at a time.
    WordByWord,
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayoutMode::Classic => "classic",
            LayoutMode::ThreeParts => "three_parts",
            LayoutMode::WordByWord => "word_by_word",
        })
    }
}

impl FromStr for LayoutMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "classic" => Ok(LayoutMode::Classic),
            "three_parts" => Ok(LayoutMode::ThreeParts),
            "word_by_word" => Ok(LayoutMode::WordByWord),
            other => Err(Error::invalid_timeline(format!("unknown layout mode '{other}'"))),
        }
    }
}

/// Text to rasterise and the window it occupies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSlot {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl LayerSlot {
    /// Attach the rasterised image for this slot.
    pub fn into_layer(self, source: impl Into<PathBuf>) -> Layer {
        Layer::new(source, self.start, self.end)
    }
}

/// One slot covering the whole duration.
///
/// The text is always a separate overlay over the background. A caller that
/// bakes the text into the background itself should render with no layers
/// instead of using this slot.
pub fn classic(text: &str, duration: f64) -> Result<Vec<LayerSlot>> {
    check_duration(duration)?;
    Ok(vec![LayerSlot {
        text: text.to_string(),
        start: 0.0,
        end: duration,
    }])
}

/// Hook `[0, 1.5)`, body `[1.5, d-2)`, trigger `[d-2, d)`.
///
/// # Errors
///
/// Fails unless exactly three parts are given and the duration leaves room
/// for a non-empty body.
pub fn three_parts(parts: &[String], duration: f64) -> Result<Vec<LayerSlot>> {
    check_duration(duration)?;
    let [hook, body, trigger] = parts else {
        return Err(Error::invalid_timeline(format!(
            "three-part layout needs exactly 3 parts, got {}",
            parts.len()
        )));
    };
    let body_end = duration - TRIGGER_SECS;
    if body_end <= HOOK_SECS {
        return Err(Error::invalid_timeline(format!(
            "three-part layout needs more than {}s, got {duration}s",
            HOOK_SECS + TRIGGER_SECS
        )));
    }
    Ok(vec![
        LayerSlot {
            text: hook.clone(),
            start: 0.0,
            end: HOOK_SECS,
        },
        LayerSlot {
            text: body.clone(),
            start: HOOK_SECS,
            end: body_end,
        },
        LayerSlot {
            text: trigger.clone(),
            start: body_end,
            end: duration,
        },
    ])
}

/// Chunks of [`WORDS_PER_CHUNK`] words sharing the duration equally; the
/// last chunk stays up until the end.
pub fn word_by_word(text: &str, duration: f64) -> Result<Vec<LayerSlot>> {
    check_duration(duration)?;
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Err(Error::invalid_timeline("word-by-word layout needs some text"));
    }

    let chunks: Vec<String> = words.chunks(WORDS_PER_CHUNK).map(|c| c.join(" ")).collect();
    let count = chunks.len();
    let chunk_dur = duration / count as f64;

    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(i, text)| LayerSlot {
            text,
            start: i as f64 * chunk_dur,
            end: if i + 1 == count {
                duration
            } else {
                (i + 1) as f64 * chunk_dur
            },
        })
        .collect())
}

/// Dispatch on `mode`. For [`LayoutMode::ThreeParts`] the text is split on
/// `|` into hook, body and trigger.
pub fn plan(mode: LayoutMode, text: &str, duration: f64) -> Result<Vec<LayerSlot>> {
    match mode {
        LayoutMode::Classic => classic(text, duration),
        LayoutMode::ThreeParts => {
            let parts: Vec<String> = text.split('|').map(|p| p.trim().to_string()).collect();
            three_parts(&parts, duration)
        }
        LayoutMode::WordByWord => word_by_word(text, duration),
    }
}

fn check_duration(duration: f64) -> Result<()> {
    if duration.is_finite() && duration > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid_timeline(format!(
            "duration must be a positive number of seconds, got {duration}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts() -> Vec<String> {
        vec!["Hook".into(), "Body".into(), "Trigger".into()]
    }

    #[test]
    fn classic_covers_duration() {
        let slots = classic("fact", 13.0).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!((slots[0].start, slots[0].end), (0.0, 13.0));
    }

    #[test]
    fn three_parts_windows() {
        let slots = three_parts(&parts(), 13.0).unwrap();
        let windows: Vec<(f64, f64)> = slots.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(windows, vec![(0.0, 1.5), (1.5, 11.0), (11.0, 13.0)]);
        assert_eq!(slots[2].text, "Trigger");
    }

    #[test]
    fn three_parts_rejects_short_duration() {
        assert!(three_parts(&parts(), 3.5).is_err());
        assert!(three_parts(&parts(), 3.6).is_ok());
    }

    #[test]
    fn three_parts_rejects_wrong_count() {
        let two = vec!["a".to_string(), "b".to_string()];
        assert!(three_parts(&two, 13.0).is_err());
    }

    #[test]
    fn word_by_word_chunks_and_tail() {
        let slots = word_by_word("one two three four five six seven", 9.0).unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].text, "one two three");
        assert_eq!(slots[2].text, "seven");
        assert_eq!((slots[0].start, slots[0].end), (0.0, 3.0));
        assert_eq!((slots[1].start, slots[1].end), (3.0, 6.0));
        assert_eq!(slots[2].end, 9.0);
    }

    #[test]
    fn word_by_word_windows_are_contiguous() {
        let slots = word_by_word("a b c d e f g h i j k", 13.0).unwrap();
        for pair in slots.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(slots.last().unwrap().end, 13.0);
    }

    #[test]
    fn word_by_word_rejects_blank_text() {
        assert!(word_by_word("   ", 5.0).is_err());
    }

    #[test]
    fn plan_splits_three_parts_on_pipe() {
        let slots = plan(LayoutMode::ThreeParts, "Wait | the body | Follow", 10.0).unwrap();
        assert_eq!(slots[0].text, "Wait");
        assert_eq!(slots[1].text, "the body");
    }

    #[test]
    fn slot_into_layer() {
        let slot = classic("x", 4.0).unwrap().remove(0);
        let layer = slot.into_layer("/tmp/x.png");
        assert_eq!(layer.source, PathBuf::from("/tmp/x.png"));
        assert_eq!(layer.end, 4.0);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("three-parts".parse::<LayoutMode>().unwrap(), LayoutMode::ThreeParts);
        assert_eq!("word_by_word".parse::<LayoutMode>().unwrap(), LayoutMode::WordByWord);
        assert!("poem".parse::<LayoutMode>().is_err());
        assert_eq!(LayoutMode::ThreeParts.to_string(), "three_parts");
    }
}
