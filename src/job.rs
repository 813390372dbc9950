//! Render job files.
//!
//! A job is a JSON document describing one timeline plus an optional
//! soundtrack:
//!
//! ```json
//! {
//!   "background": "bg.png",
//!   "layers": [{ "source": "hook.png", "start": 0.0, "end": 1.5 }],
//!   "animation": "zoom",
//!   "duration": 13.0,
//!   "palette_index": 2,
//!   "audio": { "track": "music/lofi.mp3" }
//! }
//! ```
//!
//! Relative paths are resolved against the job file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sr_av::{AudioChoice, AudioSource};
use sr_compose::{Timeline, TimelineRequest};
use sr_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    #[serde(flatten)]
    pub timeline: TimelineRequest,
    /// Fixed soundtrack; picked from the music library when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioChoice>,
}

impl RenderJob {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::invalid_timeline(format!("invalid job: {e}")))
    }

    /// Read a job file and resolve its relative paths.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut job = Self::from_json(&contents)?;
        if let Some(base) = path.parent() {
            job.rebase(base);
        }
        Ok(job)
    }

    /// Prefix every relative asset path with `base`.
    pub fn rebase(&mut self, base: &Path) {
        rebase_path(&mut self.timeline.background, base);
        for layer in &mut self.timeline.layers {
            rebase_path(&mut layer.source, base);
        }
        if let Some(AudioChoice::Track(track)) = &mut self.audio {
            rebase_path(track, base);
        }
    }

    pub fn audio_source(&self) -> AudioSource {
        self.audio
            .clone()
            .map(AudioSource::Explicit)
            .unwrap_or_default()
    }

    pub fn into_timeline(self) -> Result<Timeline> {
        self.timeline.into_timeline()
    }
}

fn rebase_path(path: &mut PathBuf, base: &Path) {
    if path.is_relative() && !base.as_os_str().is_empty() {
        *path = base.join(&*path);
    }
}
