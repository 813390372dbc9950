//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! tool, encoder, audio and composition sections. Every section defaults
//! sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub encoder: EncoderConfig,
    pub audio: AudioConfig,
    pub composition: CompositionConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Load configuration strictly: a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(ref path) = self.tools.ffmpeg_path {
            if !path.exists() {
                warnings.push(format!(
                    "tools.ffmpeg_path {} does not exist; PATH lookup will be used",
                    path.display()
                ));
            }
        }

        if self.encoder.timeout_secs == Some(0) {
            warnings.push("encoder.timeout_secs is 0; every render will time out".into());
        }
        if let Some(crf) = self.encoder.crf {
            if crf > 51 {
                warnings.push(format!("encoder.crf {crf} is outside 0..=51"));
            }
        }

        if let Some(ref dir) = self.audio.music_dir {
            if !dir.is_dir() {
                warnings.push(format!(
                    "audio.music_dir {} is not a directory; renders will use silence",
                    dir.display()
                ));
            }
        }
        if self.audio.extensions.is_empty() {
            warnings.push("audio.extensions is empty; no track will ever be picked".into());
        }
        if self.audio.sample_rate == 0 {
            warnings.push("audio.sample_rate is 0".into());
        }

        let c = &self.composition;
        if c.supersample < 2 {
            warnings.push(format!(
                "composition.supersample {} is below 2; 2 will be used",
                c.supersample
            ));
        }
        if let Err(e) = c.check() {
            warnings.push(e.to_string());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
}

/// How the filter graph reaches the encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphDelivery {
    /// Passed inline with `-filter_complex`.
    #[default]
    Inline,
    /// Written to a side file in the render workspace and passed with
    /// `-filter_complex_script`.
    Script,
}

/// Fixed encoder settings, tuned for still-image content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub video_codec: String,
    pub preset: String,
    pub tune: String,
    pub profile: String,
    /// Constant rate factor; the encoder default is used when unset.
    pub crf: Option<u32>,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub faststart: bool,
    /// Wall-clock bound for one render. Unbounded when unset.
    pub timeout_secs: Option<u64>,
    pub graph_delivery: GraphDelivery,
}

impl EncoderConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".into(),
            preset: "medium".into(),
            tune: "stillimage".into(),
            profile: "main".into(),
            crf: None,
            audio_codec: "aac".into(),
            audio_bitrate: "192k".into(),
            faststart: true,
            timeout_secs: None,
            graph_delivery: GraphDelivery::Inline,
        }
    }
}

/// Background music selection and the silent fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub music_dir: Option<PathBuf>,
    pub extensions: Vec<String>,
    pub sample_rate: u32,
    pub channel_layout: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            music_dir: None,
            extensions: vec!["mp3".into()],
            sample_rate: 44_100,
            channel_layout: "stereo".into(),
        }
    }
}

/// Tuning constants for the background animation and progress bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionConfig {
    /// Linear supersampling factor for the zoom and pan policies.
    pub supersample: u32,
    /// Final zoom factor reached by the zoom policy.
    pub zoom_cap: f64,
    /// Fixed zoom factor used by the pan policy.
    pub pan_zoom: f64,
    pub vignette_period_secs: f64,
    pub vignette_amplitude: f64,
    /// Progress bar thickness in output pixels.
    pub progress_bar_height: u32,
    /// Distance of the bar's top edge from the bottom of the frame.
    pub progress_bar_offset: u32,
    pub progress_bar_opacity: f64,
}

impl CompositionConfig {
    /// Largest accepted supersampling factor.
    pub const MAX_SUPERSAMPLE: u32 = 8;

    /// Reject settings that would produce a broken or motionless graph.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] naming the first offending field.
    pub fn check(&self) -> Result<()> {
        if self.supersample > Self::MAX_SUPERSAMPLE {
            return Err(Error::Config(format!(
                "composition.supersample {} exceeds {}",
                self.supersample,
                Self::MAX_SUPERSAMPLE
            )));
        }
        if !(self.zoom_cap.is_finite() && self.zoom_cap > 1.0) {
            return Err(Error::Config(format!(
                "composition.zoom_cap {} must be above 1.0",
                self.zoom_cap
            )));
        }
        if !(self.pan_zoom.is_finite() && self.pan_zoom > 1.0) {
            return Err(Error::Config(format!(
                "composition.pan_zoom {} must be above 1.0",
                self.pan_zoom
            )));
        }
        if !(self.vignette_period_secs.is_finite() && self.vignette_period_secs > 0.0) {
            return Err(Error::Config(format!(
                "composition.vignette_period_secs {} must be positive",
                self.vignette_period_secs
            )));
        }
        if !self.vignette_amplitude.is_finite() {
            return Err(Error::Config(
                "composition.vignette_amplitude must be finite".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.progress_bar_opacity) {
            return Err(Error::Config(format!(
                "composition.progress_bar_opacity {} is outside 0..=1",
                self.progress_bar_opacity
            )));
        }
        Ok(())
    }
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            supersample: 2,
            zoom_cap: 1.15,
            pan_zoom: 1.15,
            vignette_period_secs: 4.0,
            vignette_amplitude: 0.05,
            progress_bar_height: 10,
            progress_bar_offset: 430,
            progress_bar_opacity: 0.9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.encoder.video_codec, "libx264");
        assert_eq!(cfg.encoder.preset, "medium");
        assert_eq!(cfg.encoder.tune, "stillimage");
        assert_eq!(cfg.encoder.audio_bitrate, "192k");
        assert_eq!(cfg.encoder.graph_delivery, GraphDelivery::Inline);
        assert!(cfg.encoder.timeout().is_none());
        assert_eq!(cfg.audio.sample_rate, 44_100);
        assert_eq!(cfg.audio.extensions, vec!["mp3".to_string()]);
        assert_eq!(cfg.composition.supersample, 2);
        assert_eq!(cfg.composition.zoom_cap, 1.15);
    }

    #[test]
    fn default_config_no_warnings() {
        let warnings = Config::default().validate();
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.encoder.profile, "main");
        assert_eq!(cfg.composition.progress_bar_offset, 430);
    }

    #[test]
    fn parse_partial_sections() {
        let json = r#"{
            "encoder": {"timeout_secs": 120, "graph_delivery": "script", "crf": 20},
            "audio": {"music_dir": "/srv/music", "extensions": ["mp3", "m4a"]}
        }"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.encoder.timeout(), Some(Duration::from_secs(120)));
        assert_eq!(cfg.encoder.graph_delivery, GraphDelivery::Script);
        assert_eq!(cfg.encoder.crf, Some(20));
        // Untouched fields keep their defaults.
        assert_eq!(cfg.encoder.preset, "medium");
        assert_eq!(cfg.audio.music_dir, Some(PathBuf::from("/srv/music")));
        assert_eq!(cfg.audio.extensions.len(), 2);
        assert_eq!(cfg.audio.channel_layout, "stereo");
    }

    #[test]
    fn parse_invalid_json_is_config_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_or_default_with_none() {
        let cfg = Config::load_or_default(None);
        assert_eq!(cfg.encoder.audio_codec, "aac");
    }

    #[test]
    fn load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(Some(&dir.path().join("missing.json")));
        assert_eq!(cfg.composition.supersample, 2);
    }

    #[test]
    fn load_or_default_falls_back_on_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "garbage").unwrap();
        let cfg = Config::load_or_default(Some(&path));
        assert_eq!(cfg.encoder.tune, "stillimage");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn zero_timeout_warns() {
        let mut cfg = Config::default();
        cfg.encoder.timeout_secs = Some(0);
        assert!(cfg.validate().iter().any(|w| w.contains("timeout_secs")));
    }

    #[test]
    fn low_supersample_warns() {
        let mut cfg = Config::default();
        cfg.composition.supersample = 1;
        assert!(cfg.validate().iter().any(|w| w.contains("supersample")));
    }

    #[test]
    fn missing_music_dir_warns() {
        let mut cfg = Config::default();
        cfg.audio.music_dir = Some(PathBuf::from("/definitely/not/here"));
        assert!(cfg.validate().iter().any(|w| w.contains("music_dir")));
    }

    #[test]
    fn default_composition_passes_check() {
        assert!(CompositionConfig::default().check().is_ok());
    }

    #[test]
    fn composition_check_rejects_broken_values() {
        let cases: [(&str, fn(&mut CompositionConfig)); 7] = [
            ("zoom_cap", |c| c.zoom_cap = 1.0),
            ("zoom_cap", |c| c.zoom_cap = 0.9),
            ("pan_zoom", |c| c.pan_zoom = 0.9),
            ("vignette_period_secs", |c| c.vignette_period_secs = 0.0),
            ("vignette_period_secs", |c| c.vignette_period_secs = f64::NAN),
            ("supersample", |c| c.supersample = 9),
            ("progress_bar_opacity", |c| c.progress_bar_opacity = 1.5),
        ];
        for (field, mutate) in cases {
            let mut c = CompositionConfig::default();
            mutate(&mut c);
            let err = c.check().unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{field}");
            assert!(err.to_string().contains(field), "{err}");
        }
    }

    #[test]
    fn supersample_bounds() {
        let mut c = CompositionConfig::default();
        c.supersample = CompositionConfig::MAX_SUPERSAMPLE;
        assert!(c.check().is_ok());
        // Below 2 is clamped by the builder, not rejected.
        c.supersample = 1;
        assert!(c.check().is_ok());
    }

    #[test]
    fn broken_composition_surfaces_in_validate() {
        let mut cfg = Config::default();
        cfg.composition.pan_zoom = 0.9;
        assert!(cfg.validate().iter().any(|w| w.contains("pan_zoom")));
    }
}
