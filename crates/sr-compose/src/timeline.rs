//! The timeline model: what gets composed, for how long, and how it moves.
//!
//! A [`Timeline`] is validated once by [`TimelineBuilder::build`] and is
//! immutable afterwards, so every later stage can rely on its invariants
//! without re-checking them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sr_core::{Error, Result};

use crate::palette;

/// Output frame rate shared by every animation policy.
pub const FRAME_RATE: u32 = 30;

/// Largest accepted frame count.
pub const MAX_FRAMES: u64 = u32::MAX as u64;

/// Camera motion simulated on the background still.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationPolicy {
    /// Slow centred zoom-in.
    #[default]
    Zoom,
    /// Fixed zoom with a horizontal sinusoidal sweep.
    Pan,
    /// No camera motion; breathing vignette and a progress bar instead.
    Static,
}

impl AnimationPolicy {
    pub const ALL: [AnimationPolicy; 3] = [Self::Zoom, Self::Pan, Self::Static];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnimationPolicy::Zoom => "zoom",
            AnimationPolicy::Pan => "pan",
            AnimationPolicy::Static => "static",
        }
    }

    /// Whether the policy draws a progress indicator. Camera motion already
    /// signals playback progress, so only `static` does.
    pub fn has_progress_bar(&self) -> bool {
        matches!(self, AnimationPolicy::Static)
    }
}

impl fmt::Display for AnimationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnimationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "zoom" => Ok(AnimationPolicy::Zoom),
            "pan" => Ok(AnimationPolicy::Pan),
            "static" => Ok(AnimationPolicy::Static),
            other => Err(Error::invalid_timeline(format!(
                "unknown animation policy '{other}' (expected zoom, pan or static)"
            ))),
        }
    }
}

/// An 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// `#rrggbb`, the form ffmpeg's colour parser accepts.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Output frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// 1080x1920, the vertical short-form format.
    pub const VERTICAL_HD: Resolution = Resolution {
        width: 1080,
        height: 1920,
    };

    /// Largest accepted side, in pixels.
    pub const MAX_DIMENSION: u32 = 16_384;

    /// Both sides multiplied by `factor`, or `None` on overflow.
    pub fn scaled(&self, factor: u32) -> Option<Resolution> {
        Some(Resolution {
            width: self.width.checked_mul(factor)?,
            height: self.height.checked_mul(factor)?,
        })
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::VERTICAL_HD
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One still image composited over the background during `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub source: PathBuf,
    pub start: f64,
    pub end: f64,
}

impl Layer {
    pub fn new(source: impl Into<PathBuf>, start: f64, end: f64) -> Self {
        Self {
            source: source.into(),
            start,
            end,
        }
    }

    /// Half-open visibility: a layer disappears exactly at its end time.
    pub fn is_visible_at(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// A validated composition request. See [`TimelineBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    background: PathBuf,
    layers: Vec<Layer>,
    animation: AnimationPolicy,
    duration: f64,
    resolution: Resolution,
    accent: Rgb,
    palette_index: usize,
    total_frames: u64,
}

impl Timeline {
    /// Start building a timeline for `background` lasting `duration` seconds.
    pub fn builder(background: impl Into<PathBuf>, duration: f64) -> TimelineBuilder {
        TimelineBuilder::new(background, duration)
    }

    pub fn background(&self) -> &Path {
        &self.background
    }

    /// Layers in render order; later layers draw on top.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn animation(&self) -> AnimationPolicy {
        self.animation
    }

    /// Requested duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn frame_rate(&self) -> u32 {
        FRAME_RATE
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn accent(&self) -> Rgb {
        self.accent
    }

    pub fn palette_index(&self) -> usize {
        self.palette_index
    }

    /// `round(duration * frame_rate)`, computed once at construction.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Frame-exact duration: `total_frames / frame_rate`. This is what the
    /// encoder trims to, so the animation curve and the output length agree.
    pub fn frame_exact_duration(&self) -> f64 {
        self.total_frames as f64 / FRAME_RATE as f64
    }
}

/// Builder validating and normalising caller-supplied timing.
#[derive(Debug, Clone)]
pub struct TimelineBuilder {
    background: PathBuf,
    duration: f64,
    layers: Vec<Layer>,
    animation: AnimationPolicy,
    resolution: Resolution,
    palette_index: usize,
    accent: Option<Rgb>,
}

impl TimelineBuilder {
    pub fn new(background: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            background: background.into(),
            duration,
            layers: Vec::new(),
            animation: AnimationPolicy::default(),
            resolution: Resolution::default(),
            palette_index: 0,
            accent: None,
        }
    }

    pub fn layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn layers(mut self, layers: impl IntoIterator<Item = Layer>) -> Self {
        self.layers.extend(layers);
        self
    }

    pub fn animation(mut self, animation: AnimationPolicy) -> Self {
        self.animation = animation;
        self
    }

    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Select the palette whose accent colours the progress bar.
    pub fn palette(mut self, index: usize) -> Self {
        self.palette_index = index;
        self
    }

    /// Override the palette's accent colour.
    pub fn accent(mut self, accent: Rgb) -> Self {
        self.accent = Some(accent);
        self
    }

    /// Validate and freeze the timeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTimeline`] when the duration is not a positive
    /// finite number, when it rounds to zero frames or more than
    /// [`MAX_FRAMES`], when the resolution is zero, odd or larger than
    /// [`Resolution::MAX_DIMENSION`], or when any layer has `start >= end` or lies entirely
    /// outside `[0, duration]`. Layers straddling the bounds are clamped.
    pub fn build(self) -> Result<Timeline> {
        let duration = self.duration;
        if !duration.is_finite() || duration <= 0.0 {
            return Err(Error::invalid_timeline(format!(
                "duration must be a positive number of seconds, got {duration}"
            )));
        }

        let frames = (duration * FRAME_RATE as f64).round();
        if frames < 1.0 {
            return Err(Error::invalid_timeline(format!(
                "duration {duration}s is shorter than one frame at {FRAME_RATE} fps"
            )));
        }
        if frames > MAX_FRAMES as f64 {
            return Err(Error::invalid_timeline(format!(
                "duration {duration}s exceeds {MAX_FRAMES} frames at {FRAME_RATE} fps"
            )));
        }
        let total_frames = frames as u64;

        let Resolution { width, height } = self.resolution;
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(Error::invalid_timeline(format!(
                "resolution {} must be non-zero and even in both dimensions",
                self.resolution
            )));
        }
        if width > Resolution::MAX_DIMENSION || height > Resolution::MAX_DIMENSION {
            return Err(Error::invalid_timeline(format!(
                "resolution {} exceeds {} pixels per side",
                self.resolution,
                Resolution::MAX_DIMENSION
            )));
        }

        let mut layers = Vec::with_capacity(self.layers.len());
        for (i, layer) in self.layers.into_iter().enumerate() {
            if !layer.start.is_finite() || !layer.end.is_finite() {
                return Err(Error::invalid_timeline(format!(
                    "layer {i} has a non-finite window [{}, {})",
                    layer.start, layer.end
                )));
            }
            if layer.start >= layer.end {
                return Err(Error::invalid_timeline(format!(
                    "layer {i} starts at {} but ends at {}",
                    layer.start, layer.end
                )));
            }
            if layer.start >= duration || layer.end <= 0.0 {
                return Err(Error::invalid_timeline(format!(
                    "layer {i} window [{}, {}) lies outside [0, {duration}]",
                    layer.start, layer.end
                )));
            }
            layers.push(Layer {
                source: layer.source,
                start: layer.start.max(0.0),
                end: layer.end.min(duration),
            });
        }

        let accent = self
            .accent
            .unwrap_or_else(|| palette::palette(self.palette_index).accent);

        Ok(Timeline {
            background: self.background,
            layers,
            animation: self.animation,
            duration,
            resolution: self.resolution,
            accent,
            palette_index: self.palette_index,
            total_frames,
        })
    }
}

/// Data-only form of a timeline, as found in job files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineRequest {
    pub background: PathBuf,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub animation: AnimationPolicy,
    pub duration: f64,
    #[serde(default)]
    pub palette_index: usize,
    #[serde(default)]
    pub accent: Option<Rgb>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
}

impl TimelineRequest {
    /// Validate the request through [`TimelineBuilder`].
    pub fn into_timeline(self) -> Result<Timeline> {
        let mut builder = Timeline::builder(self.background, self.duration)
            .layers(self.layers)
            .animation(self.animation)
            .palette(self.palette_index);
        if let Some(accent) = self.accent {
            builder = builder.accent(accent);
        }
        if let Some(resolution) = self.resolution {
            builder = builder.resolution(resolution);
        }
        builder.build()
    }
}
