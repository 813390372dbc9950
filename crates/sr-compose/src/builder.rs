//! Translate a [`Timeline`] into a [`FilterGraph`] and its encoder inputs.
//!
//! The builder is a pure function of the timeline and the composition
//! settings: no I/O and no randomness, so identical inputs always produce
//! identical graphs.

use std::path::PathBuf;

use sr_core::config::CompositionConfig;
use sr_core::{Error, Result};

use crate::graph::{Filter, FilterGraph, Fragment, Pad, Stage};
use crate::motion::{PanSweep, ProgressSweep, Vignette, ZoomCurve};
use crate::timeline::{AnimationPolicy, Layer, Resolution, Timeline};

/// Label of the final video pad.
pub const VIDEO_OUTPUT: &str = "outv";
/// Pixel format of the final video pad.
pub const OUTPUT_PIXEL_FORMAT: &str = "yuv420p";

const BG_BASE: &str = "bg_base";
const BG_FINAL: &str = "bg_final";
const BAR_SOURCE: &str = "bar_src";

/// Everything the orchestrator needs to wire the encoder invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltGraph {
    /// The ordered graph fragments.
    pub graph: FilterGraph,
    /// Image inputs in encoder order: background first, then every layer.
    pub images: Vec<PathBuf>,
    /// Label of the final video pad.
    pub video_output: String,
    /// Encoder input index at which the audio input must be placed.
    pub audio_input_index: usize,
    pub total_frames: u64,
    pub frame_rate: u32,
}

impl BuiltGraph {
    /// Duration trim for the encoder, derived from the frame count.
    pub fn trim_seconds(&self) -> f64 {
        self.total_frames as f64 / self.frame_rate as f64
    }

    /// `-loop 1 -i <image>` for every image input, in order.
    pub fn input_args(&self) -> Vec<String> {
        self.images
            .iter()
            .flat_map(|path| {
                [
                    "-loop".to_string(),
                    "1".to_string(),
                    "-i".to_string(),
                    path.to_string_lossy().into_owned(),
                ]
            })
            .collect()
    }

    /// `-map [outv] -map <audio index>:a`.
    pub fn map_args(&self) -> Vec<String> {
        vec![
            "-map".to_string(),
            format!("[{}]", self.video_output),
            "-map".to_string(),
            format!("{}:a", self.audio_input_index),
        ]
    }
}

/// Builds filter graphs for one set of composition settings.
#[derive(Debug, Clone, Default)]
pub struct FilterGraphBuilder {
    composition: CompositionConfig,
}

impl FilterGraphBuilder {
    /// # Errors
    ///
    /// [`Error::Config`] when the settings fail [`CompositionConfig::check`].
    pub fn new(composition: &CompositionConfig) -> Result<Self> {
        composition.check()?;
        Ok(Self {
            composition: composition.clone(),
        })
    }

    /// Effective supersampling factor; never below 2.
    pub fn supersample(&self) -> u32 {
        self.composition.supersample.max(2)
    }

    /// # Errors
    ///
    /// [`Error::InvalidTimeline`] if the supersampled frame size overflows.
    pub fn build(&self, timeline: &Timeline) -> Result<BuiltGraph> {
        let mut graph = FilterGraph::new();
        graph.push(self.background(timeline)?);

        let mut last = BG_BASE.to_string();
        if timeline.animation().has_progress_bar() {
            graph.push(self.progress_bar(timeline, &last));
            last = BG_FINAL.to_string();
        }

        for (i, layer) in timeline.layers().iter().enumerate() {
            let output = format!("ovl{i}");
            graph.push(Fragment {
                stage: Stage::Overlay { layer: i },
                inputs: vec![Pad::label(&last), Pad::video_input(i + 1)],
                filters: vec![Filter::new("overlay")
                    .positional(0)
                    .positional(0)
                    .expr("enable", enable_expr(layer))],
                output: output.clone(),
            });
            last = output;
        }

        graph.push(Fragment {
            stage: Stage::Format,
            inputs: vec![Pad::label(last)],
            filters: vec![Filter::new("format").positional(OUTPUT_PIXEL_FORMAT)],
            output: VIDEO_OUTPUT.to_string(),
        });

        let mut images = Vec::with_capacity(timeline.layers().len() + 1);
        images.push(timeline.background().to_path_buf());
        images.extend(timeline.layers().iter().map(|l| l.source.clone()));

        Ok(BuiltGraph {
            graph,
            audio_input_index: images.len(),
            images,
            video_output: VIDEO_OUTPUT.to_string(),
            total_frames: timeline.total_frames(),
            frame_rate: timeline.frame_rate(),
        })
    }

    fn background(&self, timeline: &Timeline) -> Result<Fragment> {
        let out = timeline.resolution();
        let frames = timeline.total_frames();
        let fps = timeline.frame_rate();

        let filters = match timeline.animation() {
            AnimationPolicy::Zoom => {
                let curve = ZoomCurve::new(self.composition.zoom_cap, frames);
                let zoompan = Filter::new("zoompan")
                    .expr("z", curve.expr())
                    .expr("x", ZoomCurve::X_EXPR)
                    .expr("y", ZoomCurve::Y_EXPR);
                self.supersampled(zoompan, out, frames, fps)?
            }
            AnimationPolicy::Pan => {
                let sweep = PanSweep::new(self.composition.pan_zoom, frames);
                let zoompan = Filter::new("zoompan")
                    .keyed("z", sweep.zoom)
                    .expr("x", sweep.x_expr())
                    .expr("y", PanSweep::Y_EXPR);
                self.supersampled(zoompan, out, frames, fps)?
            }
            AnimationPolicy::Static => {
                let vignette = Vignette::new(
                    self.composition.vignette_amplitude,
                    self.composition.vignette_period_secs,
                );
                vec![
                    scale(out),
                    Filter::new("fps").positional(fps),
                    Filter::new("vignette")
                        .expr("angle", vignette.angle_expr())
                        .keyed("eval", "frame"),
                ]
            }
        };

        Ok(Fragment {
            stage: Stage::Background,
            inputs: vec![Pad::video_input(0)],
            filters,
            output: BG_BASE.to_string(),
        })
    }

    /// Upscale, animate at the supersampled size, then scale down once per
    /// output frame.
    fn supersampled(&self, zoompan: Filter, out: Resolution, frames: u64, fps: u32) -> Result<Vec<Filter>> {
        let factor = self.supersample();
        let work = out.scaled(factor).ok_or_else(|| {
            Error::invalid_timeline(format!("resolution {out} overflows at {factor}x supersampling"))
        })?;
        Ok(vec![
            scale(work),
            zoompan
                .keyed("d", frames)
                .keyed("s", work)
                .keyed("fps", fps),
            scale(out),
            Filter::new("setsar").positional(1),
        ])
    }

    fn progress_bar(&self, timeline: &Timeline, input: &str) -> Fragment {
        let c = &self.composition;
        let width = timeline.resolution().width;
        let color = format!("{}@{}", timeline.accent().hex(), c.progress_bar_opacity);
        let source = Filter::new("color")
            .keyed("c", color)
            .keyed("s", format!("{width}x{}", c.progress_bar_height))
            .keyed("r", timeline.frame_rate());
        let sweep = ProgressSweep::new(timeline.frame_exact_duration());

        Fragment {
            stage: Stage::ProgressBar,
            inputs: vec![
                Pad::label(input),
                Pad::Generated {
                    source,
                    label: BAR_SOURCE.to_string(),
                },
            ],
            filters: vec![Filter::new("overlay")
                .expr("x", sweep.x_expr())
                .keyed("y", format!("H-{}", c.progress_bar_offset))
                .keyed("shortest", 1)],
            output: BG_FINAL.to_string(),
        }
    }
}

fn scale(res: Resolution) -> Filter {
    Filter::new("scale").positional(res.width).positional(res.height)
}

/// Half-open enable predicate `start <= t < end`.
pub fn enable_expr(layer: &Layer) -> String {
    format!("gte(t,{})*lt(t,{})", layer.start, layer.end)
}

/// Convenience: build with default composition settings.
pub fn build(timeline: &Timeline) -> Result<BuiltGraph> {
    FilterGraphBuilder::default().build(timeline)
}
