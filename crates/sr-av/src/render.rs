//! Render orchestration: timeline in, finished MP4 out.
//!
//! One render walks `Building -> Invoking -> Succeeded | Failed`. Building
//! resolves the soundtrack, builds the filter graph and assembles the encoder
//! arguments; Invoking runs the encoder inside a [`RenderWorkspace`]. There
//! is no internal retry; callers decide using [`sr_core::Error::is_retryable`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use sr_compose::builder::OUTPUT_PIXEL_FORMAT;
use sr_compose::{BuiltGraph, FilterGraphBuilder, Timeline};
use sr_core::config::{EncoderConfig, GraphDelivery};
use sr_core::{Config, Result};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::audio::{AssetResolver, AudioChoice, AudioSource, SilenceSource};
use crate::command::ToolCommand;
use crate::tools::{ToolRegistry, FFMPEG};
use crate::workspace::RenderWorkspace;

/// Extension of the filter script written for `-filter_complex_script`.
const SCRIPT_EXTENSION: &str = "filtergraph";
/// Name of the filter script inside a render workspace.
const WORKSPACE_SCRIPT: &str = "graph.filtergraph";

pub type RenderResult = Result<RenderedVideo>;

/// Lifecycle of a single render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Building,
    Invoking,
    Succeeded,
    Failed,
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RenderState::Building => "building",
            RenderState::Invoking => "invoking",
            RenderState::Succeeded => "succeeded",
            RenderState::Failed => "failed",
        })
    }
}

/// A finished render.
#[derive(Debug, Clone)]
pub struct RenderedVideo {
    pub path: PathBuf,
    pub total_frames: u64,
    /// Encoded duration, `total_frames / frame_rate`.
    pub duration_secs: f64,
    pub audio: AudioChoice,
    pub elapsed: Duration,
    /// Whatever the encoder wrote to stderr on success.
    pub diagnostics: String,
}

/// A fully assembled encoder call.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: ToolCommand,
    pub built: BuiltGraph,
    /// The rendered `-filter_complex` expression.
    pub filter_complex: String,
    /// Where the expression must be written before launch, when it is
    /// delivered as a script file.
    pub script: Option<PathBuf>,
    pub audio: AudioChoice,
    pub output: PathBuf,
}

impl Invocation {
    pub fn args(&self) -> &[String] {
        self.command.get_args()
    }

    pub fn command_line(&self) -> String {
        self.command.command_line()
    }
}

/// Drives the encoder for timelines.
#[derive(Debug, Clone)]
pub struct Renderer {
    tools: ToolRegistry,
    encoder: EncoderConfig,
    builder: FilterGraphBuilder,
    resolver: AssetResolver,
    silence: SilenceSource,
    timeout: Option<Duration>,
}

impl Renderer {
    /// # Errors
    ///
    /// [`sr_core::Error::Config`] if the composition settings are unusable.
    pub fn new(tools: ToolRegistry, config: &Config) -> Result<Self> {
        Ok(Self {
            tools,
            encoder: config.encoder.clone(),
            builder: FilterGraphBuilder::new(&config.composition)?,
            resolver: AssetResolver::from_config(&config.audio),
            silence: SilenceSource::from_config(&config.audio),
            timeout: config.encoder.timeout(),
        })
    }

    pub fn with_resolver(mut self, resolver: AssetResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Kill the encoder if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    /// Assemble the encoder call writing to `output` without running it. A
    /// filter script, if any, goes next to `output`.
    ///
    /// # Errors
    ///
    /// [`sr_core::Error::EncoderLaunch`] if no encoder binary is registered.
    pub fn plan(&self, timeline: &Timeline, audio: &AudioChoice, output: &Path) -> Result<Invocation> {
        self.assemble(timeline, audio, output, output.with_extension(SCRIPT_EXTENSION))
    }

    fn assemble(
        &self,
        timeline: &Timeline,
        audio: &AudioChoice,
        output: &Path,
        script_path: PathBuf,
    ) -> Result<Invocation> {
        let ffmpeg = self.tools.require(FFMPEG)?;
        let built = self.builder.build(timeline)?;
        let filter_complex = built.graph.render();
        let enc = &self.encoder;

        let mut command = ToolCommand::new(ffmpeg.to_path_buf());
        command.timeout_opt(self.timeout);
        command.args(["-y", "-hide_banner", "-loglevel", "error"]);
        command.args(built.input_args());
        command.args(audio.input_args(&self.silence));

        let script = match enc.graph_delivery {
            GraphDelivery::Inline => {
                command.arg("-filter_complex").arg(filter_complex.as_str());
                None
            }
            GraphDelivery::Script => {
                command
                    .arg("-filter_complex_script")
                    .arg(script_path.to_string_lossy());
                Some(script_path)
            }
        };

        command.args(built.map_args());
        command.arg("-c:v").arg(enc.video_codec.as_str());
        command.arg("-preset").arg(enc.preset.as_str());
        if !enc.tune.is_empty() {
            command.arg("-tune").arg(enc.tune.as_str());
        }
        if !enc.profile.is_empty() {
            command.arg("-profile:v").arg(enc.profile.as_str());
        }
        command.arg("-pix_fmt").arg(OUTPUT_PIXEL_FORMAT);
        if let Some(crf) = enc.crf {
            command.arg("-crf").arg(crf.to_string());
        }
        command.arg("-r").arg(built.frame_rate.to_string());
        command.arg("-t").arg(built.trim_seconds().to_string());
        command.arg("-c:a").arg(enc.audio_codec.as_str());
        command.arg("-b:a").arg(enc.audio_bitrate.as_str());
        command.arg("-shortest");
        if enc.faststart {
            command.arg("-movflags").arg("+faststart");
        }
        command.arg(output.to_string_lossy());

        Ok(Invocation {
            command,
            built,
            filter_complex,
            script,
            audio: audio.clone(),
            output: output.to_path_buf(),
        })
    }

    /// Render `timeline` to `output`.
    ///
    /// On any failure nothing is written at `output` and the scratch
    /// directory is removed.
    pub async fn render(&self, timeline: &Timeline, audio: AudioSource, output: &Path) -> RenderResult {
        self.run(timeline, audio, output, None).await
    }

    /// Like [`render`](Self::render); cancelling `token` kills the encoder
    /// and fails the render with [`sr_core::Error::Cancelled`].
    pub async fn render_with_cancel(
        &self,
        timeline: &Timeline,
        audio: AudioSource,
        output: &Path,
        token: &CancellationToken,
    ) -> RenderResult {
        self.run(timeline, audio, output, Some(token)).await
    }

    async fn run(
        &self,
        timeline: &Timeline,
        audio: AudioSource,
        output: &Path,
        cancel: Option<&CancellationToken>,
    ) -> RenderResult {
        let span = tracing::info_span!(
            "render",
            output = %output.display(),
            animation = %timeline.animation(),
            layers = timeline.layers().len(),
            frames = timeline.total_frames(),
        );

        async move {
            let started = Instant::now();
            match self.encode(timeline, audio, output, cancel, started).await {
                Ok(video) => {
                    tracing::info!(
                        state = %RenderState::Succeeded,
                        elapsed_ms = video.elapsed.as_millis() as u64,
                        "rendered {}",
                        video.path.display()
                    );
                    Ok(video)
                }
                Err(e) => {
                    tracing::warn!(
                        state = %RenderState::Failed,
                        retryable = e.is_retryable(),
                        "render failed: {e}"
                    );
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn encode(
        &self,
        timeline: &Timeline,
        audio: AudioSource,
        output: &Path,
        cancel: Option<&CancellationToken>,
        started: Instant,
    ) -> RenderResult {
        tracing::debug!(state = %RenderState::Building);
        let audio = audio.resolve(&self.resolver);
        let workspace = RenderWorkspace::new(output)?;
        let invocation = self.assemble(
            timeline,
            &audio,
            &workspace.staged_output(),
            workspace.temp_file(WORKSPACE_SCRIPT),
        )?;

        if let Some(script) = &invocation.script {
            tokio::fs::write(script, &invocation.filter_complex).await?;
        }

        tracing::debug!(
            state = %RenderState::Invoking,
            audio = %audio,
            "{}",
            invocation.command_line()
        );
        let tool_output = match cancel {
            Some(token) => invocation.command.execute_with_cancel(token).await?,
            None => invocation.command.execute().await?,
        };

        let path = workspace.finalize()?;
        Ok(RenderedVideo {
            path,
            total_frames: invocation.built.total_frames,
            duration_secs: invocation.built.trim_seconds(),
            audio,
            elapsed: started.elapsed(),
            diagnostics: tool_output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sr_compose::{AnimationPolicy, Layer};
    use sr_core::Error;

    fn renderer(config: &Config) -> Renderer {
        let tools = ToolRegistry::default().with_tool(FFMPEG, "/usr/bin/ffmpeg");
        Renderer::new(tools, config).unwrap()
    }

    fn timeline(animation: AnimationPolicy) -> Timeline {
        Timeline::builder("/in/bg.png", 13.0)
            .animation(animation)
            .layer(Layer::new("/in/hook.png", 0.0, 1.5))
            .layer(Layer::new("/in/body.png", 1.5, 11.0))
            .build()
            .unwrap()
    }

    #[test]
    fn plan_orders_arguments() {
        let config = Config::default();
        let inv = renderer(&config)
            .plan(
                &timeline(AnimationPolicy::Zoom),
                &AudioChoice::Silence,
                Path::new("/out/short.mp4"),
            )
            .unwrap();

        let graph = inv.filter_complex.clone();
        let expected: Vec<String> = [
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-loop",
            "1",
            "-i",
            "/in/bg.png",
            "-loop",
            "1",
            "-i",
            "/in/hook.png",
            "-loop",
            "1",
            "-i",
            "/in/body.png",
            "-f",
            "lavfi",
            "-i",
            "anullsrc=channel_layout=stereo:sample_rate=44100",
            "-filter_complex",
            graph.as_str(),
            "-map",
            "[outv]",
            "-map",
            "3:a",
            "-c:v",
            "libx264",
            "-preset",
            "medium",
            "-tune",
            "stillimage",
            "-profile:v",
            "main",
            "-pix_fmt",
            "yuv420p",
            "-r",
            "30",
            "-t",
            "13",
            "-c:a",
            "aac",
            "-b:a",
            "192k",
            "-shortest",
            "-movflags",
            "+faststart",
            "/out/short.mp4",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        assert_eq!(inv.args(), expected.as_slice());
        assert!(inv.script.is_none());
        assert_eq!(inv.command.program(), Path::new("/usr/bin/ffmpeg"));
    }

    #[test]
    fn plan_with_track_and_crf() {
        let mut config = Config::default();
        config.encoder.crf = Some(20);
        let inv = renderer(&config)
            .plan(
                &timeline(AnimationPolicy::Static),
                &AudioChoice::Track(PathBuf::from("/music/a.mp3")),
                Path::new("/out/short.mp4"),
            )
            .unwrap();
        let args = inv.args().join(" ");
        assert!(args.contains("-i /in/body.png -i /music/a.mp3 -filter_complex"));
        assert!(args.contains("-pix_fmt yuv420p -crf 20 -r 30"));
        assert!(!args.contains("anullsrc"));
    }

    #[test]
    fn plan_with_script_delivery() {
        let mut config = Config::default();
        config.encoder.graph_delivery = GraphDelivery::Script;
        let inv = renderer(&config)
            .plan(
                &timeline(AnimationPolicy::Pan),
                &AudioChoice::Silence,
                Path::new("/tmp/ws/short.mp4"),
            )
            .unwrap();
        let script = inv.script.clone().unwrap();
        assert_eq!(script, PathBuf::from("/tmp/ws/short.filtergraph"));

        let args = inv.args();
        let pos = args.iter().position(|a| a == "-filter_complex_script").unwrap();
        assert_eq!(args[pos + 1], "/tmp/ws/short.filtergraph");
        assert!(!args.iter().any(|a| a == "-filter_complex"));
    }

    #[test]
    fn trim_matches_frame_count() {
        let tl = Timeline::builder("/in/bg.png", 7.25).build().unwrap();
        let inv = renderer(&Config::default())
            .plan(&tl, &AudioChoice::Silence, Path::new("/out/a.mp4"))
            .unwrap();
        let args = inv.args();
        let pos = args.iter().position(|a| a == "-t").unwrap();
        let trim: f64 = args[pos + 1].parse().unwrap();
        assert_eq!((trim * 30.0).round() as u64, tl.total_frames());
        // No layers: audio is input 1.
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "1:a"));
    }

    #[test]
    fn plan_without_encoder_is_launch_error() {
        let r = Renderer::new(ToolRegistry::default(), &Config::default()).unwrap();
        let err = r
            .plan(
                &timeline(AnimationPolicy::Zoom),
                &AudioChoice::Silence,
                Path::new("/out/a.mp4"),
            )
            .unwrap_err();
        assert!(matches!(err, Error::EncoderLaunch { .. }));
    }

    #[test]
    fn unusable_composition_is_rejected_up_front() {
        let mut config = Config::default();
        config.composition.vignette_period_secs = 0.0;
        let err = Renderer::new(ToolRegistry::default(), &config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("vignette_period_secs"));
    }

    #[test]
    fn timeout_reaches_command() {
        let r = renderer(&Config::default()).with_timeout(Duration::from_secs(90));
        assert_eq!(r.timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn render_state_display() {
        assert_eq!(RenderState::Building.to_string(), "building");
        assert_eq!(RenderState::Failed.to_string(), "failed");
    }
}
