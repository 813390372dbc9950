mod cli;

use shortreel::RenderJob;
use sr_av::{AudioChoice, AudioSource, Renderer, ToolRegistry, FFMPEG};
use sr_compose::{plan, LayoutMode};
use sr_core::Config;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "shortreel=trace,sr_av=trace,sr_compose=debug,sr_core=debug".to_string()
        } else {
            "shortreel=info,sr_av=info,sr_core=info".to_string()
        }
    });

    // stdout carries command output only.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render {
            job,
            output,
            dry_run,
            timeout_secs,
            audio,
            silent,
        } => {
            let config = load_config(cli.config.as_deref());
            let source = if silent {
                Some(AudioSource::Explicit(AudioChoice::Silence))
            } else {
                audio.map(|p| AudioSource::Explicit(AudioChoice::Track(p)))
            };
            let opts = RenderOptions {
                dry_run,
                timeout: timeout_secs.map(Duration::from_secs),
                audio: source,
            };
            render_job(&job, &output, &config, opts)
        }
        Commands::PlanLayers {
            mode,
            duration,
            text,
        } => plan_layers(mode, duration, &text),
        Commands::CheckTools { json } => {
            let config = load_config(cli.config.as_deref());
            check_tools(&config, json)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("shortreel {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

struct RenderOptions {
    dry_run: bool,
    timeout: Option<Duration>,
    /// Overrides the job's own audio setting.
    audio: Option<AudioSource>,
}

fn load_config(path: Option<&Path>) -> Config {
    let config = Config::load_or_default(path);
    for warning in config.validate() {
        tracing::warn!("config: {warning}");
    }
    config
}

fn render_job(job_path: &Path, output: &Path, config: &Config, opts: RenderOptions) -> Result<()> {
    let job = RenderJob::load(job_path)
        .with_context(|| format!("failed to load job {}", job_path.display()))?;
    let source = opts.audio.unwrap_or_else(|| job.audio_source());
    let timeline = job.into_timeline()?;

    let mut tools = ToolRegistry::discover(&config.tools);

    if opts.dry_run {
        // Dry runs never spawn; fall back to the bare name.
        if !tools.contains(FFMPEG) {
            tools = tools.with_tool(FFMPEG, PathBuf::from(FFMPEG));
        }
        let renderer = Renderer::new(tools, config)?;
        let audio = source.resolve(renderer.resolver());
        let invocation = renderer.plan(&timeline, &audio, output)?;
        println!("{}", invocation.command_line());
        if let Some(script) = &invocation.script {
            println!("# {}:", script.display());
            println!("{}", invocation.filter_complex);
        }
        return Ok(());
    }

    let mut renderer = Renderer::new(tools, config)?;
    if let Some(timeout) = opts.timeout {
        renderer = renderer.with_timeout(timeout);
    }

    let rt = tokio::runtime::Runtime::new()?;
    let video = rt.block_on(async {
        let token = CancellationToken::new();
        let on_interrupt = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupted; stopping encoder");
                on_interrupt.cancel();
            }
        });
        renderer
            .render_with_cancel(&timeline, source, output, &token)
            .await
    })?;

    println!("Rendered {}", video.path.display());
    println!(
        "  Duration: {:.2}s ({} frames)",
        video.duration_secs, video.total_frames
    );
    println!("  Audio: {}", video.audio);
    println!("  Elapsed: {:.1}s", video.elapsed.as_secs_f64());

    Ok(())
}

fn plan_layers(mode: LayoutMode, duration: f64, text: &str) -> Result<()> {
    let slots = plan::plan(mode, text, duration)?;
    println!("{}", serde_json::to_string_pretty(&slots)?);
    Ok(())
}

fn check_tools(config: &Config, json: bool) -> Result<()> {
    let tools = ToolRegistry::discover(&config.tools).check_all();

    if json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    println!("Checking external tools...\n");
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to render videos.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let config = Config::load(p)?;
            config.composition.check()?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Encoder: {} ({})", config.encoder.video_codec, config.encoder.preset);
    println!(
        "  Audio: {} @ {}",
        config.encoder.audio_codec, config.encoder.audio_bitrate
    );
    match &config.audio.music_dir {
        Some(dir) => println!("  Music dir: {}", dir.display()),
        None => println!("  Music dir: none (silent soundtrack)"),
    }
    println!("  Supersample: {}x", config.composition.supersample);

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for w in &warnings {
            println!("  - {w}");
        }
    }

    Ok(())
}
