use clap::{Parser, Subcommand};
use sr_compose::LayoutMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shortreel")]
#[command(author, version, about = "Vertical short-video composition with ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a job file to an MP4
    Render {
        /// Job file (JSON) describing the timeline
        #[arg(required = true)]
        job: PathBuf,

        /// Destination video file
        #[arg(short, long)]
        output: PathBuf,

        /// Print the encoder command without running it
        #[arg(long)]
        dry_run: bool,

        /// Kill the encoder after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Use this audio file as the soundtrack
        #[arg(long, conflicts_with = "silent")]
        audio: Option<PathBuf>,

        /// Render with a silent soundtrack
        #[arg(long)]
        silent: bool,
    },

    /// Plan text layer timings and print them as JSON
    PlanLayers {
        /// Layout mode: classic, three-parts or word-by-word
        #[arg(long, default_value = "classic")]
        mode: LayoutMode,

        /// Video duration in seconds
        #[arg(long)]
        duration: f64,

        /// Text to lay out; three-parts mode splits on '|'
        text: String,
    },

    /// Check that required external tools are available
    CheckTools {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
