//! Unified error type for shortreel.
//!
//! Every crate in the workspace funnels its failures into [`Error`]. The
//! variants follow the render taxonomy: timeline problems are caught before
//! any process is spawned, encoder problems carry the tool name and whatever
//! diagnostics the process produced.

use std::time::Duration;

/// Unified error type covering all failure modes of a render.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The timeline request is malformed (duration, layer window, resolution).
    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),

    /// The encoder binary could not be started.
    #[error("Encoder launch failed [{tool}]: {message}")]
    EncoderLaunch {
        /// Name of the tool that could not be started.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The encoder started but exited unsuccessfully.
    #[error("Encoder failed [{tool}] ({}): {}", status_text(*status), stderr.trim())]
    EncoderExecution {
        /// Name of the tool that failed.
        tool: String,
        /// Exit code, if the process exited normally.
        status: Option<i32>,
        /// Captured standard error, verbatim.
        stderr: String,
    },

    /// The encoder exceeded its wall-clock bound and was terminated.
    #[error("Encoder timed out [{tool}] after {after:?}")]
    Timeout {
        /// Name of the tool that was killed.
        tool: String,
        /// The bound that was exceeded.
        after: Duration,
    },

    /// The caller cancelled the render; the process was terminated.
    #[error("Encoder cancelled [{tool}]")]
    Cancelled {
        /// Name of the tool that was killed.
        tool: String,
    },

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

fn status_text(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl Error {
    /// Convenience constructor for [`Error::InvalidTimeline`].
    pub fn invalid_timeline(message: impl Into<String>) -> Self {
        Error::InvalidTimeline(message.into())
    }

    /// Convenience constructor for [`Error::EncoderLaunch`].
    pub fn launch(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::EncoderLaunch {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::EncoderExecution`].
    pub fn execution(tool: impl Into<String>, status: Option<i32>, stderr: impl Into<String>) -> Self {
        Error::EncoderExecution {
            tool: tool.into(),
            status,
            stderr: stderr.into(),
        }
    }

    /// Whether a caller may reasonably retry the same request.
    ///
    /// Timeline and launch errors never succeed on retry; an execution failure
    /// or a timeout might (for example with a simplified graph or a longer
    /// bound).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::EncoderExecution { .. } | Error::Timeout { .. })
    }

    /// Captured encoder diagnostics, if this error carries any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Error::EncoderExecution { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
