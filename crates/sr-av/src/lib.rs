//! # sr-av
//!
//! Everything in shortreel that touches the filesystem or spawns processes.
//!
//! - [`ToolRegistry`] -- locates the encoder binary.
//! - [`ToolCommand`] -- async process execution with timeout, cancellation
//!   and typed failure classification.
//! - [`RenderWorkspace`] -- scratch directory with move-into-place finalize.
//! - [`AssetResolver`] -- background music selection with silence fallback.
//! - [`Renderer`] -- the render orchestrator.

pub mod audio;
pub mod command;
pub mod render;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use audio::{AssetResolver, AudioChoice, AudioSource, SilenceSource};
pub use command::{ToolCommand, ToolOutput};
pub use render::{Invocation, RenderResult, RenderState, RenderedVideo, Renderer};
pub use tools::{ToolInfo, ToolRegistry, FFMPEG};
pub use workspace::RenderWorkspace;
