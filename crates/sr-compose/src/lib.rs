//! # sr-compose
//!
//! Pure composition logic for shortreel. Nothing in this crate performs I/O
//! or spawns processes.
//!
//! - **Timeline model** ([`Timeline`]) -- validated background, layers,
//!   duration, animation policy and resolution.
//! - **Filter graph IR** ([`graph`]) -- fragments with named pads, rendered to
//!   an ffmpeg `-filter_complex` string in a separate step.
//! - **Filter graph builder** ([`FilterGraphBuilder`]) -- zoom, pan and static
//!   backgrounds, the progress bar, timed overlays and format normalisation.
//! - **Motion curves** ([`motion`]) -- the numeric curves behind each
//!   expression.
//! - **Palettes** and **layer planners** ([`palette`], [`plan`]).

pub mod builder;
pub mod graph;
pub mod motion;
pub mod palette;
pub mod plan;
pub mod timeline;

// ---- Re-exports for convenience ----

pub use builder::{BuiltGraph, FilterGraphBuilder, VIDEO_OUTPUT};
pub use graph::{FilterGraph, Fragment, Stage};
pub use palette::{next_palette_index, palette, Palette};
pub use plan::{LayerSlot, LayoutMode};
pub use timeline::{
    AnimationPolicy, Layer, Resolution, Rgb, Timeline, TimelineBuilder, TimelineRequest,
    FRAME_RATE,
};
