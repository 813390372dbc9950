//! shortreel - vertical short-video composition over ffmpeg
//!
//! This library crate exposes the job model for the binary and for
//! integration testing; the composition and render logic live in the
//! `sr-*` workspace crates.

pub mod job;

pub use job::RenderJob;
