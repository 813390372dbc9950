//! Motion curves and their ffmpeg expressions.
//!
//! Each curve exposes the same formula twice: as a numeric function used by
//! tests and previews, and as the expression string handed to the filter.
//! Keeping both next to each other is what keeps them in agreement.

/// Zoom factor every zoom curve starts from.
pub const ZOOM_BASE: f64 = 1.0;

/// Centred zoom-in reaching `cap` at the last frame.
///
/// The speed is normalised by the frame count, so the curve arrives at `cap`
/// exactly at `total_frames` regardless of duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomCurve {
    pub cap: f64,
    pub total_frames: u64,
}

impl ZoomCurve {
    pub fn new(cap: f64, total_frames: u64) -> Self {
        Self { cap, total_frames }
    }

    /// Per-frame zoom increment.
    pub fn speed(&self) -> f64 {
        (self.cap - ZOOM_BASE) / self.total_frames.max(1) as f64
    }

    /// `min(base + frame * speed, cap)`.
    pub fn factor_at(&self, frame: u64) -> f64 {
        (ZOOM_BASE + frame as f64 * self.speed()).min(self.cap)
    }

    /// The zoom expression in terms of zoompan's output frame counter `on`.
    pub fn expr(&self) -> String {
        format!("min({}+on*{},{})", ZOOM_BASE, self.speed(), self.cap)
    }

    /// Horizontal origin keeping the visible centre fixed.
    pub const X_EXPR: &'static str = "iw/2-(iw/zoom/2)";
    /// Vertical origin keeping the visible centre fixed.
    pub const Y_EXPR: &'static str = "ih/2-(ih/zoom/2)";
}

/// Fixed zoom with one horizontal half-sine sweep over the duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanSweep {
    pub zoom: f64,
    pub total_frames: u64,
}

impl PanSweep {
    pub fn new(zoom: f64, total_frames: u64) -> Self {
        Self { zoom, total_frames }
    }

    /// Oscillation period in frames: twice the frame count, so the sweep
    /// covers exactly one half cycle.
    pub fn period_frames(&self) -> u64 {
        self.total_frames.max(1) * 2
    }

    /// The sinusoid term `sin(2*pi*frame/period)`; zero at the first and
    /// last frame, peaking mid-way.
    pub fn phase_at(&self, frame: u64) -> f64 {
        (2.0 * std::f64::consts::PI * frame as f64 / self.period_frames() as f64).sin()
    }

    /// Horizontal origin for an input of width `iw`.
    pub fn x_at(&self, frame: u64, iw: f64) -> f64 {
        (iw - iw / self.zoom) / 2.0 * (1.0 + self.phase_at(frame))
    }

    pub fn x_expr(&self) -> String {
        format!(
            "(iw-iw/zoom)/2*(1+sin(2*PI*on/{}))",
            self.period_frames()
        )
    }

    pub const Y_EXPR: &'static str = "(ih-ih/zoom)/2";
}

/// Vignette whose angle breathes around PI/4 with a period in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vignette {
    pub amplitude: f64,
    pub period_secs: f64,
}

impl Vignette {
    pub fn new(amplitude: f64, period_secs: f64) -> Self {
        Self {
            amplitude,
            period_secs,
        }
    }

    pub fn angle_at(&self, t: f64) -> f64 {
        std::f64::consts::FRAC_PI_4
            + self.amplitude * (2.0 * std::f64::consts::PI * t / self.period_secs).sin()
    }

    /// Angle expression in elapsed time `t`, independent of frame count.
    pub fn angle_expr(&self) -> String {
        format!("PI/4+{}*sin(2*PI*t/{})", self.amplitude, self.period_secs)
    }
}

/// Horizontal sweep of the progress bar from fully off-screen left (`-W`) to
/// fully on-screen (`0`) over the duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSweep {
    pub duration: f64,
}

impl ProgressSweep {
    pub fn new(duration: f64) -> Self {
        Self { duration }
    }

    pub fn x_at(&self, t: f64, width: f64) -> f64 {
        -width + width * t / self.duration
    }

    pub fn x_expr(&self) -> String {
        format!("-W+(W*t/{})", self.duration)
    }
}
