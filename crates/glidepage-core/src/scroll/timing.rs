//! Time calculation utilities for frame-clocked animations
//!
//! Times are milliseconds on the render loop's frame clock, which keeps every
//! animation deterministic under test.

/// Calculate animation progress (0.0 to 1.0) from elapsed time and duration
#[inline]
pub fn progress(elapsed_ms: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    (elapsed_ms / duration_ms).clamp(0.0, 1.0)
}

/// Progress of an animation that waits `delay_ms` before running
#[inline]
pub fn delayed_progress(elapsed_ms: f64, delay_ms: f64, duration_ms: f64) -> f64 {
    if elapsed_ms < delay_ms {
        return 0.0;
    }
    progress(elapsed_ms - delay_ms, duration_ms)
}

/// Linear interpolation between two values
#[inline]
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Map `value` from `input` range onto `output` range, clamped at both ends
///
/// Scroll-linked transforms use this to turn scroll progress into a visual
/// value, e.g. image scale 1.0 → 0.6 across progress 0.2 → 0.5.
pub fn map_range(value: f64, input: (f64, f64), output: (f64, f64)) -> f64 {
    let (in0, in1) = input;
    if (in1 - in0).abs() < f64::EPSILON {
        return if value < in0 { output.0 } else { output.1 };
    }
    let t = ((value - in0) / (in1 - in0)).clamp(0.0, 1.0);
    lerp(output.0, output.1, t)
}
