//! Pure easing functions mapping normalized time [0, 1] to progress.

pub use crate::config::EasingType;

/// Extension trait for EasingType with calculation methods
pub trait EasingTypeExt {
    /// Apply the easing function to a progress value
    ///
    /// # Arguments
    /// * `t` - Progress value, clamped to [0, 1]
    ///
    /// # Returns
    /// Eased value. Monotonic curves stay within [0, 1]; cubic-bezier curves
    /// with control points outside [0, 1] may overshoot.
    fn apply(&self, t: f64) -> f64;

    /// Whether the curve never decreases and never leaves [0, 1]
    fn is_monotonic(&self) -> bool;
}

impl EasingTypeExt for EasingType {
    #[inline]
    fn apply(&self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            EasingType::None => if t < 1.0 { 0.0 } else { 1.0 },
            EasingType::Linear => t,
            EasingType::Cubic => cubic_ease_out(t),
            EasingType::Quintic => quintic_ease_out(t),
            EasingType::EaseOut => exponential_ease_out(t),
            EasingType::Lenis => lenis_ease(t),
            EasingType::CubicBezier([x1, y1, x2, y2]) => cubic_bezier(*x1, *y1, *x2, *y2, t),
        }
    }

    fn is_monotonic(&self) -> bool {
        match self {
            EasingType::CubicBezier([_, y1, _, y2]) => {
                (0.0..=1.0).contains(y1) && (0.0..=1.0).contains(y2)
            }
            _ => true,
        }
    }
}

/// Cubic ease-out: f(t) = 1 - (1-t)³
#[inline]
fn cubic_ease_out(t: f64) -> f64 {
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

/// Quintic ease-out: f(t) = 1 - (1-t)⁵
#[inline]
fn quintic_ease_out(t: f64) -> f64 {
    let inv = 1.0 - t;
    1.0 - inv * inv * inv * inv * inv
}

/// Exponential ease-out: f(t) = 1 - 2^(-10t)
#[inline]
fn exponential_ease_out(t: f64) -> f64 {
    if t >= 1.0 {
        1.0
    } else {
        1.0 - 2.0_f64.powf(-10.0 * t)
    }
}

/// Asymptotic ease used for scroll smoothing: f(t) = min(1, 1.001 - 2^(-10t))
///
/// Reaches exactly 1 slightly before t=1, so a settled scroll lands on its
/// target without a final jump.
#[inline]
fn lenis_ease(t: f64) -> f64 {
    (1.001 - 2.0_f64.powf(-10.0 * t)).min(1.0)
}

/// CSS cubic-bezier timing function with endpoints (0,0) and (1,1)
fn cubic_bezier(x1: f64, y1: f64, x2: f64, y2: f64, t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    // Polynomial coefficients
    let cx = 3.0 * x1;
    let bx = 3.0 * (x2 - x1) - cx;
    let ax = 1.0 - cx - bx;
    let cy = 3.0 * y1;
    let by = 3.0 * (y2 - y1) - cy;
    let ay = 1.0 - cy - by;

    let sample_x = |s: f64| ((ax * s + bx) * s + cx) * s;
    let sample_y = |s: f64| ((ay * s + by) * s + cy) * s;
    let slope_x = |s: f64| (3.0 * ax * s + 2.0 * bx) * s + cx;

    const EPSILON: f64 = 1e-7;

    // Newton-Raphson first, bisection when the slope is too flat
    let mut s = t;
    for _ in 0..8 {
        let err = sample_x(s) - t;
        if err.abs() < EPSILON {
            return sample_y(s);
        }
        let d = slope_x(s);
        if d.abs() < 1e-6 {
            break;
        }
        s -= err / d;
    }

    let (mut lo, mut hi) = (0.0, 1.0);
    s = t;
    while lo < hi {
        let x = sample_x(s);
        if (x - t).abs() < EPSILON {
            break;
        }
        if t > x {
            lo = s;
        } else {
            hi = s;
        }
        let next = (lo + hi) / 2.0;
        if (next - s).abs() < EPSILON {
            break;
        }
        s = next;
    }
    sample_y(s)
}
