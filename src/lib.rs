//! Sky Bounce - A vertical-bounce arcade game core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (player, ground, gestures, bullet time, monsters)
//! - `tuning`: Data-driven game balance

pub mod sim;
pub mod tuning;

pub use tuning::{Tuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation rate (120 Hz for smooth physics)
    pub const SIM_HZ: u32 = 120;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / SIM_HZ as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest real frame delta accepted by the driver (seconds)
    pub const MAX_FRAME_DT: f32 = 0.25;

    /// Floor used before dividing by a value that may approach zero
    pub const EPSILON: f32 = 1e-4;
}

/// Frame-rate independent exponential approach factor.
///
/// Returns the fraction of the remaining distance covered in `dt` for a
/// first-order lag with time constant `tau`.
#[inline]
pub fn approach_factor(dt: f32, tau: f32) -> f32 {
    if tau <= consts::EPSILON {
        1.0
    } else {
        1.0 - (-dt / tau).exp()
    }
}

/// Move `current` toward `target` with time constant `tau`
#[inline]
pub fn approach(current: f32, target: f32, dt: f32, tau: f32) -> f32 {
    current + (target - current) * approach_factor(dt, tau)
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Divide, flooring the denominator at [`consts::EPSILON`]
#[inline]
pub fn safe_div(num: f32, den: f32) -> f32 {
    num / den.max(consts::EPSILON)
}

/// `log2(1 + height / reference)`, the shared height-scaling curve
#[inline]
pub fn height_log(height: f32, reference: f32) -> f32 {
    (1.0 + safe_div(height.max(0.0), reference)).log2()
}

/// Piecewise-linear lookup over `(x, y)` points sorted by `x`.
///
/// Values outside the curve are clamped to the first/last point.
pub fn sample_curve(points: &[(f32, f32)], x: f32) -> f32 {
    let Some(&(first_x, first_y)) = points.first() else {
        return 0.0;
    };
    if x <= first_x {
        return first_y;
    }
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            let t = safe_div(x - x0, x1 - x0).clamp(0.0, 1.0);
            return lerp(y0, y1, t);
        }
    }
    points.last().map_or(first_y, |&(_, y)| y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approach_converges() {
        let mut v = 0.0;
        for _ in 0..1000 {
            v = approach(v, 10.0, consts::SIM_DT, 0.05);
        }
        assert!((v - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_approach_never_overshoots() {
        let v = approach(0.0, 1.0, 10.0, 0.01);
        assert!(v <= 1.0);
    }

    #[test]
    fn test_sample_curve() {
        let curve = [(0.0, 0.2), (1000.0, 0.4), (3000.0, 0.8)];
        assert_eq!(sample_curve(&curve, -5.0), 0.2);
        assert!((sample_curve(&curve, 500.0) - 0.3).abs() < 1e-5);
        assert!((sample_curve(&curve, 2000.0) - 0.6).abs() < 1e-5);
        assert_eq!(sample_curve(&curve, 9000.0), 0.8);
        assert_eq!(sample_curve(&[], 1.0), 0.0);
    }

    #[test]
    fn test_height_log() {
        assert_eq!(height_log(0.0, 1000.0), 0.0);
        assert!((height_log(1000.0, 1000.0) - 1.0).abs() < 1e-6);
        assert!((height_log(3000.0, 1000.0) - 2.0).abs() < 1e-6);
    }
}
