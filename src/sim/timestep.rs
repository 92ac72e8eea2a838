//! Fixed timestep driver
//!
//! Decouples real frame time from simulation time. Real deltas are clamped,
//! accumulated, and drained in fixed steps with a per-frame cap. Time is kept
//! in f64 so frame splits that sum to the same total produce the same steps.

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_HZ};

/// Slack when comparing the accumulator against one step, so frame splits
/// that sum to an exact multiple of the step are not lost to rounding.
const ACCUMULATOR_SLACK: f64 = 1e-9;

/// Fixed timestep accumulator
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    /// The fixed delta time per step (seconds)
    dt: f64,
    /// Largest accepted real delta per frame (seconds)
    max_frame_dt: f64,
    /// Step cap per frame
    max_steps: u32,
    /// Accumulated, not yet simulated time (seconds)
    accumulator: f64,
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new(SIM_HZ, MAX_FRAME_DT, MAX_SUBSTEPS)
    }
}

impl FixedTimestep {
    pub fn new(rate_hz: u32, max_frame_dt: f32, max_steps: u32) -> Self {
        Self {
            dt: 1.0 / f64::from(rate_hz.max(1)),
            max_frame_dt: f64::from(max_frame_dt),
            max_steps,
            accumulator: 0.0,
        }
    }

    /// Add a real frame delta in milliseconds. Returns the number of fixed
    /// steps to run this frame.
    ///
    /// When the step cap is hit the leftover time is discarded rather than
    /// carried, so a stall never makes the next frames catch up.
    pub fn advance(&mut self, real_ms: f64) -> u32 {
        let frame_dt = (real_ms / 1000.0).clamp(0.0, self.max_frame_dt);
        self.accumulator += frame_dt;

        let mut steps = 0;
        while self.accumulator + ACCUMULATOR_SLACK >= self.dt && steps < self.max_steps {
            self.accumulator -= self.dt;
            steps += 1;
        }
        if steps == self.max_steps {
            self.accumulator = 0.0;
        }
        self.accumulator = self.accumulator.max(0.0);
        steps
    }

    /// Interpolation alpha for rendering between steps (0.0 to 1.0)
    pub fn alpha(&self) -> f32 {
        (self.accumulator / self.dt).clamp(0.0, 1.0) as f32
    }

    /// The fixed delta time (seconds)
    pub fn dt(&self) -> f32 {
        self.dt as f32
    }

    /// Drop any accumulated time (restart, resume from pause)
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_one_step_exact() {
        let mut ts = FixedTimestep::default();
        assert_eq!(ts.advance(1000.0 / 120.0), 1);
    }

    #[test]
    fn test_accumulates_partial() {
        let mut ts = FixedTimestep::default();
        assert_eq!(ts.advance(5.0), 0);
        assert_eq!(ts.advance(5.0), 1);
        assert!(ts.alpha() > 0.0 && ts.alpha() < 1.0);
    }

    #[test]
    fn test_caps_and_discards_after_stall() {
        let mut ts = FixedTimestep::default();
        // A 2 s stall is clamped to 0.25 s (30 steps) then capped at 8
        assert_eq!(ts.advance(2000.0), MAX_SUBSTEPS);
        // Remainder was discarded: a tiny follow-up frame runs nothing
        assert_eq!(ts.advance(1.0), 0);
    }

    #[test]
    fn test_negative_delta_ignored() {
        let mut ts = FixedTimestep::default();
        assert_eq!(ts.advance(-50.0), 0);
        assert_eq!(ts.alpha(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_step_count_independent_of_split(frames in proptest::collection::vec(1u32..=40, 1..60)) {
            // Whole-millisecond frames never exceed 8 steps per frame at 40 ms
            let total_ms: u32 = frames.iter().sum();

            let mut split = FixedTimestep::default();
            let split_steps: u32 = frames.iter().map(|&ms| split.advance(f64::from(ms))).sum();

            let mut fine = FixedTimestep::default();
            let fine_steps: u32 = (0..total_ms).map(|_| fine.advance(1.0)).sum();

            prop_assert_eq!(split_steps, fine_steps);
            prop_assert_eq!(split_steps, total_ms * 120 / 1000);
        }
    }
}
