//! Ground-contact charging phase
//!
//! After landing, compression eases toward the impact-derived target. The
//! player times a release while compression sits in the high-proximity
//! "yellow zone" (or just after peak). Holding too long past peak drains the
//! charge and eventually locks the release into a failure.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;
use crate::{approach, height_log, safe_div};

/// Fall data frozen at the moment of ground contact.
///
/// Later phases read only this snapshot, never the live accumulators, so
/// input after touchdown cannot inflate the descent stats.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LandingSnapshot {
    pub impact_speed: f32,
    pub fall_distance: f32,
    pub fast_fall_distance: f32,
    pub fast_fall_energy: f32,
    pub fast_fall_time: f32,
    pub apex_height: f32,
    pub difficulty: f32,
    /// Compression the impact asked for beyond `max_compression`
    pub overflow: f32,
}

impl LandingSnapshot {
    /// Share of the fall covered while fast-falling (0..1)
    pub fn fast_fall_fraction(&self) -> f32 {
        safe_div(self.fast_fall_distance, self.fall_distance).clamp(0.0, 1.0)
    }
}

/// Timing windows derived from landing height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargeWindows {
    /// Time constant of the compress-to-peak approach
    pub compress_tau: f32,
    /// How long the yellow zone stays open
    pub yellow_duration: f32,
    /// Post-peak window that still counts as good
    pub peak_grace: f32,
    /// Post-peak hold time that sets hold lockout
    pub fail_hold_time: f32,
}

impl ChargeWindows {
    /// Higher landings get a slower compression (more reaction time) but a
    /// shorter yellow zone; grace and lockout shrink with difficulty.
    pub fn for_landing(landing: &LandingSnapshot, tuning: &Tuning) -> Self {
        let log_h = height_log(landing.apex_height, tuning.height_ref);
        let difficulty = landing.difficulty.max(1.0);
        Self {
            compress_tau: tuning.compress_time * (1.0 + tuning.compress_log_scale * log_h),
            yellow_duration: (tuning.yellow_duration / (1.0 + tuning.yellow_log_scale * log_h))
                .max(tuning.yellow_duration_min),
            peak_grace: (tuning.peak_grace / difficulty).max(tuning.peak_grace_min),
            fail_hold_time: (tuning.fail_hold_time / difficulty).max(tuning.fail_hold_time_min),
        }
    }
}

/// What the charge asks the player to do after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStep {
    /// Keep charging
    Continue,
    /// Release edge seen; judge and launch
    Release,
    /// Compression relaxed away without a launch
    Settle { no_input: bool },
}

/// Charging-state payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub landing: LandingSnapshot,
    pub windows: ChargeWindows,
    pub target_compression: f32,
    pub current_compression: f32,
    pub reached_peak: bool,
    /// Peak was reached by the yellow zone timing out (no grace window)
    pub missed_window: bool,
    pub charge_efficiency: f32,
    pub hold_lockout: bool,
    /// Time since the peak, held or not; bounds the grace window
    pub peak_time: f32,
    /// Time held past the peak; drives over-hold decay and lockout
    pub post_peak_hold_time: f32,
    pub is_in_yellow_zone: bool,
    pub yellow_zone_start_time: f32,
    /// Time since touchdown
    pub elapsed: f32,
    pub hold_time: f32,
    /// Hold was seen at some point during this charge
    pub had_input: bool,
}

impl Charge {
    pub fn new(landing: LandingSnapshot, target_compression: f32, holding: bool, tuning: &Tuning) -> Self {
        Self {
            windows: ChargeWindows::for_landing(&landing, tuning),
            landing,
            target_compression: target_compression.max(0.0),
            current_compression: 0.0,
            reached_peak: false,
            missed_window: false,
            charge_efficiency: 1.0,
            hold_lockout: false,
            peak_time: 0.0,
            post_peak_hold_time: 0.0,
            is_in_yellow_zone: false,
            yellow_zone_start_time: 0.0,
            elapsed: 0.0,
            hold_time: 0.0,
            had_input: holding,
        }
    }

    /// current / target, guarded against a near-zero target
    pub fn proximity(&self) -> f32 {
        safe_div(self.current_compression, self.target_compression).clamp(0.0, 1.0)
    }

    /// Release now would land inside the perfect window
    pub fn in_perfect_window(&self) -> bool {
        if self.reached_peak {
            !self.missed_window && self.peak_time <= self.windows.peak_grace
        } else {
            self.is_in_yellow_zone
        }
    }

    /// Advance one step. `released` is the hold->release edge for this step.
    pub fn update(&mut self, dt: f32, holding: bool, released: bool, tuning: &Tuning) -> ChargeStep {
        self.elapsed += dt;
        if self.reached_peak {
            self.peak_time += dt;
        }
        if holding {
            self.had_input = true;
            self.hold_time += dt;
        }

        // Judge against the state the player saw when letting go
        if released {
            return ChargeStep::Release;
        }

        if self.reached_peak {
            self.update_at_peak(dt, holding, tuning);
        } else {
            self.update_compress(dt, tuning);
        }

        if self.reached_peak && self.current_compression <= tuning.settle_epsilon {
            return ChargeStep::Settle {
                no_input: !self.had_input,
            };
        }
        ChargeStep::Continue
    }

    fn update_compress(&mut self, dt: f32, tuning: &Tuning) {
        self.current_compression = approach(
            self.current_compression,
            self.target_compression,
            dt,
            self.windows.compress_tau,
        )
        .clamp(0.0, self.target_compression);

        if self.proximity() > tuning.yellow_zone_proximity {
            if !self.is_in_yellow_zone {
                self.is_in_yellow_zone = true;
                self.yellow_zone_start_time = self.elapsed;
            } else if self.elapsed - self.yellow_zone_start_time >= self.windows.yellow_duration {
                // Sat in the zone without letting go: window missed
                log::debug!("Yellow zone expired after {:.3}s", self.windows.yellow_duration);
                self.reach_peak(true);
                return;
            }
        }

        if self.target_compression - self.current_compression <= tuning.peak_epsilon {
            self.reach_peak(false);
        }
    }

    fn reach_peak(&mut self, missed: bool) {
        self.reached_peak = true;
        self.missed_window = missed;
        self.is_in_yellow_zone = false;
        self.peak_time = 0.0;
        self.post_peak_hold_time = 0.0;
    }

    fn update_at_peak(&mut self, dt: f32, holding: bool, tuning: &Tuning) {
        if !holding {
            // No input: the ground simply absorbs the landing
            self.current_compression *= (-tuning.relax_rate * dt).exp();
            return;
        }

        self.post_peak_hold_time += dt;
        let over = self.post_peak_hold_time - self.windows.peak_grace;
        if over > 0.0 {
            let accel = 1.0 + tuning.overhold_accel_growth * over * self.landing.difficulty.max(1.0);
            self.current_compression *= (-tuning.overhold_decay_rate * accel * dt).exp();
            self.charge_efficiency =
                (self.charge_efficiency - tuning.overhold_efficiency_decay * accel * dt).clamp(0.0, 1.0);
        }
        if self.post_peak_hold_time > self.windows.fail_hold_time && !self.hold_lockout {
            log::debug!("Hold lockout after {:.3}s past peak", self.post_peak_hold_time);
            self.hold_lockout = true;
        }
    }
}
