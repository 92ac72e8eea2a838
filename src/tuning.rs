//! Data-driven game balance
//!
//! Every gameplay constant lives in one flat [`Tuning`] table. The shipped
//! balance is [`Tuning::default`]; a JSON document can override any subset of
//! fields. Components receive `&Tuning` explicitly - there is no global.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating a tuning table
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to parse tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("tuning field `{field}` must be positive")]
    NonPositive { field: &'static str },
    #[error("tuning field `{field}` is out of range: {value}")]
    OutOfRange { field: &'static str, value: f32 },
    #[error("tuning curve `{field}` must be sorted by height")]
    CurveNotSorted { field: &'static str },
    #[error("tuning field `{field}` must be finite")]
    NonFinite { field: String },
}

/// Flat table of balance parameters.
///
/// Units: pixels, seconds, pixels/s, pixels/s² unless a field says otherwise.
/// World y grows downward; heights are measured upward from `ground_y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === World ===
    /// Resting ground line (world y)
    pub ground_y: f32,
    /// Viewport width; sets ground column count and swipe threshold
    pub viewport_width: f32,
    /// Collision radius of the player
    pub player_radius: f32,

    // === Airborne physics ===
    pub gravity: f32,
    /// Upward speed of the hop out of Idle
    pub base_launch_velocity: f32,
    /// Upward position nudge on leaving the ground (avoids instant re-contact)
    pub launch_nudge: f32,
    /// Fast-fall acceleration target while holding
    pub fast_fall_accel: f32,
    /// Time constant for ramping fast-fall accel up while holding
    pub fast_fall_attack_tau: f32,
    /// Time constant for decaying fast-fall accel after release
    pub fast_fall_release_tau: f32,
    /// Terminal velocity without hold
    pub terminal_velocity: f32,
    /// Terminal velocity while holding
    pub terminal_velocity_hold: f32,
    /// Floor of the dynamic velocity cap used by the energy integral
    pub energy_vy_cap_floor: f32,
    /// Accel cap used by the energy integral
    pub energy_accel_cap: f32,

    // === Landing ===
    /// targetCompression = impact_scale * impactSpeed²
    pub impact_scale: f32,
    pub max_compression: f32,
    /// landingDifficulty = max(1, apex / difficulty_ref_height)
    pub difficulty_ref_height: f32,
    /// Reference height for log2 scaling curves
    pub height_ref: f32,

    // === Charging ===
    pub compress_time: f32,
    pub compress_log_scale: f32,
    /// current/target above which the yellow (perfect) zone is active
    pub yellow_zone_proximity: f32,
    pub yellow_duration: f32,
    pub yellow_log_scale: f32,
    pub yellow_duration_min: f32,
    pub peak_epsilon: f32,
    /// Post-peak grace window, shrunk by landing difficulty
    pub peak_grace: f32,
    pub peak_grace_min: f32,
    /// Over-hold time after peak that sets hold lockout, shrunk by difficulty
    pub fail_hold_time: f32,
    pub fail_hold_time_min: f32,
    /// Exponential decay rate of compression while over-holding (1/s)
    pub overhold_decay_rate: f32,
    /// Linear decay of charge efficiency while over-holding (1/s)
    pub overhold_efficiency_decay: f32,
    /// Growth of the over-hold decay factor per second of over-hold
    pub overhold_accel_growth: f32,
    /// Relaxation rate of compression when no input is present (1/s)
    pub relax_rate: f32,
    pub settle_epsilon: f32,
    /// Charge efficiency at or below which a release is Failed
    pub dead_efficiency: f32,

    // === Rating ===
    /// Above this landing height the fast-fall fraction gate applies
    pub safe_zone_height: f32,
    /// Minimum fastFallDistance / fallDistance to keep a Perfect
    pub min_fast_fall_fraction: f32,

    // === Height growth ===
    pub decay_floor: f32,
    pub base_growth_rate: f32,
    pub height_log_bonus: f32,
    pub streak_bonus_threshold: u32,
    pub streak_growth_multiplier: f32,
    /// Additive height bonus at energy ratio 1
    pub perfect_bonus: f32,
    pub min_launch_height: f32,
    pub normal_multiplier: f32,
    pub failed_multiplier: f32,
    /// dynamicNeedTime = need_time_base + need_time_per_px * fallDistance
    pub need_time_base: f32,
    pub need_time_per_px: f32,
    pub soft_cap_speed: f32,
    /// Fraction of speed above the soft cap that survives (non-Perfect)
    pub soft_cap_factor: f32,
    pub hard_cap_speed: f32,

    // === Health ===
    pub max_hp: u8,
    pub invulnerability_time: f32,

    // === Ground ===
    pub ground_column_width: f32,
    pub ground_tension: f32,
    pub ground_stiffness: f32,
    pub ground_damping: f32,
    pub ground_pressure_gain: f32,
    /// Gaussian spread in columns
    pub ground_pressure_sigma: f32,
    /// Columns either side of contact that receive pressure
    pub ground_pressure_radius: u32,
    pub ground_max_offset: f32,
    pub ground_substeps: u32,

    // === Gestures (milliseconds / pixels) ===
    /// Swipe threshold as a fraction of viewport width
    pub swipe_threshold_frac: f32,
    /// |dx| must exceed |dy| * dominance
    pub swipe_dominance: f32,
    pub swipe_cooldown_ms: f64,
    pub hold_delay_ms: f64,
    pub hold_tolerance_px: f32,

    // === Lanes ===
    pub lane_count: u8,
    pub lane_width: f32,
    pub lane_tween_time: f32,
    /// Vertical reach of a dash attack into the destination lane
    pub dash_reach: f32,

    // === Bullet time ===
    pub bt_energy_cap: f32,
    pub bt_starting_energy: f32,
    pub bt_activation_cost: f32,
    pub bt_kill_refund: f32,
    /// Total energy refundable by kills in one run
    pub bt_refund_cap: f32,
    pub bt_min_height: f32,
    pub bt_cooldown: f32,
    pub bt_min_scale: f32,
    pub bt_max_scale: f32,
    pub bt_scale_tau_height: f32,
    pub bt_base_duration: f32,
    pub bt_max_extra_duration: f32,
    pub bt_duration_tau_height: f32,
    pub bt_smoothing_tau: f32,
    /// Predicted apex at which bullet time is forced on launch (0 disables)
    pub bt_auto_height: f32,

    // === Monster director ===
    pub dir_min_height: f32,
    pub dir_range_start: f32,
    pub dir_range_end: f32,
    pub dir_range_end_floor: f32,
    pub dir_range_shrink_height: f32,
    pub dir_base_count: f32,
    pub dir_count_ref_height: f32,
    pub dir_count_growth: f32,
    pub dir_min_count: u32,
    pub dir_max_count: u32,
    pub dir_speed_growth: f32,
    pub dir_max_speed_multiplier: f32,
    /// Height -> probability of switching lane between consecutive monsters
    pub dir_alternate_lane_curve: Vec<(f32, f32)>,
    pub dir_same_lane_spacing: f32,
    pub dir_diagonal_spacing: f32,
    pub dir_min_spacing: f32,
    pub monster_base_speed: f32,
    pub monster_patrol_half_width: f32,
    pub monster_radius: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            ground_y: 0.0,
            viewport_width: 360.0,
            player_radius: 20.0,

            gravity: 2400.0,
            base_launch_velocity: 1200.0,
            launch_nudge: 1.0,
            fast_fall_accel: 6000.0,
            fast_fall_attack_tau: 0.05,
            fast_fall_release_tau: 0.12,
            terminal_velocity: 2600.0,
            terminal_velocity_hold: 6000.0,
            energy_vy_cap_floor: 600.0,
            energy_accel_cap: 6000.0,

            impact_scale: 0.00004,
            max_compression: 120.0,
            difficulty_ref_height: 2000.0,
            height_ref: 1000.0,

            compress_time: 0.12,
            compress_log_scale: 0.35,
            yellow_zone_proximity: 0.9,
            yellow_duration: 0.12,
            yellow_log_scale: 0.25,
            yellow_duration_min: 0.05,
            peak_epsilon: 0.5,
            peak_grace: 0.06,
            peak_grace_min: 0.02,
            fail_hold_time: 0.35,
            fail_hold_time_min: 0.12,
            overhold_decay_rate: 4.0,
            overhold_efficiency_decay: 2.5,
            overhold_accel_growth: 6.0,
            relax_rate: 6.0,
            settle_epsilon: 0.5,
            dead_efficiency: 0.05,

            safe_zone_height: 1500.0,
            min_fast_fall_fraction: 0.3,

            decay_floor: 0.85,
            base_growth_rate: 0.25,
            height_log_bonus: 0.05,
            streak_bonus_threshold: 3,
            streak_growth_multiplier: 1.5,
            perfect_bonus: 120.0,
            min_launch_height: 300.0,
            normal_multiplier: 0.70,
            failed_multiplier: 0.40,
            need_time_base: 0.1,
            need_time_per_px: 0.00008,
            soft_cap_speed: 7000.0,
            soft_cap_factor: 0.25,
            hard_cap_speed: 9000.0,

            max_hp: 3,
            invulnerability_time: 1.0,

            ground_column_width: 6.0,
            ground_tension: 900.0,
            ground_stiffness: 60.0,
            ground_damping: 8.0,
            ground_pressure_gain: 60.0,
            ground_pressure_sigma: 3.0,
            ground_pressure_radius: 8,
            ground_max_offset: 120.0,
            ground_substeps: 2,

            swipe_threshold_frac: 0.05,
            swipe_dominance: 1.0,
            swipe_cooldown_ms: 150.0,
            hold_delay_ms: 80.0,
            hold_tolerance_px: 10.0,

            lane_count: 3,
            lane_width: 100.0,
            lane_tween_time: 0.12,
            dash_reach: 80.0,

            bt_energy_cap: 100.0,
            bt_starting_energy: 100.0,
            bt_activation_cost: 35.0,
            bt_kill_refund: 10.0,
            bt_refund_cap: 150.0,
            bt_min_height: 800.0,
            bt_cooldown: 1.5,
            bt_min_scale: 0.3,
            bt_max_scale: 0.7,
            bt_scale_tau_height: 6000.0,
            bt_base_duration: 0.8,
            bt_max_extra_duration: 1.2,
            bt_duration_tau_height: 8000.0,
            bt_smoothing_tau: 0.08,
            bt_auto_height: 4000.0,

            dir_min_height: 600.0,
            dir_range_start: 0.35,
            dir_range_end: 0.9,
            dir_range_end_floor: 0.7,
            dir_range_shrink_height: 20000.0,
            dir_base_count: 2.0,
            dir_count_ref_height: 1000.0,
            dir_count_growth: 1.5,
            dir_min_count: 1,
            dir_max_count: 12,
            dir_speed_growth: 0.00005,
            dir_max_speed_multiplier: 2.5,
            dir_alternate_lane_curve: vec![(0.0, 0.2), (3000.0, 0.45), (10000.0, 0.75)],
            dir_same_lane_spacing: 1.4,
            dir_diagonal_spacing: 1.25,
            dir_min_spacing: 120.0,
            monster_base_speed: 60.0,
            monster_patrol_half_width: 30.0,
            monster_radius: 24.0,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) JSON override document and validate it
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        log::info!("Loaded tuning overrides");
        Ok(tuning)
    }

    /// Serialize the full table (useful as an override template)
    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check structural constraints the simulation relies on
    pub fn validate(&self) -> Result<(), TuningError> {
        if let Some(field) = self.first_non_finite()? {
            return Err(TuningError::NonFinite { field });
        }

        let positive = [
            ("viewport_width", self.viewport_width),
            ("gravity", self.gravity),
            ("base_launch_velocity", self.base_launch_velocity),
            ("terminal_velocity", self.terminal_velocity),
            ("terminal_velocity_hold", self.terminal_velocity_hold),
            ("max_compression", self.max_compression),
            ("difficulty_ref_height", self.difficulty_ref_height),
            ("height_ref", self.height_ref),
            ("compress_time", self.compress_time),
            ("yellow_duration_min", self.yellow_duration_min),
            ("hard_cap_speed", self.hard_cap_speed),
            ("ground_column_width", self.ground_column_width),
            ("ground_max_offset", self.ground_max_offset),
            ("lane_width", self.lane_width),
            ("bt_energy_cap", self.bt_energy_cap),
            ("bt_scale_tau_height", self.bt_scale_tau_height),
            ("bt_duration_tau_height", self.bt_duration_tau_height),
            ("dir_count_ref_height", self.dir_count_ref_height),
            ("dir_range_shrink_height", self.dir_range_shrink_height),
        ];
        for (field, value) in positive {
            if value <= 0.0 {
                return Err(TuningError::NonPositive { field });
            }
        }
        if self.ground_substeps == 0 {
            return Err(TuningError::NonPositive {
                field: "ground_substeps",
            });
        }
        if self.lane_count == 0 {
            return Err(TuningError::NonPositive { field: "lane_count" });
        }

        let unit = [
            ("yellow_zone_proximity", self.yellow_zone_proximity),
            ("min_fast_fall_fraction", self.min_fast_fall_fraction),
            ("soft_cap_factor", self.soft_cap_factor),
            ("bt_min_scale", self.bt_min_scale),
            ("bt_max_scale", self.bt_max_scale),
            ("dir_range_start", self.dir_range_start),
            ("dir_range_end", self.dir_range_end),
            ("dir_range_end_floor", self.dir_range_end_floor),
        ];
        for (field, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(TuningError::OutOfRange { field, value });
            }
        }
        if self.dir_range_start >= self.dir_range_end_floor {
            return Err(TuningError::OutOfRange {
                field: "dir_range_start",
                value: self.dir_range_start,
            });
        }
        if self.bt_min_scale > self.bt_max_scale {
            return Err(TuningError::OutOfRange {
                field: "bt_min_scale",
                value: self.bt_min_scale,
            });
        }
        if self.soft_cap_speed > self.hard_cap_speed {
            return Err(TuningError::OutOfRange {
                field: "soft_cap_speed",
                value: self.soft_cap_speed,
            });
        }

        let sorted = self
            .dir_alternate_lane_curve
            .windows(2)
            .all(|pair| pair[0].0 <= pair[1].0);
        if !sorted {
            return Err(TuningError::CurveNotSorted {
                field: "dir_alternate_lane_curve",
            });
        }
        Ok(())
    }

    /// serde_json writes NaN and infinities as `null`, so any null in the
    /// serialized table names a non-finite field (curve points included)
    fn first_non_finite(&self) -> Result<Option<String>, TuningError> {
        fn has_null(value: &serde_json::Value) -> bool {
            match value {
                serde_json::Value::Null => true,
                serde_json::Value::Array(items) => items.iter().any(has_null),
                _ => false,
            }
        }
        let serde_json::Value::Object(fields) = serde_json::to_value(self)? else {
            return Ok(None);
        };
        Ok(fields
            .into_iter()
            .find(|(_, value)| has_null(value))
            .map(|(field, _)| field))
    }

    /// Number of ground columns spanning the viewport
    pub fn ground_columns(&self) -> usize {
        ((self.viewport_width / self.ground_column_width).ceil() as usize).max(1)
    }

    /// Swipe distance threshold in pixels
    pub fn swipe_threshold_px(&self) -> f32 {
        self.viewport_width * self.swipe_threshold_frac
    }
}
