//! Release judgment and launch computation
//!
//! Turns a finished charge into a rating, a target height and a launch speed.

use serde::{Deserialize, Serialize};

use super::charge::{Charge, LandingSnapshot};
use super::events::Rating;
use crate::tuning::Tuning;
use crate::{height_log, lerp, safe_div};

/// Everything decided at the moment of release
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaunchPlan {
    pub rating: Rating,
    pub energy_ratio: f32,
    pub target_height: f32,
    /// Upward speed (positive magnitude)
    pub speed: f32,
    /// Apex the speed reaches under plain gravity
    pub predicted_apex: f32,
    /// Perfect streak after this release
    pub streak: u32,
}

/// Judge a release against the charge state
pub fn rate_release(charge: &Charge, tuning: &Tuning) -> Rating {
    if charge.hold_lockout || charge.charge_efficiency <= tuning.dead_efficiency {
        return Rating::Failed;
    }
    if !charge.in_perfect_window() {
        return Rating::Normal;
    }
    // A single late tap from high up does not earn a Perfect
    let landing = &charge.landing;
    if landing.apex_height > tuning.safe_zone_height
        && landing.fast_fall_fraction() < tuning.min_fast_fall_fraction
    {
        log::debug!(
            "Perfect downgraded: fast-fall fraction {:.2} from {:.0}px",
            landing.fast_fall_fraction(),
            landing.apex_height
        );
        return Rating::Normal;
    }
    Rating::Perfect
}

/// How much fast-fall work the player put into the descent (0..1).
///
/// Product of the energy share, the distance share and the time share, where
/// the time requirement grows with fall distance.
pub fn energy_ratio(landing: &LandingSnapshot, tuning: &Tuning) -> f32 {
    let potential = tuning.gravity * landing.fall_distance;
    let energy = safe_div(landing.fast_fall_energy, potential).clamp(0.0, 1.0);
    let distance = landing.fast_fall_fraction();
    let need_time = tuning.need_time_base + tuning.need_time_per_px * landing.fall_distance;
    let time = safe_div(landing.fast_fall_time, need_time).clamp(0.0, 1.0);
    energy * distance * time
}

/// Growth ceiling multiplier for a Perfect; `streak` is the count before
/// this release
pub fn growth_ceiling(apex_height: f32, streak: u32, tuning: &Tuning) -> f32 {
    let growth_rate = if streak >= tuning.streak_bonus_threshold {
        tuning.base_growth_rate * tuning.streak_growth_multiplier
    } else {
        tuning.base_growth_rate
    };
    1.0 + growth_rate + tuning.height_log_bonus * height_log(apex_height, tuning.height_ref)
}

/// Target height for the next jump
pub fn target_height(rating: Rating, landing: &LandingSnapshot, streak: u32, tuning: &Tuning) -> f32 {
    let apex = landing.apex_height.max(0.0);
    match rating {
        Rating::Perfect => {
            let ratio = energy_ratio(landing, tuning);
            let multiplier = lerp(tuning.decay_floor, growth_ceiling(apex, streak, tuning), ratio);
            let bonus = tuning.perfect_bonus * ratio;
            (apex * multiplier + bonus).max(tuning.min_launch_height)
        }
        Rating::Normal => apex * tuning.normal_multiplier,
        Rating::Failed => apex * tuning.failed_multiplier,
    }
}

/// Launch speed for a target height: ballistic speed, floored at the base
/// launch, soft-capped for non-Perfect releases, hard-capped for everyone
pub fn launch_speed(target_height: f32, rating: Rating, tuning: &Tuning) -> f32 {
    let mut speed = (2.0 * tuning.gravity * target_height.max(0.0)).sqrt();
    speed = speed.max(tuning.base_launch_velocity);
    if rating != Rating::Perfect && speed > tuning.soft_cap_speed {
        speed = tuning.soft_cap_speed + (speed - tuning.soft_cap_speed) * tuning.soft_cap_factor;
    }
    speed.min(tuning.hard_cap_speed)
}

/// Apex reached from ground level by an upward speed
pub fn apex_for_speed(speed: f32, tuning: &Tuning) -> f32 {
    safe_div(speed * speed, 2.0 * tuning.gravity)
}

/// Full release resolution. `streak` is the perfect streak before release.
pub fn plan_launch(charge: &Charge, streak: u32, tuning: &Tuning) -> LaunchPlan {
    let rating = rate_release(charge, tuning);
    let target = target_height(rating, &charge.landing, streak, tuning);
    let speed = launch_speed(target, rating, tuning);
    LaunchPlan {
        rating,
        energy_ratio: energy_ratio(&charge.landing, tuning),
        target_height: target,
        speed,
        predicted_apex: apex_for_speed(speed, tuning),
        streak: if rating == Rating::Perfect { streak + 1 } else { 0 },
    }
}
