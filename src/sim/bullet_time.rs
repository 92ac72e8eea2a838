//! Bullet-time energy manager
//!
//! A resource-gated slow-motion mode. Activation costs a fixed chunk of
//! energy; kills refund a little, up to a per-run total. Higher jumps get a
//! slower time scale and a longer (but bounded) duration. The time scale is
//! always eased toward its target, never stepped.

use serde::{Deserialize, Serialize};

use crate::approach;
use crate::tuning::Tuning;

/// Curves and costs, copied from the tuning table
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BulletTimeParams {
    pub energy_cap: f32,
    pub starting_energy: f32,
    pub activation_cost: f32,
    pub kill_refund: f32,
    pub refund_cap: f32,
    pub min_height: f32,
    pub cooldown: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    pub scale_tau_height: f32,
    pub base_duration: f32,
    pub max_extra_duration: f32,
    pub duration_tau_height: f32,
    pub smoothing_tau: f32,
}

impl BulletTimeParams {
    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self {
            energy_cap: tuning.bt_energy_cap,
            starting_energy: tuning.bt_starting_energy.clamp(0.0, tuning.bt_energy_cap),
            activation_cost: tuning.bt_activation_cost,
            kill_refund: tuning.bt_kill_refund,
            refund_cap: tuning.bt_refund_cap,
            min_height: tuning.bt_min_height,
            cooldown: tuning.bt_cooldown,
            min_scale: tuning.bt_min_scale,
            max_scale: tuning.bt_max_scale,
            scale_tau_height: tuning.bt_scale_tau_height,
            base_duration: tuning.bt_base_duration,
            max_extra_duration: tuning.bt_max_extra_duration,
            duration_tau_height: tuning.bt_duration_tau_height,
            smoothing_tau: tuning.bt_smoothing_tau,
        }
    }

    /// Higher apex -> slower time
    pub fn time_scale_for(&self, height: f32) -> f32 {
        let falloff = (-height.max(0.0) / self.scale_tau_height).exp();
        self.min_scale + (self.max_scale - self.min_scale) * falloff
    }

    /// Asymptotic growth toward `base + max_extra`
    pub fn duration_for(&self, height: f32) -> f32 {
        let growth = 1.0 - (-height.max(0.0) / self.duration_tau_height).exp();
        self.base_duration + self.max_extra_duration * growth
    }
}

/// Player situation the manager checks each step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Altitude {
    pub height: f32,
    pub ascending: bool,
}

/// Transition reported by [`BulletTime::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletTimeChange {
    Ended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulletTime {
    params: BulletTimeParams,
    pub energy: f32,
    pub is_active: bool,
    /// Current (smoothed) time scale
    pub time_scale: f32,
    pub target_scale: f32,
    /// Seconds until activation is allowed again
    pub cooldown: f32,
    pub active_time: f32,
    pub duration: f32,
    /// Energy refunded by kills so far this run
    pub refunded: f32,
    /// Started by a high launch rather than by the player
    pub forced: bool,
}

impl BulletTime {
    pub fn new(params: BulletTimeParams) -> Self {
        Self {
            params,
            energy: params.starting_energy,
            is_active: false,
            time_scale: 1.0,
            target_scale: 1.0,
            cooldown: 0.0,
            active_time: 0.0,
            duration: 0.0,
            refunded: 0.0,
            forced: false,
        }
    }

    /// Explicit activation. Returns whether it took effect.
    pub fn try_activate(&mut self, altitude: Altitude) -> bool {
        let ready = !self.is_active
            && self.cooldown <= 0.0
            && altitude.height >= self.params.min_height
            && altitude.ascending
            && self.energy >= self.params.activation_cost;
        if !ready {
            return false;
        }
        self.energy -= self.params.activation_cost;
        self.forced = false;
        self.start(altitude.height);
        true
    }

    /// Forced activation for a predicted apex; skips cooldown, energy and
    /// minimum-height gates but still drains what energy there is.
    pub fn force_activate(&mut self, target_apex: f32) -> bool {
        if self.is_active {
            return false;
        }
        self.energy = (self.energy - self.params.activation_cost).max(0.0);
        self.forced = true;
        self.start(target_apex);
        true
    }

    fn start(&mut self, height: f32) {
        self.is_active = true;
        self.active_time = 0.0;
        self.target_scale = self.params.time_scale_for(height);
        self.duration = self.params.duration_for(height);
        log::debug!(
            "Bullet time on: scale {:.2}, {:.2}s at {:.0}px",
            self.target_scale,
            self.duration,
            height
        );
    }

    /// End bullet time now. Idempotent; returns whether it was active.
    pub fn deactivate(&mut self) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.forced = false;
        self.target_scale = 1.0;
        self.cooldown = self.params.cooldown;
        log::debug!("Bullet time off after {:.2}s", self.active_time);
        true
    }

    /// Touchdown: end any active period and return to real time at once.
    /// Returns whether bullet time was active.
    pub fn land(&mut self) -> bool {
        let was_active = self.deactivate();
        self.time_scale = 1.0;
        self.target_scale = 1.0;
        was_active
    }

    /// Advance on real (unscaled) time
    pub fn update(&mut self, dt: f32, altitude: Altitude) -> Option<BulletTimeChange> {
        self.time_scale = approach(self.time_scale, self.target_scale, dt, self.params.smoothing_tau);

        if !self.is_active {
            self.cooldown = (self.cooldown - dt).max(0.0);
            return None;
        }

        self.active_time += dt;
        let expired = self.active_time >= self.duration;
        let too_low = !self.forced && altitude.height < self.params.min_height;
        if expired || !altitude.ascending || too_low {
            self.deactivate();
            return Some(BulletTimeChange::Ended);
        }
        None
    }

    /// Kill refund, bounded by the energy cap and the per-run refund cap
    pub fn refund_kill(&mut self) -> f32 {
        let gain = self
            .params
            .kill_refund
            .min(self.params.refund_cap - self.refunded)
            .min(self.params.energy_cap - self.energy)
            .max(0.0);
        self.energy += gain;
        self.refunded += gain;
        gain
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn manager() -> BulletTime {
        BulletTime::new(BulletTimeParams::from_tuning(&Tuning::default()))
    }

    const HIGH_UP: Altitude = Altitude {
        height: 2000.0,
        ascending: true,
    };

    #[test]
    fn test_activation_preconditions() {
        let mut bt = manager();
        assert!(!bt.try_activate(Altitude { height: 100.0, ascending: true }));
        assert!(!bt.try_activate(Altitude { height: 2000.0, ascending: false }));
        assert!(bt.try_activate(HIGH_UP));
        assert!(!bt.try_activate(HIGH_UP), "already active");
        assert_eq!(bt.energy, 65.0);
    }

    #[test]
    fn test_insufficient_energy() {
        let mut bt = manager();
        bt.energy = 10.0;
        assert!(!bt.try_activate(HIGH_UP));
    }

    #[test]
    fn test_curves() {
        let p = BulletTimeParams::from_tuning(&Tuning::default());
        assert!((p.time_scale_for(0.0) - p.max_scale).abs() < 1e-6);
        assert!(p.time_scale_for(50000.0) < p.time_scale_for(2000.0));
        assert!(p.time_scale_for(1e9) >= p.min_scale);
        assert!(p.duration_for(50000.0) > p.duration_for(2000.0));
        assert!(p.duration_for(1e9) <= p.base_duration + p.max_extra_duration + 1e-4);
    }

    #[test]
    fn test_time_scale_is_smoothed() {
        let mut bt = manager();
        bt.try_activate(HIGH_UP);
        bt.update(SIM_DT, HIGH_UP);
        assert!(bt.time_scale < 1.0);
        assert!(bt.time_scale > bt.target_scale);
    }

    #[test]
    fn test_expires_then_cools_down() {
        let mut bt = manager();
        bt.try_activate(HIGH_UP);
        let mut ended = false;
        for _ in 0..600 {
            if bt.update(SIM_DT, HIGH_UP) == Some(BulletTimeChange::Ended) {
                ended = true;
                break;
            }
        }
        assert!(ended);
        assert_eq!(bt.target_scale, 1.0);
        assert!(!bt.try_activate(HIGH_UP), "cooling down");
        for _ in 0..240 {
            bt.update(SIM_DT, HIGH_UP);
        }
        assert!(bt.try_activate(HIGH_UP));
    }

    #[test]
    fn test_ends_when_descending() {
        let mut bt = manager();
        bt.try_activate(HIGH_UP);
        let falling = Altitude { height: 2000.0, ascending: false };
        assert_eq!(bt.update(SIM_DT, falling), Some(BulletTimeChange::Ended));
        assert!(!bt.deactivate(), "deactivate is idempotent");
    }

    #[test]
    fn test_landing_snaps_to_real_time() {
        let mut bt = manager();
        bt.try_activate(HIGH_UP);
        for _ in 0..10 {
            bt.update(SIM_DT, HIGH_UP);
        }
        // Ended on the way down but still easing back
        let falling = Altitude { height: 2000.0, ascending: false };
        assert_eq!(bt.update(SIM_DT, falling), Some(BulletTimeChange::Ended));
        assert!(bt.time_scale < 1.0);

        assert!(!bt.land());
        assert_eq!(bt.time_scale, 1.0);
        assert_eq!(bt.target_scale, 1.0);

        bt.cooldown = 0.0;
        bt.try_activate(HIGH_UP);
        bt.update(SIM_DT, HIGH_UP);
        assert!(bt.land());
        assert!(!bt.is_active);
        assert_eq!(bt.time_scale, 1.0);
    }

    #[test]
    fn test_force_ignores_cooldown() {
        let mut bt = manager();
        bt.energy = 5.0;
        bt.cooldown = 1.0;
        assert!(bt.force_activate(8000.0));
        assert_eq!(bt.energy, 0.0);
        assert!(bt.is_active);
        // Launch height is still below the manual threshold
        let launching = Altitude { height: 10.0, ascending: true };
        assert_eq!(bt.update(SIM_DT, launching), None);
        assert!(bt.is_active);
    }

    #[test]
    fn test_refund_caps() {
        let mut bt = manager();
        assert_eq!(bt.refund_kill(), 0.0, "already full");
        bt.energy = 0.0;
        let total: f32 = (0..40).map(|_| {
            let gain = bt.refund_kill();
            bt.energy = 0.0;
            gain
        }).sum();
        assert_eq!(total, bt.params.refund_cap);
    }
}
