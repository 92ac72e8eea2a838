//! Player state machine
//!
//! Idle -> Airborne -> Charging -> (Airborne | Idle). Each state carries its
//! own payload so fields that only make sense in one state cannot leak into
//! another. Transitions go through [`Player::transition`], which runs the
//! exit action of the current state and the entry action of the next.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::charge::{Charge, ChargeStep, LandingSnapshot};
use super::events::{DeathCause, GameEvent};
use super::ground::Ground;
use super::scoring::{self, LaunchPlan};
use crate::approach;
use crate::tuning::Tuning;

/// Descent accumulators, reset on launch and again at apex
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FallTracker {
    /// Work done by fast-fall accel during the descent (per unit mass)
    pub fast_fall_energy: f32,
    /// Time spent holding while descending
    pub fast_fall_time: f32,
    pub fall_distance_since_apex: f32,
    pub fast_fall_distance: f32,
}

/// Airborne-state payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airborne {
    /// Extra downward accel from holding
    pub user_accel: f32,
    pub fall: FallTracker,
    /// Height of the last apex (launch height until the apex is seen)
    pub apex_height: f32,
    pub past_apex: bool,
}

impl Airborne {
    fn new(start_height: f32) -> Self {
        Self {
            user_accel: 0.0,
            fall: FallTracker::default(),
            apex_height: start_height,
            past_apex: false,
        }
    }
}

/// Current player state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerState {
    /// Grounded, waiting for a press
    Idle,
    Airborne(Airborne),
    Charging(Box<Charge>),
}

impl PlayerState {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerState::Idle => "Idle",
            PlayerState::Airborne(_) => "Airborne",
            PlayerState::Charging(_) => "Charging",
        }
    }
}

/// What happened to the player during one step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepOutcome {
    /// Touched down this step
    pub landed: bool,
    /// Launched this step
    pub launch: Option<LaunchPlan>,
    /// Hopped out of Idle; predicted apex height
    pub hop: Option<f32>,
    /// Apex height if the apex was crossed this step
    pub apex: Option<f32>,
    /// Charge settled back to Idle without a launch
    pub settled: bool,
    pub died: bool,
}

impl StepOutcome {
    /// Predicted apex of a jump that started this step
    pub fn predicted_apex(&self) -> Option<f32> {
        self.launch.map(|plan| plan.predicted_apex).or(self.hop)
    }
}

/// The controlled entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    /// Vertical velocity, positive = downward
    pub vy: f32,
    pub state: PlayerState,
    pub perfect_streak: u32,
    /// Hold signal from the previous step, for edge detection
    prev_hold: bool,
}

impl Player {
    pub fn new(x: f32, tuning: &Tuning) -> Self {
        Self {
            pos: Vec2::new(x, tuning.ground_y),
            vy: 0.0,
            state: PlayerState::Idle,
            perfect_streak: 0,
            prev_hold: false,
        }
    }

    /// Height above the resting ground line
    pub fn height(&self, tuning: &Tuning) -> f32 {
        tuning.ground_y - self.pos.y
    }

    pub fn is_airborne(&self) -> bool {
        matches!(self.state, PlayerState::Airborne(_))
    }

    pub fn is_ascending(&self) -> bool {
        self.is_airborne() && self.vy < 0.0
    }

    /// Descending while the fast-fall accel is engaged
    pub fn is_fast_falling(&self) -> bool {
        match &self.state {
            PlayerState::Airborne(air) => self.vy > 0.0 && air.user_accel > 0.0 && self.prev_hold,
            _ => false,
        }
    }

    /// Current ground penetration (0 outside Charging)
    pub fn compression(&self) -> f32 {
        match &self.state {
            PlayerState::Charging(charge) => charge.current_compression,
            _ => 0.0,
        }
    }

    pub fn charge(&self) -> Option<&Charge> {
        match &self.state {
            PlayerState::Charging(charge) => Some(charge),
            _ => None,
        }
    }

    /// Exit current state, install `next`, run its entry action
    pub fn transition(&mut self, next: PlayerState, tuning: &Tuning) {
        log::debug!("Player {} -> {}", self.state.name(), next.name());
        self.exit_state();
        self.state = next;
        self.enter_state(tuning);
    }

    fn exit_state(&mut self) {
        if let PlayerState::Airborne(air) = &mut self.state {
            air.user_accel = 0.0;
        }
    }

    fn enter_state(&mut self, tuning: &Tuning) {
        match &self.state {
            PlayerState::Idle => {
                self.vy = 0.0;
                self.pos.y = tuning.ground_y;
            }
            PlayerState::Charging(_) => {
                self.vy = 0.0;
            }
            PlayerState::Airborne(_) => {
                // Nudge up so the first airborne step does not re-contact
                self.pos.y = self.pos.y.min(tuning.ground_y) - tuning.launch_nudge;
            }
        }
    }

    /// Advance one fixed step
    pub fn update(
        &mut self,
        dt: f32,
        hold: bool,
        ground: &Ground,
        tuning: &Tuning,
        events: &mut Vec<GameEvent>,
    ) -> StepOutcome {
        let pressed = hold && !self.prev_hold;
        let released = !hold && self.prev_hold;
        self.prev_hold = hold;

        let mut outcome = StepOutcome::default();
        match &mut self.state {
            PlayerState::Idle => {
                if pressed {
                    self.hop(tuning, events, &mut outcome);
                }
            }
            PlayerState::Airborne(_) => {
                if let Some(next) = self.update_airborne(dt, hold, ground, tuning, events, &mut outcome) {
                    self.transition(next, tuning);
                }
            }
            PlayerState::Charging(charge) => {
                let step = charge.update(dt, hold, released, tuning);
                self.pos.y = tuning.ground_y + charge.current_compression;
                match step {
                    ChargeStep::Continue => {}
                    ChargeStep::Release => self.release(tuning, events, &mut outcome),
                    ChargeStep::Settle { no_input } => self.settle(no_input, tuning, events, &mut outcome),
                }
            }
        }
        outcome
    }

    /// Idle -> Airborne at base launch speed
    fn hop(&mut self, tuning: &Tuning, events: &mut Vec<GameEvent>, outcome: &mut StepOutcome) {
        self.vy = -tuning.base_launch_velocity;
        self.transition(PlayerState::Airborne(Airborne::new(0.0)), tuning);
        let predicted = scoring::apex_for_speed(tuning.base_launch_velocity, tuning);
        events.push(GameEvent::ApexPredicted { height: predicted });
        outcome.hop = Some(predicted);
    }

    fn update_airborne(
        &mut self,
        dt: f32,
        hold: bool,
        ground: &Ground,
        tuning: &Tuning,
        events: &mut Vec<GameEvent>,
        outcome: &mut StepOutcome,
    ) -> Option<PlayerState> {
        let PlayerState::Airborne(air) = &mut self.state else {
            return None;
        };

        let (target, tau) = if hold {
            (tuning.fast_fall_accel, tuning.fast_fall_attack_tau)
        } else {
            (0.0, tuning.fast_fall_release_tau)
        };
        air.user_accel = approach(air.user_accel, target, dt, tau);

        let prev_vy = self.vy;
        self.vy += (tuning.gravity + air.user_accel) * dt;
        // Two-tier terminal velocity caps the energy integral below
        let cap = if hold {
            tuning.terminal_velocity_hold
        } else {
            tuning.terminal_velocity
        };
        self.vy = self.vy.min(cap);

        if prev_vy < 0.0 && self.vy >= 0.0 {
            let height = tuning.ground_y - self.pos.y;
            air.apex_height = height;
            air.past_apex = true;
            air.fall = FallTracker::default();
            events.push(GameEvent::ApexReached { height });
            outcome.apex = Some(height);
        }

        let dy = self.vy * dt;
        self.pos.y += dy;
        if dy > 0.0 {
            let fall = &mut air.fall;
            fall.fall_distance_since_apex += dy;
            if hold {
                fall.fast_fall_distance += dy;
                fall.fast_fall_time += dt;
            }
            // Only count speed free fall alone would not have produced
            let vy_cap = (2.0 * tuning.gravity * fall.fall_distance_since_apex)
                .sqrt()
                .max(tuning.energy_vy_cap_floor);
            let accel = air.user_accel.clamp(0.0, tuning.energy_accel_cap);
            fall.fast_fall_energy += accel * self.vy.min(vy_cap) * dt;
        }

        let surface_y = tuning.ground_y + ground.surface_offset_at(self.pos.x);
        if self.vy < 0.0 || self.pos.y < surface_y {
            return None;
        }

        // Touchdown: snapshot the descent before anything else reads it
        self.pos.y = surface_y;
        let impact_speed = self.vy.max(0.0);
        let raw_compression = tuning.impact_scale * impact_speed * impact_speed;
        let target_compression = raw_compression.min(tuning.max_compression);
        let landing = LandingSnapshot {
            impact_speed,
            fall_distance: air.fall.fall_distance_since_apex,
            fast_fall_distance: air.fall.fast_fall_distance,
            fast_fall_energy: air.fall.fast_fall_energy,
            fast_fall_time: air.fall.fast_fall_time,
            apex_height: air.apex_height,
            difficulty: (air.apex_height / tuning.difficulty_ref_height).max(1.0),
            overflow: (raw_compression - target_compression).max(0.0),
        };
        log::info!(
            "Landed from {:.0}px at {:.0}px/s (fast-fall {:.0}%)",
            landing.apex_height,
            impact_speed,
            landing.fast_fall_fraction() * 100.0
        );
        events.push(GameEvent::LandingImpact {
            intensity: (impact_speed / tuning.terminal_velocity_hold).clamp(0.0, 1.0),
        });
        outcome.landed = true;

        Some(PlayerState::Charging(Box::new(Charge::new(
            landing,
            target_compression,
            hold,
            tuning,
        ))))
    }

    /// Charging -> Airborne with a judged launch
    fn release(&mut self, tuning: &Tuning, events: &mut Vec<GameEvent>, outcome: &mut StepOutcome) {
        let PlayerState::Charging(charge) = &self.state else {
            return;
        };
        if charge.current_compression <= tuning.settle_epsilon {
            // Nothing stored to launch with
            self.settle(false, tuning, events, outcome);
            return;
        }

        let plan = scoring::plan_launch(charge, self.perfect_streak, tuning);
        self.perfect_streak = plan.streak;
        log::info!(
            "{} release: target {:.0}px, speed {:.0}px/s, streak {}",
            plan.rating.as_str(),
            plan.target_height,
            plan.speed,
            plan.streak
        );
        events.push(GameEvent::Rating {
            rating: plan.rating,
            streak: plan.streak,
        });

        self.vy = -plan.speed;
        self.transition(PlayerState::Airborne(Airborne::new(0.0)), tuning);
        events.push(GameEvent::ApexPredicted {
            height: plan.predicted_apex,
        });
        outcome.launch = Some(plan);
    }

    /// Charging -> Idle without a launch
    fn settle(&mut self, no_input: bool, tuning: &Tuning, events: &mut Vec<GameEvent>, outcome: &mut StepOutcome) {
        let apex = self.charge().map_or(0.0, |c| c.landing.apex_height);
        self.perfect_streak = 0;
        self.transition(PlayerState::Idle, tuning);
        outcome.settled = true;

        if no_input && apex > tuning.safe_zone_height {
            log::info!("No input after a {apex:.0}px fall: dead");
            events.push(GameEvent::Death {
                cause: DeathCause::NoInput,
            });
            outcome.died = true;
        } else {
            events.push(GameEvent::Settled);
        }
    }

    /// Back to a fresh Idle player (session restart)
    pub fn reset(&mut self, x: f32, tuning: &Tuning) {
        *self = Self::new(x, tuning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::events::Rating;

    struct Rig {
        tuning: Tuning,
        ground: Ground,
        player: Player,
        events: Vec<GameEvent>,
    }

    impl Rig {
        fn new() -> Self {
            let tuning = Tuning::default();
            let ground = Ground::new(&tuning);
            let player = Player::new(tuning.viewport_width / 2.0, &tuning);
            Self {
                tuning,
                ground,
                player,
                events: Vec::new(),
            }
        }

        fn step(&mut self, hold: bool) -> StepOutcome {
            self.player
                .update(SIM_DT, hold, &self.ground, &self.tuning, &mut self.events)
        }

        /// Step until `done` or the limit, returning the matching outcome
        fn run_until(&mut self, hold: bool, limit: usize, done: impl Fn(&StepOutcome, &Player) -> bool) -> StepOutcome {
            for _ in 0..limit {
                let outcome = self.step(hold);
                if done(&outcome, &self.player) {
                    return outcome;
                }
            }
            panic!("condition not reached in {limit} steps");
        }

        /// Drop the player from `height` with zero velocity
        fn drop_from(&mut self, height: f32) {
            self.player.vy = -1.0;
            self.player.pos.y = self.tuning.ground_y - height;
            self.player
                .transition(PlayerState::Airborne(Airborne::new(height)), &self.tuning);
            self.player.pos.y = self.tuning.ground_y - height;
        }
    }

    #[test]
    fn test_idle_press_hops() {
        let mut rig = Rig::new();
        assert_eq!(rig.step(false), StepOutcome::default());
        let outcome = rig.step(true);
        assert!(rig.player.is_airborne());
        assert!(rig.player.vy < 0.0);
        assert!(rig.player.pos.y < rig.tuning.ground_y);
        assert!(outcome.hop.is_some());
    }

    #[test]
    fn test_hop_reaches_apex_then_lands() {
        let mut rig = Rig::new();
        rig.step(true);
        let apex = rig.run_until(false, 2000, |o, _| o.apex.is_some());
        let expected = scoring::apex_for_speed(rig.tuning.base_launch_velocity, &rig.tuning);
        assert!((apex.apex.unwrap() - expected).abs() < 15.0);
        rig.run_until(false, 2000, |o, _| o.landed);
        assert!(matches!(rig.player.state, PlayerState::Charging(_)));
        assert_eq!(rig.player.vy, 0.0);
    }

    #[test]
    fn test_landing_snapshot_is_frozen() {
        let mut rig = Rig::new();
        rig.drop_from(1200.0);
        rig.run_until(true, 4000, |o, _| o.landed);
        let snapshot = rig.player.charge().unwrap().landing;
        assert!(snapshot.fast_fall_time > 0.0);
        assert!((snapshot.fast_fall_fraction() - 1.0).abs() < 0.01);
        for _ in 0..5 {
            rig.step(true);
        }
        assert_eq!(rig.player.charge().unwrap().landing, snapshot);
    }

    #[test]
    fn test_holding_falls_faster() {
        let mut free = Rig::new();
        free.drop_from(2000.0);
        let mut held = Rig::new();
        held.drop_from(2000.0);
        for _ in 0..60 {
            free.step(false);
            held.step(true);
        }
        assert!(held.player.vy > free.player.vy);
        assert!(free.player.vy <= free.tuning.terminal_velocity);
    }

    #[test]
    fn test_timed_release_in_yellow_is_perfect() {
        let mut rig = Rig::new();
        rig.drop_from(1200.0);
        rig.run_until(true, 4000, |o, _| o.landed);
        rig.run_until(true, 400, |_, p| p.charge().is_some_and(|c| c.is_in_yellow_zone));
        let outcome = rig.step(false);
        let plan = outcome.launch.expect("release should launch");
        assert_eq!(plan.rating, Rating::Perfect);
        assert_eq!(rig.player.perfect_streak, 1);
        assert!(rig.player.is_ascending());
        assert!(plan.target_height > 1200.0 * rig.tuning.decay_floor);
    }

    #[test]
    fn test_early_release_is_normal() {
        let mut rig = Rig::new();
        rig.drop_from(1200.0);
        rig.run_until(true, 4000, |o, _| o.landed);
        rig.step(true);
        let plan = rig.step(false).launch.expect("release should launch");
        assert_eq!(plan.rating, Rating::Normal);
        assert_eq!(rig.player.perfect_streak, 0);
    }

    #[test]
    fn test_overhold_lockout_then_release_fails() {
        let mut rig = Rig::new();
        rig.drop_from(1200.0);
        rig.run_until(true, 4000, |o, _| o.landed);
        rig.run_until(true, 400, |_, p| p.charge().is_some_and(|c| c.hold_lockout));
        let plan = rig.step(false).launch.expect("release after lockout still launches");
        assert_eq!(plan.rating, Rating::Failed);
        let landing_apex = 1200.0;
        assert!((plan.target_height - landing_apex * rig.tuning.failed_multiplier).abs() < 5.0);
    }

    #[test]
    fn test_no_input_above_safe_zone_dies() {
        let mut rig = Rig::new();
        rig.drop_from(3000.0);
        rig.run_until(false, 4000, |o, _| o.landed);
        let outcome = rig.run_until(false, 2000, |o, _| o.settled);
        assert!(outcome.died);
        assert!(rig.events.contains(&GameEvent::Death {
            cause: DeathCause::NoInput
        }));
        assert!(matches!(rig.player.state, PlayerState::Idle));
    }

    #[test]
    fn test_no_input_below_safe_zone_settles() {
        let mut rig = Rig::new();
        rig.player.perfect_streak = 4;
        rig.drop_from(600.0);
        rig.run_until(false, 4000, |o, _| o.landed);
        let outcome = rig.run_until(false, 2000, |o, _| o.settled);
        assert!(!outcome.died);
        assert_eq!(rig.player.perfect_streak, 0);
        assert!(rig.events.contains(&GameEvent::Settled));
    }

    #[test]
    fn test_apex_resets_fall_tracker() {
        let mut rig = Rig::new();
        rig.step(true);
        // Holding during the ascent does not count toward the descent
        rig.run_until(true, 2000, |o, _| o.apex.is_some());
        let PlayerState::Airborne(air) = &rig.player.state else {
            panic!("expected airborne");
        };
        assert!(air.past_apex);
        assert!(air.fall.fast_fall_time <= SIM_DT);
    }
}
