//! Game session
//!
//! Owns the tuning table, the fixed-timestep driver, the gesture classifier
//! and the world state. The host calls [`Session::frame`] once per display
//! frame with the real elapsed time and forwards pointer events in between.

use glam::Vec2;

use super::events::PresentationSink;
use super::gesture::{GestureClassifier, GestureConfig, PointerId};
use super::player::StepOutcome;
use super::state::GameState;
use super::tick::{TickInput, tick};
use super::timestep::FixedTimestep;
use crate::tuning::Tuning;

pub struct Session {
    tuning: Tuning,
    timestep: FixedTimestep,
    gestures: GestureClassifier,
    /// Session clock in milliseconds, advanced by `frame`
    clock_ms: f64,
    /// Player was ascending at the start of the previous frame
    was_ascending: bool,
    state: GameState,
}

impl Session {
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        log::info!("Session start (seed {seed})");
        Self {
            timestep: FixedTimestep::default(),
            gestures: GestureClassifier::new(GestureConfig::from_tuning(&tuning)),
            clock_ms: 0.0,
            was_ascending: false,
            state: GameState::new(&tuning, seed),
            tuning,
        }
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn gestures(&self) -> &GestureClassifier {
        &self.gestures
    }

    pub fn record_height(&self) -> f32 {
        self.state.record_height
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over()
    }

    /// Render interpolation between the last two fixed steps
    pub fn alpha(&self) -> f32 {
        self.timestep.alpha()
    }

    /// Run one display frame.
    ///
    /// `input` carries host-resolved signals (keyboard, tests); pointer
    /// gestures are merged in. A swipe or bullet-time request applies to the
    /// first fixed step only. Events are delivered to `sink` at the end.
    /// Returns the number of fixed steps taken.
    pub fn frame(&mut self, real_ms: f64, input: &TickInput, sink: &mut impl PresentationSink) -> u32 {
        self.clock_ms += real_ms.max(0.0);

        // A fresh ascent gets a fresh lane decision, before gestures are read
        let ascending = self.state.player.is_ascending();
        if ascending && !self.was_ascending {
            self.gestures.reset_lane_lock();
        }
        self.was_ascending = ascending;
        self.gestures.update(self.clock_ms);

        let steps = self.timestep.advance(real_ms);
        if steps > 0 {
            let swipe = if input.swipe != 0 {
                input.swipe
            } else {
                self.gestures.take_swipe()
            };
            let mut step_input = TickInput {
                hold: input.hold || self.gestures.is_hold_active(),
                swipe,
                bullet_time: input.bullet_time,
                lane_locked: input.lane_locked || self.gestures.lane_switch_locked(),
            };
            for _ in 0..steps {
                self.tick(&step_input);
                step_input.swipe = 0;
                step_input.bullet_time = false;
            }
        }

        self.drain_events(sink);
        steps
    }

    /// Run exactly one fixed step with explicit input
    pub fn tick(&mut self, input: &TickInput) -> StepOutcome {
        let was_over = self.state.is_game_over();
        let outcome = tick(&mut self.state, input, &self.tuning, self.timestep.dt());
        if !was_over && self.state.is_game_over() {
            log::info!(
                "Game over after {} ticks, record {:.0}px",
                self.state.time_ticks,
                self.state.record_height
            );
        }
        outcome
    }

    /// Deliver and clear pending events
    pub fn drain_events(&mut self, sink: &mut impl PresentationSink) {
        for event in self.state.events.drain(..) {
            sink.on_event(&event);
        }
    }

    /// Restart: fresh world on the same seed
    pub fn reset(&mut self) {
        log::info!("Session restart (seed {})", self.state.seed);
        self.state.reset(&self.tuning);
        self.timestep.reset();
        self.gestures.reset();
        self.was_ascending = false;
    }

    pub fn pointer_down(&mut self, id: PointerId, pos: Vec2) {
        self.gestures.pointer_down(id, pos, self.clock_ms);
    }

    pub fn pointer_move(&mut self, id: PointerId, pos: Vec2) {
        self.gestures.pointer_move(id, pos, self.clock_ms);
    }

    pub fn pointer_up(&mut self, id: PointerId, pos: Vec2) {
        self.gestures.pointer_up(id, pos, self.clock_ms);
    }

    pub fn pointer_cancel(&mut self, id: PointerId) {
        self.gestures.pointer_cancel(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::events::{GameEvent, NullSink, Rating, RecordingSink};
    use crate::sim::player::PlayerState;
    use crate::sim::scoring;
    use proptest::prelude::*;

    fn quiet_tuning() -> Tuning {
        Tuning {
            dir_min_height: f32::MAX,
            bt_auto_height: f32::MAX,
            ..Tuning::default()
        }
    }

    fn hold(hold: bool) -> TickInput {
        TickInput {
            hold,
            ..Default::default()
        }
    }

    /// Hold through each descent and let go as soon as the yellow zone opens
    fn perfect_policy(session: &Session) -> TickInput {
        let player = &session.state().player;
        let hold = match &player.state {
            PlayerState::Idle => true,
            PlayerState::Airborne(_) => player.vy >= 0.0,
            PlayerState::Charging(charge) => !charge.is_in_yellow_zone,
        };
        TickInput {
            hold,
            ..Default::default()
        }
    }

    /// Run `total_ms` in frames cycling through `splits`, holding for the
    /// first `hold_ms` of it. Both boundaries must land on frame edges.
    fn run_split(splits: &[u32], hold_ms: u32, total_ms: u32) -> (Session, RecordingSink) {
        let mut session = Session::new(Tuning::default(), 77);
        let mut sink = RecordingSink::default();
        let mut elapsed = 0;
        let mut i = 0;
        while elapsed < total_ms {
            let limit = if elapsed < hold_ms { hold_ms } else { total_ms };
            let ms = splits[i % splits.len()].min(limit - elapsed);
            session.frame(f64::from(ms), &hold(elapsed < hold_ms), &mut sink);
            elapsed += ms;
            i += 1;
        }
        (session, sink)
    }

    #[test]
    fn test_frame_split_determinism() {
        let (a, a_events) = run_split(&[16], 1500, 6000);
        let (b, b_events) = run_split(&[7, 33, 4, 21], 1500, 6000);
        assert_eq!(a.state().time_ticks, b.state().time_ticks);
        assert_eq!(a.state().player.pos, b.state().player.pos);
        assert_eq!(a.state().player.vy, b.state().player.vy);
        assert_eq!(a.state().ground.offsets(), b.state().ground.offsets());
        assert_eq!(a_events.events, b_events.events);
        assert!(!a_events.events.is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_any_split_matches_single_frames(splits in prop::collection::vec(1u32..60, 1..6)) {
            let (a, a_events) = run_split(&[10], 1000, 3000);
            let (b, b_events) = run_split(&splits, 1000, 3000);
            prop_assert_eq!(a.state().player.pos, b.state().player.pos);
            prop_assert_eq!(a_events.events, b_events.events);
        }
    }

    #[test]
    fn test_three_perfects_then_streak_bonus() {
        let mut session = Session::new(quiet_tuning(), 3);
        let mut plans = Vec::new();
        for _ in 0..20_000 {
            let landing = session.state().player.charge().map(|c| c.landing);
            let streak_before = session.state().player.perfect_streak;
            let outcome = session.tick(&perfect_policy(&session));
            if let (Some(plan), Some(landing)) = (outcome.launch, landing) {
                plans.push((plan, landing, streak_before));
                if plans.len() == 4 {
                    break;
                }
            }
        }
        assert_eq!(plans.len(), 4);

        let tuning = session.tuning().clone();
        let streaks: Vec<u32> = plans.iter().map(|(p, _, _)| p.streak).collect();
        assert_eq!(streaks, vec![1, 2, 3, 4]);
        assert!(plans.iter().all(|(p, _, _)| p.rating == Rating::Perfect));

        let (fourth, landing, before) = plans[3];
        assert_eq!(before, 3);
        let with_bonus = scoring::target_height(Rating::Perfect, &landing, 3, &tuning);
        let without = scoring::target_height(Rating::Perfect, &landing, 2, &tuning);
        assert_eq!(fourth.target_height, with_bonus);
        assert!(with_bonus > without);
        assert!(session.record_height() > plans[0].0.predicted_apex * 0.9);
    }

    #[test]
    fn test_two_pointers_swipe_and_hold() {
        let mut session = Session::new(quiet_tuning(), 1);
        let mut sink = RecordingSink::default();
        // Hop first so the swipe has somewhere to go
        session.frame(10.0, &hold(true), &mut sink);
        session.frame(10.0, &hold(false), &mut sink);
        assert!(session.state().player.is_ascending());

        session.pointer_down(1, Vec2::new(100.0, 400.0));
        session.pointer_down(2, Vec2::new(260.0, 400.0));
        session.frame(10.0, &TickInput::default(), &mut sink);
        session.pointer_move(1, Vec2::new(130.0, 402.0));
        session.frame(10.0, &TickInput::default(), &mut sink);
        assert!(sink.events.contains(&GameEvent::LaneChanged { lane: 2 }));

        for _ in 0..8 {
            session.frame(10.0, &TickInput::default(), &mut sink);
        }
        assert!(session.gestures().is_hold_active());
        assert_eq!(session.state().lanes.lane(), 2);
    }

    #[test]
    fn test_hold_pointer_blocks_swipe() {
        // Strong launch so the whole exchange happens on the way up
        let tuning = Tuning {
            base_launch_velocity: 4000.0,
            ..quiet_tuning()
        };
        let mut session = Session::new(tuning, 1);
        let mut sink = RecordingSink::default();
        session.frame(10.0, &hold(true), &mut sink);
        session.frame(10.0, &hold(false), &mut sink);
        assert!(session.state().player.is_ascending());

        session.pointer_down(1, Vec2::new(100.0, 400.0));
        for _ in 0..10 {
            session.frame(10.0, &TickInput::default(), &mut sink);
        }
        assert!(session.gestures().is_hold_active());
        assert!(session.gestures().lane_switch_locked());
        assert!(session.state().player.is_ascending());

        session.pointer_down(2, Vec2::new(260.0, 400.0));
        session.pointer_move(2, Vec2::new(300.0, 400.0));
        session.frame(10.0, &TickInput::default(), &mut sink);
        assert_eq!(session.state().lanes.lane(), 1);
        assert!(
            !sink
                .events
                .iter()
                .any(|e| matches!(e, GameEvent::LaneChanged { .. }))
        );
    }

    #[test]
    fn test_hold_pointer_drives_fast_fall() {
        let mut session = Session::new(quiet_tuning(), 1);
        session.pointer_down(1, Vec2::new(180.0, 500.0));
        for _ in 0..10 {
            session.frame(10.0, &TickInput::default(), &mut NullSink);
        }
        // The hold registered as a press and hopped
        assert!(session.state().player.is_airborne());
        session.pointer_up(1, Vec2::new(180.0, 500.0));
        session.frame(10.0, &TickInput::default(), &mut NullSink);
        assert!(!session.gestures().is_hold_active());
    }

    #[test]
    fn test_reset_clears_session_state() {
        let mut session = Session::new(quiet_tuning(), 9);
        for _ in 0..2000 {
            let input = perfect_policy(&session);
            session.frame(8.0, &input, &mut NullSink);
        }
        assert!(session.record_height() > 0.0);
        session.pointer_down(4, Vec2::ZERO);

        session.reset();
        assert_eq!(session.record_height(), 0.0);
        assert_eq!(session.state().player.perfect_streak, 0);
        assert_eq!(session.state().time_ticks, 0);
        assert!(session.gestures().sessions().is_empty());
        assert!(matches!(session.state().player.state, PlayerState::Idle));
    }
}
