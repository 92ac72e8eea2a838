//! Touch gesture classification
//!
//! Each active pointer gets its own session and is classified once into a
//! terminal intent: a horizontal swipe (lane change) or a still hold
//! (fast-fall + lane lock). Sessions never interfere with each other, so one
//! finger can swipe while another holds.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// Pointer id as reported by the platform
pub type PointerId = u32;

/// What a touch session turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Not yet decided
    Candidate,
    Swipe { direction: i8 },
    Hold,
}

/// One active pointer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureSession {
    pub id: PointerId,
    pub start: Vec2,
    /// Milliseconds
    pub start_time: f64,
    pub current: Vec2,
    pub intent: Intent,
    pub swipe_consumed: bool,
    pub hold_locked: bool,
}

/// Classification thresholds, copied from the tuning table
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GestureConfig {
    pub swipe_threshold: f32,
    pub swipe_dominance: f32,
    pub swipe_cooldown_ms: f64,
    pub hold_delay_ms: f64,
    pub hold_tolerance: f32,
}

impl GestureConfig {
    pub fn from_tuning(tuning: &Tuning) -> Self {
        Self {
            swipe_threshold: tuning.swipe_threshold_px(),
            swipe_dominance: tuning.swipe_dominance,
            swipe_cooldown_ms: tuning.swipe_cooldown_ms,
            hold_delay_ms: tuning.hold_delay_ms,
            hold_tolerance: tuning.hold_tolerance_px,
        }
    }
}

/// Multi-pointer Hold-vs-Swipe classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureClassifier {
    config: GestureConfig,
    /// Active sessions, kept sorted by pointer id
    sessions: Vec<GestureSession>,
    /// Fired swipe waiting to be consumed by the next tick
    pending_swipe: Option<i8>,
    /// Time (ms) before which a new swipe will not fire
    cooldown_until: f64,
    lane_switch_locked: bool,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            sessions: Vec::new(),
            pending_swipe: None,
            cooldown_until: f64::NEG_INFINITY,
            lane_switch_locked: false,
        }
    }

    pub fn pointer_down(&mut self, id: PointerId, pos: Vec2, now: f64) {
        // A repeated down for a live id restarts that session
        self.sessions.retain(|s| s.id != id);
        self.sessions.push(GestureSession {
            id,
            start: pos,
            start_time: now,
            current: pos,
            intent: Intent::Candidate,
            swipe_consumed: false,
            hold_locked: false,
        });
        self.sessions.sort_by_key(|s| s.id);
    }

    pub fn pointer_move(&mut self, id: PointerId, pos: Vec2, now: f64) {
        let Some(index) = self.sessions.iter().position(|s| s.id == id) else {
            return;
        };
        self.sessions[index].current = pos;
        self.classify(index, now);
    }

    pub fn pointer_up(&mut self, id: PointerId, pos: Vec2, now: f64) {
        if let Some(index) = self.sessions.iter().position(|s| s.id == id) {
            // A fast flick may only cross the threshold on its final sample
            self.sessions[index].current = pos;
            self.classify(index, now);
        }
        self.sessions.retain(|s| s.id != id);
    }

    pub fn pointer_cancel(&mut self, id: PointerId) {
        self.sessions.retain(|s| s.id != id);
    }

    /// Re-evaluate time-based intents (hold delay) for still pointers
    pub fn update(&mut self, now: f64) {
        for index in 0..self.sessions.len() {
            self.classify(index, now);
        }
    }

    fn classify(&mut self, index: usize, now: f64) {
        let config = self.config;
        let Some(session) = self.sessions.get_mut(index) else {
            return;
        };
        if session.intent != Intent::Candidate {
            return;
        }

        let delta = session.current - session.start;
        let (adx, ady) = (delta.x.abs(), delta.y.abs());

        if adx >= config.swipe_threshold && adx > ady * config.swipe_dominance {
            let direction = if delta.x > 0.0 { 1 } else { -1 };
            session.intent = Intent::Swipe { direction };
            if !session.swipe_consumed && now >= self.cooldown_until {
                session.swipe_consumed = true;
                self.pending_swipe = Some(direction);
                self.cooldown_until = now + config.swipe_cooldown_ms;
                log::debug!("Swipe {direction:+} from pointer {}", session.id);
            }
        } else if now - session.start_time >= config.hold_delay_ms
            && adx <= config.hold_tolerance
            && ady <= config.hold_tolerance
        {
            session.intent = Intent::Hold;
            session.hold_locked = true;
            self.lane_switch_locked = true;
            log::debug!("Hold from pointer {}", session.id);
        }
    }

    /// Consume the fired swipe direction (-1, +1), or 0 if none
    pub fn take_swipe(&mut self) -> i8 {
        self.pending_swipe.take().unwrap_or(0)
    }

    /// Some pointer is down and classified as a hold
    pub fn is_hold_active(&self) -> bool {
        self.sessions.iter().any(|s| s.intent == Intent::Hold)
    }

    pub fn lane_switch_locked(&self) -> bool {
        self.lane_switch_locked
    }

    /// Allow a fresh lane decision (start of each ascent)
    pub fn reset_lane_lock(&mut self) {
        self.lane_switch_locked = false;
    }

    pub fn sessions(&self) -> &[GestureSession] {
        &self.sessions
    }

    /// Drop every session and timer (session restart)
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> GestureClassifier {
        GestureClassifier::new(GestureConfig::from_tuning(&Tuning::default()))
    }

    #[test]
    fn test_swipe_right_fires_once() {
        let mut g = classifier();
        g.pointer_down(1, Vec2::new(100.0, 300.0), 0.0);
        g.pointer_move(1, Vec2::new(110.0, 301.0), 10.0);
        assert_eq!(g.take_swipe(), 0);
        g.pointer_move(1, Vec2::new(125.0, 302.0), 20.0);
        assert_eq!(g.take_swipe(), 1);
        g.pointer_move(1, Vec2::new(200.0, 302.0), 30.0);
        assert_eq!(g.take_swipe(), 0);
        assert!(!g.is_hold_active());
    }

    #[test]
    fn test_vertical_drag_is_not_swipe() {
        let mut g = classifier();
        g.pointer_down(1, Vec2::new(100.0, 300.0), 0.0);
        g.pointer_move(1, Vec2::new(120.0, 360.0), 20.0);
        assert_eq!(g.take_swipe(), 0);
        assert_eq!(g.sessions()[0].intent, Intent::Candidate);
    }

    #[test]
    fn test_hold_after_delay_locks_lanes() {
        let mut g = classifier();
        g.pointer_down(7, Vec2::new(50.0, 50.0), 0.0);
        g.update(40.0);
        assert!(!g.is_hold_active());
        g.pointer_move(7, Vec2::new(53.0, 48.0), 60.0);
        g.update(85.0);
        assert!(g.is_hold_active());
        assert!(g.lane_switch_locked());

        // Sticky: moving far afterwards does not turn it into a swipe
        g.pointer_move(7, Vec2::new(200.0, 50.0), 120.0);
        assert!(g.is_hold_active());
        assert_eq!(g.take_swipe(), 0);

        g.pointer_up(7, Vec2::new(200.0, 50.0), 130.0);
        assert!(!g.is_hold_active());
        // The lane lock outlives the pointer until explicitly reset
        assert!(g.lane_switch_locked());
        g.reset_lane_lock();
        assert!(!g.lane_switch_locked());
    }

    #[test]
    fn test_swipe_cooldown() {
        let mut g = classifier();
        g.pointer_down(1, Vec2::ZERO, 0.0);
        g.pointer_up(1, Vec2::new(-30.0, 0.0), 20.0);
        assert_eq!(g.take_swipe(), -1);

        g.pointer_down(2, Vec2::ZERO, 50.0);
        g.pointer_up(2, Vec2::new(30.0, 0.0), 60.0);
        assert_eq!(g.take_swipe(), 0, "still cooling down");

        g.pointer_down(3, Vec2::ZERO, 300.0);
        g.pointer_up(3, Vec2::new(30.0, 0.0), 310.0);
        assert_eq!(g.take_swipe(), 1);
    }

    #[test]
    fn test_simultaneous_swipe_and_hold() {
        let mut g = classifier();
        g.pointer_down(1, Vec2::new(100.0, 300.0), 0.0);
        g.pointer_down(2, Vec2::new(250.0, 300.0), 0.0);
        g.pointer_move(1, Vec2::new(125.0, 303.0), 30.0);
        g.update(90.0);
        assert_eq!(g.take_swipe(), 1);
        assert!(g.is_hold_active());
        let intents: Vec<_> = g.sessions().iter().map(|s| s.intent).collect();
        assert_eq!(intents, vec![Intent::Swipe { direction: 1 }, Intent::Hold]);
    }

    #[test]
    fn test_cancel_drops_session() {
        let mut g = classifier();
        g.pointer_down(1, Vec2::ZERO, 0.0);
        g.update(100.0);
        assert!(g.is_hold_active());
        g.pointer_cancel(1);
        assert!(!g.is_hold_active());
        assert!(g.sessions().is_empty());
    }
}
