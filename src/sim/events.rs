//! Events emitted by the simulation for the presentation layer
//!
//! Events are fire-and-forget: the simulation pushes them while ticking and
//! the session drains them into a [`PresentationSink`] once per frame.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Outcome of a timed release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    Perfect,
    Normal,
    Failed,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Perfect => "PERFECT",
            Rating::Normal => "NORMAL",
            Rating::Failed => "FAILED",
        }
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// Landed from above the safe zone and never pressed during the charge
    NoInput,
    /// Health ran out from monster hits
    Health,
}

/// Notifications for camera, HUD, audio and sprites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A release was judged; `streak` is the perfect streak after the judgment
    Rating { rating: Rating, streak: u32 },
    /// Failure path back to Idle without a launch
    Settled,
    Death { cause: DeathCause },
    /// Ground contact, `intensity` normalized to 0..1
    LandingImpact { intensity: f32 },
    /// Monster destroyed; `direction` is -1/+1 for dashes, 0 for stomps
    Kill { direction: i8, position: Vec2 },
    /// Player took a hit and survived
    Damaged { hp: u8 },
    /// Launch committed; predicted apex height of the coming jump
    ApexPredicted { height: f32 },
    /// Top of the jump reached
    ApexReached { height: f32 },
    NewRecord { height: f32 },
    LaneChanged { lane: u8 },
    BulletTimeStarted { time_scale: f32, duration: f32 },
    BulletTimeEnded,
}

/// Presentation boundary.
///
/// Implemented by the rendering/audio side. The default handler ignores the
/// event.
pub trait PresentationSink {
    fn on_event(&mut self, event: &GameEvent) {
        let _ = event;
    }
}

/// Sink that drops everything (headless runs, tests)
#[derive(Debug, Default)]
pub struct NullSink;

impl PresentationSink for NullSink {}

/// Sink that records every event it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<GameEvent>,
}

impl PresentationSink for RecordingSink {
    fn on_event(&mut self, event: &GameEvent) {
        self.events.push(event.clone());
    }
}
