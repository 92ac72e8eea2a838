//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod bullet_time;
pub mod charge;
pub mod director;
pub mod events;
pub mod gesture;
pub mod ground;
pub mod health;
pub mod lanes;
pub mod player;
pub mod scoring;
pub mod session;
pub mod state;
pub mod tick;
pub mod timestep;

pub use bullet_time::{Altitude, BulletTime, BulletTimeParams};
pub use charge::{Charge, ChargeStep, LandingSnapshot};
pub use director::{AttackOutcome, Director, DirectorPlan, Monster, MonsterHit, SpawnBand};
pub use events::{DeathCause, GameEvent, NullSink, PresentationSink, Rating, RecordingSink};
pub use gesture::{GestureClassifier, GestureConfig, Intent, PointerId};
pub use ground::Ground;
pub use health::Health;
pub use lanes::{LaneRefusal, LaneSystem};
pub use player::{Player, PlayerState, StepOutcome};
pub use scoring::LaunchPlan;
pub use session::Session;
pub use state::{GamePhase, GameState};
pub use tick::{TickInput, tick};
pub use timestep::FixedTimestep;
