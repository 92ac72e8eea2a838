//! Fixed timestep simulation tick
//!
//! Advances the whole world by one step. Order within a step is fixed:
//! bullet time, player, ground, lanes, then monsters and collisions.

use super::bullet_time::{Altitude, BulletTimeChange};
use super::director::AttackOutcome;
use super::events::{DeathCause, GameEvent};
use super::player::{PlayerState, StepOutcome};
use super::state::{GamePhase, GameState};
use crate::tuning::Tuning;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Hold / fast-fall signal
    pub hold: bool,
    /// Lane swipe direction: -1, 0 or +1
    pub swipe: i8,
    /// Ask for bullet time
    pub bullet_time: bool,
    /// A hold gesture has locked lane switching
    pub lane_locked: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, tuning: &Tuning, dt: f32) -> StepOutcome {
    if state.phase == GamePhase::GameOver {
        return StepOutcome::default();
    }
    state.time_ticks += 1;

    // Bullet time runs on real time; everything else on scaled time
    let altitude = Altitude {
        height: state.player.height(tuning),
        ascending: state.player.is_ascending(),
    };
    if input.bullet_time && state.bullet_time.try_activate(altitude) {
        push_bullet_time_started(state);
    }
    if state.bullet_time.update(dt, altitude) == Some(BulletTimeChange::Ended) {
        state.events.push(GameEvent::BulletTimeEnded);
    }
    let sim_dt = dt * state.bullet_time.time_scale;

    let outcome = state
        .player
        .update(sim_dt, input.hold, &state.ground, tuning, &mut state.events);

    // Ground reads the compression the player has right now
    let contact_x = match state.player.state {
        PlayerState::Charging(_) => Some(state.player.pos.x),
        _ => None,
    };
    state.ground.step(sim_dt, state.player.compression(), contact_x);

    handle_outcome(state, &outcome, tuning);

    let dash = update_lanes(state, input, tuning, sim_dt);

    state.director.update(sim_dt, tuning);
    state.health.update(dt);
    let contact = state
        .director
        .resolve_contacts(state.player.pos, state.player.is_fast_falling(), tuning);
    record_kills(state, &dash);
    record_kills(state, &contact.stomps);
    if contact.struck && state.health.damage() {
        if state.health.is_dead() {
            log::info!("Out of health at {:.0}px", state.player.height(tuning));
            state.events.push(GameEvent::Death {
                cause: DeathCause::Health,
            });
            state.phase = GamePhase::GameOver;
        } else {
            state.events.push(GameEvent::Damaged { hp: state.health.hp });
        }
    }

    outcome
}

/// React to what the player did this step
fn handle_outcome(state: &mut GameState, outcome: &StepOutcome, tuning: &Tuning) {
    if outcome.landed {
        state.director.clear();
        state.lanes.cancel_tween();
        state.player.pos.x = state.lanes.x();
        if state.bullet_time.land() {
            state.events.push(GameEvent::BulletTimeEnded);
        }
    }

    if let Some(apex) = outcome.predicted_apex() {
        state.lanes.unlock();
        let mut rng = state.rng_state.next_rng();
        let plan = state.director.plan(apex, &state.lanes, tuning, &mut rng);
        state.last_plan = Some(plan);
        if apex >= tuning.bt_auto_height && state.bullet_time.force_activate(apex) {
            push_bullet_time_started(state);
        }
    }

    if let Some(height) = outcome.apex {
        state.lanes.lock_for_descent();
        if height > state.record_height {
            state.record_height = height;
            state.events.push(GameEvent::NewRecord { height });
        }
    }

    if outcome.died {
        state.phase = GamePhase::GameOver;
    }
}

/// Apply a swipe and advance the lane tween. A successful lane change is a
/// dash attack into the destination lane.
fn update_lanes(state: &mut GameState, input: &TickInput, tuning: &Tuning, dt: f32) -> AttackOutcome {
    let mut dash = AttackOutcome::default();
    if input.swipe != 0 {
        match state
            .lanes
            .request_change(input.swipe, state.player.is_airborne(), input.lane_locked)
        {
            Ok(lane) => {
                state.events.push(GameEvent::LaneChanged { lane });
                dash = state
                    .director
                    .resolve_dash_attack(lane, state.player.pos.y, input.swipe.signum(), tuning);
            }
            Err(reason) => log::trace!("Lane change refused: {reason:?}"),
        }
    }
    state.lanes.update(dt);
    state.player.pos.x = state.lanes.x();
    dash
}

fn record_kills(state: &mut GameState, attack: &AttackOutcome) {
    for hit in &attack.hits {
        state.events.push(GameEvent::Kill {
            direction: attack.direction,
            position: hit.position,
        });
        state.bullet_time.refund_kill();
    }
}

fn push_bullet_time_started(state: &mut GameState) {
    state.events.push(GameEvent::BulletTimeStarted {
        time_scale: state.bullet_time.target_scale,
        duration: state.bullet_time.duration,
    });
}
