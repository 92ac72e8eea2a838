//! Monster director
//!
//! On every launch the director reads the predicted apex and fills the band
//! just below it with monsters: count grows with log(height), patrol speed
//! grows linearly, and lanes alternate more often the higher the jump.
//! Everything is cleared again on the next landing.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::lanes::LaneSystem;
use crate::sample_curve;
use crate::tuning::Tuning;

/// A monster hovering in a lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monster {
    pub id: u32,
    pub lane: u8,
    pub pos: Vec2,
    /// Patrol centre (lane centre x)
    pub anchor_x: f32,
    /// Signed horizontal patrol speed
    pub vx: f32,
}

/// Vertical spawn band, as heights above ground
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnBand {
    pub start: f32,
    pub end: f32,
}

/// Summary of one planning pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectorPlan {
    pub predicted_apex: f32,
    pub band: SpawnBand,
    pub desired: u32,
    pub spawned: u32,
    pub speed_multiplier: f32,
    pub alternate_probability: f32,
}

/// A monster destroyed by the player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonsterHit {
    pub id: u32,
    pub lane: u8,
    pub position: Vec2,
}

/// Result of resolving an attack, returned synchronously so presentation
/// can decide when to show it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttackOutcome {
    /// -1 / +1 for dashes, 0 for stomps
    pub direction: i8,
    pub hits: Vec<MonsterHit>,
}

/// Result of overlapping monsters during a step
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContactOutcome {
    pub stomps: AttackOutcome,
    /// A monster touched the player without being stomped
    pub struck: bool,
}

/// Spawn band for a predicted apex. The upper bound shrinks toward its floor
/// as height grows, leaving more clearance under very high apexes.
pub fn spawn_band(predicted_apex: f32, tuning: &Tuning) -> SpawnBand {
    let h = predicted_apex.max(0.0);
    let shrink = (-h / tuning.dir_range_shrink_height).exp();
    let end_frac = tuning.dir_range_end_floor + (tuning.dir_range_end - tuning.dir_range_end_floor) * shrink;
    SpawnBand {
        start: tuning.dir_range_start * h,
        end: end_frac * h,
    }
}

/// Logarithmic count growth, clamped
pub fn desired_count(predicted_apex: f32, tuning: &Tuning) -> u32 {
    let ratio = (predicted_apex / tuning.dir_count_ref_height).max(f32::MIN_POSITIVE);
    let raw = tuning.dir_base_count + ratio.log2() * tuning.dir_count_growth;
    let count = raw.round().max(0.0) as u32;
    count.clamp(tuning.dir_min_count, tuning.dir_max_count.max(tuning.dir_min_count))
}

/// Linear speed growth, clamped
pub fn speed_multiplier(predicted_apex: f32, tuning: &Tuning) -> f32 {
    (1.0 + predicted_apex.max(0.0) * tuning.dir_speed_growth).min(tuning.dir_max_speed_multiplier)
}

/// Chance the next monster sits in a different lane than the previous one
pub fn alternate_lane_probability(predicted_apex: f32, tuning: &Tuning) -> f32 {
    let p = sample_curve(&tuning.dir_alternate_lane_curve, predicted_apex);
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Director {
    monsters: Vec<Monster>,
    next_id: u32,
}

impl Director {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn monsters(&self) -> &[Monster] {
        &self.monsters
    }

    /// Remove every monster (on landing)
    pub fn clear(&mut self) {
        self.monsters.clear();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Replace the field with monsters for the coming apex
    pub fn plan<R: Rng>(
        &mut self,
        predicted_apex: f32,
        lanes: &LaneSystem,
        tuning: &Tuning,
        rng: &mut R,
    ) -> DirectorPlan {
        self.clear();

        let band = spawn_band(predicted_apex, tuning);
        let desired = desired_count(predicted_apex, tuning);
        let speed_mult = speed_multiplier(predicted_apex, tuning);
        let alternate = alternate_lane_probability(predicted_apex, tuning);
        let mut plan = DirectorPlan {
            predicted_apex,
            band,
            desired,
            spawned: 0,
            speed_multiplier: speed_mult,
            alternate_probability: alternate,
        };
        if predicted_apex < tuning.dir_min_height || desired == 0 {
            return plan;
        }

        let lane_count = lanes.lane_count();
        let base_spacing = ((band.end - band.start) / desired as f32).max(tuning.dir_min_spacing);
        let speed = tuning.monster_base_speed * speed_mult;

        let mut height = band.start;
        let mut prev_lane: Option<u8> = None;
        for _ in 0..desired {
            let lane = match prev_lane {
                None => rng.random_range(0..lane_count),
                Some(prev) => {
                    let lane = if lane_count > 1 && rng.random_bool(f64::from(alternate)) {
                        // Any lane but the previous one
                        let pick = rng.random_range(0..lane_count - 1);
                        if pick >= prev { pick + 1 } else { pick }
                    } else {
                        prev
                    };
                    let gap = lane.abs_diff(prev);
                    let spacing = if gap == 0 {
                        base_spacing * tuning.dir_same_lane_spacing
                    } else if gap >= 2 {
                        base_spacing * tuning.dir_diagonal_spacing
                    } else {
                        base_spacing
                    };
                    height += spacing;
                    lane
                }
            };
            if height > band.end {
                break;
            }

            let direction = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
            let pos = Vec2::new(lanes.lane_x(lane), tuning.ground_y - height);
            self.spawn(lane, pos, speed * direction);
            prev_lane = Some(lane);
            plan.spawned += 1;
        }

        log::info!(
            "Director: apex {:.0}px, band {:.0}..{:.0}, {}/{} monsters, speed x{:.2}",
            predicted_apex,
            band.start,
            band.end,
            plan.spawned,
            desired,
            speed_mult
        );
        plan
    }

    /// Add a monster patrolling around `pos.x`. Returns its id.
    pub fn spawn(&mut self, lane: u8, pos: Vec2, vx: f32) -> u32 {
        self.next_id += 1;
        self.monsters.push(Monster {
            id: self.next_id,
            lane,
            pos,
            anchor_x: pos.x,
            vx,
        });
        self.next_id
    }

    /// Patrol around lane centres
    pub fn update(&mut self, dt: f32, tuning: &Tuning) {
        let half_width = tuning.monster_patrol_half_width;
        for monster in &mut self.monsters {
            monster.pos.x += monster.vx * dt;
            let offset = monster.pos.x - monster.anchor_x;
            if offset.abs() > half_width {
                monster.pos.x = monster.anchor_x + half_width * offset.signum();
                monster.vx = -monster.vx;
            }
        }
    }

    /// Dash into `lane`: destroys monsters there within vertical reach
    pub fn resolve_dash_attack(&mut self, lane: u8, player_y: f32, direction: i8, tuning: &Tuning) -> AttackOutcome {
        let reach = tuning.dash_reach;
        let hits = self.take_where(|m| m.lane == lane && (m.pos.y - player_y).abs() <= reach);
        AttackOutcome { direction, hits }
    }

    /// Overlaps with the player. Stomping (fast-falling downward) destroys
    /// what it touches; otherwise a touch strikes the player.
    pub fn resolve_contacts(&mut self, player_pos: Vec2, stomping: bool, tuning: &Tuning) -> ContactOutcome {
        let reach = tuning.player_radius + tuning.monster_radius;
        let touching = |m: &Monster| m.pos.distance(player_pos) <= reach;

        if stomping {
            let hits = self.take_where(touching);
            ContactOutcome {
                stomps: AttackOutcome { direction: 0, hits },
                struck: false,
            }
        } else {
            ContactOutcome {
                stomps: AttackOutcome::default(),
                struck: self.monsters.iter().any(touching),
            }
        }
    }

    fn take_where(&mut self, pred: impl Fn(&Monster) -> bool) -> Vec<MonsterHit> {
        let mut hits = Vec::new();
        self.monsters.retain(|m| {
            if pred(m) {
                hits.push(MonsterHit {
                    id: m.id,
                    lane: m.lane,
                    position: m.pos,
                });
                false
            } else {
                true
            }
        });
        hits
    }
}
