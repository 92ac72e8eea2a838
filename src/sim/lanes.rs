//! Lane system
//!
//! The player's x is one of `lane_count` lane centres. Lane changes are only
//! accepted while airborne and unlocked; the move itself is a short quad-out
//! tween that a newer request interrupts from wherever x currently is.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// In-flight lane transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneTween {
    pub from_x: f32,
    pub to_x: f32,
    pub elapsed: f32,
    pub duration: f32,
}

impl LaneTween {
    fn x(&self) -> f32 {
        let t = if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        };
        let eased = 1.0 - (1.0 - t) * (1.0 - t);
        self.from_x + (self.to_x - self.from_x) * eased
    }

    fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Why a lane change was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneRefusal {
    NotAirborne,
    Locked,
    Edge,
    NoDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneSystem {
    lane_count: u8,
    lane_width: f32,
    center_x: f32,
    tween_time: f32,
    lane: u8,
    x: f32,
    tween: Option<LaneTween>,
    /// Set at apex, cleared when the next ascent starts
    descent_locked: bool,
}

impl LaneSystem {
    pub fn new(tuning: &Tuning) -> Self {
        let lane_count = tuning.lane_count.max(1);
        let mut lanes = Self {
            lane_count,
            lane_width: tuning.lane_width,
            center_x: tuning.viewport_width / 2.0,
            tween_time: tuning.lane_tween_time,
            lane: lane_count / 2,
            x: 0.0,
            tween: None,
            descent_locked: false,
        };
        lanes.x = lanes.lane_x(lanes.lane);
        lanes
    }

    pub fn lane_count(&self) -> u8 {
        self.lane_count
    }

    /// Target lane (the destination while tweening)
    pub fn lane(&self) -> u8 {
        self.lane
    }

    /// Current x, including any in-flight tween
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Centre x of a lane
    pub fn lane_x(&self, lane: u8) -> f32 {
        let mid = (self.lane_count as f32 - 1.0) / 2.0;
        self.center_x + (lane as f32 - mid) * self.lane_width
    }

    pub fn is_descent_locked(&self) -> bool {
        self.descent_locked
    }

    pub fn lock_for_descent(&mut self) {
        self.descent_locked = true;
    }

    pub fn unlock(&mut self) {
        self.descent_locked = false;
    }

    /// Request a move of `direction` lanes (-1 / +1).
    ///
    /// Returns the new lane on success. `gesture_locked` is the hold lock
    /// from the gesture classifier.
    pub fn request_change(&mut self, direction: i8, airborne: bool, gesture_locked: bool) -> Result<u8, LaneRefusal> {
        if direction == 0 {
            return Err(LaneRefusal::NoDirection);
        }
        if !airborne {
            return Err(LaneRefusal::NotAirborne);
        }
        if self.descent_locked || gesture_locked {
            return Err(LaneRefusal::Locked);
        }
        let target = i16::from(self.lane) + i16::from(direction.signum());
        if target < 0 || target >= i16::from(self.lane_count) {
            return Err(LaneRefusal::Edge);
        }

        let lane = target as u8;
        // Interrupt any in-flight tween from the current x
        self.tween = Some(LaneTween {
            from_x: self.x,
            to_x: self.lane_x(lane),
            elapsed: 0.0,
            duration: self.tween_time,
        });
        self.lane = lane;
        log::debug!("Lane change -> {lane}");
        Ok(lane)
    }

    /// Stop any tween and snap to the target lane
    pub fn cancel_tween(&mut self) {
        self.tween = None;
        self.x = self.lane_x(self.lane);
    }

    pub fn update(&mut self, dt: f32) {
        if let Some(tween) = &mut self.tween {
            tween.elapsed += dt;
            self.x = tween.x();
            if tween.finished() {
                self.x = tween.to_x;
                self.tween = None;
            }
        }
    }

    pub fn reset(&mut self) {
        self.lane = self.lane_count / 2;
        self.tween = None;
        self.descent_locked = false;
        self.x = self.lane_x(self.lane);
    }
}
