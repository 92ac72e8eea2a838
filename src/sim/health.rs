//! Hit points with a short invulnerability window after each hit

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub max_hp: u8,
    pub hp: u8,
    /// Seconds of invulnerability left
    pub invulnerable: f32,
    invulnerability_time: f32,
}

impl Health {
    pub fn new(tuning: &Tuning) -> Self {
        let max_hp = tuning.max_hp.max(1);
        Self {
            max_hp,
            hp: max_hp,
            invulnerable: 0.0,
            invulnerability_time: tuning.invulnerability_time,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable > 0.0
    }

    /// Take one point of damage. Returns false while invulnerable or dead.
    pub fn damage(&mut self) -> bool {
        if self.is_dead() || self.is_invulnerable() {
            return false;
        }
        self.hp -= 1;
        self.invulnerable = self.invulnerability_time;
        log::debug!("Damaged: {}/{} hp", self.hp, self.max_hp);
        true
    }

    pub fn update(&mut self, dt: f32) {
        self.invulnerable = (self.invulnerable - dt).max(0.0);
    }

    pub fn reset(&mut self) {
        self.hp = self.max_hp;
        self.invulnerable = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_and_invulnerability() {
        let mut health = Health::new(&Tuning::default());
        assert_eq!(health.hp, 3);
        assert!(health.damage());
        assert!(!health.damage(), "invulnerable right after a hit");
        health.update(1.5);
        assert!(health.damage());
        health.update(1.5);
        assert!(health.damage());
        assert!(health.is_dead());
        health.update(1.5);
        assert!(!health.damage());
        assert_eq!(health.hp, 0);

        health.reset();
        assert_eq!(health.hp, 3);
        assert!(!health.is_invulnerable());
    }
}
