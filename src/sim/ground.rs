//! Deformable ground strip
//!
//! A 1-D spring/wave simulation: each column holds a vertical offset
//! (positive = pushed down) and velocity. Neighbouring columns are coupled by
//! tension, so an impact spreads as a wave and rebounds instead of each
//! column springing back on its own.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// Share of `max_offset` the surface may rebound above rest
const OVERSHOOT_RATIO: f32 = 0.3;

/// Spring constants copied out of the tuning table at construction
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct GroundParams {
    column_width: f32,
    tension: f32,
    stiffness: f32,
    damping: f32,
    pressure_gain: f32,
    pressure_sigma: f32,
    pressure_radius: u32,
    max_offset: f32,
    substeps: u32,
}

/// The deformable ground
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ground {
    params: GroundParams,
    offset: Vec<f32>,
    velocity: Vec<f32>,
    /// External force scratch buffer, rebuilt every step
    #[serde(skip)]
    force: Vec<f32>,
}

impl Ground {
    pub fn new(tuning: &Tuning) -> Self {
        let columns = tuning.ground_columns();
        Self {
            params: GroundParams {
                column_width: tuning.ground_column_width,
                tension: tuning.ground_tension,
                stiffness: tuning.ground_stiffness,
                damping: tuning.ground_damping,
                pressure_gain: tuning.ground_pressure_gain,
                pressure_sigma: tuning.ground_pressure_sigma.max(0.1),
                pressure_radius: tuning.ground_pressure_radius,
                max_offset: tuning.ground_max_offset,
                substeps: tuning.ground_substeps.max(1),
            },
            offset: vec![0.0; columns],
            velocity: vec![0.0; columns],
            force: vec![0.0; columns],
        }
    }

    /// Number of columns
    pub fn columns(&self) -> usize {
        self.offset.len()
    }

    /// Column nearest to world x (clamped to the strip)
    pub fn column_at(&self, x: f32) -> usize {
        let last = self.columns().saturating_sub(1);
        let col = (x / self.params.column_width).round();
        if col <= 0.0 {
            0
        } else {
            (col as usize).min(last)
        }
    }

    /// Top-layer surface offset under world x
    pub fn surface_offset_at(&self, x: f32) -> f32 {
        self.offset.get(self.column_at(x)).copied().unwrap_or(0.0)
    }

    /// Raw offsets (for rendering)
    pub fn offsets(&self) -> &[f32] {
        &self.offset
    }

    /// Lowest allowed offset (upward rebound limit)
    pub fn min_offset(&self) -> f32 {
        -OVERSHOOT_RATIO * self.params.max_offset
    }

    /// Deepest allowed offset
    pub fn max_offset(&self) -> f32 {
        self.params.max_offset
    }

    /// Advance one fixed step.
    ///
    /// `compression_depth` is the player's current ground penetration and
    /// `contact_x` where it presses; pass `None` when nothing is in contact.
    pub fn step(&mut self, dt: f32, compression_depth: f32, contact_x: Option<f32>) {
        self.build_force(compression_depth.max(0.0), contact_x);

        let p = self.params;
        let h = dt / p.substeps as f32;
        let n = self.columns();
        let (lo, hi) = (self.min_offset(), self.max_offset());

        for _ in 0..p.substeps {
            // Velocities first from current offsets, then offsets from the
            // new velocities (semi-implicit Euler)
            for i in 0..n {
                let here = self.offset[i];
                let left = if i > 0 { self.offset[i - 1] } else { here };
                let right = if i + 1 < n { self.offset[i + 1] } else { here };
                let accel = p.tension * (left - 2.0 * here + right) - p.stiffness * here
                    - p.damping * self.velocity[i]
                    + self.force[i];
                self.velocity[i] += accel * h;
            }
            for i in 0..n {
                let next = self.offset[i] + self.velocity[i] * h;
                let clamped = next.clamp(lo, hi);
                if clamped != next {
                    self.velocity[i] = 0.0;
                }
                self.offset[i] = clamped;
            }
        }
    }

    /// Gaussian pressure bump centred on the contact column
    fn build_force(&mut self, depth: f32, contact_x: Option<f32>) {
        self.force.resize(self.offset.len(), 0.0);
        self.force.iter_mut().for_each(|f| *f = 0.0);

        let Some(x) = contact_x else {
            return;
        };
        if depth <= 0.0 {
            return;
        }

        let p = self.params;
        let center = self.column_at(x) as i64;
        let radius = i64::from(p.pressure_radius);
        let amplitude = p.pressure_gain * depth;
        let two_sigma_sq = 2.0 * p.pressure_sigma * p.pressure_sigma;
        let n = self.columns() as i64;

        for col in (center - radius).max(0)..=(center + radius).min(n - 1) {
            let d = (col - center) as f32;
            self.force[col as usize] = amplitude * (-(d * d) / two_sigma_sq).exp();
        }
    }

    /// Flatten the strip (session restart)
    pub fn reset(&mut self) {
        self.offset.iter_mut().for_each(|o| *o = 0.0);
        self.velocity.iter_mut().for_each(|v| *v = 0.0);
    }
}
