//! Per-cell field aggregation
//!
//! Converts a particle snapshot into one scalar per display cell. Each frame
//! computes a target value per cell with the active [`FieldMode`] and then
//! eases the displayed value towards it:
//!
//! ```text
//! current += (target − current) × (rate_in  if |target| > |current|
//!                                  rate_out otherwise)
//! ```
//!
//! ## Modes
//!
//! | Mode       | Target per cell                                        |
//! |------------|--------------------------------------------------------|
//! | Proximity  | pairwise `1 − d²/r²`, particles bucketed by centre     |
//! | ProximityB | same, particles bucketed into every overlapped cell    |
//! | Density    | summed compressed coverage fraction                    |
//! | Velocity   | coverage-weighted mean speed                           |
//! | Pressure   | squared total coverage                                 |
//! | Vorticity  | curl of the coverage-weighted velocity field           |
//! | Collision  | contact intensity from the collision grid              |
//! | Overlap    | summed compressed coverage percentage                  |

pub mod buffer;
pub mod collision;
mod modes;
pub mod overlap;

pub use buffer::FieldBuffer;
pub use collision::{CollisionGrid, UniformCollisionGrid};
pub use modes::PRESSURE_GAIN;

use crate::core::types::Particle;
use crate::error::{Error, Result};
use crate::grid::CellMap;
use modes::FrameInput;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Aggregation algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldMode {
    #[default]
    Proximity,
    ProximityB,
    Density,
    Velocity,
    Pressure,
    Vorticity,
    Collision,
    Overlap,
}

impl FieldMode {
    pub const ALL: [FieldMode; 8] = [
        FieldMode::Proximity,
        FieldMode::ProximityB,
        FieldMode::Density,
        FieldMode::Velocity,
        FieldMode::Pressure,
        FieldMode::Vorticity,
        FieldMode::Collision,
        FieldMode::Overlap,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FieldMode::Proximity => "Proximity",
            FieldMode::ProximityB => "ProximityB",
            FieldMode::Density => "Density",
            FieldMode::Velocity => "Velocity",
            FieldMode::Pressure => "Pressure",
            FieldMode::Vorticity => "Vorticity",
            FieldMode::Collision => "Collision",
            FieldMode::Overlap => "Overlap",
        }
    }
}

impl fmt::Display for FieldMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FieldMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidParameter(format!("unknown field mode: {}", s)))
    }
}

/// Field aggregation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTuning {
    #[serde(default)]
    pub mode: FieldMode,

    /// Smoothing rate while a value rises
    #[serde(default = "default_rate_in")]
    pub rate_in: f32,

    /// Smoothing rate while a value falls
    #[serde(default = "default_rate_out")]
    pub rate_out: f32,

    /// Interaction radius for the proximity modes in pixels
    #[serde(default = "default_proximity_radius")]
    pub proximity_radius: f32,

    #[serde(default = "default_proximity_tune")]
    pub proximity_tune: f32,

    #[serde(default = "default_proximity_b_tune")]
    pub proximity_b_tune: f32,

    #[serde(default = "default_velocity_tune")]
    pub velocity_tune: f32,

    #[serde(default = "default_pressure_tune")]
    pub pressure_tune: f32,

    #[serde(default = "default_vorticity_tune")]
    pub vorticity_tune: f32,

    #[serde(default = "default_collision_tune")]
    pub collision_tune: f32,

    /// Particle footprint radius as a fraction of its rendered size
    #[serde(default = "default_particle_radius_scale")]
    pub particle_radius_scale: f32,

    /// Buckets per side of the collision grid built from snapshots
    #[serde(default = "default_collision_grid_size")]
    pub collision_grid_size: usize,

    /// Field value mapped to 100 in the outbound payload
    #[serde(default = "default_max_value")]
    pub max_value: f32,
}

fn default_rate_in() -> f32 {
    0.15
}

fn default_rate_out() -> f32 {
    0.08
}

fn default_proximity_radius() -> f32 {
    20.0
}

fn default_proximity_tune() -> f32 {
    0.15
}

fn default_proximity_b_tune() -> f32 {
    1.5
}

fn default_velocity_tune() -> f32 {
    5.0
}

fn default_pressure_tune() -> f32 {
    0.1
}

fn default_vorticity_tune() -> f32 {
    2500.0
}

fn default_collision_tune() -> f32 {
    10.0
}

fn default_particle_radius_scale() -> f32 {
    0.25
}

fn default_collision_grid_size() -> usize {
    16
}

fn default_max_value() -> f32 {
    2.1
}

impl Default for FieldTuning {
    fn default() -> Self {
        Self {
            mode: FieldMode::default(),
            rate_in: default_rate_in(),
            rate_out: default_rate_out(),
            proximity_radius: default_proximity_radius(),
            proximity_tune: default_proximity_tune(),
            proximity_b_tune: default_proximity_b_tune(),
            velocity_tune: default_velocity_tune(),
            pressure_tune: default_pressure_tune(),
            vorticity_tune: default_vorticity_tune(),
            collision_tune: default_collision_tune(),
            particle_radius_scale: default_particle_radius_scale(),
            collision_grid_size: default_collision_grid_size(),
            max_value: default_max_value(),
        }
    }
}

/// Computes smoothed per-cell values for the active mode
pub struct FieldAggregator {
    tuning: FieldTuning,
    map: Option<CellMap>,
    buffer: FieldBuffer,
}

impl FieldAggregator {
    pub fn new(tuning: FieldTuning) -> Self {
        let buffer = FieldBuffer::new(0, tuning.rate_in, tuning.rate_out);
        Self {
            tuning,
            map: None,
            buffer,
        }
    }

    pub fn mode(&self) -> FieldMode {
        self.tuning.mode
    }

    pub fn set_mode(&mut self, mode: FieldMode) {
        if mode != self.tuning.mode {
            log::info!("Field mode: {} -> {}", self.tuning.mode, mode);
            self.tuning.mode = mode;
        }
    }

    pub fn tuning(&self) -> &FieldTuning {
        &self.tuning
    }

    pub fn set_tuning(&mut self, tuning: FieldTuning) {
        self.buffer.set_rates(tuning.rate_in, tuning.rate_out);
        self.tuning = tuning;
    }

    /// Bind a freshly generated grid.
    ///
    /// Buffers are zeroed only when the cell count changes.
    pub fn set_grid(&mut self, map: &CellMap) {
        if self.buffer.resize(map.len()) {
            log::debug!("Field buffers resized to {} cells", map.len());
        }
        self.map = Some(map.clone());
    }

    pub fn cell_count(&self) -> usize {
        self.buffer.len()
    }

    /// Last smoothed values
    pub fn values(&self) -> &[f32] {
        self.buffer.current()
    }

    /// Compute one frame.
    ///
    /// `collisions` feeds [`FieldMode::Collision`]; other modes ignore it.
    /// An empty snapshot zeroes both target and displayed values.
    pub fn compute_frame(
        &mut self,
        particles: &[Particle],
        collisions: Option<&dyn CollisionGrid>,
    ) -> &[f32] {
        let Some(map) = self.map.as_ref() else {
            return self.buffer.current();
        };
        if particles.is_empty() {
            self.buffer.reset();
            return self.buffer.current();
        }

        let input = FrameInput::new(map, &self.tuning, particles);
        let out = self.buffer.clear_target();
        match self.tuning.mode {
            FieldMode::Proximity => {
                modes::proximity(&input, out, false, self.tuning.proximity_tune)
            }
            FieldMode::ProximityB => {
                modes::proximity(&input, out, true, self.tuning.proximity_b_tune)
            }
            FieldMode::Density => modes::density(&input, out),
            FieldMode::Velocity => modes::velocity(&input, out),
            FieldMode::Pressure => modes::pressure(&input, out),
            FieldMode::Vorticity => modes::vorticity(&input, out),
            FieldMode::Collision => match collisions {
                Some(grid) => modes::collision(&input, grid, out),
                None => log::trace!("Collision mode without a collision grid"),
            },
            FieldMode::Overlap => modes::overlap(&input, out),
        }

        self.buffer.smooth()
    }
}
