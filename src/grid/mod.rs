//! Display surface tiling
//!
//! The display is covered by a symmetric lattice of equally sized cells,
//! centred on the screen. Cells are classified against the screen boundary
//! (a circle for round panels, a rectangle otherwise):
//!
//! ```text
//!        ┌──┬──┬──┐
//!     ┌──┼──┼──┼──┼──┐      B = Boundary (one or more corners outside)
//!     │B │I │I │I │B │      I = Inside   (all four corners inside)
//!     ├──┼──┼──┼──┼──┤
//!     │I │I │I │I │I │
//!     └──┴──┴──┴──┴──┘
//! ```
//!
//! - [`builder::CellGridBuilder`]: searches cell sizes for a target count
//! - [`boundary::Boundary`]: containment and edge intersection tests
//! - [`cell_map::CellMap`]: lattice lookup used by field aggregation

pub mod boundary;
pub mod builder;
pub mod cell_map;

pub use boundary::Boundary;
pub use builder::{CellGridBuilder, GridLayout};
pub use cell_map::CellMap;

use serde::{Deserialize, Serialize};

/// Physical outline of the display panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenShape {
    #[default]
    Circular,
    Rectangular,
}

/// Display surface in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSpec {
    #[serde(default = "default_screen_size")]
    pub width: u32,
    #[serde(default = "default_screen_size")]
    pub height: u32,
    #[serde(default)]
    pub shape: ScreenShape,
    /// Unscaled boundary circle radius for round screens, half the
    /// shorter side when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_radius: Option<f32>,
}

fn default_screen_size() -> u32 {
    240
}

impl Default for ScreenSpec {
    fn default() -> Self {
        Self {
            width: default_screen_size(),
            height: default_screen_size(),
            shape: ScreenShape::Circular,
            boundary_radius: None,
        }
    }
}

impl ScreenSpec {
    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn is_round(&self) -> bool {
        self.shape == ScreenShape::Circular
    }

    pub fn boundary_radius(&self) -> f32 {
        self.boundary_radius
            .unwrap_or_else(|| self.width.min(self.height) as f32 / 2.0)
    }
}

/// Grid generation parameters
///
/// Any change requires a full regeneration through
/// [`CellGridBuilder::generate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Desired number of cells, 0 for as many as the best candidate holds
    #[serde(default = "default_target_cell_count")]
    pub target_cell_count: u32,
    /// Pixels between neighbouring cells
    #[serde(default = "default_gap")]
    pub gap: u32,
    /// Cell width over cell height
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: f32,
    /// Boundary scale factor
    #[serde(default = "default_scale")]
    pub scale: f32,
    /// Corners a cell may have outside the boundary (0 = strict)
    #[serde(default = "default_allow_cut")]
    pub allow_cut: u8,
    #[serde(default)]
    pub screen: ScreenSpec,
}

fn default_target_cell_count() -> u32 {
    341
}

fn default_gap() -> u32 {
    1
}

fn default_aspect_ratio() -> f32 {
    1.0
}

fn default_scale() -> f32 {
    0.986
}

fn default_allow_cut() -> u8 {
    1
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            target_cell_count: default_target_cell_count(),
            gap: default_gap(),
            aspect_ratio: default_aspect_ratio(),
            scale: default_scale(),
            allow_cut: default_allow_cut(),
            screen: ScreenSpec::default(),
        }
    }
}

/// Cell classification against the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    /// All four corners inside
    Inside,
    /// Admitted with at least one corner outside
    Boundary,
}

/// Axis-aligned rectangle in screen pixels (y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CellRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    #[inline]
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Corners in clockwise order starting top-left
    pub fn corners(&self) -> [(f32, f32); 4] {
        [
            (self.x, self.y),
            (self.right(), self.y),
            (self.right(), self.bottom()),
            (self.x, self.bottom()),
        ]
    }

    /// Perimeter edges as corner pairs
    pub fn edges(&self) -> [((f32, f32), (f32, f32)); 4] {
        let c = self.corners();
        [(c[0], c[1]), (c[1], c[2]), (c[2], c[3]), (c[3], c[0])]
    }
}

/// One display cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Position in the output payload
    pub index: usize,
    pub bounds: CellRect,
    pub cell_type: CellType,
    /// Lattice column relative to the centre cell
    pub col: i32,
    /// Lattice row relative to the centre cell
    pub row: i32,
}
