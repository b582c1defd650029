//! Lattice lookup over a generated grid
//!
//! Maps lattice coordinates back to payload indices so aggregation can find
//! the cells under a point or a particle footprint without scanning the
//! whole grid.

use super::{Cell, GridLayout, ScreenSpec};

/// Spatial index of a [`GridLayout`]
#[derive(Debug, Clone)]
pub struct CellMap {
    cells: Vec<Cell>,
    /// Payload index per lattice slot, row-major
    lookup: Vec<Option<usize>>,
    half_cols: i32,
    half_rows: i32,
    step_x: f32,
    step_y: f32,
    center: (f32, f32),
    cell_area: f32,
    screen: ScreenSpec,
}

impl CellMap {
    pub fn new(layout: &GridLayout) -> Self {
        let half_cols = layout.half_cols();
        let half_rows = layout.half_rows();
        let width = (2 * half_cols + 1) as usize;
        let height = (2 * half_rows + 1) as usize;
        let mut lookup = vec![None; width * height];

        for cell in &layout.cells {
            let slot = (cell.row + half_rows) as usize * width + (cell.col + half_cols) as usize;
            if let Some(entry) = lookup.get_mut(slot) {
                *entry = Some(cell.index);
            }
        }

        Self {
            cells: layout.cells.clone(),
            lookup,
            half_cols,
            half_rows,
            step_x: layout.step_x.max(f32::EPSILON),
            step_y: layout.step_y.max(f32::EPSILON),
            center: layout.center,
            cell_area: layout.cell_w as f32 * layout.cell_h as f32,
            screen: layout.screen,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn screen(&self) -> &ScreenSpec {
        &self.screen
    }

    /// Area of one cell in square pixels
    pub fn cell_area(&self) -> f32 {
        self.cell_area
    }

    /// Lattice spacing in pixels (x, y)
    pub fn step(&self) -> (f32, f32) {
        (self.step_x, self.step_y)
    }

    /// Payload index at a lattice position
    pub fn at_lattice(&self, col: i32, row: i32) -> Option<usize> {
        if col.unsigned_abs() > self.half_cols as u32 || row.unsigned_abs() > self.half_rows as u32 {
            return None;
        }
        let width = (2 * self.half_cols + 1) as usize;
        let slot = (row + self.half_rows) as usize * width + (col + self.half_cols) as usize;
        self.lookup.get(slot).copied().flatten()
    }

    /// Neighbour of a cell by lattice offset
    pub fn lattice_neighbor(&self, index: usize, dc: i32, dr: i32) -> Option<usize> {
        let cell = self.cells.get(index)?;
        self.at_lattice(cell.col.saturating_add(dc), cell.row.saturating_add(dr))
    }

    /// Cell whose bounds contain the pixel, if any
    pub fn cell_at(&self, px: f32, py: f32) -> Option<usize> {
        if !(px.is_finite() && py.is_finite()) {
            return None;
        }
        let col = clamp_slot((px - self.center.0) / self.step_x, self.half_cols + 1);
        let row = clamp_slot((py - self.center.1) / self.step_y, self.half_rows + 1);

        // Rounded cell origins can shift a point into the adjacent slot
        for dr in [0, -1, 1] {
            for dc in [0, -1, 1] {
                if let Some(index) = self.at_lattice(col + dc, row + dr) {
                    if self.cells[index].bounds.contains(px, py) {
                        return Some(index);
                    }
                }
            }
        }
        None
    }

    /// Visit every cell whose lattice slot intersects the square around a
    /// circle. Callers decide whether the footprint actually overlaps.
    pub fn for_each_near(&self, px: f32, py: f32, radius: f32, mut f: impl FnMut(usize)) {
        if self.cells.is_empty() || !(px.is_finite() && py.is_finite()) || radius.is_nan() {
            return;
        }
        let radius = radius.max(0.0);
        let (dx, dy) = (px - self.center.0, py - self.center.1);
        // Bounds are clamped in f32 so huge footprints never overflow the cast
        let col_lo = clamp_slot(((dx - radius) / self.step_x).floor() - 1.0, self.half_cols);
        let col_hi = clamp_slot(((dx + radius) / self.step_x).ceil() + 1.0, self.half_cols);
        let row_lo = clamp_slot(((dy - radius) / self.step_y).floor() - 1.0, self.half_rows);
        let row_hi = clamp_slot(((dy + radius) / self.step_y).ceil() + 1.0, self.half_rows);

        for row in row_lo..=row_hi {
            for col in col_lo..=col_hi {
                if let Some(index) = self.at_lattice(col, row) {
                    f(index);
                }
            }
        }
    }

    /// Visit cells whose lattice distance from `index` is within `radius`
    /// pixels on both axes, including the cell itself
    pub fn for_each_neighbor_within(&self, index: usize, radius: f32, mut f: impl FnMut(usize)) {
        let Some(cell) = self.cells.get(index) else {
            return;
        };
        // Nothing lies further than the full lattice width away
        let reach_x = reach(radius / self.step_x, 2 * self.half_cols);
        let reach_y = reach(radius / self.step_y, 2 * self.half_rows);

        for dr in -reach_y..=reach_y {
            for dc in -reach_x..=reach_x {
                if let Some(other) = self.at_lattice(cell.col + dc, cell.row + dr) {
                    f(other);
                }
            }
        }
    }
}

/// Lattice slot for a fractional offset, clamped to `±half`
fn clamp_slot(offset: f32, half: i32) -> i32 {
    offset.round().clamp(-half as f32, half as f32) as i32
}

/// Neighbour reach in slots: at least one, at most `limit`
fn reach(slots: f32, limit: i32) -> i32 {
    slots.ceil().max(1.0).min(limit.max(1) as f32) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Boundary, CellGridBuilder, GridSpec};

    fn map() -> CellMap {
        let spec = GridSpec {
            target_cell_count: 0,
            ..GridSpec::default()
        };
        let boundary = Boundary::for_screen(&spec.screen, 120.0, 1.0);
        CellMap::new(&CellGridBuilder::lay_out(&spec, &boundary, 20))
    }

    #[test]
    fn test_lookup_matches_cells() {
        let map = map();
        assert!(!map.is_empty());
        for cell in map.cells() {
            assert_eq!(map.at_lattice(cell.col, cell.row), Some(cell.index));
        }
    }

    #[test]
    fn test_cell_at_centre() {
        let map = map();
        let index = map.cell_at(120.0, 120.0).unwrap();
        let cell = map.cell(index).unwrap();
        assert_eq!((cell.col, cell.row), (0, 0));
        // Gap between cells belongs to nobody
        assert!(map.cell_at(120.0 + 10.5, 120.0).is_none());
        // Far outside the lattice
        assert!(map.cell_at(-50.0, -50.0).is_none());
    }

    #[test]
    fn test_neighbors_include_self() {
        let map = map();
        let centre = map.at_lattice(0, 0).unwrap();
        let mut seen = Vec::new();
        map.for_each_neighbor_within(centre, 5.0, |i| seen.push(i));
        assert_eq!(seen.len(), 9);
        assert!(seen.contains(&centre));
    }

    #[test]
    fn test_near_covers_footprint() {
        let map = map();
        let mut seen = Vec::new();
        map.for_each_near(120.0, 120.0, 15.0, |i| seen.push(i));
        let centre = map.at_lattice(0, 0).unwrap();
        let right = map.at_lattice(1, 0).unwrap();
        assert!(seen.contains(&centre));
        assert!(seen.contains(&right));
    }

    #[test]
    fn test_huge_footprint_visits_each_cell_once() {
        let map = map();
        let mut seen = Vec::new();
        map.for_each_near(120.0, 120.0, 1e30, |i| seen.push(i));
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), map.len());

        let mut visits = 0;
        map.for_each_near(-1e30, 1e30, f32::INFINITY, |_| visits += 1);
        assert_eq!(visits, map.len());

        let mut none = 0;
        map.for_each_near(f32::NAN, 120.0, 5.0, |_| none += 1);
        map.for_each_near(120.0, 120.0, f32::NAN, |_| none += 1);
        assert_eq!(none, 0);
    }

    #[test]
    fn test_huge_neighbor_radius_is_bounded() {
        let map = map();
        let centre = map.at_lattice(0, 0).unwrap();
        let mut count = 0;
        map.for_each_neighbor_within(centre, 1e30, |_| count += 1);
        assert_eq!(count, map.len());

        let mut nan = 0;
        map.for_each_neighbor_within(centre, f32::NAN, |_| nan += 1);
        assert_eq!(nan, 9);
    }

    #[test]
    fn test_far_points_resolve_to_nothing() {
        let map = map();
        assert!(map.cell_at(1e30, -1e30).is_none());
        assert!(map.cell_at(f32::INFINITY, 120.0).is_none());
        assert_eq!(map.lattice_neighbor(0, i32::MAX, i32::MIN), None);
    }
}
