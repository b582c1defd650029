//! Cell grid generation
//!
//! # Search
//!
//! Candidate cell heights are tried from the largest useful size down to one
//! pixel. For each height a symmetric lattice is laid over the boundary and
//! every lattice cell is classified:
//!
//! | corners outside | allow_cut = 0 | allow_cut > 0                              |
//! |-----------------|---------------|--------------------------------------------|
//! | 0               | Inside        | Inside                                     |
//! | 1..=allow_cut   | rejected      | Boundary                                   |
//! | more            | rejected      | Boundary if the centre is inside           |
//! | 4               | rejected      | Boundary if an edge crosses the boundary   |
//!
//! The first candidate whose admitted count reaches the target wins and is
//! truncated to exactly the target. Otherwise the largest candidate seen is
//! returned.

use super::{Boundary, Cell, CellRect, CellType, GridSpec, ScreenSpec};

/// Result of a grid generation
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    /// Admitted cells in row-major order
    pub cells: Vec<Cell>,
    /// Lattice columns of the winning candidate
    pub cols: u32,
    /// Lattice rows of the winning candidate
    pub rows: u32,
    /// Cell width in pixels
    pub cell_w: u32,
    /// Cell height in pixels
    pub cell_h: u32,
    /// Horizontal lattice step (cell width + gap)
    pub step_x: f32,
    /// Vertical lattice step (cell height + gap)
    pub step_y: f32,
    /// Lattice centre in pixels
    pub center: (f32, f32),
    pub screen: ScreenSpec,
}

impl GridLayout {
    /// Layout with no cells
    pub fn empty(screen: ScreenSpec) -> Self {
        Self {
            cells: Vec::new(),
            cols: 0,
            rows: 0,
            cell_w: 0,
            cell_h: 0,
            step_x: 1.0,
            step_y: 1.0,
            center: screen.center(),
            screen,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Half the lattice width in cells, excluding the centre column
    pub fn half_cols(&self) -> i32 {
        (self.cols as i32 - 1).max(0) / 2
    }

    /// Half the lattice height in cells, excluding the centre row
    pub fn half_rows(&self) -> i32 {
        (self.rows as i32 - 1).max(0) / 2
    }
}

/// Generates cell grids from a [`GridSpec`]
pub struct CellGridBuilder;

impl CellGridBuilder {
    /// Largest cell height tried for a screen
    pub fn max_cell_height(screen: &ScreenSpec) -> u32 {
        let min_side = screen.width.min(screen.height) as f32;
        ((60.0 * min_side / 240.0).round() as u32).max(20)
    }

    /// Generate the grid for `spec`.
    ///
    /// `boundary_radius` is the unscaled circle radius for round screens and
    /// is ignored for rectangular ones. Never fails: an empty layout is a
    /// valid result.
    pub fn generate(spec: &GridSpec, boundary_radius: f32) -> GridLayout {
        let boundary = Boundary::for_screen(&spec.screen, boundary_radius, spec.scale);
        if boundary.is_degenerate() {
            log::warn!(
                "Grid: boundary has no area (radius {}, scale {})",
                boundary_radius,
                spec.scale
            );
            return GridLayout::empty(spec.screen);
        }
        let target = spec.target_cell_count as usize;
        let mut best: Option<GridLayout> = None;

        for cell_h in (1..=Self::max_cell_height(&spec.screen)).rev() {
            let mut candidate = Self::lay_out(spec, &boundary, cell_h);
            let count = candidate.cell_count();

            if target > 0 && count >= target {
                candidate.cells.truncate(target);
                log::debug!(
                    "Grid: {} cells at {}x{} px ({}x{} lattice)",
                    target,
                    candidate.cell_w,
                    candidate.cell_h,
                    candidate.cols,
                    candidate.rows
                );
                return candidate;
            }

            if best.as_ref().map_or(true, |b| count > b.cell_count()) {
                best = Some(candidate);
            }
        }

        match best {
            Some(layout) if !layout.is_empty() => {
                if target > 0 {
                    log::warn!(
                        "Grid: target {} not reachable, best candidate has {} cells",
                        target,
                        layout.cell_count()
                    );
                }
                layout
            }
            _ => {
                log::warn!("Grid: no cells fit the boundary");
                GridLayout::empty(spec.screen)
            }
        }
    }

    /// Lay out and classify the lattice for one cell height
    pub fn lay_out(spec: &GridSpec, boundary: &Boundary, cell_h: u32) -> GridLayout {
        let cell_h = cell_h.max(1);
        let cell_w = ((spec.aspect_ratio * cell_h as f32).round() as u32).max(1);
        let step_x = cell_w as f32 + spec.gap as f32;
        let step_y = cell_h as f32 + spec.gap as f32;
        let (radius_x, radius_y) = boundary.half_extent();
        // Cells are at least a pixel apart, so no lattice needs more slots
        // than the screen has pixels along its longer side
        let limit = spec.screen.width.max(spec.screen.height).clamp(1, i32::MAX as u32) as i32;
        let half_cols = half_count(step_x, radius_x, limit);
        let half_rows = half_count(step_y, radius_y, limit);
        let (cx, cy) = boundary.center();

        let mut cells = Vec::new();
        for row in -half_rows..=half_rows {
            for col in -half_cols..=half_cols {
                let center_x = cx + col as f32 * step_x;
                let center_y = cy + row as f32 * step_y;
                let bounds = CellRect::new(
                    (center_x - cell_w as f32 / 2.0).round(),
                    (center_y - cell_h as f32 / 2.0).round(),
                    cell_w as f32,
                    cell_h as f32,
                );

                if let Some(cell_type) = classify(boundary, &bounds, spec.allow_cut) {
                    cells.push(Cell {
                        index: cells.len(),
                        bounds,
                        cell_type,
                        col,
                        row,
                    });
                }
            }
        }

        GridLayout {
            cells,
            cols: (2 * half_cols + 1) as u32,
            rows: (2 * half_rows + 1) as u32,
            cell_w,
            cell_h,
            step_x,
            step_y,
            center: (cx, cy),
            screen: spec.screen,
        }
    }
}

/// Lattice half extent: grows while `((2n+1)·step)/2 ≤ R + step/2`, up to `limit`
fn half_count(step: f32, radius: f32, limit: i32) -> i32 {
    if !(step.is_finite() && step > 0.0 && radius.is_finite()) {
        return 0;
    }
    let mut n = 0;
    while n < limit && ((2 * n + 1) as f32 * step) / 2.0 <= radius + step / 2.0 {
        n += 1;
    }
    n
}

/// Admission rule for one lattice cell
///
/// `allow_cut` saturates at 3 so a cell entirely outside the boundary is
/// only ever admitted through the edge rule.
fn classify(boundary: &Boundary, bounds: &CellRect, allow_cut: u8) -> Option<CellType> {
    let outside = boundary.corners_outside(bounds);
    if outside == 0 {
        return Some(CellType::Inside);
    }
    if allow_cut == 0 {
        return None;
    }

    let (x, y) = bounds.center();
    let admitted = outside <= allow_cut.min(3)
        || boundary.contains(x, y)
        || (outside == 4 && boundary.touches_edges(bounds));
    admitted.then_some(CellType::Boundary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::ScreenShape;

    fn spec(target: u32, allow_cut: u8) -> GridSpec {
        GridSpec {
            target_cell_count: target,
            gap: 1,
            aspect_ratio: 1.0,
            scale: 1.0,
            allow_cut,
            screen: ScreenSpec::default(),
        }
    }

    #[test]
    fn test_max_cell_height() {
        assert_eq!(CellGridBuilder::max_cell_height(&ScreenSpec::default()), 60);
        let small = ScreenSpec {
            width: 64,
            height: 32,
            shape: ScreenShape::Rectangular,
            boundary_radius: None,
        };
        assert_eq!(CellGridBuilder::max_cell_height(&small), 20);
    }

    #[test]
    fn test_half_count() {
        // n·step ≤ R keeps growing
        assert_eq!(half_count(10.0, 25.0, 100), 3);
        assert_eq!(half_count(10.0, 30.0, 100), 4);
        assert_eq!(half_count(10.0, 0.0, 100), 1);
        assert_eq!(half_count(f32::INFINITY, 10.0, 100), 0);
        assert_eq!(half_count(10.0, f32::INFINITY, 100), 0);
        assert_eq!(half_count(1.0, 1e30, 100), 100);
    }

    #[test]
    fn test_strict_cells_fully_inside() {
        let spec = spec(0, 0);
        let layout = CellGridBuilder::generate(&spec, 120.0);
        assert!(!layout.is_empty());
        for cell in &layout.cells {
            assert_eq!(cell.cell_type, CellType::Inside);
            for (x, y) in cell.bounds.corners() {
                assert!((x - 120.0).hypot(y - 120.0) <= 120.0 + 1e-3);
            }
        }
    }

    #[test]
    fn test_allow_cut_monotone_per_candidate() {
        let boundary = Boundary::for_screen(&ScreenSpec::default(), 120.0, 1.0);
        for cell_h in [5, 12, 23, 40] {
            let mut previous = 0;
            for allow_cut in 0..=4 {
                let count = CellGridBuilder::lay_out(&spec(0, allow_cut), &boundary, cell_h)
                    .cell_count();
                assert!(count >= previous, "h={} cut={}", cell_h, allow_cut);
                previous = count;
            }
        }
    }

    #[test]
    fn test_result_not_smaller_than_any_candidate() {
        let spec = spec(100_000, 1);
        let boundary = Boundary::for_screen(&spec.screen, 120.0, spec.scale);
        let best = (1..=CellGridBuilder::max_cell_height(&spec.screen))
            .map(|h| CellGridBuilder::lay_out(&spec, &boundary, h).cell_count())
            .max()
            .unwrap();

        let layout = CellGridBuilder::generate(&spec, 120.0);
        assert_eq!(layout.cell_count(), best);
    }

    #[test]
    fn test_target_truncates_exactly() {
        let layout = CellGridBuilder::generate(&spec(50, 1), 120.0);
        assert_eq!(layout.cell_count(), 50);
        for (i, cell) in layout.cells.iter().enumerate() {
            assert_eq!(cell.index, i);
        }
    }

    #[test]
    fn test_row_major_order() {
        let layout = CellGridBuilder::generate(&spec(0, 1), 120.0);
        for pair in layout.cells.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.row < b.row || (a.row == b.row && a.col < b.col));
        }
    }

    #[test]
    fn test_zero_scale_is_not_an_error() {
        let mut spec = spec(10, 0);
        spec.scale = 0.0;
        let layout = CellGridBuilder::generate(&spec, 120.0);
        assert!(layout.is_empty());
        assert_eq!(layout.cols, 0);
    }

    #[test]
    fn test_rectangular_screen_fills_rectangle() {
        let spec = GridSpec {
            target_cell_count: 0,
            gap: 0,
            aspect_ratio: 1.0,
            scale: 1.0,
            allow_cut: 0,
            screen: ScreenSpec {
                width: 100,
                height: 40,
                shape: ScreenShape::Rectangular,
                boundary_radius: None,
            },
        };
        let layout = CellGridBuilder::generate(&spec, 0.0);
        assert!(!layout.is_empty());
        for cell in &layout.cells {
            assert!(cell.bounds.x >= 0.0 && cell.bounds.right() <= 100.0);
            assert!(cell.bounds.y >= 0.0 && cell.bounds.bottom() <= 40.0);
        }
    }

    #[test]
    fn test_boundary_cells_marked() {
        let layout = CellGridBuilder::generate(&spec(0, 2), 120.0);
        let boundary = layout
            .cells
            .iter()
            .filter(|c| c.cell_type == CellType::Boundary)
            .count();
        assert!(boundary > 0);
        assert!(boundary < layout.cell_count());
    }

    #[test]
    fn test_wide_aspect_ratio_does_not_overflow() {
        let mut spec = spec(0, 1);
        spec.aspect_ratio = 1e10;
        let boundary = Boundary::for_screen(&spec.screen, 120.0, 1.0);
        let layout = CellGridBuilder::lay_out(&spec, &boundary, 20);
        assert_eq!(layout.cell_w, u32::MAX);
        assert!(layout.step_x.is_finite());
        assert_eq!(layout.half_cols(), 1);

        // Whole run terminates as well
        CellGridBuilder::generate(&spec, 120.0);
    }

    #[test]
    fn test_huge_gap_does_not_overflow() {
        let mut spec = spec(0, 1);
        spec.gap = u32::MAX;
        let boundary = Boundary::for_screen(&spec.screen, 120.0, 1.0);
        let layout = CellGridBuilder::lay_out(&spec, &boundary, 20);
        assert!(layout.step_x > u32::MAX as f32 / 2.0);
        // Only the centre cell can land inside a lattice this sparse
        assert!(layout.cell_count() <= 1);
    }

    #[test]
    fn test_non_finite_boundary_yields_empty_layout() {
        let mut infinite_scale = spec(10, 1);
        infinite_scale.scale = f32::INFINITY;
        assert!(CellGridBuilder::generate(&infinite_scale, 120.0).is_empty());

        let spec = spec(10, 1);
        assert!(CellGridBuilder::generate(&spec, f32::NAN).is_empty());
        assert!(CellGridBuilder::generate(&spec, f32::INFINITY).is_empty());
    }

    #[test]
    fn test_huge_radius_is_bounded() {
        let layout = CellGridBuilder::generate(&spec(50, 1), 1e30);
        assert_eq!(layout.cell_count(), 50);
    }
}
