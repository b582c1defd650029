//! Grid generation scenarios on the default round display

use std::collections::HashSet;
use tarang_io::core::types::Particle;
use tarang_io::field::{FieldAggregator, FieldMode, FieldTuning};
use tarang_io::grid::{Boundary, CellGridBuilder, CellMap, CellType, GridSpec};

fn round_spec(target: u32, allow_cut: u8) -> GridSpec {
    GridSpec {
        target_cell_count: target,
        scale: 1.0,
        allow_cut,
        ..GridSpec::default()
    }
}

#[test]
fn test_radius_120_yields_exact_target() {
    let spec = round_spec(341, 1);
    let layout = CellGridBuilder::generate(&spec, 120.0);

    assert_eq!(layout.cell_count(), 341);
    assert!(layout.cols % 2 == 1 && layout.rows % 2 == 1);
    assert_eq!(layout.cell_w, layout.cell_h);
    assert_eq!(layout.step_x, (layout.cell_w + spec.gap) as f32);
    assert_eq!(layout.step_y, (layout.cell_h + spec.gap) as f32);

    let half_cols = layout.half_cols();
    let half_rows = layout.half_rows();
    for (i, cell) in layout.cells.iter().enumerate() {
        assert_eq!(cell.index, i);
        assert_eq!(cell.bounds.width, layout.cell_w as f32);
        assert_eq!(cell.bounds.height, layout.cell_h as f32);
        assert!(cell.col.abs() <= half_cols);
        assert!(cell.row.abs() <= half_rows);
    }
}

#[test]
fn test_cells_are_row_major_and_unique() {
    let layout = CellGridBuilder::generate(&round_spec(341, 1), 120.0);

    let mut seen = HashSet::new();
    for pair in layout.cells.windows(2) {
        let a = (pair[0].row, pair[0].col);
        let b = (pair[1].row, pair[1].col);
        assert!(a < b, "{:?} should precede {:?}", a, b);
    }
    for cell in &layout.cells {
        assert!(seen.insert((cell.col, cell.row)));
    }
}

#[test]
fn test_no_cut_keeps_cells_inside() {
    let spec = round_spec(341, 0);
    let layout = CellGridBuilder::generate(&spec, 120.0);
    let boundary = Boundary::for_screen(&spec.screen, 120.0, spec.scale);

    assert!(!layout.is_empty());
    for cell in &layout.cells {
        assert_eq!(cell.cell_type, CellType::Inside);
        assert_eq!(boundary.corners_outside(&cell.bounds), 0);
    }
}

#[test]
fn test_unreachable_target_returns_best_candidate() {
    let spec = round_spec(100_000, 1);
    let layout = CellGridBuilder::generate(&spec, 120.0);

    assert!(layout.cell_count() > 341);
    assert!(layout.cell_count() < 100_000);
}

#[test]
fn test_field_covers_generated_grid() {
    let spec = round_spec(341, 1);
    let layout = CellGridBuilder::generate(&spec, 120.0);
    let map = CellMap::new(&layout);

    let mut aggregator = FieldAggregator::new(FieldTuning {
        mode: FieldMode::Density,
        rate_in: 1.0,
        rate_out: 1.0,
        ..FieldTuning::default()
    });
    aggregator.set_grid(&map);

    let centre = [Particle::new(0.5, 0.5, 0.0, 0.0, 8.0)];
    let values = aggregator.compute_frame(&centre, None).to_vec();
    assert_eq!(values.len(), 341);
    assert!(values.iter().any(|&v| v > 0.0));

    let cleared = aggregator.compute_frame(&[], None);
    assert!(cleared.iter().all(|&v| v == 0.0));
}
