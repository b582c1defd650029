//! Circle / rectangle overlap estimate
//!
//! Exact when one shape contains the other. Partial overlaps start from the
//! intersection of the circle's bounding box with the rectangle:
//!
//! - centre inside the rectangle: circle area minus the four circular
//!   segments cut off by the rectangle sides
//! - centre outside: box area blended towards `π/4 × box` as the centre
//!   moves away (`0.785 + 0.215·(1 − d/r)`)
//!
//! The estimate is biased on purpose and downstream tuning depends on it.
//! A thin rectangle can cut away more than the circle holds, which yields a
//! non-positive estimate; callers treat that as no overlap.

use crate::grid::CellRect;
use std::f32::consts::PI;

/// Approximate overlap area between a circle and a rectangle
pub fn circle_rect_overlap(cx: f32, cy: f32, radius: f32, rect: &CellRect) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }

    let closest_x = cx.clamp(rect.x, rect.right());
    let closest_y = cy.clamp(rect.y, rect.bottom());
    let dist_sq = (cx - closest_x).powi(2) + (cy - closest_y).powi(2);
    if dist_sq > radius * radius {
        return 0.0;
    }

    let circle_area = PI * radius * radius;

    // Circle covers the whole rectangle
    if cx - radius <= rect.x
        && cx + radius >= rect.right()
        && cy - radius <= rect.y
        && cy + radius >= rect.bottom()
    {
        return rect.area();
    }

    // Rectangle holds the whole circle
    if cx - radius >= rect.x
        && cx + radius <= rect.right()
        && cy - radius >= rect.y
        && cy + radius <= rect.bottom()
    {
        return circle_area;
    }

    let left = (cx - radius).max(rect.x);
    let right = (cx + radius).min(rect.right());
    let top = (cy - radius).max(rect.y);
    let bottom = (cy + radius).min(rect.bottom());
    if left >= right || top >= bottom {
        return 0.0;
    }
    let box_area = (right - left) * (bottom - top);

    if cx >= rect.x && cx <= rect.right() && cy >= rect.y && cy <= rect.bottom() {
        let cut = segment_area(radius, cx - rect.x)
            + segment_area(radius, rect.right() - cx)
            + segment_area(radius, cy - rect.y)
            + segment_area(radius, rect.bottom() - cy);
        return circle_area - cut;
    }

    let weight = 1.0 - dist_sq.sqrt() / radius;
    box_area * (0.785 + 0.215 * weight)
}

/// Area of the circular segment beyond a chord at `distance` from the centre
pub fn segment_area(radius: f32, distance: f32) -> f32 {
    if distance >= radius {
        return 0.0;
    }
    let theta = 2.0 * (distance / radius).clamp(-1.0, 1.0).acos();
    radius * radius * (theta - theta.sin()) / 2.0
}

/// Coverage of a cell in percent after `(x/100)^1.5·100` compression
#[inline]
pub fn compressed_coverage(overlap: f32, cell_area: f32) -> f32 {
    if cell_area <= 0.0 {
        return 0.0;
    }
    let pct = overlap / cell_area * 100.0;
    (pct / 100.0).powf(1.5) * 100.0
}
