//! Screen boundary geometry
//!
//! Round panels use a circle of radius `scale × radius` around the screen
//! centre. Rectangular panels use the screen rectangle scaled by `scale`.

use super::{CellRect, ScreenSpec};

/// Admission boundary for lattice cells
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Boundary {
    Circle {
        cx: f32,
        cy: f32,
        radius: f32,
    },
    Rect {
        cx: f32,
        cy: f32,
        half_width: f32,
        half_height: f32,
    },
}

fn extent(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

impl Boundary {
    /// Boundary for a screen. `radius` applies to round screens only.
    ///
    /// A non-finite extent collapses to zero, which admits no cells.
    pub fn for_screen(screen: &ScreenSpec, radius: f32, scale: f32) -> Self {
        let (cx, cy) = screen.center();
        if screen.is_round() {
            Boundary::Circle {
                cx,
                cy,
                radius: extent(radius * scale),
            }
        } else {
            Boundary::Rect {
                cx,
                cy,
                half_width: extent(cx * scale),
                half_height: extent(cy * scale),
            }
        }
    }

    /// Whether the boundary encloses any area at all
    pub fn is_degenerate(&self) -> bool {
        let (rx, ry) = self.half_extent();
        rx <= 0.0 || ry <= 0.0
    }

    pub fn center(&self) -> (f32, f32) {
        match *self {
            Boundary::Circle { cx, cy, .. } | Boundary::Rect { cx, cy, .. } => (cx, cy),
        }
    }

    /// Half extent along each axis
    pub fn half_extent(&self) -> (f32, f32) {
        match *self {
            Boundary::Circle { radius, .. } => (radius, radius),
            Boundary::Rect {
                half_width,
                half_height,
                ..
            } => (half_width, half_height),
        }
    }

    /// Point containment, boundary inclusive
    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        match *self {
            Boundary::Circle { cx, cy, radius } => (x - cx).hypot(y - cy) <= radius,
            Boundary::Rect {
                cx,
                cy,
                half_width,
                half_height,
            } => (x - cx).abs() <= half_width && (y - cy).abs() <= half_height,
        }
    }

    /// Number of rectangle corners outside the boundary (0..=4)
    pub fn corners_outside(&self, rect: &CellRect) -> u8 {
        rect.corners()
            .iter()
            .filter(|&&(x, y)| !self.contains(x, y))
            .count() as u8
    }

    /// Whether any perimeter edge of the rectangle touches the boundary region
    pub fn touches_edges(&self, rect: &CellRect) -> bool {
        rect.edges()
            .iter()
            .any(|&(a, b)| self.intersects_segment(a, b))
    }

    /// Whether the segment `a → b` touches the boundary region
    pub fn intersects_segment(&self, a: (f32, f32), b: (f32, f32)) -> bool {
        match *self {
            Boundary::Circle { cx, cy, radius } => {
                let (dx, dy) = (b.0 - a.0, b.1 - a.1);
                let len_sq = dx * dx + dy * dy;
                let t = if len_sq > 0.0 {
                    (((cx - a.0) * dx + (cy - a.1) * dy) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let (px, py) = (a.0 + t * dx, a.1 + t * dy);
                (px - cx).hypot(py - cy) <= radius
            }
            Boundary::Rect {
                cx,
                cy,
                half_width,
                half_height,
            } => clip_segment(
                a,
                b,
                (cx - half_width, cy - half_height),
                (cx + half_width, cy + half_height),
            ),
        }
    }
}

/// Slab test of a segment against an axis-aligned box
fn clip_segment(a: (f32, f32), b: (f32, f32), min: (f32, f32), max: (f32, f32)) -> bool {
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;
    let axes = [(a.0, b.0 - a.0, min.0, max.0), (a.1, b.1 - a.1, min.1, max.1)];

    for (origin, delta, lo, hi) in axes {
        if delta.abs() < f32::EPSILON {
            if origin < lo || origin > hi {
                return false;
            }
            continue;
        }
        let mut near = (lo - origin) / delta;
        let mut far = (hi - origin) / delta;
        if near > far {
            std::mem::swap(&mut near, &mut far);
        }
        t0 = t0.max(near);
        t1 = t1.min(far);
        if t0 > t1 {
            return false;
        }
    }
    true
}
