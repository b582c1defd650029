//! Per-mode target computations
//!
//! Every function writes into a zeroed `out` slice with one entry per cell.

use super::collision::CollisionGrid;
use super::overlap::{circle_rect_overlap, compressed_coverage};
use super::FieldTuning;
use crate::core::types::Particle;
use crate::grid::CellMap;

/// Gain applied on top of the pressure tune
pub const PRESSURE_GAIN: f32 = 10.0;

/// Exponent of the signed vorticity rescale
const VORTICITY_EXPONENT: f32 = 0.5;

/// One frame of particles projected into pixel space
pub(super) struct FrameInput<'a> {
    pub map: &'a CellMap,
    pub tuning: &'a FieldTuning,
    pub particles: &'a [Particle],
    pub positions: Vec<(f32, f32)>,
}

impl<'a> FrameInput<'a> {
    pub fn new(map: &'a CellMap, tuning: &'a FieldTuning, particles: &'a [Particle]) -> Self {
        let screen = map.screen();
        let (w, h) = (screen.width as f32, screen.height as f32);
        let positions = particles.iter().map(|p| p.to_pixel(w, h)).collect();
        Self {
            map,
            tuning,
            particles,
            positions,
        }
    }

    #[inline]
    fn radius(&self, i: usize) -> f32 {
        (self.particles[i].size * self.tuning.particle_radius_scale).max(0.0)
    }

    /// Visit each cell the particle footprint overlaps with its overlap area
    fn for_each_overlap(&self, i: usize, mut f: impl FnMut(usize, f32)) {
        let (px, py) = self.positions[i];
        let radius = self.radius(i);
        if radius <= 0.0 {
            return;
        }
        let cells = self.map.cells();
        self.map.for_each_near(px, py, radius, |c| {
            let overlap = circle_rect_overlap(px, py, radius, &cells[c].bounds);
            if overlap > 0.0 {
                f(c, overlap);
            }
        });
    }

    /// Visit each overlapped cell with its compressed coverage percentage
    fn for_each_coverage(&self, i: usize, mut f: impl FnMut(usize, f32)) {
        let cell_area = self.map.cell_area();
        self.for_each_overlap(i, |c, overlap| f(c, compressed_coverage(overlap, cell_area)));
    }
}

/// Pairwise proximity `1 − d²/r²` against particles in nearby cells,
/// normalised by the cell's own particle count.
///
/// `multi_cell` places each particle in every cell its footprint overlaps
/// instead of the single cell containing its centre.
pub(super) fn proximity(input: &FrameInput, out: &mut [f32], multi_cell: bool, tune: f32) {
    let map = input.map;
    let radius = input.tuning.proximity_radius.max(f32::EPSILON);
    let radius_sq = radius * radius;

    let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); map.len()];
    for (i, &(px, py)) in input.positions.iter().enumerate() {
        if multi_cell {
            input.for_each_overlap(i, |c, _| buckets[c].push(i));
        } else if let Some(c) = map.cell_at(px, py) {
            buckets[c].push(i);
        }
    }

    for (cell, members) in buckets.iter().enumerate() {
        if members.is_empty() {
            continue;
        }
        let mut total = 0.0;
        map.for_each_neighbor_within(cell, radius, |neighbor| {
            for &a in members {
                let (ax, ay) = input.positions[a];
                for &b in &buckets[neighbor] {
                    if a == b {
                        continue;
                    }
                    let (bx, by) = input.positions[b];
                    let dist_sq = (bx - ax).powi(2) + (by - ay).powi(2);
                    if dist_sq < radius_sq {
                        total += 1.0 - dist_sq / radius_sq;
                    }
                }
            }
        });
        out[cell] = total / members.len() as f32 * tune;
    }
}

/// Summed coverage fraction, capped at 1 per particle
pub(super) fn density(input: &FrameInput, out: &mut [f32]) {
    for i in 0..input.particles.len() {
        input.for_each_coverage(i, |c, pct| out[c] += (pct / 100.0).min(1.0));
    }
}

/// Summed coverage percentage scaled by 0.1, capped at 100 per particle
pub(super) fn overlap(input: &FrameInput, out: &mut [f32]) {
    for i in 0..input.particles.len() {
        input.for_each_coverage(i, |c, pct| out[c] += (pct * 0.1).min(100.0));
    }
}

/// Coverage-weighted mean particle speed
pub(super) fn velocity(input: &FrameInput, out: &mut [f32]) {
    let mut weights = vec![0.0f32; out.len()];
    for (i, particle) in input.particles.iter().enumerate() {
        let speed = particle.speed();
        input.for_each_coverage(i, |c, pct| {
            let w = pct / 100.0;
            weights[c] += w;
            out[c] += w * speed;
        });
    }

    let tune = input.tuning.velocity_tune;
    for (value, &w) in out.iter_mut().zip(&weights) {
        *value = if w > 0.0 { *value / w * tune } else { 0.0 };
    }
}

/// Squared total coverage
pub(super) fn pressure(input: &FrameInput, out: &mut [f32]) {
    for i in 0..input.particles.len() {
        input.for_each_coverage(i, |c, pct| out[c] += pct);
    }

    let gain = input.tuning.pressure_tune * PRESSURE_GAIN;
    for value in out.iter_mut() {
        *value = (*value / 100.0).powi(2) * gain;
    }
}

/// Curl of the coverage-weighted velocity field.
///
/// Velocities keep the simulation's y-up convention, so "up" in the lattice
/// is the row above.
pub(super) fn vorticity(input: &FrameInput, out: &mut [f32]) {
    let len = out.len();
    let mut vx = vec![0.0f32; len];
    let mut vy = vec![0.0f32; len];
    let mut weights = vec![0.0f32; len];

    for (i, particle) in input.particles.iter().enumerate() {
        input.for_each_coverage(i, |c, pct| {
            let w = pct / 100.0;
            weights[c] += w;
            vx[c] += w * particle.vx;
            vy[c] += w * particle.vy;
        });
    }
    for c in 0..len {
        if weights[c] > 0.0 {
            vx[c] /= weights[c];
            vy[c] /= weights[c];
        }
    }

    let map = input.map;
    let (step_x, step_y) = map.step();
    let tune = input.tuning.vorticity_tune;
    for (c, value) in out.iter_mut().enumerate() {
        let dvy_dx = gradient(map, &vy, c, (1, 0), step_x);
        let dvx_dy = gradient(map, &vx, c, (0, -1), step_y);
        let curl = dvy_dx - dvx_dy;
        *value = if curl == 0.0 {
            0.0
        } else {
            curl.signum() * (curl.abs() * tune).powf(VORTICITY_EXPONENT)
        };
    }
}

/// Mean of the one-sided differences available along a lattice direction
fn gradient(map: &CellMap, field: &[f32], c: usize, (dc, dr): (i32, i32), step: f32) -> f32 {
    let here = field[c];
    let mut sum = 0.0;
    let mut n = 0;
    if let Some(ahead) = map.lattice_neighbor(c, dc, dr) {
        sum += (field[ahead] - here) / step;
        n += 1;
    }
    if let Some(behind) = map.lattice_neighbor(c, -dc, -dr) {
        sum += (here - field[behind]) / step;
        n += 1;
    }
    if n == 0 {
        0.0
    } else {
        sum / n as f32
    }
}

/// Contact intensity `overlapDepth × relativeSpeed` for each overlapping
/// pair in a collision bucket, spread over the cells either particle
/// covers and averaged by overlap area.
pub(super) fn collision(input: &FrameInput, grid: &dyn CollisionGrid, out: &mut [f32]) {
    let count = input.particles.len();
    let mut weights = vec![0.0f32; out.len()];

    for bucket in 0..grid.bucket_count() {
        let members = grid.bucket(bucket);
        if members.len() < 2 {
            continue;
        }
        for (k, &a) in members.iter().enumerate() {
            for &b in &members[k + 1..] {
                if a >= count || b >= count || a == b {
                    continue;
                }
                let (ax, ay) = input.positions[a];
                let (bx, by) = input.positions[b];
                let depth = input.radius(a) + input.radius(b) - (bx - ax).hypot(by - ay);
                if depth <= 0.0 {
                    continue;
                }
                let (pa, pb) = (&input.particles[a], &input.particles[b]);
                let intensity = depth * (pb.vx - pa.vx).hypot(pb.vy - pa.vy);

                for p in [a, b] {
                    input.for_each_overlap(p, |c, area| {
                        out[c] += intensity * area;
                        weights[c] += area;
                    });
                }
            }
        }
    }

    let tune = input.tuning.collision_tune;
    for (value, &w) in out.iter_mut().zip(&weights) {
        *value = if w > 0.0 { *value / w * tune } else { 0.0 };
    }
}
