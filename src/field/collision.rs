//! Uniform collision grid over normalized particle positions

use crate::core::types::Particle;

/// Broad-phase grid of particle indices, provided by the simulation
pub trait CollisionGrid {
    /// Number of buckets
    fn bucket_count(&self) -> usize;

    /// Particle indices in one bucket
    fn bucket(&self, index: usize) -> &[usize];
}

/// Square grid of `size × size` buckets over the unit square
#[derive(Debug, Clone)]
pub struct UniformCollisionGrid {
    size: usize,
    buckets: Vec<Vec<usize>>,
}

impl UniformCollisionGrid {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            buckets: vec![Vec::new(); size * size],
        }
    }

    /// Build a grid and insert every particle
    pub fn build(particles: &[Particle], size: usize) -> Self {
        let mut grid = Self::new(size);
        grid.rebuild(particles);
        grid
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Re-bucket particles, keeping allocations
    pub fn rebuild(&mut self, particles: &[Particle]) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        let max = (self.size - 1) as f32;
        for (i, p) in particles.iter().enumerate() {
            if !p.x.is_finite() || !p.y.is_finite() {
                continue;
            }
            let gx = (p.x * self.size as f32).floor().clamp(0.0, max) as usize;
            let gy = (p.y * self.size as f32).floor().clamp(0.0, max) as usize;
            self.buckets[gy * self.size + gx].push(i);
        }
    }
}

impl CollisionGrid for UniformCollisionGrid {
    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket(&self, index: usize) -> &[usize] {
        self.buckets.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}
