//! Point-sampling tracers.
//!
//! The clipped segment is cut into `n` equal pieces and the voxel under the midpoint of each
//! piece is looked up, framed by the voxels of the two (slightly inset) endpoints. `n` scales
//! with the segment length over the finest voxel extent times the configured samples per
//! voxel.
use std::collections::HashSet;

use glam::{DVec3, UVec3};
use mint::Vector3;

use crate::field::FieldGeometry;
use crate::math;
use crate::tracer::segment::{
    clip_to_box, clip_to_sphere, endpoint_inset, outside_same_side, prepare,
};
use crate::tracer::{GridTracer, GridTracerAlgorithm};

/// Sampling tracer for Cartesian grids.
#[derive(Debug, Clone)]
pub struct CartesianSamplingTracer {
    geometry: FieldGeometry,
    samples_per_voxel: u32,
}

impl CartesianSamplingTracer {
    pub fn new(geometry: FieldGeometry, samples_per_voxel: u32) -> Self {
        Self {
            geometry,
            samples_per_voxel: samples_per_voxel.max(1),
        }
    }
}

impl GridTracer for CartesianSamplingTracer {
    fn trace(&self, start: Vector3<f32>, end: Vector3<f32>) -> Vec<usize> {
        let Some((a, b)) = prepare(start, end) else {
            return Vec::new();
        };
        let size = self.geometry.size().as_dvec3();
        if outside_same_side(a, b, DVec3::ZERO, size) {
            return Vec::new();
        }
        let Some((t0, t1)) = clip_to_box(a, b, DVec3::ZERO, size) else {
            return Vec::new();
        };

        // Voxel coordinates are linear in world space, so sample directly in grid space.
        let g0 = self.geometry.to_grid_space(a + (b - a) * t0);
        let g1 = self.geometry.to_grid_space(a + (b - a) * t1);
        let span = (g1 - g0).abs().max_element();
        if span == 0.0 {
            return Vec::new();
        }
        let inset = endpoint_inset(g1 - g0, span);

        collect_entered(
            sample_count(span, self.samples_per_voxel),
            |t| self.geometry.cell_of(g0 + (g1 - g0) * t),
            self.geometry.cell_of(g0 + inset),
            self.geometry.cell_of(g1 - inset),
            self.geometry.grid_dims(),
            false,
        )
    }

    fn algorithm(&self) -> GridTracerAlgorithm {
        GridTracerAlgorithm::Sampling
    }
}

/// Sampling tracer for polar grids.
#[derive(Debug, Clone)]
pub struct PolarSamplingTracer {
    geometry: FieldGeometry,
    samples_per_voxel: u32,
}

impl PolarSamplingTracer {
    pub fn new(geometry: FieldGeometry, samples_per_voxel: u32) -> Self {
        Self {
            geometry,
            samples_per_voxel: samples_per_voxel.max(1),
        }
    }

    /// Shortest bin extent in meters, taking the angular bins at the first radial boundary.
    fn finest_extent(&self) -> f64 {
        let bin = self.geometry.voxel_size().as_dvec3();
        bin.x * bin.y.min(bin.z).min(1.0)
    }
}

impl GridTracer for PolarSamplingTracer {
    fn trace(&self, start: Vector3<f32>, end: Vector3<f32>) -> Vec<usize> {
        let Some((a, b)) = prepare(start, end) else {
            return Vec::new();
        };
        let radius = self.geometry.radius() as f64;
        if outside_same_side(a, b, DVec3::splat(-radius), DVec3::splat(radius)) {
            return Vec::new();
        }
        let Some((t0, t1)) = clip_to_sphere(a, b, radius) else {
            return Vec::new();
        };

        let p0 = a + (b - a) * t0;
        let p1 = a + (b - a) * t1;
        let span = p0.distance(p1) / self.finest_extent();
        if span == 0.0 {
            return Vec::new();
        }
        let inset = endpoint_inset(p1 - p0, span);
        let cell_at = |pos: DVec3| self.geometry.cell_of(self.geometry.to_grid_space(pos));

        collect_entered(
            sample_count(span, self.samples_per_voxel),
            |t| cell_at(p0 + (p1 - p0) * t),
            cell_at(p0 + inset),
            cell_at(p1 - inset),
            self.geometry.grid_dims(),
            true,
        )
    }

    fn algorithm(&self) -> GridTracerAlgorithm {
        GridTracerAlgorithm::Sampling
    }
}

fn sample_count(span_in_voxels: f64, samples_per_voxel: u32) -> usize {
    let voxels = span_in_voxels.ceil().max(1.0) as usize;
    voxels.saturating_mul(samples_per_voxel as usize)
}

/// Walks from `start` over the voxels under the midpoints of `samples` equal pieces of
/// `[0, 1]` to `end` and returns the voxels entered after `start`. With `unique`, voxels
/// already seen are skipped too.
fn collect_entered(
    samples: usize,
    mut cell_at: impl FnMut(f64) -> UVec3,
    start: UVec3,
    end: UVec3,
    dims: UVec3,
    unique: bool,
) -> Vec<usize> {
    let step = 1.0 / samples as f64;
    let mut current = start;
    let mut seen = HashSet::new();
    if unique {
        seen.insert(current);
    }

    let mut indices = Vec::new();
    let cells = (0..samples)
        .map(|i| cell_at((i as f64 + 0.5) * step))
        .chain(std::iter::once(end));
    for cell in cells {
        if cell == current {
            continue;
        }
        current = cell;
        if unique && !seen.insert(cell) {
            continue;
        }
        indices.push(math::linear_index(cell, dims));
    }
    indices
}
