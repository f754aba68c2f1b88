//! Exact traversal of polar grids by bin-boundary crossings.
//!
//! Bin boundaries of a polar grid are spheres (`r = m Δr`), half-planes through the z axis
//! (`φ = m Δφ`) and cones around it (`θ = m Δθ`). The segment parameters where it meets
//! these surfaces split it into pieces that each lie inside a single bin; the bin of each
//! piece is found by looking up its midpoint.
use std::collections::HashSet;
use std::f64::consts::PI;

use glam::{DVec3, UVec3};
use mint::Vector3;

use crate::field::FieldGeometry;
use crate::math;
use crate::tracer::segment::{clip_to_sphere, outside_same_side, prepare, quadratic_roots};
use crate::tracer::{GridTracer, GridTracerAlgorithm};

/// Pieces shorter than this (in segment parameter) are dropped.
const MIN_PIECE: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct PolarCrossingTracer {
    geometry: FieldGeometry,
}

impl PolarCrossingTracer {
    pub fn new(geometry: FieldGeometry) -> Self {
        Self { geometry }
    }

    /// Sorted segment parameters in `(t0, t1)` where `a + t d` crosses a bin boundary,
    /// framed by `t0` and `t1`.
    fn crossings(&self, a: DVec3, d: DVec3, t0: f64, t1: f64) -> Vec<f64> {
        let dims = self.geometry.grid_dims();
        let bin = self.geometry.voxel_size().as_dvec3();
        let radius = self.geometry.radius() as f64;

        let mut events = vec![t0, t1];
        let mut push = |t: f64| {
            if t > t0 && t < t1 {
                events.push(t);
            }
        };
        let mut push_roots = |roots: Option<(f64, f64)>| {
            if let Some((lo, hi)) = roots {
                push(lo);
                push(hi);
            }
        };

        let dd = d.dot(d);
        let ad = a.dot(d);
        let aa = a.dot(a);

        for m in 1..dims.x {
            let rho = m as f64 * bin.x;
            if rho >= radius {
                break;
            }
            push_roots(quadratic_roots(dd, 2.0 * ad, aa - rho * rho));
        }

        for m in 1..dims.z {
            let theta = m as f64 * bin.z;
            if theta >= PI {
                break;
            }
            let c2 = theta.cos().powi(2);
            push_roots(quadratic_roots(
                d.z * d.z - c2 * dd,
                2.0 * (a.z * d.z - c2 * ad),
                a.z * a.z - c2 * aa,
            ));
        }

        for m in 0..dims.y {
            let (sin, cos) = (m as f64 * bin.y).sin_cos();
            let normal = DVec3::new(-sin, cos, 0.0);
            let denom = normal.dot(d);
            if denom.abs() > f64::EPSILON * dd.sqrt() {
                push(-normal.dot(a) / denom);
            }
        }

        events.sort_by(f64::total_cmp);
        events.dedup_by(|x, y| (*x - *y).abs() <= MIN_PIECE);
        events
    }

    fn cell_at(&self, p: DVec3) -> UVec3 {
        self.geometry.cell_of(self.geometry.to_grid_space(p))
    }
}

impl GridTracer for PolarCrossingTracer {
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

        let d = b - a;
        let events = self.crossings(a, d, t0, t1);
        let dims = self.geometry.grid_dims();

        let mut current = None;
        let mut seen = HashSet::new();
        let mut indices = Vec::new();
        for piece in events.windows(2) {
            if piece[1] - piece[0] <= MIN_PIECE {
                continue;
            }
            let cell = self.cell_at(a + d * (0.5 * (piece[0] + piece[1])));
            if current == Some(cell) {
                continue;
            }
            let first = current.is_none();
            current = Some(cell);
            if seen.insert(cell) && !first {
                indices.push(math::linear_index(cell, dims));
            }
        }
        indices
    }

    fn algorithm(&self) -> GridTracerAlgorithm {
        GridTracerAlgorithm::Bresenham
    }
}
