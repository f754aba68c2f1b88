//! Integer line rasterization on Cartesian grids.
use glam::{DVec3, IVec3};
use mint::Vector3;

use crate::field::FieldGeometry;
use crate::math;
use crate::tracer::segment::{clip_to_box, endpoint_inset, outside_same_side, prepare};
use crate::tracer::{GridTracer, GridTracerAlgorithm};

/// 3D Bresenham traversal from the start voxel to the end voxel.
///
/// Every step advances the dominant axis by one voxel, so the number of voxels reported is
/// the largest per-axis voxel distance between the endpoints.
#[derive(Debug, Clone)]
pub struct CartesianBresenhamTracer {
    geometry: FieldGeometry,
}

impl CartesianBresenhamTracer {
    pub fn new(geometry: FieldGeometry) -> Self {
        Self { geometry }
    }

    /// Start and end voxel of the segment clipped to the grid.
    fn endpoints(&self, a: DVec3, b: DVec3) -> Option<(IVec3, IVec3)> {
        let size = self.geometry.size().as_dvec3();
        if outside_same_side(a, b, DVec3::ZERO, size) {
            return None;
        }
        let (t0, t1) = clip_to_box(a, b, DVec3::ZERO, size)?;

        let g0 = self.geometry.to_grid_space(a + (b - a) * t0);
        let g1 = self.geometry.to_grid_space(a + (b - a) * t1);
        let delta = g1 - g0;
        let span = delta.abs().max_element();
        if span == 0.0 {
            return None;
        }
        let inset = endpoint_inset(delta, span);

        let v0 = self.geometry.cell_of(g0 + inset).as_ivec3();
        let v1 = self.geometry.cell_of(g1 - inset).as_ivec3();
        Some((v0, v1))
    }
}

impl GridTracer for CartesianBresenhamTracer {
    fn trace(&self, start: Vector3<f32>, end: Vector3<f32>) -> Vec<usize> {
        let Some((a, b)) = prepare(start, end) else {
            return Vec::new();
        };
        let Some((from, to)) = self.endpoints(a, b) else {
            return Vec::new();
        };

        let dims = self.geometry.grid_dims();
        let mut indices = Vec::with_capacity((to - from).abs().max_element() as usize);
        rasterize(from, to, |voxel| {
            indices.push(math::linear_index(voxel.as_uvec3(), dims));
        });
        indices
    }

    fn algorithm(&self) -> GridTracerAlgorithm {
        GridTracerAlgorithm::Bresenham
    }
}

/// Visits the voxels of the 26-connected line `from -> to`, excluding `from`.
fn rasterize(from: IVec3, to: IVec3, mut visit: impl FnMut(IVec3)) {
    let delta = (to - from).abs();
    let step = (to - from).signum();

    // Dominant axis first, the two others after it.
    let major = if delta.x >= delta.y && delta.x >= delta.z {
        0
    } else if delta.y >= delta.z {
        1
    } else {
        2
    };
    let (u, v) = ((major + 1) % 3, (major + 2) % 3);

    let d = delta.to_array();
    let s = step.to_array();
    let mut p = from.to_array();
    let mut err_u = 2 * d[u] - d[major];
    let mut err_v = 2 * d[v] - d[major];

    for _ in 0..d[major] {
        p[major] += s[major];
        if err_u >= 0 {
            p[u] += s[u];
            err_u -= 2 * d[major];
        }
        if err_v >= 0 {
            p[v] += s[v];
            err_v -= 2 * d[major];
        }
        err_u += 2 * d[u];
        err_v += 2 * d[v];
        visit(IVec3::from_array(p));
    }
}
