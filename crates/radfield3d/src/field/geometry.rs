//! Grid geometry of a radiation field.
//!
//! Both variants share one parameterization: a `size` split into bins of `voxel_size`, with
//! `grid_dims = ceil(size / voxel_size)` per axis.
//!
//! - Cartesian grids span the box `[0, size]` in world meters.
//! - Polar grids are spherical and centred on the origin. Their axes are
//!   `(r, azimuth φ, polar angle θ)` with `size = (radius, 2π, π)`.
use std::f32::consts::{PI, TAU};
use std::fmt;

use glam::{DVec3, UVec3, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math;

/// Kind of grid a field is laid out on.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Cartesian,
    Polar,
}

impl FieldType {
    pub fn tag(self) -> u8 {
        match self {
            FieldType::Cartesian => 0,
            FieldType::Polar => 1,
        }
    }

    pub fn from_tag(tag: u8) -> Option<FieldType> {
        match tag {
            0 => Some(FieldType::Cartesian),
            1 => Some(FieldType::Polar),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Cartesian => f.write_str("cartesian"),
            FieldType::Polar => f.write_str("polar"),
        }
    }
}

/// Immutable geometry of a field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldGeometry {
    field_type: FieldType,
    size: Vec3,
    voxel_size: Vec3,
    dims: UVec3,
}

impl FieldGeometry {
    /// Cartesian box `[0, size]` split into voxels of `voxel_size` meters.
    pub fn cartesian(size: Vec3, voxel_size: Vec3) -> Result<Self> {
        Self::new(FieldType::Cartesian, size, voxel_size)
    }

    /// Sphere of `radius` meters split into `(Δr, Δφ, Δθ)` bins (meters, radians, radians).
    pub fn polar(radius: f32, bin_size: Vec3) -> Result<Self> {
        Self::new(FieldType::Polar, Vec3::new(radius, TAU, PI), bin_size)
    }

    /// Builds a geometry from its stored parameters.
    pub fn new(field_type: FieldType, size: Vec3, voxel_size: Vec3) -> Result<Self> {
        validate_extent("size", size)?;
        validate_extent("voxel_size", voxel_size)?;

        let ratio = size.as_dvec3() / voxel_size.as_dvec3();
        let dims =
            DVec3::select(near_integer(ratio), ratio.round(), ratio.ceil()).max(DVec3::ONE);
        if dims.max_element() > u32::MAX as f64 || dims.element_product() > isize::MAX as f64 {
            return Err(Error::InvalidConfig(format!(
                "{size} split into {voxel_size} exceeds the addressable grid"
            )));
        }

        Ok(Self {
            field_type,
            size,
            voxel_size,
            dims: dims.as_uvec3(),
        })
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn size(&self) -> Vec3 {
        self.size
    }

    pub fn voxel_size(&self) -> Vec3 {
        self.voxel_size
    }

    /// Voxel counts per axis.
    pub fn grid_dims(&self) -> UVec3 {
        self.dims
    }

    pub fn voxel_count(&self) -> usize {
        math::voxel_count(self.dims)
    }

    /// Outer radius of a polar grid; the x extent for Cartesian grids.
    pub fn radius(&self) -> f32 {
        self.size.x
    }

    /// Grid-space coordinates of `pos` before flooring: Cartesian `pos / voxel_size`,
    /// polar `(r, φ, θ) / voxel_size`.
    pub fn to_grid_space(&self, pos: DVec3) -> DVec3 {
        let voxel_size = self.voxel_size.as_dvec3();
        match self.field_type {
            FieldType::Cartesian => pos / voxel_size,
            FieldType::Polar => to_spherical(pos) / voxel_size,
        }
    }

    /// Voxel containing `pos`, with positions on the upper boundary mapped into the last voxel.
    pub fn voxel_coords_at(&self, pos: Vec3) -> Option<UVec3> {
        let pos = pos.as_dvec3();
        let inside = match self.field_type {
            FieldType::Cartesian => {
                pos.cmpge(DVec3::ZERO).all() && pos.cmple(self.size.as_dvec3()).all()
            }
            FieldType::Polar => pos.length() <= self.size.x as f64,
        };
        inside.then(|| self.clamp_to_grid(self.to_grid_space(pos)))
    }

    /// Linear index of the voxel containing `pos`.
    pub fn voxel_index_at(&self, pos: Vec3) -> Option<usize> {
        self.voxel_coords_at(pos)
            .map(|c| math::linear_index(c, self.dims))
    }

    /// World position of the centre of voxel `coords`.
    pub fn voxel_center(&self, coords: UVec3) -> Vec3 {
        let grid = (coords.as_vec3() + Vec3::splat(0.5)) * self.voxel_size;
        match self.field_type {
            FieldType::Cartesian => grid,
            FieldType::Polar => {
                let (r, phi, theta) = (grid.x, grid.y, grid.z);
                Vec3::new(
                    r * theta.sin() * phi.cos(),
                    r * theta.sin() * phi.sin(),
                    r * theta.cos(),
                )
            }
        }
    }

    /// Floors grid-space coordinates and clamps them into `[0, dims - 1]`.
    #[inline]
    pub(crate) fn clamp_to_grid(&self, grid: DVec3) -> UVec3 {
        let max = (self.dims - UVec3::ONE).as_dvec3();
        snap_floor(grid).clamp(DVec3::ZERO, max).as_uvec3()
    }

    /// Like [`FieldGeometry::clamp_to_grid`] but without boundary snapping, for points that
    /// are known not to sit on a boundary.
    #[inline]
    pub(crate) fn cell_of(&self, grid: DVec3) -> UVec3 {
        let max = (self.dims - UVec3::ONE).as_dvec3();
        grid.floor().clamp(DVec3::ZERO, max).as_uvec3()
    }
}

impl fmt::Display for FieldGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} field of size {} with voxels of {} ({} x {} x {})",
            self.field_type, self.size, self.voxel_size, self.dims.x, self.dims.y, self.dims.z
        )
    }
}

/// `(r, φ, θ)` of `pos` with `φ ∈ [0, 2π)` and `θ ∈ [0, π]`.
#[inline]
pub(crate) fn to_spherical(pos: DVec3) -> DVec3 {
    let r = pos.length();
    if r == 0.0 {
        return DVec3::ZERO;
    }
    let mut phi = pos.y.atan2(pos.x);
    if phi < 0.0 {
        phi += std::f64::consts::TAU;
    }
    let theta = (pos.z / r).clamp(-1.0, 1.0).acos();
    DVec3::new(r, phi, theta)
}

/// Relative distance below which a grid coordinate counts as lying on a voxel boundary.
/// Absorbs the rounding of decimal sizes such as `0.01` stored as `f32`.
const BOUNDARY_EPS: f64 = 1e-6;

#[inline]
fn near_integer(v: DVec3) -> glam::BVec3 {
    let tol = v.abs().max(DVec3::ONE) * BOUNDARY_EPS;
    (v - v.round()).abs().cmple(tol)
}

/// Floors `v`, treating coordinates within [`BOUNDARY_EPS`] of a boundary as on it.
#[inline]
pub(crate) fn snap_floor(v: DVec3) -> DVec3 {
    DVec3::select(near_integer(v), v.round(), v.floor())
}

fn validate_extent(what: &str, v: Vec3) -> Result<()> {
    if !v.is_finite() || v.cmple(Vec3::ZERO).any() {
        return Err(Error::InvalidConfig(format!(
            "{what} must be finite and > 0 in every component, got {v}"
        )));
    }
    Ok(())
}
