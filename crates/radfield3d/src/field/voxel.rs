//! Voxel accessors.
//!
//! A voxel is never stored on its own. [`Voxel`] and [`VoxelMut`] borrow the owning
//! [`Layer`] and address one element of its buffer by linear index; typed reads and writes
//! are checked against the layer dtype.
use std::fmt;

use glam::{Vec2, Vec3, Vec4};

use crate::error::{Error, Result};
use crate::field::dtype::{DType, Element};
use crate::field::layer::Layer;

/// Untyped copy of a single voxel value.
#[derive(Clone, Debug, PartialEq)]
pub enum VoxelValue {
    Float32(f32),
    Float64(f64),
    Int32(i32),
    Char(i8),
    UInt32(u32),
    UInt64(u64),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Hist(Vec<f32>),
}

impl VoxelValue {
    pub fn dtype(&self) -> DType {
        match self {
            VoxelValue::Float32(_) => DType::Float32,
            VoxelValue::Float64(_) => DType::Float64,
            VoxelValue::Int32(_) => DType::Int32,
            VoxelValue::Char(_) => DType::Char,
            VoxelValue::UInt32(_) => DType::UInt32,
            VoxelValue::UInt64(_) => DType::UInt64,
            VoxelValue::Vec2(_) => DType::Vec2,
            VoxelValue::Vec3(_) => DType::Vec3,
            VoxelValue::Vec4(_) => DType::Vec4,
            VoxelValue::Hist(_) => DType::Hist,
        }
    }
}

impl fmt::Display for VoxelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoxelValue::Float32(v) => write!(f, "{v}"),
            VoxelValue::Float64(v) => write!(f, "{v}"),
            VoxelValue::Int32(v) => write!(f, "{v}"),
            VoxelValue::Char(v) => write!(f, "{v}"),
            VoxelValue::UInt32(v) => write!(f, "{v}"),
            VoxelValue::UInt64(v) => write!(f, "{v}"),
            VoxelValue::Vec2(v) => write!(f, "{v}"),
            VoxelValue::Vec3(v) => write!(f, "{v}"),
            VoxelValue::Vec4(v) => write!(f, "{v}"),
            VoxelValue::Hist(bins) => write!(f, "{bins:?}"),
        }
    }
}

/// Read-only view of one voxel of a layer.
#[derive(Clone, Copy, Debug)]
pub struct Voxel<'a> {
    layer: &'a Layer,
    index: usize,
}

impl<'a> Voxel<'a> {
    pub(crate) fn new(layer: &'a Layer, index: usize) -> Self {
        debug_assert!(index < layer.voxel_count());
        Self { layer, index }
    }

    /// Linear index of the voxel inside its layer.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn dtype(&self) -> DType {
        self.layer.dtype()
    }

    pub fn unit(&self) -> &'a str {
        self.layer.unit()
    }

    /// Reads the value as `T`, failing if `T` is not the layer's element type.
    pub fn get<T: Element>(&self) -> Result<T> {
        let data = self.layer.as_slice::<T>()?;
        Ok(data[self.index])
    }

    /// Histogram bins of this voxel.
    pub fn histogram(&self) -> Result<&'a [f32]> {
        let layer: &'a Layer = self.layer;
        layer.histogram(self.index)
    }

    /// Returns an untyped copy of the value.
    pub fn value(&self) -> VoxelValue {
        self.layer.value(self.index)
    }
}

/// Mutable view of one voxel of a layer.
#[derive(Debug)]
pub struct VoxelMut<'a> {
    layer: &'a mut Layer,
    index: usize,
}

impl<'a> VoxelMut<'a> {
    pub(crate) fn new(layer: &'a mut Layer, index: usize) -> Self {
        debug_assert!(index < layer.voxel_count());
        Self { layer, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn dtype(&self) -> DType {
        self.layer.dtype()
    }

    pub fn get<T: Element>(&self) -> Result<T> {
        let data = self.layer.as_slice::<T>()?;
        Ok(data[self.index])
    }

    /// Writes `value`, failing if `T` is not the layer's element type.
    pub fn set<T: Element>(&mut self, value: T) -> Result<()> {
        let index = self.index;
        let data = self.layer.as_mut_slice::<T>()?;
        data[index] = value;
        Ok(())
    }

    /// Writes an untyped value, failing if its dtype (or bin count) does not match.
    pub fn set_value(&mut self, value: &VoxelValue) -> Result<()> {
        match value {
            VoxelValue::Float32(v) => self.set(*v),
            VoxelValue::Float64(v) => self.set(*v),
            VoxelValue::Int32(v) => self.set(*v),
            VoxelValue::Char(v) => self.set(*v),
            VoxelValue::UInt32(v) => self.set(*v),
            VoxelValue::UInt64(v) => self.set(*v),
            VoxelValue::Vec2(v) => self.set(*v),
            VoxelValue::Vec3(v) => self.set(*v),
            VoxelValue::Vec4(v) => self.set(*v),
            VoxelValue::Hist(bins) => {
                let target = self.histogram_mut()?;
                if target.len() != bins.len() {
                    return Err(Error::Validation(format!(
                        "histogram has {} bins, layer expects {}",
                        bins.len(),
                        target.len()
                    )));
                }
                target.copy_from_slice(bins);
                Ok(())
            }
        }
    }

    pub fn histogram(&self) -> Result<&[f32]> {
        self.layer.histogram(self.index)
    }

    pub fn histogram_mut(&mut self) -> Result<&mut [f32]> {
        self.layer.histogram_mut(self.index)
    }

    pub fn value(&self) -> VoxelValue {
        self.layer.value(self.index)
    }
}

impl<T: Element> From<T> for VoxelValue {
    fn from(value: T) -> Self {
        value.into_value()
    }
}
