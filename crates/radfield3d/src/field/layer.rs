//! A single typed per-voxel buffer with a physical unit.
use glam::UVec3;

use crate::error::{Error, Result};
use crate::field::dtype::{DType, Element, LayerBuffer, Scalar};
use crate::field::voxel::VoxelValue;

/// Schema entry describing a layer without its data.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerDescriptor {
    pub name: String,
    pub unit: String,
    pub dtype: DType,
    /// Elements per voxel; `1` unless the layer is a histogram.
    pub bins: usize,
}

/// One typed array of per-voxel values.
///
/// The voxel count is fixed when the layer is created and the buffer never grows or shrinks.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    name: String,
    unit: String,
    bins: usize,
    bin_width: f32,
    statistical_error: f32,
    buffer: LayerBuffer,
}

impl Layer {
    /// Creates a zero-initialized layer of `voxel_count` elements.
    ///
    /// For [`DType::Hist`] this creates a single-bin histogram; use [`Layer::new_histogram`]
    /// to choose the bin layout.
    pub(crate) fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        dtype: DType,
        voxel_count: usize,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            bins: 1,
            bin_width: 0.0,
            statistical_error: 0.0,
            buffer: LayerBuffer::zeroed(dtype, voxel_count),
        }
    }

    /// Creates a zero-initialized histogram layer with `bins` values per voxel.
    pub(crate) fn new_histogram(
        name: impl Into<String>,
        unit: impl Into<String>,
        bins: usize,
        bin_width: f32,
        voxel_count: usize,
    ) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            bins,
            bin_width,
            statistical_error: 0.0,
            buffer: LayerBuffer::zeroed(DType::Hist, voxel_count * bins),
        }
    }

    /// Wraps an already decoded buffer. `bins` must divide the buffer length.
    pub(crate) fn from_buffer(
        name: impl Into<String>,
        unit: impl Into<String>,
        bins: usize,
        bin_width: f32,
        buffer: LayerBuffer,
    ) -> Self {
        debug_assert!(bins > 0 && buffer.len() % bins == 0);
        Self {
            name: name.into(),
            unit: unit.into(),
            bins,
            bin_width,
            statistical_error: 0.0,
            buffer,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn dtype(&self) -> DType {
        self.buffer.dtype()
    }

    /// Elements per voxel.
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Width of one histogram bin, `0.0` for non-histogram layers.
    pub fn bin_width(&self) -> f32 {
        self.bin_width
    }

    pub fn voxel_count(&self) -> usize {
        self.buffer.len() / self.bins
    }

    pub fn statistical_error(&self) -> f32 {
        self.statistical_error
    }

    pub fn set_statistical_error(&mut self, error: f32) {
        self.statistical_error = error;
    }

    pub fn descriptor(&self) -> LayerDescriptor {
        LayerDescriptor {
            name: self.name.clone(),
            unit: self.unit.clone(),
            dtype: self.dtype(),
            bins: self.bins,
        }
    }

    pub fn buffer(&self) -> &LayerBuffer {
        &self.buffer
    }

    /// The whole buffer as elements of `T`.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        let found = self.dtype();
        self.buffer.as_slice::<T>().ok_or(Error::TypeMismatch {
            expected: T::DTYPE,
            found,
        })
    }

    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        let found = self.dtype();
        self.buffer.as_mut_slice::<T>().ok_or(Error::TypeMismatch {
            expected: T::DTYPE,
            found,
        })
    }

    /// The whole buffer as flat scalar components of `T`.
    pub fn components<T: Scalar>(&self) -> Result<&[T]> {
        let found = self.dtype();
        self.buffer.components::<T>().ok_or(Error::TypeMismatch {
            expected: T::DTYPE,
            found,
        })
    }

    pub fn components_mut<T: Scalar>(&mut self) -> Result<&mut [T]> {
        let found = self.dtype();
        self.buffer.components_mut::<T>().ok_or(Error::TypeMismatch {
            expected: T::DTYPE,
            found,
        })
    }

    /// Sets every voxel to `value`.
    pub fn fill<T: Element>(&mut self, value: T) -> Result<()> {
        self.as_mut_slice::<T>()?.fill(value);
        Ok(())
    }

    /// Histogram bins of the voxel at linear `index`.
    pub fn histogram(&self, index: usize) -> Result<&[f32]> {
        let range = self.histogram_range(index)?;
        match &self.buffer {
            LayerBuffer::Hist(v) => Ok(&v[range]),
            other => Err(Error::TypeMismatch {
                expected: DType::Hist,
                found: other.dtype(),
            }),
        }
    }

    pub fn histogram_mut(&mut self, index: usize) -> Result<&mut [f32]> {
        let range = self.histogram_range(index)?;
        match &mut self.buffer {
            LayerBuffer::Hist(v) => Ok(&mut v[range]),
            other => Err(Error::TypeMismatch {
                expected: DType::Hist,
                found: other.dtype(),
            }),
        }
    }

    /// Untyped copy of the voxel at linear `index`.
    ///
    /// # Panics
    /// If `index` is not below [`Layer::voxel_count`].
    pub fn value(&self, index: usize) -> VoxelValue {
        match &self.buffer {
            LayerBuffer::Float32(v) => VoxelValue::Float32(v[index]),
            LayerBuffer::Float64(v) => VoxelValue::Float64(v[index]),
            LayerBuffer::Int32(v) => VoxelValue::Int32(v[index]),
            LayerBuffer::Char(v) => VoxelValue::Char(v[index]),
            LayerBuffer::UInt32(v) => VoxelValue::UInt32(v[index]),
            LayerBuffer::UInt64(v) => VoxelValue::UInt64(v[index]),
            LayerBuffer::Vec2(v) => VoxelValue::Vec2(v[index]),
            LayerBuffer::Vec3(v) => VoxelValue::Vec3(v[index]),
            LayerBuffer::Vec4(v) => VoxelValue::Vec4(v[index]),
            LayerBuffer::Hist(v) => {
                VoxelValue::Hist(v[index * self.bins..(index + 1) * self.bins].to_vec())
            }
        }
    }

    fn histogram_range(&self, index: usize) -> Result<std::ops::Range<usize>> {
        if index >= self.voxel_count() {
            return Err(Error::IndexOutOfRange {
                index: UVec3::new(index as u32, 0, 0),
                dims: UVec3::new(self.voxel_count() as u32, 1, 1),
            });
        }
        Ok(index * self.bins..(index + 1) * self.bins)
    }
}
