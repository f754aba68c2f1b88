//! Element types and the tagged storage backing every layer.
//!
//! [`DType`] is the closed set of per-voxel element types. A [`LayerBuffer`] holds one typed
//! vector per dtype so that typed access never needs to reinterpret misaligned bytes; the
//! [`Element`] and [`Scalar`] traits dispatch on the tag and fail with `None` on mismatch.
use std::fmt;

use bytemuck::Pod;
use glam::{Vec2, Vec3, Vec4};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::field::voxel::VoxelValue;

/// Element type of a layer.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Float32,
    Float64,
    Int32,
    Char,
    UInt32,
    UInt64,
    Vec2,
    Vec3,
    Vec4,
    /// Histogram with a per-layer number of `f32` bins per voxel.
    Hist,
}

impl DType {
    pub const ALL: [DType; 10] = [
        DType::Float32,
        DType::Float64,
        DType::Int32,
        DType::Char,
        DType::UInt32,
        DType::UInt64,
        DType::Vec2,
        DType::Vec3,
        DType::Vec4,
        DType::Hist,
    ];

    /// Stable on-disk tag.
    pub fn tag(self) -> u8 {
        match self {
            DType::Float32 => 0,
            DType::Float64 => 1,
            DType::Int32 => 2,
            DType::Char => 3,
            DType::UInt32 => 4,
            DType::UInt64 => 5,
            DType::Vec2 => 6,
            DType::Vec3 => 7,
            DType::Vec4 => 8,
            DType::Hist => 9,
        }
    }

    pub fn from_tag(tag: u8) -> Option<DType> {
        DType::ALL.iter().copied().find(|d| d.tag() == tag)
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Int32 => "int32",
            DType::Char => "char",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Vec2 => "vec2",
            DType::Vec3 => "vec3",
            DType::Vec4 => "vec4",
            DType::Hist => "histogram",
        }
    }

    /// Parses a dtype name, accepting the common C-style aliases and the compiler spellings of
    /// glm float vectors (`glm::vec<3,float,...>`, optionally prefixed by `struct` or `class`).
    pub fn from_name(name: &str) -> Option<DType> {
        let normalized: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        let unqualified = ["struct", "class"]
            .into_iter()
            .find_map(|keyword| normalized.strip_prefix(keyword))
            .unwrap_or(normalized.as_str());
        let unqualified = unqualified.strip_prefix("glm::").unwrap_or(unqualified);
        if let Some(args) = unqualified.strip_prefix("vec<") {
            let mut args = args.split([',', '>']);
            return match (args.next(), args.next()) {
                (Some("2"), Some("float")) => Some(DType::Vec2),
                (Some("3"), Some("float")) => Some(DType::Vec3),
                (Some("4"), Some("float")) => Some(DType::Vec4),
                _ => None,
            };
        }
        let dtype = match unqualified {
            "float" | "float32" | "f32" => DType::Float32,
            "double" | "float64" | "f64" => DType::Float64,
            "int" | "int32" | "i32" => DType::Int32,
            "char" | "i8" => DType::Char,
            "uint32" | "u32" | "unsignedlong" => DType::UInt32,
            "uint64" | "u64" | "unsignedlonglong" => DType::UInt64,
            "vec2" => DType::Vec2,
            "vec3" => DType::Vec3,
            "vec4" => DType::Vec4,
            "hist" | "histogram" => DType::Hist,
            _ => return None,
        };
        Some(dtype)
    }

    /// The scalar type of one component.
    pub fn scalar(self) -> DType {
        match self {
            DType::Vec2 | DType::Vec3 | DType::Vec4 | DType::Hist => DType::Float32,
            other => other,
        }
    }

    /// Number of scalar components of one element. Histograms count per bin.
    pub fn components(self) -> usize {
        match self {
            DType::Vec2 => 2,
            DType::Vec3 => 3,
            DType::Vec4 => 4,
            _ => 1,
        }
    }

    /// Size in bytes of one scalar component.
    pub fn scalar_size(self) -> usize {
        match self.scalar() {
            DType::Float64 | DType::UInt64 => 8,
            DType::Char => 1,
            _ => 4,
        }
    }

    /// Size in bytes of one element (one histogram bin for [`DType::Hist`]).
    pub fn element_size(self) -> usize {
        self.scalar_size() * self.components()
    }

    pub fn is_vector(self) -> bool {
        matches!(self, DType::Vec2 | DType::Vec3 | DType::Vec4)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed storage of a layer, one variant per [`DType`].
///
/// Histogram buffers store `voxels * bins` values, every other variant one element per voxel.
#[derive(Clone, Debug, PartialEq)]
pub enum LayerBuffer {
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Int32(Vec<i32>),
    Char(Vec<i8>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Vec2(Vec<Vec2>),
    Vec3(Vec<Vec3>),
    Vec4(Vec<Vec4>),
    Hist(Vec<f32>),
}

impl LayerBuffer {
    /// Allocates a zero-initialized buffer of `len` elements.
    pub fn zeroed(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::Float32 => LayerBuffer::Float32(vec![0.0; len]),
            DType::Float64 => LayerBuffer::Float64(vec![0.0; len]),
            DType::Int32 => LayerBuffer::Int32(vec![0; len]),
            DType::Char => LayerBuffer::Char(vec![0; len]),
            DType::UInt32 => LayerBuffer::UInt32(vec![0; len]),
            DType::UInt64 => LayerBuffer::UInt64(vec![0; len]),
            DType::Vec2 => LayerBuffer::Vec2(vec![Vec2::ZERO; len]),
            DType::Vec3 => LayerBuffer::Vec3(vec![Vec3::ZERO; len]),
            DType::Vec4 => LayerBuffer::Vec4(vec![Vec4::ZERO; len]),
            DType::Hist => LayerBuffer::Hist(vec![0.0; len]),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            LayerBuffer::Float32(_) => DType::Float32,
            LayerBuffer::Float64(_) => DType::Float64,
            LayerBuffer::Int32(_) => DType::Int32,
            LayerBuffer::Char(_) => DType::Char,
            LayerBuffer::UInt32(_) => DType::UInt32,
            LayerBuffer::UInt64(_) => DType::UInt64,
            LayerBuffer::Vec2(_) => DType::Vec2,
            LayerBuffer::Vec3(_) => DType::Vec3,
            LayerBuffer::Vec4(_) => DType::Vec4,
            LayerBuffer::Hist(_) => DType::Hist,
        }
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        match self {
            LayerBuffer::Float32(v) | LayerBuffer::Hist(v) => v.len(),
            LayerBuffer::Float64(v) => v.len(),
            LayerBuffer::Int32(v) => v.len(),
            LayerBuffer::Char(v) => v.len(),
            LayerBuffer::UInt32(v) => v.len(),
            LayerBuffer::UInt64(v) => v.len(),
            LayerBuffer::Vec2(v) => v.len(),
            LayerBuffer::Vec3(v) => v.len(),
            LayerBuffer::Vec4(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the payload in bytes, as written to disk.
    pub fn byte_len(&self) -> usize {
        self.len() * self.dtype().element_size()
    }

    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(self)
    }

    /// Flat view of all scalar components, e.g. `3 * len` `f32`s for a `Vec3` buffer.
    pub fn components<T: Scalar>(&self) -> Option<&[T]> {
        T::components(self)
    }

    pub fn components_mut<T: Scalar>(&mut self) -> Option<&mut [T]> {
        T::components_mut(self)
    }
}

/// A type that can be stored as one element of a layer.
pub trait Element: Pod + PartialEq + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;

    fn slice(buffer: &LayerBuffer) -> Option<&[Self]>;

    fn slice_mut(buffer: &mut LayerBuffer) -> Option<&mut [Self]>;

    fn into_value(self) -> VoxelValue;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            #[inline]
            fn slice(buffer: &LayerBuffer) -> Option<&[Self]> {
                match buffer {
                    LayerBuffer::$variant(v) => Some(v),
                    _ => None,
                }
            }

            #[inline]
            fn slice_mut(buffer: &mut LayerBuffer) -> Option<&mut [Self]> {
                match buffer {
                    LayerBuffer::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_value(self) -> VoxelValue {
                VoxelValue::$variant(self)
            }
        }
    };
}

impl_element!(f32, Float32);
impl_element!(f64, Float64);
impl_element!(i32, Int32);
impl_element!(i8, Char);
impl_element!(u32, UInt32);
impl_element!(u64, UInt64);
impl_element!(Vec2, Vec2);
impl_element!(Vec3, Vec3);
impl_element!(Vec4, Vec4);

/// A scalar component type. Vector and histogram buffers expose their components as `f32`.
pub trait Scalar: Pod + PartialEq + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;

    fn components(buffer: &LayerBuffer) -> Option<&[Self]>;

    fn components_mut(buffer: &mut LayerBuffer) -> Option<&mut [Self]>;
}

impl Scalar for f32 {
    const DTYPE: DType = DType::Float32;

    fn components(buffer: &LayerBuffer) -> Option<&[Self]> {
        match buffer {
            LayerBuffer::Float32(v) | LayerBuffer::Hist(v) => Some(v),
            LayerBuffer::Vec2(v) => Some(bytemuck::cast_slice(v)),
            LayerBuffer::Vec3(v) => Some(bytemuck::cast_slice(v)),
            LayerBuffer::Vec4(v) => Some(bytemuck::cast_slice(v)),
            _ => None,
        }
    }

    fn components_mut(buffer: &mut LayerBuffer) -> Option<&mut [Self]> {
        match buffer {
            LayerBuffer::Float32(v) | LayerBuffer::Hist(v) => Some(v),
            LayerBuffer::Vec2(v) => Some(bytemuck::cast_slice_mut(v)),
            LayerBuffer::Vec3(v) => Some(bytemuck::cast_slice_mut(v)),
            LayerBuffer::Vec4(v) => Some(bytemuck::cast_slice_mut(v)),
            _ => None,
        }
    }
}

macro_rules! impl_scalar {
    ($ty:ty) => {
        impl Scalar for $ty {
            const DTYPE: DType = <$ty as Element>::DTYPE;

            #[inline]
            fn components(buffer: &LayerBuffer) -> Option<&[Self]> {
                <$ty as Element>::slice(buffer)
            }

            #[inline]
            fn components_mut(buffer: &mut LayerBuffer) -> Option<&mut [Self]> {
                <$ty as Element>::slice_mut(buffer)
            }
        }
    };
}

impl_scalar!(f64);
impl_scalar!(i32);
impl_scalar!(i8);
impl_scalar!(u32);
impl_scalar!(u64);
