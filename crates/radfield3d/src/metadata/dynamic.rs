//! Free-form metadata values attached to a field under string keys.
use std::fmt;

use glam::{Vec2, Vec3, Vec4};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A binned series of `f32` values with a fixed bin width.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    pub bin_width: f32,
    pub bins: Vec<f32>,
}

/// Tagged value stored in the dynamic metadata map.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum DynamicValue {
    Float32(f32),
    Float64(f64),
    Int32(i32),
    UInt32(u32),
    UInt64(u64),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Text(String),
    Histogram(Histogram),
}

impl DynamicValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            DynamicValue::Float32(_) => "float32",
            DynamicValue::Float64(_) => "float64",
            DynamicValue::Int32(_) => "int32",
            DynamicValue::UInt32(_) => "uint32",
            DynamicValue::UInt64(_) => "uint64",
            DynamicValue::Vec2(_) => "vec2",
            DynamicValue::Vec3(_) => "vec3",
            DynamicValue::Vec4(_) => "vec4",
            DynamicValue::Text(_) => "text",
            DynamicValue::Histogram(_) => "histogram",
        }
    }

    /// Wire tag of the variant.
    pub(crate) fn tag(&self) -> u8 {
        match self {
            DynamicValue::Float32(_) => 0,
            DynamicValue::Float64(_) => 1,
            DynamicValue::Int32(_) => 2,
            DynamicValue::UInt32(_) => 3,
            DynamicValue::UInt64(_) => 4,
            DynamicValue::Vec2(_) => 5,
            DynamicValue::Vec3(_) => 6,
            DynamicValue::Vec4(_) => 7,
            DynamicValue::Text(_) => 8,
            DynamicValue::Histogram(_) => 9,
        }
    }
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicValue::Float32(v) => write!(f, "{v}"),
            DynamicValue::Float64(v) => write!(f, "{v}"),
            DynamicValue::Int32(v) => write!(f, "{v}"),
            DynamicValue::UInt32(v) => write!(f, "{v}"),
            DynamicValue::UInt64(v) => write!(f, "{v}"),
            DynamicValue::Vec2(v) => write!(f, "{v}"),
            DynamicValue::Vec3(v) => write!(f, "{v}"),
            DynamicValue::Vec4(v) => write!(f, "{v}"),
            DynamicValue::Text(v) => f.write_str(v),
            DynamicValue::Histogram(h) => {
                write!(f, "histogram({} bins of {})", h.bins.len(), h.bin_width)
            }
        }
    }
}

/// Types that can be read out of a [`DynamicValue`].
pub trait FromDynamic: Sized {
    /// Name used in mismatch errors.
    const TYPE_NAME: &'static str;

    fn from_dynamic(value: &DynamicValue) -> Option<Self>;
}

macro_rules! impl_dynamic {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl FromDynamic for $ty {
            const TYPE_NAME: &'static str = $name;

            fn from_dynamic(value: &DynamicValue) -> Option<Self> {
                match value {
                    DynamicValue::$variant(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }

        impl From<$ty> for DynamicValue {
            fn from(v: $ty) -> Self {
                DynamicValue::$variant(v)
            }
        }
    };
}

impl_dynamic!(f32, Float32, "float32");
impl_dynamic!(f64, Float64, "float64");
impl_dynamic!(i32, Int32, "int32");
impl_dynamic!(u32, UInt32, "uint32");
impl_dynamic!(u64, UInt64, "uint64");
impl_dynamic!(Vec2, Vec2, "vec2");
impl_dynamic!(Vec3, Vec3, "vec3");
impl_dynamic!(Vec4, Vec4, "vec4");
impl_dynamic!(String, Text, "text");
impl_dynamic!(Histogram, Histogram, "histogram");

impl From<&str> for DynamicValue {
    fn from(v: &str) -> Self {
        DynamicValue::Text(v.to_owned())
    }
}
