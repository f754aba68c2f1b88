#![forbid(unsafe_code)]
//! radfield3d: voxelized multi-channel radiation fields.
//!
//! Modules:
//! - field: Cartesian and polar voxel grids with named channels and typed layers
//! - tracer: line-segment traversal of a field grid (sampling and exact crossing tracers)
//! - metadata: simulation, tube and software descriptions plus free-form dynamic entries
//! - store: versioned binary files with partial loading of metadata, channels and layers
//!
//! For examples, see the README.
pub mod error;
pub mod field;
pub mod math;
pub mod metadata;
pub mod store;
pub mod tracer;

pub use error::{Error, Result};

/// Convenient re-exports for common types. Import with `use radfield3d::prelude::*;`.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::field::{
        Channel, DType, Element, FieldGeometry, FieldType, Layer, LayerBuffer, LayerDescriptor,
        LayerView, LayerViewMut, RadiationField, Scalar, Voxel, VoxelMut, VoxelValue,
    };
    pub use crate::metadata::{
        DynamicValue, FieldShape, FromDynamic, Histogram, Metadata, MetadataVersion, Simulation,
        Software, Spectrum, Tube,
    };
    pub use crate::store::{FieldStore, StoreVersion};
    pub use crate::tracer::{
        CartesianBresenhamTracer, CartesianSamplingTracer, GridTracer, GridTracerAlgorithm,
        GridTracerFactory, PolarCrossingTracer, PolarSamplingTracer, TracerConfig,
    };
}
