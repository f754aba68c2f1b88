//! Line-segment voxel tracers.
//!
//! A tracer returns the linear indices of the voxels a segment passes through, in order of
//! traversal. All tracers share the same conventions:
//!
//! - the segment is clipped to the grid first; segments missing the grid yield nothing,
//! - the voxel containing the (clipped) start point is not reported, every voxel entered
//!   afterwards is,
//! - consecutive duplicates are collapsed.
//!
//! Which voxels count as entered depends on the algorithm. See [`GridTracerAlgorithm`].
use mint::Vector3;
use tracing::debug;

use crate::error::{Error, Result};
use crate::field::{FieldGeometry, FieldType, RadiationField};

pub mod bresenham;
pub mod polar;
pub mod sampling;
pub(crate) mod segment;

pub use bresenham::CartesianBresenhamTracer;
pub use polar::PolarCrossingTracer;
pub use sampling::{CartesianSamplingTracer, PolarSamplingTracer};

/// Trait for voxel traversal of a line segment.
pub trait GridTracer: Send + Sync {
    /// Linear voxel indices (`x + y * dims.x + z * dims.x * dims.y`) entered by the
    /// segment `start -> end`, in traversal order.
    fn trace(&self, start: Vector3<f32>, end: Vector3<f32>) -> Vec<usize>;

    fn algorithm(&self) -> GridTracerAlgorithm;
}

/// Traversal strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GridTracerAlgorithm {
    /// Point sampling along the segment; fast, may miss voxels the line only grazes.
    Sampling,
    /// Exact integer line rasterization for Cartesian grids, exact boundary crossings for
    /// polar grids.
    Bresenham,
}

/// Tuning shared by all tracers.
#[derive(Clone, Debug, PartialEq)]
pub struct TracerConfig {
    /// Samples taken per voxel length by the sampling tracers.
    pub samples_per_voxel: u32,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            samples_per_voxel: 4,
        }
    }
}

impl TracerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_samples_per_voxel(mut self, samples: u32) -> Self {
        self.samples_per_voxel = samples;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.samples_per_voxel == 0 {
            return Err(Error::InvalidConfig(
                "samples_per_voxel must be at least 1".into(),
            ));
        }
        if self.samples_per_voxel > 1024 {
            return Err(Error::InvalidConfig(format!(
                "samples_per_voxel must not exceed 1024, got {}",
                self.samples_per_voxel
            )));
        }
        Ok(())
    }
}

/// Builds the tracer matching a field's geometry.
pub struct GridTracerFactory;

impl GridTracerFactory {
    /// Tracer for `field` using the default [`TracerConfig`].
    pub fn construct(
        field: &RadiationField,
        algorithm: GridTracerAlgorithm,
    ) -> Box<dyn GridTracer> {
        Self::for_geometry(*field.geometry(), algorithm, &TracerConfig::default())
    }

    /// Tracer for `field` with an explicit configuration.
    pub fn construct_with(
        field: &RadiationField,
        algorithm: GridTracerAlgorithm,
        config: &TracerConfig,
    ) -> Result<Box<dyn GridTracer>> {
        config.validate()?;
        Ok(Self::for_geometry(*field.geometry(), algorithm, config))
    }

    fn for_geometry(
        geometry: FieldGeometry,
        algorithm: GridTracerAlgorithm,
        config: &TracerConfig,
    ) -> Box<dyn GridTracer> {
        let samples = config.samples_per_voxel;
        debug!(
            field_type = %geometry.field_type(),
            ?algorithm,
            samples_per_voxel = samples,
            dims = %geometry.grid_dims(),
            "constructing grid tracer"
        );
        match (geometry.field_type(), algorithm) {
            (FieldType::Cartesian, GridTracerAlgorithm::Sampling) => {
                Box::new(CartesianSamplingTracer::new(geometry, samples))
            }
            (FieldType::Cartesian, GridTracerAlgorithm::Bresenham) => {
                Box::new(CartesianBresenhamTracer::new(geometry))
            }
            (FieldType::Polar, GridTracerAlgorithm::Sampling) => {
                Box::new(PolarSamplingTracer::new(geometry, samples))
            }
            (FieldType::Polar, GridTracerAlgorithm::Bresenham) => {
                Box::new(PolarCrossingTracer::new(geometry))
            }
        }
    }
}
