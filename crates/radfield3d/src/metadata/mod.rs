//! Metadata describing how a field was produced.
//!
//! Metadata is versioned independently of the field file format; [`MetadataVersion`]
//! selects the codec used to persist it.
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod dynamic;
pub mod spectrum;
pub mod v1;

pub use dynamic::{DynamicValue, FromDynamic, Histogram};
pub use spectrum::Spectrum;
pub use v1::{FieldShape, Metadata, Simulation, Software, Tube};

/// On-disk layout of the metadata block.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MetadataVersion {
    #[default]
    V1,
}

impl MetadataVersion {
    pub const LATEST: MetadataVersion = MetadataVersion::V1;

    pub fn as_u32(self) -> u32 {
        match self {
            MetadataVersion::V1 => 1,
        }
    }

    pub fn from_u32(version: u32) -> Option<Self> {
        match version {
            1 => Some(MetadataVersion::V1),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "metadata v{}", self.as_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_numbers() {
        assert_eq!(MetadataVersion::LATEST.as_u32(), 1);
        assert_eq!(MetadataVersion::from_u32(1), Some(MetadataVersion::V1));
        assert_eq!(MetadataVersion::from_u32(0), None);
        assert_eq!(MetadataVersion::V1.to_string(), "metadata v1");
    }
}
