//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! duplicate or missing names, voxel addressing, dtype mismatches, metadata validation,
//! file format versioning and corruption, and IO.
use glam::UVec3;
use thiserror::Error;

use crate::field::DType;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{kind} '{name}' already exists")]
    DuplicateKey { kind: &'static str, name: String },

    #[error("unknown {kind} '{name}'")]
    NotFound { kind: &'static str, name: String },

    #[error("voxel {index} is outside of the grid {dims}")]
    IndexOutOfRange { index: UVec3, dims: UVec3 },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: DType, found: DType },

    #[error("metadata '{key}' holds {found}, not {expected}")]
    MetadataTypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unsupported file version {0}")]
    UnsupportedVersion(u32),

    #[error("corrupt file: {0}")]
    CorruptFile(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Error::DuplicateKey {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Maps a read failure to [`Error::CorruptFile`] when the stream ended early.
    pub(crate) fn from_read(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::CorruptFile("unexpected end of file".into())
        } else {
            Error::Io(err)
        }
    }
}
