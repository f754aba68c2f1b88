//! Voxel field data model.
//!
//! A [`RadiationField`] owns its [`FieldGeometry`] and an ordered set of [`Channel`]s; each
//! channel owns typed [`Layer`]s holding one value per voxel. Voxels are addressed through
//! borrowed [`Voxel`] accessors or whole-layer [`LayerView`]s.
use std::fmt;

use glam::{UVec3, Vec3};
use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Error, Result};

pub mod channel;
pub mod dtype;
pub mod geometry;
pub mod layer;
pub mod view;
pub mod voxel;

pub use channel::Channel;
pub use dtype::{DType, Element, LayerBuffer, Scalar};
pub use geometry::{FieldGeometry, FieldType};
pub use layer::{Layer, LayerDescriptor};
pub use view::{LayerView, LayerViewMut};
pub use voxel::{Voxel, VoxelMut, VoxelValue};

/// A voxel grid plus its named channels.
#[derive(Clone, Debug, PartialEq)]
pub struct RadiationField {
    geometry: FieldGeometry,
    channels: IndexMap<String, Channel>,
}

impl RadiationField {
    /// Creates a field without channels.
    pub fn new(geometry: FieldGeometry) -> Self {
        Self {
            geometry,
            channels: IndexMap::new(),
        }
    }

    /// Cartesian field spanning `[0, size]` with voxels of `voxel_size` meters.
    pub fn cartesian(size: Vec3, voxel_size: Vec3) -> Result<Self> {
        Ok(Self::new(FieldGeometry::cartesian(size, voxel_size)?))
    }

    /// Spherical field of `radius` meters around the origin with `(Δr, Δφ, Δθ)` bins.
    pub fn polar(radius: f32, bin_size: Vec3) -> Result<Self> {
        Ok(Self::new(FieldGeometry::polar(radius, bin_size)?))
    }

    pub fn geometry(&self) -> &FieldGeometry {
        &self.geometry
    }

    pub fn field_type(&self) -> FieldType {
        self.geometry.field_type()
    }

    pub fn size(&self) -> Vec3 {
        self.geometry.size()
    }

    pub fn voxel_size(&self) -> Vec3 {
        self.geometry.voxel_size()
    }

    pub fn grid_dims(&self) -> UVec3 {
        self.geometry.grid_dims()
    }

    pub fn voxel_count(&self) -> usize {
        self.geometry.voxel_count()
    }

    /// Adds an empty channel.
    pub fn add_channel(&mut self, name: &str) -> Result<&mut Channel> {
        if self.channels.contains_key(name) {
            return Err(Error::duplicate("channel", name));
        }
        debug!(channel = name, "added channel");
        let channel = Channel::new(name, self.geometry.grid_dims());
        Ok(self.channels.entry(name.to_owned()).or_insert(channel))
    }

    /// Inserts a decoded channel; its grid must match the field.
    pub(crate) fn insert_channel(&mut self, channel: Channel) -> Result<&mut Channel> {
        if channel.dims() != self.geometry.grid_dims() {
            return Err(Error::CorruptFile(format!(
                "channel '{}' has grid {} but the field has {}",
                channel.name(),
                channel.dims(),
                self.geometry.grid_dims()
            )));
        }
        if self.channels.contains_key(channel.name()) {
            return Err(Error::duplicate("channel", channel.name()));
        }
        Ok(self
            .channels
            .entry(channel.name().to_owned())
            .or_insert(channel))
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn get_channel(&self, name: &str) -> Result<&Channel> {
        self.channels
            .get(name)
            .ok_or_else(|| Error::not_found("channel", name))
    }

    pub fn get_channel_mut(&mut self, name: &str) -> Result<&mut Channel> {
        self.channels
            .get_mut(name)
            .ok_or_else(|| Error::not_found("channel", name))
    }

    pub fn remove_channel(&mut self, name: &str) -> Result<Channel> {
        self.channels
            .shift_remove(name)
            .ok_or_else(|| Error::not_found("channel", name))
    }

    /// Channels in insertion order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }
}

impl fmt::Display for RadiationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with {} channel(s)", self.geometry, self.channels.len())
    }
}
