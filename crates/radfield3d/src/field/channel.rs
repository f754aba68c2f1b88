//! Channels: named groups of co-located layers sharing one voxel grid.
use glam::UVec3;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::field::dtype::{DType, Scalar};
use crate::field::layer::{Layer, LayerDescriptor};
use crate::field::view::{LayerView, LayerViewMut};
use crate::field::voxel::{Voxel, VoxelMut};
use crate::math;

/// A named mapping of layer name to [`Layer`]. Layers keep their insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    name: String,
    dims: UVec3,
    layers: IndexMap<String, Layer>,
}

impl Channel {
    pub(crate) fn new(name: impl Into<String>, dims: UVec3) -> Self {
        Self {
            name: name.into(),
            dims,
            layers: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Voxel counts per axis of the owning field.
    pub fn dims(&self) -> UVec3 {
        self.dims
    }

    pub fn voxel_count(&self) -> usize {
        math::voxel_count(self.dims)
    }

    /// Adds a zero-initialized layer with one `dtype` element per voxel.
    pub fn add_layer(&mut self, name: &str, unit: &str, dtype: DType) -> Result<&mut Layer> {
        if dtype == DType::Hist {
            return Err(Error::InvalidConfig(format!(
                "layer '{name}': histogram layers need a bin layout, use add_histogram_layer"
            )));
        }
        let layer = Layer::new(name, unit, dtype, self.voxel_count());
        self.insert_layer(layer)
    }

    /// Adds a zero-initialized histogram layer with `bins` values of `bin_width` per voxel.
    pub fn add_histogram_layer(
        &mut self,
        name: &str,
        unit: &str,
        bins: usize,
        bin_width: f32,
    ) -> Result<&mut Layer> {
        if bins == 0 {
            return Err(Error::InvalidConfig(format!(
                "layer '{name}': histogram needs at least one bin"
            )));
        }
        if !(bin_width.is_finite() && bin_width > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "layer '{name}': bin width must be > 0"
            )));
        }
        let layer = Layer::new_histogram(name, unit, bins, bin_width, self.voxel_count());
        self.insert_layer(layer)
    }

    pub(crate) fn insert_layer(&mut self, layer: Layer) -> Result<&mut Layer> {
        if self.layers.contains_key(layer.name()) {
            return Err(Error::duplicate("layer", layer.name()));
        }
        debug_assert_eq!(layer.voxel_count(), self.voxel_count());
        debug!(
            channel = %self.name,
            layer = layer.name(),
            dtype = %layer.dtype(),
            "added layer"
        );
        let entry = self.layers.entry(layer.name().to_owned());
        Ok(entry.or_insert(layer))
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn get_layer(&self, name: &str) -> Result<&Layer> {
        self.layers
            .get(name)
            .ok_or_else(|| Error::not_found("layer", name))
    }

    pub fn get_layer_mut(&mut self, name: &str) -> Result<&mut Layer> {
        self.layers
            .get_mut(name)
            .ok_or_else(|| Error::not_found("layer", name))
    }

    /// Removes a layer, keeping the order of the remaining ones.
    pub fn remove_layer(&mut self, name: &str) -> Result<Layer> {
        self.layers
            .shift_remove(name)
            .ok_or_else(|| Error::not_found("layer", name))
    }

    /// Layer descriptors in insertion order.
    pub fn get_layers(&self) -> Vec<LayerDescriptor> {
        self.layers.values().map(Layer::descriptor).collect()
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Voxel `(i, j, k)` of `layer`.
    pub fn get_voxel(&self, layer: &str, i: u32, j: u32, k: u32) -> Result<Voxel<'_>> {
        let index = self.checked_index(UVec3::new(i, j, k))?;
        Ok(Voxel::new(self.get_layer(layer)?, index))
    }

    pub fn get_voxel_mut(&mut self, layer: &str, i: u32, j: u32, k: u32) -> Result<VoxelMut<'_>> {
        let index = self.checked_index(UVec3::new(i, j, k))?;
        Ok(VoxelMut::new(self.get_layer_mut(layer)?, index))
    }

    /// Voxel at linear `index` of `layer`.
    pub fn get_voxel_flat(&self, layer: &str, index: usize) -> Result<Voxel<'_>> {
        self.check_flat(index)?;
        Ok(Voxel::new(self.get_layer(layer)?, index))
    }

    pub fn get_voxel_flat_mut(&mut self, layer: &str, index: usize) -> Result<VoxelMut<'_>> {
        self.check_flat(index)?;
        Ok(VoxelMut::new(self.get_layer_mut(layer)?, index))
    }

    /// Zero-copy view of `layer` shaped `(x, y, z)` or `(x, y, z, components)`.
    ///
    /// `T` is the scalar component type; vector and histogram layers are viewed as `f32`.
    pub fn get_layer_as_array<T: Scalar>(&self, layer: &str) -> Result<LayerView<'_, T>> {
        let dims = self.dims;
        let layer = self.get_layer(layer)?;
        let (components, axis) = component_layout(layer);
        Ok(LayerView::new(layer.components::<T>()?, dims, components, axis))
    }

    pub fn get_layer_as_array_mut<T: Scalar>(
        &mut self,
        layer: &str,
    ) -> Result<LayerViewMut<'_, T>> {
        let dims = self.dims;
        let layer = self.get_layer_mut(layer)?;
        let (components, axis) = component_layout(layer);
        Ok(LayerViewMut::new(
            layer.components_mut::<T>()?,
            dims,
            components,
            axis,
        ))
    }

    fn checked_index(&self, coords: UVec3) -> Result<usize> {
        if !math::contains(coords, self.dims) {
            return Err(Error::IndexOutOfRange {
                index: coords,
                dims: self.dims,
            });
        }
        Ok(math::linear_index(coords, self.dims))
    }

    fn check_flat(&self, index: usize) -> Result<()> {
        if index >= self.voxel_count() {
            return Err(Error::IndexOutOfRange {
                index: math::coords_of(index, self.dims),
                dims: self.dims,
            });
        }
        Ok(())
    }
}

fn component_layout(layer: &Layer) -> (usize, bool) {
    let dtype = layer.dtype();
    match dtype {
        DType::Hist => (layer.bins(), true),
        d if d.is_vector() => (d.components(), true),
        _ => (1, false),
    }
}
