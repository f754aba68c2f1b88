//! Zero-copy array views over a layer buffer.
//!
//! A view is a borrowed slice of the layer's storage plus a shape `(x, y, z[, components])`.
//! Views never copy: writes through a [`LayerViewMut`] are what every later accessor of the
//! same layer observes. The borrow ties a view to its layer, so a view can not outlive the
//! layer (or the channel and field owning it).
use std::ops::{Index, IndexMut};

use glam::UVec3;

use crate::field::dtype::Scalar;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Layout {
    shape: [usize; 4],
    ndim: usize,
}

impl Layout {
    fn new(dims: UVec3, components: usize, with_component_axis: bool) -> Self {
        Self {
            shape: [dims.x as usize, dims.y as usize, dims.z as usize, components],
            ndim: if with_component_axis { 4 } else { 3 },
        }
    }

    /// Element strides for `(x, y, z, component)`; `x` varies fastest after the component.
    fn strides(&self) -> [usize; 4] {
        let c = self.shape[3];
        [c, self.shape[0] * c, self.shape[0] * self.shape[1] * c, 1]
    }

    fn offset(&self, i: usize, j: usize, k: usize, c: usize) -> Option<usize> {
        if i >= self.shape[0] || j >= self.shape[1] || k >= self.shape[2] || c >= self.shape[3] {
            return None;
        }
        let s = self.strides();
        Some(i * s[0] + j * s[1] + k * s[2] + c)
    }
}

/// Read-only view of a layer as a 3D (or 4D with components) array.
#[derive(Clone, Copy, Debug)]
pub struct LayerView<'a, T> {
    data: &'a [T],
    layout: Layout,
}

impl<'a, T: Scalar> LayerView<'a, T> {
    pub(crate) fn new(
        data: &'a [T],
        dims: UVec3,
        components: usize,
        with_component_axis: bool,
    ) -> Self {
        let layout = Layout::new(dims, components, with_component_axis);
        debug_assert_eq!(data.len(), layout.shape.iter().product::<usize>());
        Self { data, layout }
    }

    /// `[x, y, z]` for scalar layers, `[x, y, z, components]` otherwise.
    pub fn shape(&self) -> &[usize] {
        &self.layout.shape[..self.layout.ndim]
    }

    /// Element strides matching [`LayerView::shape`].
    pub fn strides(&self) -> Vec<usize> {
        self.layout.strides()[..self.layout.ndim].to_vec()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// First component of voxel `(i, j, k)`.
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<&'a T> {
        self.get_component(i, j, k, 0)
    }

    pub fn get_component(&self, i: usize, j: usize, k: usize, c: usize) -> Option<&'a T> {
        let data: &'a [T] = self.data;
        self.layout.offset(i, j, k, c).map(|o| &data[o])
    }

    /// All components of voxel `(i, j, k)`.
    pub fn voxel(&self, i: usize, j: usize, k: usize) -> Option<&'a [T]> {
        let data: &'a [T] = self.data;
        let c = self.layout.shape[3];
        self.layout.offset(i, j, k, 0).map(|o| &data[o..o + c])
    }
}

/// Mutable view of a layer as a 3D (or 4D with components) array.
#[derive(Debug)]
pub struct LayerViewMut<'a, T> {
    data: &'a mut [T],
    layout: Layout,
}

impl<'a, T: Scalar> LayerViewMut<'a, T> {
    pub(crate) fn new(
        data: &'a mut [T],
        dims: UVec3,
        components: usize,
        with_component_axis: bool,
    ) -> Self {
        let layout = Layout::new(dims, components, with_component_axis);
        debug_assert_eq!(data.len(), layout.shape.iter().product::<usize>());
        Self { data, layout }
    }

    pub fn shape(&self) -> &[usize] {
        &self.layout.shape[..self.layout.ndim]
    }

    pub fn strides(&self) -> Vec<usize> {
        self.layout.strides()[..self.layout.ndim].to_vec()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data[..]
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data[..]
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<&T> {
        let o = self.layout.offset(i, j, k, 0)?;
        Some(&self.data[o])
    }

    pub fn get_mut(&mut self, i: usize, j: usize, k: usize) -> Option<&mut T> {
        let o = self.layout.offset(i, j, k, 0)?;
        Some(&mut self.data[o])
    }

    pub fn voxel_mut(&mut self, i: usize, j: usize, k: usize) -> Option<&mut [T]> {
        let c = self.layout.shape[3];
        let o = self.layout.offset(i, j, k, 0)?;
        Some(&mut self.data[o..o + c])
    }

    /// Sets every component of every voxel to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Downgrades to a read-only view.
    pub fn view(&self) -> LayerView<'_, T> {
        LayerView {
            data: &self.data[..],
            layout: self.layout,
        }
    }
}

impl<T: Scalar> Index<[usize; 3]> for LayerView<'_, T> {
    type Output = T;

    fn index(&self, [i, j, k]: [usize; 3]) -> &T {
        self.get(i, j, k)
            .unwrap_or_else(|| panic!("index [{i}, {j}, {k}] out of bounds for {:?}", self.shape()))
    }
}

impl<T: Scalar> Index<[usize; 4]> for LayerView<'_, T> {
    type Output = T;

    fn index(&self, [i, j, k, c]: [usize; 4]) -> &T {
        self.get_component(i, j, k, c).unwrap_or_else(|| {
            panic!("index [{i}, {j}, {k}, {c}] out of bounds for {:?}", self.shape())
        })
    }
}

impl<T: Scalar> Index<[usize; 3]> for LayerViewMut<'_, T> {
    type Output = T;

    fn index(&self, [i, j, k]: [usize; 3]) -> &T {
        let offset = self.layout.offset(i, j, k, 0);
        match offset {
            Some(o) => &self.data[o],
            None => panic!("index [{i}, {j}, {k}] out of bounds for {:?}", self.shape()),
        }
    }
}

impl<T: Scalar> IndexMut<[usize; 3]> for LayerViewMut<'_, T> {
    fn index_mut(&mut self, [i, j, k]: [usize; 3]) -> &mut T {
        match self.layout.offset(i, j, k, 0) {
            Some(o) => &mut self.data[o],
            None => panic!(
                "index [{i}, {j}, {k}] out of bounds for {:?}",
                &self.layout.shape[..self.layout.ndim]
            ),
        }
    }
}

impl<T: Scalar> Index<[usize; 4]> for LayerViewMut<'_, T> {
    type Output = T;

    fn index(&self, [i, j, k, c]: [usize; 4]) -> &T {
        match self.layout.offset(i, j, k, c) {
            Some(o) => &self.data[o],
            None => panic!("index [{i}, {j}, {k}, {c}] out of bounds for {:?}", self.shape()),
        }
    }
}

impl<T: Scalar> IndexMut<[usize; 4]> for LayerViewMut<'_, T> {
    fn index_mut(&mut self, [i, j, k, c]: [usize; 4]) -> &mut T {
        match self.layout.offset(i, j, k, c) {
            Some(o) => &mut self.data[o],
            None => panic!(
                "index [{i}, {j}, {k}, {c}] out of bounds for {:?}",
                &self.layout.shape[..self.layout.ndim]
            ),
        }
    }
}
