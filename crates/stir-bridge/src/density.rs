//! Dense image values.
//!
//! A [`Density`] is the full voxel field of an image copied out of the
//! engine. Its shape is `[nz, ny, nx]`, exactly as the engine reports the
//! dimensions, and values are laid out C-contiguously in that order.

use std::ops::Index;

/// Voxel values in `(z, y, x)` order
#[derive(Debug, Clone, PartialEq)]
pub struct Density {
    shape: [usize; 3],
    strides: [usize; 3],
    data: Vec<f64>,
}

impl Density {
    /// Wrap values whose length matches `shape`
    pub(crate) fn from_parts(shape: [usize; 3], data: Vec<f64>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        let mut strides = [0; 3];
        let mut stride = 1;
        // last axis varies fastest
        for axis in (0..3).rev() {
            strides[axis] = stride;
            stride *= shape[axis];
        }
        Density { shape, strides, data }
    }

    /// `[nz, ny, nx]`
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Position of `[z, y, x]` in the flat value buffer
    pub fn flat_index(&self, index: [usize; 3]) -> Option<usize> {
        if index.iter().zip(self.shape.iter()).any(|(i, n)| i >= n) {
            return None;
        }
        Some(index.iter().zip(self.strides.iter()).map(|(i, s)| i * s).sum())
    }

    pub fn get(&self, index: [usize; 3]) -> Option<f64> {
        self.flat_index(index).map(|i| self.data[i])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// One z-plane as `ny` rows of `nx` values
    pub fn plane(&self, z: usize) -> Option<&[f64]> {
        let [nz, ny, nx] = self.shape;
        (z < nz).then(|| &self.data[z * ny * nx..(z + 1) * ny * nx])
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.iter().reduce(f64::max)
    }

    pub fn sum(&self) -> f64 {
        self.iter().sum()
    }
}

impl Index<[usize; 3]> for Density {
    type Output = f64;

    fn index(&self, index: [usize; 3]) -> &f64 {
        match self.flat_index(index) {
            Some(i) => &self.data[i],
            None => panic!("index {:?} out of bounds for density of shape {:?}", index, self.shape),
        }
    }
}
