//! Voxel grids and image values for the reference engine.
//!
//! Values are stored z-major: index `(z * ny + y) * nx + x`, which is the
//! `(z, y, x)` order the extraction API promises.

use super::objects::EllipsoidalCylinder;
use crate::fault::FaultResult;

/// Voxel grid: dimensions `[nx, ny, nz]`, voxel size and origin, both `[x, y, z]`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Geometry {
    pub(crate) dims: [usize; 3],
    pub(crate) voxel_size: [f32; 3],
    pub(crate) origin: [f32; 3],
}

impl Geometry {
    pub(crate) fn new(dims: [i32; 3], voxel_size: [f32; 3], origin: [f32; 3]) -> FaultResult<Self> {
        let mut checked = [0usize; 3];
        for (axis, &n) in dims.iter().enumerate() {
            if n <= 0 {
                return Err(fault!(
                    "voxel dimensions must be positive, got {:?}",
                    dims
                ));
            }
            checked[axis] = n as usize;
        }
        if voxel_size.iter().any(|&v| !(v > 0.0)) {
            return Err(fault!(
                "voxel sizes must be positive, got {:?}",
                voxel_size
            ));
        }
        Ok(Geometry {
            dims: checked,
            voxel_size,
            origin,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.dims.iter().product()
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        let [nx, ny, _] = self.dims;
        (z * ny + y) * nx + x
    }

    /// Physical coordinate of the centre of voxel `i` along `axis`
    fn centre(&self, axis: usize, i: usize) -> f32 {
        let n = self.dims[axis] as f32;
        self.origin[axis] + (i as f32 - (n - 1.0) / 2.0) * self.voxel_size[axis]
    }

    /// Dimensions as reported to callers: `[nz, ny, nx]`
    pub(crate) fn reported_dims(&self) -> [i32; 3] {
        let [nx, ny, nz] = self.dims;
        [nz as i32, ny as i32, nx as i32]
    }
}

/// A scalar field over a [`Geometry`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImageData {
    pub(crate) geometry: Geometry,
    pub(crate) values: Vec<f32>,
}

impl ImageData {
    pub(crate) fn zeros(geometry: Geometry) -> Self {
        let values = vec![0.0; geometry.len()];
        ImageData { geometry, values }
    }

    pub(crate) fn from_values(geometry: Geometry, values: Vec<f32>) -> FaultResult<Self> {
        if values.len() != geometry.len() {
            return Err(fault!(
                "image file holds {} values, grid needs {}",
                values.len(),
                geometry.len()
            ));
        }
        Ok(ImageData { geometry, values })
    }

    pub(crate) fn fill(&mut self, value: f32) {
        self.values.iter_mut().for_each(|v| *v = value);
    }

    /// Add `scale` to every voxel whose centre lies inside the cylinder.
    pub(crate) fn add_cylinder(&mut self, shape: &EllipsoidalCylinder, scale: f32) -> FaultResult<()> {
        if scale == 0.0 {
            return Ok(());
        }
        if shape.radius_x <= 0.0 || shape.radius_y <= 0.0 {
            return Err(fault!(
                "ellipsoidal cylinder radii must be positive, got ({}, {})",
                shape.radius_x,
                shape.radius_y
            ));
        }
        let [nx, ny, nz] = self.geometry.dims;
        let half_length = shape.length / 2.0;
        for z in 0..nz {
            let dz = self.geometry.centre(2, z) - shape.origin[2];
            if dz.abs() > half_length {
                continue;
            }
            for y in 0..ny {
                let dy = (self.geometry.centre(1, y) - shape.origin[1]) / shape.radius_y;
                for x in 0..nx {
                    let dx = (self.geometry.centre(0, x) - shape.origin[0]) / shape.radius_x;
                    if dx * dx + dy * dy <= 1.0 {
                        let i = self.geometry.index(x, y, z);
                        self.values[i] += scale;
                    }
                }
            }
        }
        Ok(())
    }

    /// Maximum absolute voxel difference, skipping `rim` voxels at each
    /// transaxial border when `rim` is positive.
    pub(crate) fn max_abs_difference(&self, other: &ImageData, rim: i32) -> FaultResult<f64> {
        if self.geometry.dims != other.geometry.dims {
            return Err(fault!(
                "cannot compare images of dimensions {:?} and {:?}",
                self.geometry.reported_dims(),
                other.geometry.reported_dims()
            ));
        }
        let [nx, ny, nz] = self.geometry.dims;
        let rim = rim.max(0) as usize;
        if 2 * rim >= nx || 2 * rim >= ny {
            return Err(fault!(
                "rim of {} voxels leaves nothing of a {}x{} plane",
                rim,
                nx,
                ny
            ));
        }
        let mut diff = 0.0f64;
        for z in 0..nz {
            for y in rim..ny - rim {
                for x in rim..nx - rim {
                    let i = self.geometry.index(x, y, z);
                    let d = (f64::from(self.values[i]) - f64::from(other.values[i])).abs();
                    diff = diff.max(d);
                }
            }
        }
        Ok(diff)
    }

    /// Zero every voxel outside the cylinder inscribed in the transaxial plane.
    pub(crate) fn truncate_to_cylindrical_fov(&mut self, strictly_less_than_radius: bool) {
        let [nx, ny, nz] = self.geometry.dims;
        let [vx, vy, _] = self.geometry.voxel_size;
        let radius = (nx as f32 * vx).min(ny as f32 * vy) / 2.0;
        let r2 = radius * radius;
        for y in 0..ny {
            let py = (y as f32 - (ny as f32 - 1.0) / 2.0) * vy;
            for x in 0..nx {
                let px = (x as f32 - (nx as f32 - 1.0) / 2.0) * vx;
                let d2 = px * px + py * py;
                let outside = if strictly_less_than_radius {
                    d2 >= r2
                } else {
                    d2 > r2
                };
                if outside {
                    for z in 0..nz {
                        let i = self.geometry.index(x, y, z);
                        self.values[i] = 0.0;
                    }
                }
            }
        }
    }

    pub(crate) fn write_values(&self, out: &mut [f64]) -> FaultResult<()> {
        if out.len() != self.values.len() {
            return Err(fault!(
                "output buffer holds {} values, image has {}",
                out.len(),
                self.values.len()
            ));
        }
        for (dst, src) in out.iter_mut().zip(self.values.iter()) {
            *dst = f64::from(*src);
        }
        Ok(())
    }
}
