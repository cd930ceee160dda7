//! Images and the voxel grids they are built on.
//!
//! ## Overview
//!
//! An [`Image`] is a 3-D scalar field held by the engine. It is either
//! built over a [`Voxels`] grid the image itself creates and owns, or
//! loaded from an image file, in which case no grid is tracked. Both
//! engine objects are owned independently, each in its own slot, so
//! re-initialising releases the previous pair exactly once before the
//! new one is built.
//!
//! Extraction through [`Image::density`] yields values in `(z, y, x)`
//! order, the order the engine reports dimensions in.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use stir_engine::{Engine, Handle};
use tracing::debug;

use crate::bridge::Bridge;
use crate::density::Density;
use crate::error::{BridgeResult, EngineError};
use crate::ownership::{Family, Owned};
use crate::shape::Shape;
use crate::status;

// ============================================================================
// Geometry
// ============================================================================

/// Grid description: dimensions `[nx, ny, nz]`, voxel size and origin in `[x, y, z]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageGeometry {
    pub dims: [i32; 3],
    pub voxel_size: [f32; 3],
    pub origin: [f32; 3],
}

impl ImageGeometry {
    pub const DEFAULT_VOXEL_SIZE: [f32; 3] = [1.0, 1.0, 1.0];
    pub const DEFAULT_ORIGIN: [f32; 3] = [0.0, 0.0, 0.0];

    /// Unit voxels at the origin
    pub fn new(dims: [i32; 3]) -> Self {
        ImageGeometry {
            dims,
            voxel_size: Self::DEFAULT_VOXEL_SIZE,
            origin: Self::DEFAULT_ORIGIN,
        }
    }

    /// An all-zero voxel size means the default
    pub fn with_voxel_size(mut self, voxel_size: [f32; 3]) -> Self {
        self.voxel_size = if voxel_size == [0.0; 3] {
            Self::DEFAULT_VOXEL_SIZE
        } else {
            voxel_size
        };
        self
    }

    pub fn with_origin(mut self, origin: [f32; 3]) -> Self {
        self.origin = origin;
        self
    }

    /// Nine discrete values: dimensions, voxel sizes, origin
    #[allow(clippy::too_many_arguments)]
    pub fn from_scalars(nx: i32, ny: i32, nz: i32, vx: f32, vy: f32, vz: f32, x0: f32, y0: f32, z0: f32) -> Self {
        ImageGeometry {
            dims: [nx, ny, nz],
            voxel_size: [vx, vy, vz],
            origin: [x0, y0, z0],
        }
    }

    /// Number of voxels
    pub fn len(&self) -> usize {
        self.dims.iter().map(|&n| n.max(0) as usize).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<[i32; 3]> for ImageGeometry {
    fn from(dims: [i32; 3]) -> Self {
        ImageGeometry::new(dims)
    }
}

impl From<(i32, i32, i32)> for ImageGeometry {
    fn from((nx, ny, nz): (i32, i32, i32)) -> Self {
        ImageGeometry::new([nx, ny, nz])
    }
}

impl From<((i32, i32, i32), (f32, f32, f32))> for ImageGeometry {
    fn from(((nx, ny, nz), (vx, vy, vz)): ((i32, i32, i32), (f32, f32, f32))) -> Self {
        ImageGeometry::new([nx, ny, nz]).with_voxel_size([vx, vy, vz])
    }
}

/// An all-zero voxel size discards the origin too, leaving unit voxels at `(0, 0, 0)`
impl From<((i32, i32, i32), (f32, f32, f32), (f32, f32, f32))> for ImageGeometry {
    fn from(
        ((nx, ny, nz), (vx, vy, vz), (x0, y0, z0)): ((i32, i32, i32), (f32, f32, f32), (f32, f32, f32)),
    ) -> Self {
        if [vx, vy, vz] == [0.0; 3] {
            return ImageGeometry::new([nx, ny, nz]);
        }
        ImageGeometry::new([nx, ny, nz])
            .with_voxel_size([vx, vy, vz])
            .with_origin([x0, y0, z0])
    }
}

// ============================================================================
// Voxels
// ============================================================================

/// A free-standing voxel grid
#[derive(Debug)]
pub struct Voxels {
    object: Owned,
}

impl Voxels {
    pub fn new(bridge: &Bridge, dims: [i32; 3], voxel_size: [f32; 3], origin: [f32; 3]) -> BridgeResult<Self> {
        let engine = bridge.engine();
        let object = Owned::from_call(engine, engine.voxels_3df(dims, voxel_size, origin), Family::Voxels)?;
        Ok(Voxels { object })
    }

    pub fn handle(&self) -> Handle {
        self.object.handle()
    }
}

// ============================================================================
// Image
// ============================================================================

/// Border exclusion used by [`Image::diff_from`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rim {
    /// Compare the whole image
    #[default]
    Full,
    /// Skip this many voxels at each transaxial border
    Trim(u32),
}

impl Rim {
    /// The engine's rim size; `Full` is sent as -1
    pub fn rimsize(self) -> i32 {
        match self {
            Rim::Full => -1,
            Rim::Trim(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }
}

/// A 3-D scalar field held by the engine
pub struct Image {
    engine: Rc<dyn Engine>,
    object: Option<Owned>,
    voxels: Option<Owned>,
    rim: Rim,
}

impl Image {
    /// An uninitialised image
    pub fn new(bridge: &Bridge) -> Self {
        Self::empty(Rc::clone(bridge.engine()))
    }

    /// Load an image from an engine-native image file
    pub fn from_file(bridge: &Bridge, path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref().to_string_lossy();
        let engine = bridge.engine();
        let object = Owned::from_call(engine, engine.image_from_file(&path), Family::Image)?;
        let mut image = Self::empty(Rc::clone(engine));
        image.object = Some(object);
        Ok(image)
    }

    fn empty(engine: Rc<dyn Engine>) -> Self {
        Image {
            engine,
            object: None,
            voxels: None,
            rim: Rim::default(),
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.object.is_some()
    }

    /// The engine handle, or an error for an uninitialised image
    pub fn handle(&self) -> BridgeResult<Handle> {
        self.object
            .as_ref()
            .map(Owned::handle)
            .ok_or_else(|| EngineError::precondition("image is not initialised"))
    }

    /// Build a zero image over a new grid.
    ///
    /// Accepts `(nx, ny, nz)`, `((nx, ny, nz), voxel_size)` or
    /// `((nx, ny, nz), voxel_size, origin)` as well as an [`ImageGeometry`].
    pub fn initialise(&mut self, geometry: impl Into<ImageGeometry>) -> BridgeResult<()> {
        let geometry = geometry.into();
        // release the previous image and grid before building anew
        self.object = None;
        self.voxels = None;

        let voxels = Owned::from_call(
            &self.engine,
            self.engine
                .voxels_3df(geometry.dims, geometry.voxel_size, geometry.origin),
            Family::Voxels,
        )?;
        let object = Owned::from_call(&self.engine, self.engine.image_from_voxels(voxels.handle()), Family::Image)?;
        debug!(dims = ?geometry.dims, "initialised image");
        self.voxels = Some(voxels);
        self.object = Some(object);
        Ok(())
    }

    /// [`initialise`](Self::initialise) from nine discrete values
    #[allow(clippy::too_many_arguments)]
    pub fn initialise_scalars(
        &mut self,
        nx: i32,
        ny: i32,
        nz: i32,
        vx: f32,
        vy: f32,
        vz: f32,
        x0: f32,
        y0: f32,
        z0: f32,
    ) -> BridgeResult<()> {
        self.initialise(ImageGeometry::from_scalars(nx, ny, nz, vx, vy, vz, x0, y0, z0))
    }

    pub fn fill(&mut self, value: f64) -> BridgeResult<()> {
        let handle = self.handle()?;
        status::check(&*self.engine, self.engine.fill_image(handle, value))
    }

    /// An independent deep copy
    pub fn clone_image(&self) -> BridgeResult<Image> {
        let handle = self.handle()?;
        let object = Owned::from_call(&self.engine, self.engine.image_from_image(handle), Family::Image)?;
        let mut copy = Self::empty(Rc::clone(&self.engine));
        copy.object = Some(object);
        Ok(copy)
    }

    /// A copy of this image's geometry with every voxel set to `value`
    pub fn get_empty_copy(&self, value: f64) -> BridgeResult<Image> {
        let mut copy = self.clone_image()?;
        copy.fill(value)?;
        Ok(copy)
    }

    /// Add `scale` to every voxel inside `shape`
    pub fn add_shape(&mut self, shape: &impl Shape, scale: f32) -> BridgeResult<()> {
        let handle = self
            .handle()
            .map_err(|_| EngineError::precondition("cannot add shapes to uninitialised image"))?;
        let voxels = self.voxels.as_ref().map(Owned::handle);
        status::check(
            &*self.engine,
            self.engine.add_shape(handle, voxels, shape.handle(), scale),
        )
    }

    /// Difference metric against `other`, honouring this image's [`Rim`]
    pub fn diff_from(&self, other: &Image) -> BridgeResult<f64> {
        let token = status::call(
            &*self.engine,
            self.engine
                .images_difference(self.handle()?, other.handle()?, self.rim.rimsize()),
        )?;
        Ok(token.double())
    }

    pub fn set_rim(&mut self, rim: Rim) {
        self.rim = rim;
    }

    pub fn rim(&self) -> Rim {
        self.rim
    }

    /// Copy the voxel values out, shaped `[nz, ny, nx]`
    pub fn density(&self) -> BridgeResult<Density> {
        let handle = self.handle()?;
        let mut dims = [0i32; 3];
        status::check(&*self.engine, self.engine.image_dimensions(handle, &mut dims))?;
        let shape = dims.map(|n| n.max(0) as usize);
        let mut data = vec![0.0; shape.iter().product()];
        status::check(&*self.engine, self.engine.image_data(handle, &mut data))?;
        Ok(Density::from_parts(shape, data))
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("object", &self.object)
            .field("voxels", &self.voxels)
            .field("rim", &self.rim)
            .finish()
    }
}
