//! Geometric shapes that can be rasterized into an image.

use crate::bridge::Bridge;
use crate::capability::Parameterized;
use crate::error::BridgeResult;
use crate::ownership::{Family, ObjectHandle, Owned};
use crate::params::keys;

/// A 3-D primitive positioned by its origin
pub trait Shape: Parameterized {
    fn set_origin(&self, origin: [f32; 3]) -> BridgeResult<()> {
        self.set(keys::SHAPE_X, origin[0])?;
        self.set(keys::SHAPE_Y, origin[1])?;
        self.set(keys::SHAPE_Z, origin[2])
    }

    fn origin(&self) -> BridgeResult<[f32; 3]> {
        Ok([
            self.get(keys::SHAPE_X)?,
            self.get(keys::SHAPE_Y)?,
            self.get(keys::SHAPE_Z)?,
        ])
    }
}

/// Cylinder along z with an elliptical cross-section
#[derive(Debug)]
pub struct EllipsoidalCylinder {
    object: ObjectHandle,
}

impl EllipsoidalCylinder {
    pub const CLASS: &'static str = "EllipsoidalCylinder";

    pub fn new(bridge: &Bridge) -> BridgeResult<Self> {
        let object = Owned::create(bridge.engine(), Self::CLASS, Family::Shape)?;
        Ok(EllipsoidalCylinder { object: object.into() })
    }

    pub fn set_length(&self, length: f32) -> BridgeResult<()> {
        self.set(keys::CYLINDER_LENGTH, length)
    }

    pub fn length(&self) -> BridgeResult<f32> {
        self.get(keys::CYLINDER_LENGTH)
    }

    pub fn set_radius_x(&self, radius: f32) -> BridgeResult<()> {
        self.set(keys::CYLINDER_RADIUS_X, radius)
    }

    pub fn radius_x(&self) -> BridgeResult<f32> {
        self.get(keys::CYLINDER_RADIUS_X)
    }

    pub fn set_radius_y(&self, radius: f32) -> BridgeResult<()> {
        self.set(keys::CYLINDER_RADIUS_Y, radius)
    }

    pub fn radius_y(&self) -> BridgeResult<f32> {
        self.get(keys::CYLINDER_RADIUS_Y)
    }

    /// Set `(radius_x, radius_y)`
    pub fn set_radii(&self, (radius_x, radius_y): (f32, f32)) -> BridgeResult<()> {
        self.set_radius_x(radius_x)?;
        self.set_radius_y(radius_y)
    }

    pub fn radii(&self) -> BridgeResult<(f32, f32)> {
        Ok((self.radius_x()?, self.radius_y()?))
    }
}

impl Parameterized for EllipsoidalCylinder {
    fn object(&self) -> &ObjectHandle {
        &self.object
    }
}

impl Shape for EllipsoidalCylinder {}
