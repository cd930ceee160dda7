//! Capability interfaces shared by the domain entities.
//!
//! Instead of mirroring the engine's class chains, each entity implements
//! the few capabilities it actually has:
//!
//! - [`Parameterized`]: typed parameter and link access
//! - [`SetUp`]: a set-up step run under a declared class
//! - [`Runnable`]: the staged reconstruction verbs

use stir_engine::Handle;
use tracing::{debug, instrument};

use crate::error::BridgeResult;
use crate::image::Image;
use crate::ownership::{Borrowed, ObjectHandle};
use crate::params::{self, Link, Param, ParamValue};
use crate::status;

/// An engine object with named parameters
pub trait Parameterized {
    fn object(&self) -> &ObjectHandle;

    fn handle(&self) -> Handle {
        self.object().handle()
    }

    /// Whether dropping this facade destroys the engine object
    fn owns_handle(&self) -> bool {
        self.object().is_owner()
    }

    fn set<V: ParamValue>(&self, key: Param<V>, value: V) -> BridgeResult<()> {
        let object = self.object();
        params::set_parameter(&**object.engine(), object.handle(), key, &value)
    }

    fn get<V: ParamValue>(&self, key: Param<V>) -> BridgeResult<V> {
        let object = self.object();
        params::get_parameter(&**object.engine(), object.handle(), key)
    }

    fn set_link(&self, key: Link, target: &ObjectHandle) -> BridgeResult<()> {
        let object = self.object();
        params::set_link(&**object.engine(), object.handle(), key, target.handle())
    }

    fn link(&self, key: Link) -> BridgeResult<Borrowed> {
        let object = self.object();
        params::get_link(object.engine(), object.handle(), key)
    }
}

/// An object whose engine side must be set up before use
pub trait SetUp: Parameterized {
    /// Class under which the engine runs the set-up step
    const SET_UP_CLASS: &'static str;

    #[instrument(skip_all)]
    fn set_up(&self) -> BridgeResult<()> {
        let object = self.object();
        let engine = object.engine();
        debug!(class = Self::SET_UP_CLASS, handle = %object.handle(), "set-up");
        status::check(&**engine, engine.setup_object(Self::SET_UP_CLASS, object.handle()))
    }
}

/// A reconstruction driven through set-up, full runs and single updates
pub trait Runnable: Parameterized {
    /// Prepare the reconstruction for `image`; rewinds the sub-iteration counter
    #[instrument(skip_all)]
    fn set_up(&self, image: &Image) -> BridgeResult<()> {
        let engine = self.object().engine();
        status::check(&**engine, engine.setup_reconstruction(self.handle(), image.handle()?))
    }

    /// Run every remaining sub-iteration, updating `image` in place
    #[instrument(skip_all)]
    fn reconstruct(&self, image: &mut Image) -> BridgeResult<()> {
        let engine = self.object().engine();
        status::check(&**engine, engine.run_reconstruction(self.handle(), image.handle()?))?;
        debug!("reconstruction finished");
        Ok(())
    }

    /// Advance exactly one sub-iteration
    #[instrument(skip_all)]
    fn update(&self, image: &mut Image) -> BridgeResult<()> {
        let engine = self.object().engine();
        status::check(&**engine, engine.update_reconstruction(self.handle(), image.handle()?))
    }
}
