//! Regularisation priors.

use crate::bridge::Bridge;
use crate::capability::{Parameterized, SetUp};
use crate::error::BridgeResult;
use crate::ownership::{Borrowed, Family, ObjectHandle, Owned};
use crate::params::keys;

const PRIOR_CLASS: &str = "GeneralisedPrior";

/// A penalty term weighted by a penalisation factor
pub trait Prior: SetUp {
    fn set_penalisation_factor(&self, factor: f32) -> BridgeResult<()> {
        self.set(keys::PENALISATION_FACTOR, factor)
    }

    fn penalisation_factor(&self) -> BridgeResult<f32> {
        self.get(keys::PENALISATION_FACTOR)
    }
}

#[derive(Debug)]
pub struct QuadraticPrior {
    object: ObjectHandle,
}

impl QuadraticPrior {
    pub const CLASS: &'static str = "QuadraticPrior";

    pub fn new(bridge: &Bridge) -> BridgeResult<Self> {
        let object = Owned::create(bridge.engine(), Self::CLASS, Family::Prior)?;
        Ok(QuadraticPrior { object: object.into() })
    }
}

impl Parameterized for QuadraticPrior {
    fn object(&self) -> &ObjectHandle {
        &self.object
    }
}

impl SetUp for QuadraticPrior {
    const SET_UP_CLASS: &'static str = PRIOR_CLASS;
}

impl Prior for QuadraticPrior {}

/// A prior read back from an objective function; never owns its object
#[derive(Debug)]
pub struct PriorRef {
    object: ObjectHandle,
}

impl PriorRef {
    pub(crate) fn new(borrowed: Borrowed) -> Self {
        PriorRef {
            object: borrowed.into(),
        }
    }
}

impl Parameterized for PriorRef {
    fn object(&self) -> &ObjectHandle {
        &self.object
    }
}

impl SetUp for PriorRef {
    const SET_UP_CLASS: &'static str = PRIOR_CLASS;
}

impl Prior for PriorRef {}
