//! Image processors.

use tracing::instrument;

use crate::bridge::Bridge;
use crate::capability::Parameterized;
use crate::error::BridgeResult;
use crate::image::Image;
use crate::ownership::{Borrowed, Family, ObjectHandle, Owned};
use crate::params::keys;
use crate::status;

/// A filter that mutates an image in place
pub trait DataProcessor: Parameterized {
    #[instrument(skip_all)]
    fn apply(&self, image: &mut Image) -> BridgeResult<()> {
        let engine = self.object().engine();
        status::check(&**engine, engine.apply_data_processor(self.handle(), image.handle()?))
    }
}

/// Zeroes every voxel outside the transaxial field of view
#[derive(Debug)]
pub struct TruncateToCylindricalFovProcessor {
    object: ObjectHandle,
}

impl TruncateToCylindricalFovProcessor {
    pub const CLASS: &'static str = "TruncateToCylindricalFOVImageProcessor";

    pub fn new(bridge: &Bridge) -> BridgeResult<Self> {
        let object = Owned::create(bridge.engine(), Self::CLASS, Family::DataProcessor)?;
        Ok(TruncateToCylindricalFovProcessor { object: object.into() })
    }

    /// A non-owning facade over the same engine filter
    pub fn aliasing(filter: &impl DataProcessor) -> BridgeResult<Self> {
        Ok(TruncateToCylindricalFovProcessor {
            object: filter.object().borrow()?.into(),
        })
    }

    pub fn set_strictly_less_than_radius(&self, flag: bool) -> BridgeResult<()> {
        self.set(keys::STRICTLY_LESS_THAN_RADIUS, flag)
    }

    pub fn strictly_less_than_radius(&self) -> BridgeResult<bool> {
        self.get(keys::STRICTLY_LESS_THAN_RADIUS)
    }
}

impl Parameterized for TruncateToCylindricalFovProcessor {
    fn object(&self) -> &ObjectHandle {
        &self.object
    }
}

impl DataProcessor for TruncateToCylindricalFovProcessor {}

/// A processor read back from a composition link; never owns its object
#[derive(Debug)]
pub struct DataProcessorRef {
    object: ObjectHandle,
}

impl DataProcessorRef {
    pub(crate) fn new(borrowed: Borrowed) -> Self {
        DataProcessorRef {
            object: borrowed.into(),
        }
    }
}

impl Parameterized for DataProcessorRef {
    fn object(&self) -> &ObjectHandle {
        &self.object
    }
}

impl DataProcessor for DataProcessorRef {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use stir_engine::MemoryEngine;

    #[test]
    fn test_alias_shares_flag() {
        let bridge = Bridge::without_sinks(Rc::new(MemoryEngine::new()));
        let filter = TruncateToCylindricalFovProcessor::new(&bridge).unwrap();
        let alias = TruncateToCylindricalFovProcessor::aliasing(&filter).unwrap();
        assert!(!alias.owns_handle());

        alias.set_strictly_less_than_radius(true).unwrap();
        assert!(filter.strictly_less_than_radius().unwrap());
        drop(alias);
        filter.set_strictly_less_than_radius(false).unwrap();
        assert!(!filter.strictly_less_than_radius().unwrap());
    }

    #[test]
    fn test_apply_to_uninitialised_image_fails() {
        let bridge = Bridge::without_sinks(Rc::new(MemoryEngine::new()));
        let filter = TruncateToCylindricalFovProcessor::new(&bridge).unwrap();
        let mut image = Image::new(&bridge);
        assert!(filter.apply(&mut image).is_err());
    }
}
