//! System model: projection matrix and the projector pair built on it.

use crate::bridge::Bridge;
use crate::capability::Parameterized;
use crate::error::BridgeResult;
use crate::ownership::{Borrowed, Family, ObjectHandle, Owned};
use crate::params::keys;

#[derive(Debug)]
pub struct RayTracingMatrix {
    object: ObjectHandle,
}

impl RayTracingMatrix {
    pub const CLASS: &'static str = "RayTracingMatrix";

    pub fn new(bridge: &Bridge) -> BridgeResult<Self> {
        let object = Owned::create(bridge.engine(), Self::CLASS, Family::ProjMatrix)?;
        Ok(RayTracingMatrix { object: object.into() })
    }

    fn borrowed(borrowed: Borrowed) -> Self {
        RayTracingMatrix {
            object: borrowed.into(),
        }
    }

    pub fn set_num_tangential_lors(&self, n: i32) -> BridgeResult<()> {
        self.set(keys::NUM_TANGENTIAL_LORS, n)
    }

    pub fn num_tangential_lors(&self) -> BridgeResult<i32> {
        self.get(keys::NUM_TANGENTIAL_LORS)
    }
}

impl Parameterized for RayTracingMatrix {
    fn object(&self) -> &ObjectHandle {
        &self.object
    }
}

/// Forward and back projectors sharing one matrix
#[derive(Debug)]
pub struct ProjectorsUsingMatrix {
    object: ObjectHandle,
}

impl ProjectorsUsingMatrix {
    pub const CLASS: &'static str = "ProjectorsUsingMatrix";

    pub fn new(bridge: &Bridge) -> BridgeResult<Self> {
        let object = Owned::create(bridge.engine(), Self::CLASS, Family::Projectors)?;
        Ok(ProjectorsUsingMatrix { object: object.into() })
    }

    pub(crate) fn borrowed(borrowed: Borrowed) -> Self {
        ProjectorsUsingMatrix {
            object: borrowed.into(),
        }
    }

    pub fn set_matrix(&self, matrix: &RayTracingMatrix) -> BridgeResult<()> {
        self.set_link(keys::MATRIX, matrix.object())
    }

    /// The matrix in use, as a non-owning facade
    pub fn matrix(&self) -> BridgeResult<RayTracingMatrix> {
        self.link(keys::MATRIX).map(RayTracingMatrix::borrowed)
    }
}

impl Parameterized for ProjectorsUsingMatrix {
    fn object(&self) -> &ObjectHandle {
        &self.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use stir_engine::MemoryEngine;

    #[test]
    fn test_matrix_link() {
        let memory = Rc::new(MemoryEngine::new());
        let bridge = Bridge::without_sinks(memory.clone());
        let projectors = ProjectorsUsingMatrix::new(&bridge).unwrap();
        assert!(projectors.matrix().is_err());

        let matrix = RayTracingMatrix::new(&bridge).unwrap();
        matrix.set_num_tangential_lors(2).unwrap();
        projectors.set_matrix(&matrix).unwrap();
        drop(matrix);

        let linked = projectors.matrix().unwrap();
        assert!(!linked.owns_handle());
        assert_eq!(linked.num_tangential_lors().unwrap(), 2);
        drop(linked);
        drop(projectors);
        assert_eq!(memory.live_handles(), 0);
    }

    #[test]
    fn test_num_tangential_lors_must_be_positive() {
        let bridge = Bridge::without_sinks(Rc::new(MemoryEngine::new()));
        let matrix = RayTracingMatrix::new(&bridge).unwrap();
        assert!(matrix.set_num_tangential_lors(0).is_err());
        assert_eq!(matrix.num_tangential_lors().unwrap(), 1);
    }
}
