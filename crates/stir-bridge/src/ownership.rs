//! Handle Ownership
//!
//! Engine objects are held either outright or by reference:
//!
//! - [`Owned`]: the holder created the object and destroys it on drop,
//!   through the declared base class of its [`Family`]
//! - [`Borrowed`]: an alias data handle obtained by reference increment;
//!   dropping it releases only the alias, never the object
//!
//! [`ObjectHandle`] carries either one, so a facade can be built over a
//! fresh object or over one read back from a composition link. Destroying
//! a borrowed facade leaves the owning facade fully usable.

use std::fmt;
use std::rc::Rc;

use stir_engine::{Engine, Handle};
use tracing::warn;

use crate::error::BridgeResult;
use crate::status;

// ============================================================================
// Family
// ============================================================================

/// Declared base class of an engine object, used for deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Shape,
    Voxels,
    Image,
    DataProcessor,
    ProjMatrix,
    Projectors,
    Prior,
    ObjectiveFunction,
    Reconstruction,
}

impl Family {
    /// Class name passed to `delete_object`
    pub const fn base_class(self) -> &'static str {
        match self {
            Family::Shape => "Shape",
            Family::Voxels => "Voxels",
            Family::Image => "Image",
            Family::DataProcessor => "DataProcessor",
            Family::ProjMatrix => "ProjMatrix",
            Family::Projectors => "Projectors",
            Family::Prior => "Prior",
            Family::ObjectiveFunction => "ObjectiveFunction",
            Family::Reconstruction => "Reconstruction",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base_class())
    }
}

// ============================================================================
// Owned
// ============================================================================

/// An engine object this holder is responsible for destroying
pub struct Owned {
    engine: Rc<dyn Engine>,
    handle: Handle,
    family: Family,
}

impl Owned {
    /// Take ownership of an object handle that has passed its status check
    pub(crate) fn adopt(engine: Rc<dyn Engine>, handle: Handle, family: Family) -> Self {
        Owned {
            engine,
            handle,
            family,
        }
    }

    /// Check the handle returned by a construction call and own the object
    pub(crate) fn from_call(engine: &Rc<dyn Engine>, handle: Handle, family: Family) -> BridgeResult<Self> {
        let handle = status::call(&**engine, handle)?.into_raw();
        Ok(Self::adopt(Rc::clone(engine), handle, family))
    }

    /// Construct an object of a concrete class
    pub fn create(engine: &Rc<dyn Engine>, class_name: &str, family: Family) -> BridgeResult<Self> {
        Self::from_call(engine, engine.new_object(class_name), family)
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn engine(&self) -> &Rc<dyn Engine> {
        &self.engine
    }

    /// A non-owning alias of this object
    pub fn borrow(&self) -> BridgeResult<Borrowed> {
        Borrowed::alias(&self.engine, self.handle, self.family)
    }
}

impl Drop for Owned {
    fn drop(&mut self) {
        let handle = self.engine.delete_object(self.handle, self.family.base_class());
        if let Err(e) = status::check(&*self.engine, handle) {
            warn!(handle = %self.handle, family = %self.family, error = %e, "failed to delete engine object");
        }
    }
}

impl fmt::Debug for Owned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owned({} {})", self.family, self.handle)
    }
}

// ============================================================================
// Borrowed
// ============================================================================

/// A non-owning alias of an engine object
pub struct Borrowed {
    engine: Rc<dyn Engine>,
    handle: Handle,
    family: Family,
}

impl Borrowed {
    /// Take charge of an alias data handle that has passed its status check
    pub(crate) fn adopt(engine: Rc<dyn Engine>, handle: Handle, family: Family) -> Self {
        Borrowed {
            engine,
            handle,
            family,
        }
    }

    /// Alias `handle` through a reference increment
    pub fn alias(engine: &Rc<dyn Engine>, handle: Handle, family: Family) -> BridgeResult<Self> {
        let alias = status::call(&**engine, engine.ref_data_handle(handle))?.into_raw();
        Ok(Self::adopt(Rc::clone(engine), alias, family))
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn engine(&self) -> &Rc<dyn Engine> {
        &self.engine
    }
}

impl Drop for Borrowed {
    fn drop(&mut self) {
        self.engine.delete_data_handle(self.handle);
    }
}

impl fmt::Debug for Borrowed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Borrowed({} {})", self.family, self.handle)
    }
}

// ============================================================================
// ObjectHandle
// ============================================================================

/// Either an owned object or a borrowed alias
#[derive(Debug)]
pub enum ObjectHandle {
    Owned(Owned),
    Borrowed(Borrowed),
}

impl ObjectHandle {
    pub fn handle(&self) -> Handle {
        match self {
            ObjectHandle::Owned(o) => o.handle(),
            ObjectHandle::Borrowed(b) => b.handle(),
        }
    }

    pub fn family(&self) -> Family {
        match self {
            ObjectHandle::Owned(o) => o.family(),
            ObjectHandle::Borrowed(b) => b.family(),
        }
    }

    pub fn engine(&self) -> &Rc<dyn Engine> {
        match self {
            ObjectHandle::Owned(o) => o.engine(),
            ObjectHandle::Borrowed(b) => b.engine(),
        }
    }

    /// Whether dropping this handle destroys the object
    pub fn is_owner(&self) -> bool {
        matches!(self, ObjectHandle::Owned(_))
    }

    /// A fresh non-owning alias of the same object
    pub fn borrow(&self) -> BridgeResult<Borrowed> {
        Borrowed::alias(self.engine(), self.handle(), self.family())
    }
}

impl From<Owned> for ObjectHandle {
    fn from(owned: Owned) -> Self {
        ObjectHandle::Owned(owned)
    }
}

impl From<Borrowed> for ObjectHandle {
    fn from(borrowed: Borrowed) -> Self {
        ObjectHandle::Borrowed(borrowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stir_engine::MemoryEngine;

    fn engines() -> (Rc<MemoryEngine>, Rc<dyn Engine>) {
        let memory = Rc::new(MemoryEngine::new());
        let engine: Rc<dyn Engine> = memory.clone();
        (memory, engine)
    }

    #[test]
    fn test_owned_deletes_through_family() {
        let (memory, engine) = engines();
        let prior = Owned::create(&engine, "QuadraticPrior", Family::Prior).unwrap();
        assert_eq!(memory.live_handles(), 1);
        drop(prior);
        assert_eq!(memory.live_handles(), 0);
    }

    #[test]
    fn test_dropping_borrow_keeps_owner() {
        let (memory, engine) = engines();
        let owner = ObjectHandle::from(Owned::create(&engine, "QuadraticPrior", Family::Prior).unwrap());
        let alias = ObjectHandle::from(owner.borrow().unwrap());
        assert!(owner.is_owner());
        assert!(!alias.is_owner());
        assert_eq!(memory.live_handles(), 2);

        drop(alias);
        assert_eq!(memory.live_handles(), 1);
        let copy = owner.borrow().unwrap();
        assert_eq!(copy.family(), Family::Prior);
    }

    #[test]
    fn test_wrong_family_is_reported_not_panicked() {
        let (memory, engine) = engines();
        let misfiled = Owned::create(&engine, "QuadraticPrior", Family::Shape).unwrap();
        let handle = misfiled.handle();
        drop(misfiled);
        // the object survives a deletion through the wrong base class
        assert_eq!(memory.live_handles(), 1);
        status::check(&*engine, engine.delete_object(handle, "Prior")).unwrap();
        assert_eq!(memory.live_handles(), 0);
    }

    #[test]
    fn test_debug_names_family() {
        let (_memory, engine) = engines();
        let owner = Owned::create(&engine, "RayTracingMatrix", Family::ProjMatrix).unwrap();
        assert!(format!("{:?}", owner).starts_with("Owned(ProjMatrix #"));
    }
}
