//! Parameter Protocol
//!
//! Typed get/set of named parameters on engine objects. A parameter is
//! addressed by a `(class, name)` pair; [`Param<V>`] fixes that pair and
//! its value type at compile time, and [`Link`] does the same for
//! handle-valued parameters that wire one object into another.
//!
//! The protocol adds no validation of its own. Range and type errors are
//! the engine's to report, and reach the caller through the status
//! channel. Every boxed value allocated here is released on both the
//! success and the error path.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use stir_engine::{Engine, Handle};

use crate::error::BridgeResult;
use crate::ownership::{Borrowed, Family};
use crate::status::{self, Token};

// ============================================================================
// Value boxing
// ============================================================================

/// A scalar that can travel through a boxed data handle
pub trait ParamValue: Sized {
    /// Box the value into a new data handle
    fn boxed(&self, engine: &dyn Engine) -> Handle;

    /// Read the value out of a data handle
    fn unboxed(token: &Token<'_>) -> Self;
}

impl ParamValue for String {
    fn boxed(&self, engine: &dyn Engine) -> Handle {
        engine.char_data_handle(self)
    }

    fn unboxed(token: &Token<'_>) -> Self {
        token.string()
    }
}

impl ParamValue for i32 {
    fn boxed(&self, engine: &dyn Engine) -> Handle {
        engine.int_data_handle(*self)
    }

    fn unboxed(token: &Token<'_>) -> Self {
        token.int()
    }
}

impl ParamValue for f32 {
    fn boxed(&self, engine: &dyn Engine) -> Handle {
        engine.float_data_handle(*self)
    }

    fn unboxed(token: &Token<'_>) -> Self {
        token.float()
    }
}

impl ParamValue for f64 {
    fn boxed(&self, engine: &dyn Engine) -> Handle {
        engine.double_data_handle(*self)
    }

    fn unboxed(token: &Token<'_>) -> Self {
        token.double()
    }
}

/// Flags are sent as text and answered as integers
impl ParamValue for bool {
    fn boxed(&self, engine: &dyn Engine) -> Handle {
        engine.char_data_handle(if *self { "true" } else { "false" })
    }

    fn unboxed(token: &Token<'_>) -> Self {
        token.int() != 0
    }
}

// ============================================================================
// Keys
// ============================================================================

/// A `(class, name)` parameter key carrying a value of type `V`
pub struct Param<V> {
    class: &'static str,
    name: &'static str,
    _value: PhantomData<fn() -> V>,
}

impl<V> Param<V> {
    pub const fn new(class: &'static str, name: &'static str) -> Self {
        Param {
            class,
            name,
            _value: PhantomData,
        }
    }

    pub const fn class(&self) -> &'static str {
        self.class
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<V> Clone for Param<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Param<V> {}

impl<V> fmt::Debug for Param<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.class, self.name)
    }
}

/// A handle-valued parameter linking to an object of `family`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    class: &'static str,
    name: &'static str,
    family: Family,
}

impl Link {
    pub const fn new(class: &'static str, name: &'static str, family: Family) -> Self {
        Link { class, name, family }
    }

    pub const fn class(&self) -> &'static str {
        self.class
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn family(&self) -> Family {
        self.family
    }
}

// ============================================================================
// Protocol
// ============================================================================

pub fn set_parameter<V: ParamValue>(engine: &dyn Engine, object: Handle, key: Param<V>, value: &V) -> BridgeResult<()> {
    let boxed = Token::new(engine, value.boxed(engine));
    status::check(engine, engine.set_parameter(object, key.class, key.name, boxed.handle()))
}

pub fn get_parameter<V: ParamValue>(engine: &dyn Engine, object: Handle, key: Param<V>) -> BridgeResult<V> {
    let token = status::call(engine, engine.parameter(object, key.class, key.name))?;
    Ok(V::unboxed(&token))
}

/// Wire `target` into `object`; the engine shares the target, no copy is made
pub fn set_link(engine: &dyn Engine, object: Handle, key: Link, target: Handle) -> BridgeResult<()> {
    status::check(engine, engine.set_parameter(object, key.class, key.name, target))
}

/// Read a link back as a non-owning alias of the linked object
pub fn get_link(engine: &Rc<dyn Engine>, object: Handle, key: Link) -> BridgeResult<Borrowed> {
    let alias = status::call(&**engine, engine.parameter(object, key.class, key.name))?.into_raw();
    Ok(Borrowed::adopt(Rc::clone(engine), alias, key.family))
}

// ============================================================================
// Supported keys
// ============================================================================

/// Every `(class, name)` pair the bridge uses
pub mod keys {
    use super::{Link, Param};
    use crate::ownership::Family;

    const SHAPE: &str = "Shape";
    const CYLINDER: &str = "EllipsoidalCylinder";
    const FOV_FILTER: &str = "TruncateToCylindricalFOVImageProcessor";
    const RAY_TRACING: &str = "RayTracingMatrix";
    const PROJECTORS: &str = "ProjectorsUsingMatrix";
    const PRIOR: &str = "GeneralisedPrior";
    const OBJECTIVE: &str = "GeneralisedObjectiveFunction";
    const POISSON: &str = "PoissonLogLikelihoodWithLinearModelForMean";
    const POISSON_PROJ_DATA: &str = "PoissonLogLikelihoodWithLinearModelForMeanAndProjData";
    const RECONSTRUCTION: &str = "Reconstruction";
    const ITERATIVE: &str = "IterativeReconstruction";

    pub const SHAPE_X: Param<f32> = Param::new(SHAPE, "x");
    pub const SHAPE_Y: Param<f32> = Param::new(SHAPE, "y");
    pub const SHAPE_Z: Param<f32> = Param::new(SHAPE, "z");
    pub const CYLINDER_LENGTH: Param<f32> = Param::new(CYLINDER, "length");
    pub const CYLINDER_RADIUS_X: Param<f32> = Param::new(CYLINDER, "radius_x");
    pub const CYLINDER_RADIUS_Y: Param<f32> = Param::new(CYLINDER, "radius_y");

    pub const STRICTLY_LESS_THAN_RADIUS: Param<bool> = Param::new(FOV_FILTER, "strictly_less_than_radius");

    pub const NUM_TANGENTIAL_LORS: Param<i32> = Param::new(RAY_TRACING, "num_tangential_LORs");
    pub const MATRIX: Link = Link::new(PROJECTORS, "matrix_type", Family::ProjMatrix);

    pub const PENALISATION_FACTOR: Param<f32> = Param::new(PRIOR, "penalisation_factor");

    pub const PRIOR_LINK: Link = Link::new(OBJECTIVE, "prior", Family::Prior);
    pub const SENSITIVITY_FILENAME: Param<String> = Param::new(POISSON, "sensitivity_filename");
    pub const USE_SUBSET_SENSITIVITIES: Param<bool> = Param::new(POISSON, "use_subset_sensitivities");
    pub const RECOMPUTE_SENSITIVITY: Param<bool> = Param::new(POISSON, "recompute_sensitivity");
    pub const INPUT_FILENAME: Param<String> = Param::new(POISSON_PROJ_DATA, "input_filename");
    pub const ZERO_SEG0_END_PLANES: Param<bool> = Param::new(POISSON_PROJ_DATA, "zero_seg0_end_planes");
    pub const MAX_SEGMENT_NUM_TO_PROCESS: Param<i32> =
        Param::new(POISSON_PROJ_DATA, "max_segment_num_to_process");
    pub const PROJECTOR_PAIR: Link = Link::new(POISSON_PROJ_DATA, "projector_pair_type", Family::Projectors);

    pub const OUTPUT_FILENAME_PREFIX: Param<String> = Param::new(RECONSTRUCTION, "output_filename_prefix");
    pub const NUM_SUBSETS: Param<i32> = Param::new(ITERATIVE, "num_subsets");
    pub const START_SUBSET_NUM: Param<i32> = Param::new(ITERATIVE, "start_subset_num");
    pub const NUM_SUBITERATIONS: Param<i32> = Param::new(ITERATIVE, "num_subiterations");
    pub const START_SUBITERATION_NUM: Param<i32> = Param::new(ITERATIVE, "start_subiteration_num");
    pub const SUBITERATION_NUM: Param<i32> = Param::new(ITERATIVE, "subiteration_num");
    pub const SAVE_INTERVAL: Param<i32> = Param::new(ITERATIVE, "save_interval");
    pub const INTER_ITERATION_FILTER_INTERVAL: Param<i32> = Param::new(ITERATIVE, "inter_iteration_filter_interval");
    pub const OBJECTIVE_FUNCTION: Link = Link::new(ITERATIVE, "objective_function", Family::ObjectiveFunction);
    pub const INTER_ITERATION_FILTER: Link =
        Link::new(ITERATIVE, "inter_iteration_filter_type", Family::DataProcessor);

    pub const MAP_MODEL: Param<String> = Param::new("OSMAPOSL", "MAP_model");
    pub const RELAXATION_PARAMETER: Param<f32> = Param::new("OSSPS", "relaxation_parameter");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::Owned;
    use pretty_assertions::assert_eq;
    use stir_engine::MemoryEngine;

    fn engines() -> (Rc<MemoryEngine>, Rc<dyn Engine>) {
        let memory = Rc::new(MemoryEngine::new());
        let engine: Rc<dyn Engine> = memory.clone();
        (memory, engine)
    }

    #[test]
    fn test_round_trip_each_type() {
        let (memory, engine) = engines();
        let shape = Owned::create(&engine, "EllipsoidalCylinder", Family::Shape).unwrap();
        set_parameter(&*engine, shape.handle(), keys::CYLINDER_LENGTH, &12.5).unwrap();
        assert_eq!(get_parameter(&*engine, shape.handle(), keys::CYLINDER_LENGTH).unwrap(), 12.5);

        let filter = Owned::create(&engine, "TruncateToCylindricalFOVImageProcessor", Family::DataProcessor).unwrap();
        set_parameter(&*engine, filter.handle(), keys::STRICTLY_LESS_THAN_RADIUS, &true).unwrap();
        assert!(get_parameter(&*engine, filter.handle(), keys::STRICTLY_LESS_THAN_RADIUS).unwrap());

        let objective = Owned::create(
            &engine,
            "PoissonLogLikelihoodWithLinearModelForMeanAndProjData",
            Family::ObjectiveFunction,
        )
        .unwrap();
        let name = "sino.hs".to_string();
        set_parameter(&*engine, objective.handle(), keys::INPUT_FILENAME, &name).unwrap();
        assert_eq!(get_parameter(&*engine, objective.handle(), keys::INPUT_FILENAME).unwrap(), name);
        set_parameter(&*engine, objective.handle(), keys::MAX_SEGMENT_NUM_TO_PROCESS, &3).unwrap();
        assert_eq!(
            get_parameter(&*engine, objective.handle(), keys::MAX_SEGMENT_NUM_TO_PROCESS).unwrap(),
            3
        );

        assert_eq!(memory.live_handles(), 3);
    }

    #[test]
    fn test_failed_set_releases_boxed_value() {
        let (memory, engine) = engines();
        let shape = Owned::create(&engine, "EllipsoidalCylinder", Family::Shape).unwrap();
        let bad: Param<f32> = Param::new("Shape", "radius");
        let err = set_parameter(&*engine, shape.handle(), bad, &1.0).unwrap_err();
        assert_eq!(err.message(), "parameter radius not found in Shape");
        assert_eq!(memory.live_handles(), 1);
    }

    #[test]
    fn test_link_round_trip_is_an_alias() {
        let (memory, engine) = engines();
        let matrix = Owned::create(&engine, "RayTracingMatrix", Family::ProjMatrix).unwrap();
        let projectors = Owned::create(&engine, "ProjectorsUsingMatrix", Family::Projectors).unwrap();
        set_link(&*engine, projectors.handle(), keys::MATRIX, matrix.handle()).unwrap();

        let alias = get_link(&engine, projectors.handle(), keys::MATRIX).unwrap();
        assert_eq!(alias.family(), Family::ProjMatrix);
        set_parameter(&*engine, alias.handle(), keys::NUM_TANGENTIAL_LORS, &4).unwrap();
        drop(alias);

        assert_eq!(get_parameter(&*engine, matrix.handle(), keys::NUM_TANGENTIAL_LORS).unwrap(), 4);
        assert_eq!(memory.live_handles(), 2);
    }

    #[test]
    fn test_param_debug() {
        assert_eq!(format!("{:?}", keys::NUM_SUBSETS), "IterativeReconstruction::num_subsets");
    }
}
