//! Iterative reconstruction pipelines.
//!
//! ## Overview
//!
//! A reconstruction references, without owning, one objective function
//! and an optional inter-iteration filter. It is driven through
//! [`Runnable`]: `set_up` once, then either `reconstruct` for the whole
//! configured range or `update` one sub-iteration at a time.
//!
//! ```ignore
//! let recon = OsmaposlReconstruction::new(&bridge)?;
//! recon.set_objective_function(&objective)?;
//! recon.set_num_subsets(12)?;
//! recon.set_up(&image)?;
//! recon.reconstruct(&mut image)?;
//! ```

use std::path::Path;

use crate::bridge::Bridge;
use crate::capability::{Parameterized, Runnable};
use crate::error::BridgeResult;
use crate::objective::{ObjectiveFunction, ObjectiveFunctionRef};
use crate::ownership::{Family, ObjectHandle, Owned};
use crate::params::keys;
use crate::processor::{DataProcessor, DataProcessorRef};

/// Parameters common to the ordered-subsets algorithms
pub trait IterativeReconstruction: Runnable {
    /// Prefix of saved estimate names
    fn set_output_filename_prefix(&self, prefix: &str) -> BridgeResult<()> {
        self.set(keys::OUTPUT_FILENAME_PREFIX, prefix.to_string())
    }

    fn output_filename_prefix(&self) -> BridgeResult<String> {
        self.get(keys::OUTPUT_FILENAME_PREFIX)
    }

    fn set_num_subsets(&self, n: i32) -> BridgeResult<()> {
        self.set(keys::NUM_SUBSETS, n)
    }

    fn num_subsets(&self) -> BridgeResult<i32> {
        self.get(keys::NUM_SUBSETS)
    }

    fn set_start_subset_num(&self, n: i32) -> BridgeResult<()> {
        self.set(keys::START_SUBSET_NUM, n)
    }

    fn start_subset_num(&self) -> BridgeResult<i32> {
        self.get(keys::START_SUBSET_NUM)
    }

    fn set_num_subiterations(&self, n: i32) -> BridgeResult<()> {
        self.set(keys::NUM_SUBITERATIONS, n)
    }

    fn num_subiterations(&self) -> BridgeResult<i32> {
        self.get(keys::NUM_SUBITERATIONS)
    }

    fn set_start_subiteration_num(&self, n: i32) -> BridgeResult<()> {
        self.set(keys::START_SUBITERATION_NUM, n)
    }

    fn start_subiteration_num(&self) -> BridgeResult<i32> {
        self.get(keys::START_SUBITERATION_NUM)
    }

    fn set_subiteration_num(&self, n: i32) -> BridgeResult<()> {
        self.set(keys::SUBITERATION_NUM, n)
    }

    /// The sub-iteration the next update will perform
    fn subiteration_num(&self) -> BridgeResult<i32> {
        self.get(keys::SUBITERATION_NUM)
    }

    fn set_save_interval(&self, n: i32) -> BridgeResult<()> {
        self.set(keys::SAVE_INTERVAL, n)
    }

    fn save_interval(&self) -> BridgeResult<i32> {
        self.get(keys::SAVE_INTERVAL)
    }

    /// 0 disables the inter-iteration filter
    fn set_inter_iteration_filter_interval(&self, n: i32) -> BridgeResult<()> {
        self.set(keys::INTER_ITERATION_FILTER_INTERVAL, n)
    }

    fn inter_iteration_filter_interval(&self) -> BridgeResult<i32> {
        self.get(keys::INTER_ITERATION_FILTER_INTERVAL)
    }

    fn set_objective_function(&self, objective: &impl ObjectiveFunction) -> BridgeResult<()> {
        self.set_link(keys::OBJECTIVE_FUNCTION, objective.object())
    }

    fn objective_function(&self) -> BridgeResult<ObjectiveFunctionRef> {
        self.link(keys::OBJECTIVE_FUNCTION).map(ObjectiveFunctionRef::new)
    }

    fn set_inter_iteration_filter(&self, filter: &impl DataProcessor) -> BridgeResult<()> {
        self.set_link(keys::INTER_ITERATION_FILTER, filter.object())
    }

    fn inter_iteration_filter(&self) -> BridgeResult<DataProcessorRef> {
        self.link(keys::INTER_ITERATION_FILTER).map(DataProcessorRef::new)
    }
}

fn new_reconstruction(bridge: &Bridge, algorithm: &str, par_file: &str) -> BridgeResult<ObjectHandle> {
    let engine = bridge.engine();
    let object = Owned::from_call(
        engine,
        engine.new_reconstruction(algorithm, par_file),
        Family::Reconstruction,
    )?;
    Ok(object.into())
}

// ============================================================================
// OSMAPOSL
// ============================================================================

/// Ordered-subsets one-step-late MAP expectation maximisation
#[derive(Debug)]
pub struct OsmaposlReconstruction {
    object: ObjectHandle,
}

impl OsmaposlReconstruction {
    pub const ALGORITHM: &'static str = "OSMAPOSL";

    pub fn new(bridge: &Bridge) -> BridgeResult<Self> {
        Ok(Self {
            object: new_reconstruction(bridge, Self::ALGORITHM, "")?,
        })
    }

    /// Configure from a parameter file
    pub fn from_par_file(bridge: &Bridge, path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref().to_string_lossy();
        Ok(Self {
            object: new_reconstruction(bridge, Self::ALGORITHM, &path)?,
        })
    }

    /// `additive` or `multiplicative`
    pub fn set_map_model(&self, model: &str) -> BridgeResult<()> {
        self.set(keys::MAP_MODEL, model.to_string())
    }

    pub fn map_model(&self) -> BridgeResult<String> {
        self.get(keys::MAP_MODEL)
    }
}

impl Parameterized for OsmaposlReconstruction {
    fn object(&self) -> &ObjectHandle {
        &self.object
    }
}

impl Runnable for OsmaposlReconstruction {}

impl IterativeReconstruction for OsmaposlReconstruction {}

// ============================================================================
// OSSPS
// ============================================================================

/// Ordered-subsets separable paraboloidal surrogates
#[derive(Debug)]
pub struct OsspsReconstruction {
    object: ObjectHandle,
}

impl OsspsReconstruction {
    pub const ALGORITHM: &'static str = "OSSPS";

    pub fn new(bridge: &Bridge) -> BridgeResult<Self> {
        Ok(Self {
            object: new_reconstruction(bridge, Self::ALGORITHM, "")?,
        })
    }

    pub fn from_par_file(bridge: &Bridge, path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref().to_string_lossy();
        Ok(Self {
            object: new_reconstruction(bridge, Self::ALGORITHM, &path)?,
        })
    }

    pub fn set_relaxation_parameter(&self, value: f32) -> BridgeResult<()> {
        self.set(keys::RELAXATION_PARAMETER, value)
    }

    pub fn relaxation_parameter(&self) -> BridgeResult<f32> {
        self.get(keys::RELAXATION_PARAMETER)
    }
}

impl Parameterized for OsspsReconstruction {
    fn object(&self) -> &ObjectHandle {
        &self.object
    }
}

impl Runnable for OsspsReconstruction {}

impl IterativeReconstruction for OsspsReconstruction {}
