//! Objective functions.
//!
//! [`ObjectiveFunction`] covers what every objective offers (a prior and a
//! set-up step); [`PoissonLinearModel`] adds the sensitivity controls of
//! the Poisson log-likelihood family. The concrete projection-data variant
//! implements both.

use std::fmt;

use crate::bridge::Bridge;
use crate::capability::{Parameterized, SetUp};
use crate::error::BridgeResult;
use crate::ownership::{Borrowed, Family, ObjectHandle, Owned};
use crate::params::keys;
use crate::prior::{Prior, PriorRef};
use crate::projectors::ProjectorsUsingMatrix;

const OBJECTIVE_CLASS: &str = "GeneralisedObjectiveFunction";

pub trait ObjectiveFunction: SetUp {
    /// Link `prior`; the objective shares it, no copy is made
    fn set_prior(&self, prior: &impl Prior) -> BridgeResult<()> {
        self.set_link(keys::PRIOR_LINK, prior.object())
    }

    fn prior(&self) -> BridgeResult<PriorRef> {
        self.link(keys::PRIOR_LINK).map(PriorRef::new)
    }
}

/// Poisson log-likelihood with a linear model for the mean
pub trait PoissonLinearModel: ObjectiveFunction {
    fn set_sensitivity_filename(&self, name: &str) -> BridgeResult<()> {
        self.set(keys::SENSITIVITY_FILENAME, name.to_string())
    }

    fn sensitivity_filename(&self) -> BridgeResult<String> {
        self.get(keys::SENSITIVITY_FILENAME)
    }

    fn set_use_subset_sensitivities(&self, flag: bool) -> BridgeResult<()> {
        self.set(keys::USE_SUBSET_SENSITIVITIES, flag)
    }

    fn use_subset_sensitivities(&self) -> BridgeResult<bool> {
        self.get(keys::USE_SUBSET_SENSITIVITIES)
    }

    fn set_recompute_sensitivity(&self, flag: bool) -> BridgeResult<()> {
        self.set(keys::RECOMPUTE_SENSITIVITY, flag)
    }

    fn recompute_sensitivity(&self) -> BridgeResult<bool> {
        self.get(keys::RECOMPUTE_SENSITIVITY)
    }
}

// ============================================================================
// Projection-data Poisson objective
// ============================================================================

pub struct PoissonLogLikelihoodWithLinearModelForMeanAndProjData {
    object: ObjectHandle,
}

impl PoissonLogLikelihoodWithLinearModelForMeanAndProjData {
    pub const CLASS: &'static str = "PoissonLogLikelihoodWithLinearModelForMeanAndProjData";

    pub fn new(bridge: &Bridge) -> BridgeResult<Self> {
        let object = Owned::create(bridge.engine(), Self::CLASS, Family::ObjectiveFunction)?;
        Ok(Self { object: object.into() })
    }

    /// A non-owning facade over the same engine objective
    pub fn aliasing(objective: &impl ObjectiveFunction) -> BridgeResult<Self> {
        Ok(Self {
            object: objective.object().borrow()?.into(),
        })
    }

    pub fn set_input_filename(&self, name: &str) -> BridgeResult<()> {
        self.set(keys::INPUT_FILENAME, name.to_string())
    }

    pub fn input_filename(&self) -> BridgeResult<String> {
        self.get(keys::INPUT_FILENAME)
    }

    pub fn set_zero_seg0_end_planes(&self, flag: bool) -> BridgeResult<()> {
        self.set(keys::ZERO_SEG0_END_PLANES, flag)
    }

    pub fn zero_seg0_end_planes(&self) -> BridgeResult<bool> {
        self.get(keys::ZERO_SEG0_END_PLANES)
    }

    /// -1 processes every segment
    pub fn set_max_segment_num_to_process(&self, n: i32) -> BridgeResult<()> {
        self.set(keys::MAX_SEGMENT_NUM_TO_PROCESS, n)
    }

    pub fn max_segment_num_to_process(&self) -> BridgeResult<i32> {
        self.get(keys::MAX_SEGMENT_NUM_TO_PROCESS)
    }

    pub fn set_projector_pair(&self, projectors: &ProjectorsUsingMatrix) -> BridgeResult<()> {
        self.set_link(keys::PROJECTOR_PAIR, projectors.object())
    }

    pub fn projector_pair(&self) -> BridgeResult<ProjectorsUsingMatrix> {
        self.link(keys::PROJECTOR_PAIR).map(ProjectorsUsingMatrix::borrowed)
    }
}

impl fmt::Debug for PoissonLogLikelihoodWithLinearModelForMeanAndProjData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PoissonLogLikelihood").field(&self.object).finish()
    }
}

impl Parameterized for PoissonLogLikelihoodWithLinearModelForMeanAndProjData {
    fn object(&self) -> &ObjectHandle {
        &self.object
    }
}

impl SetUp for PoissonLogLikelihoodWithLinearModelForMeanAndProjData {
    const SET_UP_CLASS: &'static str = OBJECTIVE_CLASS;
}

impl ObjectiveFunction for PoissonLogLikelihoodWithLinearModelForMeanAndProjData {}

impl PoissonLinearModel for PoissonLogLikelihoodWithLinearModelForMeanAndProjData {}

// ============================================================================
// Borrowed objective
// ============================================================================

/// An objective read back from a reconstruction; never owns its object
#[derive(Debug)]
pub struct ObjectiveFunctionRef {
    object: ObjectHandle,
}

impl ObjectiveFunctionRef {
    pub(crate) fn new(borrowed: Borrowed) -> Self {
        ObjectiveFunctionRef {
            object: borrowed.into(),
        }
    }
}

impl Parameterized for ObjectiveFunctionRef {
    fn object(&self) -> &ObjectHandle {
        &self.object
    }
}

impl SetUp for ObjectiveFunctionRef {
    const SET_UP_CLASS: &'static str = OBJECTIVE_CLASS;
}

impl ObjectiveFunction for ObjectiveFunctionRef {}
