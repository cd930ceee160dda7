//! Engine Objects and Their Parameters
//!
//! Every object answers parameters only under the class names of its
//! lineage, and only for the `(class, name)` pairs that class declares.
//! A QuadraticPrior therefore accepts `("GeneralisedPrior",
//! "penalisation_factor")` but rejects `("Shape", "x")` and
//! `("Prior", "radius_x")`.

use std::rc::Rc;

use smol_str::SmolStr;

use super::image::{Geometry, ImageData};
use super::reconstruction::ReconState;
use super::value::{borrow, borrow_mut, Shared, Value};
use crate::fault::FaultResult;

// ============================================================================
// Family (declared base) names
// ============================================================================

pub(crate) const SHAPE: &str = "Shape";
pub(crate) const VOXELS: &str = "Voxels";
pub(crate) const IMAGE: &str = "Image";
pub(crate) const DATA_PROCESSOR: &str = "DataProcessor";
pub(crate) const PROJ_MATRIX: &str = "ProjMatrix";
pub(crate) const PROJECTORS: &str = "Projectors";
pub(crate) const PRIOR: &str = "Prior";
pub(crate) const OBJECTIVE_FUNCTION: &str = "ObjectiveFunction";
pub(crate) const RECONSTRUCTION: &str = "Reconstruction";

// ============================================================================
// Concrete objects
// ============================================================================

/// Cylinder along z with an elliptical cross-section
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct EllipsoidalCylinder {
    pub(crate) origin: [f32; 3],
    pub(crate) length: f32,
    pub(crate) radius_x: f32,
    pub(crate) radius_y: f32,
}

impl EllipsoidalCylinder {
    fn set(&mut self, class: &str, name: &str, value: &Value) -> FaultResult<bool> {
        match (class, name) {
            ("Shape", "x") => self.origin[0] = value.as_f32()?,
            ("Shape", "y") => self.origin[1] = value.as_f32()?,
            ("Shape", "z") => self.origin[2] = value.as_f32()?,
            ("EllipsoidalCylinder", "length") => self.length = non_negative(name, value.as_f32()?)?,
            ("EllipsoidalCylinder", "radius_x") => self.radius_x = non_negative(name, value.as_f32()?)?,
            ("EllipsoidalCylinder", "radius_y") => self.radius_y = non_negative(name, value.as_f32()?)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn get(&self, class: &str, name: &str) -> Option<Value> {
        let v = match (class, name) {
            ("Shape", "x") => self.origin[0],
            ("Shape", "y") => self.origin[1],
            ("Shape", "z") => self.origin[2],
            ("EllipsoidalCylinder", "length") => self.length,
            ("EllipsoidalCylinder", "radius_x") => self.radius_x,
            ("EllipsoidalCylinder", "radius_y") => self.radius_y,
            _ => return None,
        };
        Some(Value::Float(v))
    }
}

/// Zeroes everything outside the transaxial field of view
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CylindricalFovTruncation {
    pub(crate) strictly_less_than_radius: bool,
}

impl CylindricalFovTruncation {
    const CLASS: &'static str = "TruncateToCylindricalFOVImageProcessor";

    pub(crate) fn apply(&self, image: &mut ImageData) {
        image.truncate_to_cylindrical_fov(self.strictly_less_than_radius);
    }

    fn set(&mut self, class: &str, name: &str, value: &Value) -> FaultResult<bool> {
        if (class, name) == (Self::CLASS, "strictly_less_than_radius") {
            self.strictly_less_than_radius = value.as_flag()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn get(&self, class: &str, name: &str) -> Option<Value> {
        ((class, name) == (Self::CLASS, "strictly_less_than_radius"))
            .then(|| Value::flag(self.strictly_less_than_radius))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RayTracingMatrix {
    pub(crate) num_tangential_lors: i32,
}

impl Default for RayTracingMatrix {
    fn default() -> Self {
        RayTracingMatrix {
            num_tangential_lors: 1,
        }
    }
}

impl RayTracingMatrix {
    fn set(&mut self, class: &str, name: &str, value: &Value) -> FaultResult<bool> {
        if (class, name) != ("RayTracingMatrix", "num_tangential_LORs") {
            return Ok(false);
        }
        let n = value.as_i32()?;
        if n < 1 {
            return Err(fault!("num_tangential_LORs must be at least 1, got {}", n));
        }
        self.num_tangential_lors = n;
        Ok(true)
    }

    fn get(&self, class: &str, name: &str) -> Option<Value> {
        ((class, name) == ("RayTracingMatrix", "num_tangential_LORs"))
            .then(|| Value::Int(self.num_tangential_lors))
    }
}

#[derive(Debug, Default)]
pub(crate) struct ProjectorsUsingMatrix {
    pub(crate) matrix: Option<Shared>,
}

impl ProjectorsUsingMatrix {
    fn set(&mut self, class: &str, name: &str, value: &Value) -> FaultResult<bool> {
        if (class, name) != ("ProjectorsUsingMatrix", "matrix_type") {
            return Ok(false);
        }
        self.matrix = Some(linked(value, PROJ_MATRIX)?);
        Ok(true)
    }

    fn get(&self, class: &str, name: &str) -> FaultResult<Option<Value>> {
        if (class, name) != ("ProjectorsUsingMatrix", "matrix_type") {
            return Ok(None);
        }
        link_value(&self.matrix, name).map(Some)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct QuadraticPrior {
    pub(crate) penalisation_factor: f32,
    pub(crate) is_set_up: bool,
}

impl QuadraticPrior {
    pub(crate) fn set_up(&mut self) -> FaultResult<()> {
        if self.penalisation_factor < 0.0 {
            return Err(fault!(
                "penalisation factor must not be negative, got {}",
                self.penalisation_factor
            ));
        }
        self.is_set_up = true;
        Ok(())
    }

    fn set(&mut self, class: &str, name: &str, value: &Value) -> FaultResult<bool> {
        if (class, name) != ("GeneralisedPrior", "penalisation_factor") {
            return Ok(false);
        }
        self.penalisation_factor = value.as_f32()?;
        self.is_set_up = false;
        Ok(true)
    }

    fn get(&self, class: &str, name: &str) -> Option<Value> {
        ((class, name) == ("GeneralisedPrior", "penalisation_factor"))
            .then(|| Value::Float(self.penalisation_factor))
    }
}

/// PoissonLogLikelihoodWithLinearModelForMeanAndProjData
#[derive(Debug)]
pub(crate) struct PoissonObjective {
    pub(crate) prior: Option<Shared>,
    pub(crate) sensitivity_filename: SmolStr,
    pub(crate) use_subset_sensitivities: bool,
    pub(crate) recompute_sensitivity: bool,
    pub(crate) input_filename: SmolStr,
    pub(crate) zero_seg0_end_planes: bool,
    pub(crate) max_segment_num_to_process: i32,
    pub(crate) projector_pair: Option<Shared>,
    pub(crate) is_set_up: bool,
}

impl Default for PoissonObjective {
    fn default() -> Self {
        PoissonObjective {
            prior: None,
            sensitivity_filename: SmolStr::default(),
            use_subset_sensitivities: false,
            recompute_sensitivity: false,
            input_filename: SmolStr::default(),
            zero_seg0_end_planes: false,
            max_segment_num_to_process: -1,
            projector_pair: None,
            is_set_up: false,
        }
    }
}

impl PoissonObjective {
    const MEAN: &'static str = "PoissonLogLikelihoodWithLinearModelForMean";
    const PROJ_DATA: &'static str = "PoissonLogLikelihoodWithLinearModelForMeanAndProjData";

    pub(crate) fn set_up(&mut self) -> FaultResult<()> {
        let projectors = self
            .projector_pair
            .as_ref()
            .ok_or_else(|| fault!("objective function has no projector pair"))?;
        match &*borrow(projectors)? {
            EngineObject::Projectors(p) if p.matrix.is_some() => {}
            EngineObject::Projectors(_) => {
                return Err(fault!("projector pair has no projection matrix"));
            }
            other => {
                return Err(fault!("projector pair is a {}", other.class_name()));
            }
        }
        if let Some(prior) = &self.prior {
            if let EngineObject::Prior(p) = &mut *borrow_mut(prior)? {
                p.set_up()?;
            }
        }
        self.is_set_up = true;
        Ok(())
    }

    fn set(&mut self, class: &str, name: &str, value: &Value) -> FaultResult<bool> {
        match (class, name) {
            ("GeneralisedObjectiveFunction", "prior") => self.prior = Some(linked(value, PRIOR)?),
            (Self::MEAN, "sensitivity_filename") => self.sensitivity_filename = value.as_text()?,
            (Self::MEAN, "use_subset_sensitivities") => self.use_subset_sensitivities = value.as_flag()?,
            (Self::MEAN, "recompute_sensitivity") => self.recompute_sensitivity = value.as_flag()?,
            (Self::PROJ_DATA, "input_filename") => self.input_filename = value.as_text()?,
            (Self::PROJ_DATA, "zero_seg0_end_planes") => self.zero_seg0_end_planes = value.as_flag()?,
            (Self::PROJ_DATA, "max_segment_num_to_process") => {
                let n = value.as_i32()?;
                if n < -1 {
                    return Err(fault!("max_segment_num_to_process must be -1 or more, got {}", n));
                }
                self.max_segment_num_to_process = n;
            }
            (Self::PROJ_DATA, "projector_pair_type") => {
                self.projector_pair = Some(linked(value, PROJECTORS)?)
            }
            _ => return Ok(false),
        }
        self.is_set_up = false;
        Ok(true)
    }

    fn get(&self, class: &str, name: &str) -> FaultResult<Option<Value>> {
        let value = match (class, name) {
            ("GeneralisedObjectiveFunction", "prior") => link_value(&self.prior, name)?,
            (Self::MEAN, "sensitivity_filename") => Value::Char(self.sensitivity_filename.clone()),
            (Self::MEAN, "use_subset_sensitivities") => Value::flag(self.use_subset_sensitivities),
            (Self::MEAN, "recompute_sensitivity") => Value::flag(self.recompute_sensitivity),
            (Self::PROJ_DATA, "input_filename") => Value::Char(self.input_filename.clone()),
            (Self::PROJ_DATA, "zero_seg0_end_planes") => Value::flag(self.zero_seg0_end_planes),
            (Self::PROJ_DATA, "max_segment_num_to_process") => Value::Int(self.max_segment_num_to_process),
            (Self::PROJ_DATA, "projector_pair_type") => link_value(&self.projector_pair, name)?,
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

// ============================================================================
// EngineObject
// ============================================================================

#[derive(Debug)]
pub(crate) enum EngineObject {
    Shape(EllipsoidalCylinder),
    Voxels(Geometry),
    Image(ImageData),
    Processor(CylindricalFovTruncation),
    Matrix(RayTracingMatrix),
    Projectors(ProjectorsUsingMatrix),
    Prior(QuadraticPrior),
    Objective(PoissonObjective),
    Reconstruction(ReconState),
}

impl EngineObject {
    /// Construct a default object of a concrete class
    pub(crate) fn create(class_name: &str) -> FaultResult<Self> {
        let object = match class_name {
            "EllipsoidalCylinder" => EngineObject::Shape(EllipsoidalCylinder::default()),
            "TruncateToCylindricalFOVImageProcessor" => {
                EngineObject::Processor(CylindricalFovTruncation::default())
            }
            "RayTracingMatrix" => EngineObject::Matrix(RayTracingMatrix::default()),
            "ProjectorsUsingMatrix" => EngineObject::Projectors(ProjectorsUsingMatrix::default()),
            "QuadraticPrior" => EngineObject::Prior(QuadraticPrior::default()),
            "PoissonLogLikelihoodWithLinearModelForMeanAndProjData" => {
                EngineObject::Objective(PoissonObjective::default())
            }
            "OSMAPOSL" | "OSSPS" => {
                return Err(fault!(
                    "{} is a reconstruction algorithm; create it as a reconstruction",
                    class_name
                ));
            }
            _ => return Err(fault!("unknown object class '{}'", class_name)),
        };
        Ok(object)
    }

    /// Declared base class used for deletion
    pub(crate) fn family(&self) -> &'static str {
        match self {
            EngineObject::Shape(_) => SHAPE,
            EngineObject::Voxels(_) => VOXELS,
            EngineObject::Image(_) => IMAGE,
            EngineObject::Processor(_) => DATA_PROCESSOR,
            EngineObject::Matrix(_) => PROJ_MATRIX,
            EngineObject::Projectors(_) => PROJECTORS,
            EngineObject::Prior(_) => PRIOR,
            EngineObject::Objective(_) => OBJECTIVE_FUNCTION,
            EngineObject::Reconstruction(_) => RECONSTRUCTION,
        }
    }

    /// Class names this object answers to, base first
    pub(crate) fn lineage(&self) -> &'static [&'static str] {
        match self {
            EngineObject::Shape(_) => &["Shape", "EllipsoidalCylinder"],
            EngineObject::Voxels(_) => &["Voxels"],
            EngineObject::Image(_) => &["Image"],
            EngineObject::Processor(_) => &["DataProcessor", "TruncateToCylindricalFOVImageProcessor"],
            EngineObject::Matrix(_) => &["ProjMatrix", "RayTracingMatrix"],
            EngineObject::Projectors(_) => &["Projectors", "ProjectorsUsingMatrix"],
            EngineObject::Prior(_) => &["Prior", "GeneralisedPrior", "QuadraticPrior"],
            EngineObject::Objective(_) => &[
                "ObjectiveFunction",
                "GeneralisedObjectiveFunction",
                "PoissonLogLikelihoodWithLinearModelForMean",
                "PoissonLogLikelihoodWithLinearModelForMeanAndProjData",
            ],
            EngineObject::Reconstruction(state) => state.lineage(),
        }
    }

    /// Most-derived class name
    pub(crate) fn class_name(&self) -> &'static str {
        self.lineage().last().copied().unwrap_or("Object")
    }

    fn check_class(&self, class: &str) -> FaultResult<()> {
        if self.lineage().contains(&class) {
            Ok(())
        } else {
            Err(fault!("object of class {} is not a {}", self.class_name(), class))
        }
    }

    pub(crate) fn set_parameter(&mut self, class: &str, name: &str, value: &Value) -> FaultResult<()> {
        self.check_class(class)?;
        let handled = match self {
            EngineObject::Shape(s) => s.set(class, name, value)?,
            EngineObject::Processor(p) => p.set(class, name, value)?,
            EngineObject::Matrix(m) => m.set(class, name, value)?,
            EngineObject::Projectors(p) => p.set(class, name, value)?,
            EngineObject::Prior(p) => p.set(class, name, value)?,
            EngineObject::Objective(o) => o.set(class, name, value)?,
            EngineObject::Reconstruction(r) => r.set(class, name, value)?,
            EngineObject::Voxels(_) | EngineObject::Image(_) => false,
        };
        if handled {
            Ok(())
        } else {
            Err(unknown_parameter(class, name))
        }
    }

    pub(crate) fn parameter(&self, class: &str, name: &str) -> FaultResult<Value> {
        self.check_class(class)?;
        let value = match self {
            EngineObject::Shape(s) => s.get(class, name),
            EngineObject::Processor(p) => p.get(class, name),
            EngineObject::Matrix(m) => m.get(class, name),
            EngineObject::Projectors(p) => p.get(class, name)?,
            EngineObject::Prior(p) => p.get(class, name),
            EngineObject::Objective(o) => o.get(class, name)?,
            EngineObject::Reconstruction(r) => r.get(class, name)?,
            EngineObject::Voxels(_) | EngineObject::Image(_) => None,
        };
        value.ok_or_else(|| unknown_parameter(class, name))
    }

    /// Run the set-up step declared by `class`
    pub(crate) fn set_up(&mut self, class: &str) -> FaultResult<()> {
        self.check_class(class)?;
        match self {
            EngineObject::Prior(p) => p.set_up(),
            EngineObject::Objective(o) => o.set_up(),
            other => Err(fault!("objects of class {} have no set-up step", other.class_name())),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn unknown_parameter(class: &str, name: &str) -> crate::fault::Fault {
    fault!("parameter {} not found in {}", name, class)
}

fn non_negative(name: &str, value: f32) -> FaultResult<f32> {
    if value < 0.0 {
        Err(fault!("{} must not be negative, got {}", name, value))
    } else {
        Ok(value)
    }
}

/// Resolve a handle-valued parameter and check its family
pub(crate) fn linked(value: &Value, family: &str) -> FaultResult<Shared> {
    let object = value.as_object()?;
    let actual = borrow(&object)?.family();
    if actual != family {
        return Err(fault!("expected a {} object, got a {}", family, actual));
    }
    Ok(object)
}

pub(crate) fn link_value(link: &Option<Shared>, name: &str) -> FaultResult<Value> {
    link.as_ref()
        .map(|obj| Value::Object(Rc::clone(obj)))
        .ok_or_else(|| fault!("{} is not set", name))
}
