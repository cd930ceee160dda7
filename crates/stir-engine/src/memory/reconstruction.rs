//! Reconstruction stage machine.
//!
//! `set_up` validates the configuration and rewinds the sub-iteration
//! counter; each `update` performs the bookkeeping of one sub-iteration
//! (subset selection, inter-iteration filtering, estimate saving) and
//! advances the counter by exactly one. The update arithmetic itself
//! belongs to the numerical engine and is not performed here.

use std::path::Path;

use smol_str::SmolStr;

use super::image::ImageData;
use super::objects::{link_value, linked, EngineObject, DATA_PROCESSOR, OBJECTIVE_FUNCTION};
use super::parfile::ParFile;
use super::value::{borrow, borrow_mut, Shared, Value};
use crate::fault::FaultResult;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Algorithm {
    Osmaposl { map_model: SmolStr },
    Ossps { relaxation_parameter: f32 },
}

impl Algorithm {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Algorithm::Osmaposl { .. } => "OSMAPOSL",
            Algorithm::Ossps { .. } => "OSSPS",
        }
    }
}

/// What one sub-iteration did
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UpdateReport {
    pub(crate) subiteration: i32,
    pub(crate) subset: i32,
    pub(crate) filtered: bool,
    pub(crate) saved: Option<SmolStr>,
}

#[derive(Debug)]
pub(crate) struct ReconState {
    pub(crate) algorithm: Algorithm,
    output_filename_prefix: SmolStr,
    num_subsets: i32,
    start_subset_num: i32,
    num_subiterations: i32,
    start_subiteration_num: i32,
    subiteration_num: i32,
    save_interval: i32,
    inter_iteration_filter_interval: i32,
    objective: Option<Shared>,
    filter: Option<Shared>,
    is_set_up: bool,
    saved_estimates: Vec<SmolStr>,
}

impl ReconState {
    pub(crate) fn new(algorithm: &str) -> FaultResult<Self> {
        let algorithm = match algorithm {
            "OSMAPOSL" => Algorithm::Osmaposl {
                map_model: SmolStr::new("additive"),
            },
            "OSSPS" => Algorithm::Ossps {
                relaxation_parameter: 1.0,
            },
            other => return Err(fault!("unknown reconstruction algorithm '{}'", other)),
        };
        Ok(ReconState {
            algorithm,
            output_filename_prefix: SmolStr::default(),
            num_subsets: 1,
            start_subset_num: 0,
            num_subiterations: 1,
            start_subiteration_num: 1,
            subiteration_num: 1,
            save_interval: 1,
            inter_iteration_filter_interval: 0,
            objective: None,
            filter: None,
            is_set_up: false,
            saved_estimates: Vec::new(),
        })
    }

    /// Build from a parameter file; unknown keys are ignored.
    pub(crate) fn from_par_file(algorithm: &str, path: &Path) -> FaultResult<Self> {
        let mut state = Self::new(algorithm)?;
        let par = ParFile::read(path)?;
        const KEYS: &[(&str, &str, &str)] = &[
            ("number of subsets", "IterativeReconstruction", "num_subsets"),
            ("start at subset", "IterativeReconstruction", "start_subset_num"),
            ("number of subiterations", "IterativeReconstruction", "num_subiterations"),
            ("start at subiteration number", "IterativeReconstruction", "start_subiteration_num"),
            ("save estimates at subiteration intervals", "IterativeReconstruction", "save_interval"),
            (
                "inter-iteration filter subiteration interval",
                "IterativeReconstruction",
                "inter_iteration_filter_interval",
            ),
            ("output filename prefix", "Reconstruction", "output_filename_prefix"),
        ];
        for (key, class, name) in KEYS {
            if let Some(value) = par.get(key) {
                state.set(class, name, &Value::Char(SmolStr::new(value)))?;
            }
        }
        let own = state.algorithm.name();
        if let Some(model) = par.get("MAP_model") {
            state.set(own, "MAP_model", &Value::Char(SmolStr::new(model)))?;
        }
        if let Some(relaxation) = par.get("relaxation parameter") {
            state.set(own, "relaxation_parameter", &Value::Char(SmolStr::new(relaxation)))?;
        }
        for (key, _) in par.iter() {
            let known = KEYS.iter().any(|(k, _, _)| *k == key)
                || key == "map_model"
                || key == "relaxation parameter";
            if !known {
                tracing::debug!(key, "ignoring parameter file entry");
            }
        }
        state.subiteration_num = state.start_subiteration_num;
        Ok(state)
    }

    pub(crate) fn lineage(&self) -> &'static [&'static str] {
        match self.algorithm {
            Algorithm::Osmaposl { .. } => &["Reconstruction", "IterativeReconstruction", "OSMAPOSL"],
            Algorithm::Ossps { .. } => &["Reconstruction", "IterativeReconstruction", "OSSPS"],
        }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.subiteration_num > self.num_subiterations
    }

    pub(crate) fn set(&mut self, class: &str, name: &str, value: &Value) -> FaultResult<bool> {
        let own = self.algorithm.name();
        match (class, name) {
            ("Reconstruction", "output_filename_prefix") => {
                self.output_filename_prefix = value.as_text()?;
            }
            ("IterativeReconstruction", "num_subsets") => {
                self.num_subsets = at_least(name, value.as_i32()?, 1)?;
            }
            ("IterativeReconstruction", "start_subset_num") => {
                self.start_subset_num = at_least(name, value.as_i32()?, 0)?;
            }
            ("IterativeReconstruction", "num_subiterations") => {
                self.num_subiterations = at_least(name, value.as_i32()?, 1)?;
            }
            ("IterativeReconstruction", "start_subiteration_num") => {
                self.start_subiteration_num = at_least(name, value.as_i32()?, 1)?;
            }
            ("IterativeReconstruction", "subiteration_num") => {
                self.subiteration_num = at_least(name, value.as_i32()?, 1)?;
            }
            ("IterativeReconstruction", "save_interval") => {
                self.save_interval = at_least(name, value.as_i32()?, 1)?;
            }
            ("IterativeReconstruction", "inter_iteration_filter_interval") => {
                self.inter_iteration_filter_interval = at_least(name, value.as_i32()?, 0)?;
            }
            ("IterativeReconstruction", "objective_function") => {
                self.objective = Some(linked(value, OBJECTIVE_FUNCTION)?);
            }
            ("IterativeReconstruction", "inter_iteration_filter_type") => {
                self.filter = Some(linked(value, DATA_PROCESSOR)?);
            }
            (c, "objective_function") if c == own => {
                self.objective = Some(linked(value, OBJECTIVE_FUNCTION)?);
            }
            (c, "MAP_model") if c == own => match &mut self.algorithm {
                Algorithm::Osmaposl { map_model } => {
                    let model = value.as_text()?;
                    if model != "additive" && model != "multiplicative" {
                        return Err(fault!(
                            "MAP_model must be 'additive' or 'multiplicative', got '{}'",
                            model
                        ));
                    }
                    *map_model = model;
                }
                Algorithm::Ossps { .. } => return Ok(false),
            },
            (c, "relaxation_parameter") if c == own => match &mut self.algorithm {
                Algorithm::Ossps {
                    relaxation_parameter,
                } => {
                    let v = value.as_f32()?;
                    if !(v >= 0.0) {
                        return Err(fault!("relaxation_parameter must not be negative, got {}", v));
                    }
                    *relaxation_parameter = v;
                }
                Algorithm::Osmaposl { .. } => return Ok(false),
            },
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub(crate) fn get(&self, class: &str, name: &str) -> FaultResult<Option<Value>> {
        let own = self.algorithm.name();
        let value = match (class, name) {
            ("Reconstruction", "output_filename_prefix") => Value::Char(self.output_filename_prefix.clone()),
            ("IterativeReconstruction", "num_subsets") => Value::Int(self.num_subsets),
            ("IterativeReconstruction", "start_subset_num") => Value::Int(self.start_subset_num),
            ("IterativeReconstruction", "num_subiterations") => Value::Int(self.num_subiterations),
            ("IterativeReconstruction", "start_subiteration_num") => Value::Int(self.start_subiteration_num),
            ("IterativeReconstruction", "subiteration_num") => Value::Int(self.subiteration_num),
            ("IterativeReconstruction", "save_interval") => Value::Int(self.save_interval),
            ("IterativeReconstruction", "inter_iteration_filter_interval") => {
                Value::Int(self.inter_iteration_filter_interval)
            }
            ("IterativeReconstruction", "objective_function") => link_value(&self.objective, name)?,
            ("IterativeReconstruction", "inter_iteration_filter_type") => link_value(&self.filter, name)?,
            (c, "objective_function") if c == own => link_value(&self.objective, name)?,
            (c, "MAP_model") if c == own => match &self.algorithm {
                Algorithm::Osmaposl { map_model } => Value::Char(map_model.clone()),
                Algorithm::Ossps { .. } => return Ok(None),
            },
            (c, "relaxation_parameter") if c == own => match &self.algorithm {
                Algorithm::Ossps {
                    relaxation_parameter,
                } => Value::Float(*relaxation_parameter),
                Algorithm::Osmaposl { .. } => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    pub(crate) fn set_up(&mut self, target: &ImageData) -> FaultResult<()> {
        let objective = self
            .objective
            .as_ref()
            .ok_or_else(|| fault!("{}: no objective function set", self.algorithm.name()))?;
        if self.start_subset_num >= self.num_subsets {
            return Err(fault!(
                "start_subset_num {} is out of range for {} subsets",
                self.start_subset_num,
                self.num_subsets
            ));
        }
        if target.values.is_empty() {
            return Err(fault!("target image is empty"));
        }
        match &mut *borrow_mut(objective)? {
            EngineObject::Objective(o) => o.set_up()?,
            other => return Err(fault!("objective function is a {}", other.class_name())),
        }
        self.subiteration_num = self.start_subiteration_num;
        self.saved_estimates.clear();
        self.is_set_up = true;
        Ok(())
    }

    pub(crate) fn update(&mut self, image: &mut ImageData) -> FaultResult<UpdateReport> {
        if !self.is_set_up {
            return Err(fault!(
                "{}: reconstruction has not been set up",
                self.algorithm.name()
            ));
        }
        let n = self.subiteration_num;
        let next = n
            .checked_add(1)
            .ok_or_else(|| fault!("subiteration counter overflow at {}", n))?;
        let subset = (i64::from(self.start_subset_num) + i64::from(n) - i64::from(self.start_subiteration_num))
            .rem_euclid(i64::from(self.num_subsets)) as i32;

        let mut filtered = false;
        let interval = self.inter_iteration_filter_interval;
        if interval > 0 && n % interval == 0 {
            if let Some(filter) = &self.filter {
                match &*borrow(filter)? {
                    EngineObject::Processor(p) => p.apply(image),
                    other => return Err(fault!("inter-iteration filter is a {}", other.class_name())),
                }
                filtered = true;
            }
        }

        let saved = if n % self.save_interval == 0 || n == self.num_subiterations {
            let name = SmolStr::new(format!("{}_{}", self.output_filename_prefix, n));
            self.saved_estimates.push(name.clone());
            Some(name)
        } else {
            None
        };

        self.subiteration_num = next;
        Ok(UpdateReport {
            subiteration: n,
            subset,
            filtered,
            saved,
        })
    }
}

fn at_least(name: &str, value: i32, min: i32) -> FaultResult<i32> {
    if value < min {
        Err(fault!("{} must be at least {}, got {}", name, min, value))
    } else {
        Ok(value)
    }
}
