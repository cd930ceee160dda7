//! # STIR Bridge
//!
//! A typed object model over the handle-based reconstruction engine.
//!
//! ## Overview
//!
//! The engine speaks in untyped data handles: every call hands back a slot
//! carrying a status and maybe a payload, and every slot must be released
//! exactly once. This crate wraps that protocol so callers work with
//! images, shapes, filters, priors, objectives and reconstructions instead.
//!
//! - Every engine call is checked; a failed status becomes an
//!   [`EngineError`] carrying the engine's message, line and file.
//! - Data handles live in [`status::Token`] values that release on drop.
//! - Entities either own their engine object ([`Owned`]) or alias one they
//!   read back from a composition link ([`Borrowed`]). Only owners delete.
//! - Parameters are addressed by typed [`Param`] and [`Link`] keys, so a
//!   value's type is fixed at compile time.
//! - Capabilities shared across entity kinds are traits:
//!   [`Parameterized`], [`SetUp`], [`Runnable`], [`DataProcessor`],
//!   [`ObjectiveFunction`], [`Prior`], [`IterativeReconstruction`].
//!
//! ## Module Structure
//!
//! - [`bridge`]: the session root and diagnostic sinks
//! - [`config`]: TOML configuration for sinks
//! - [`error`]: error types
//! - [`status`]: data-handle tokens and status checks
//! - [`ownership`]: owned and borrowed engine objects
//! - [`params`]: typed parameter keys and boxing
//! - [`capability`]: the traits every entity builds on
//! - [`density`]: host-side voxel arrays
//! - [`image`], [`shape`], [`processor`], [`projectors`], [`prior`],
//!   [`objective`], [`reconstruction`]: the entities

pub mod bridge;
pub mod capability;
pub mod config;
pub mod density;
pub mod error;
pub mod image;
pub mod objective;
pub mod ownership;
pub mod params;
pub mod prior;
pub mod processor;
pub mod projectors;
pub mod reconstruction;
pub mod shape;
pub mod status;

pub use bridge::{Bridge, DiagnosticSink};
pub use capability::{Parameterized, Runnable, SetUp};
pub use config::{BridgeConfig, Channel, SinkConfig};
pub use density::Density;
pub use error::{BridgeResult, ConfigError, EngineError};
pub use image::{Image, ImageGeometry, Rim, Voxels};
pub use objective::{
    ObjectiveFunction, ObjectiveFunctionRef, PoissonLinearModel, PoissonLogLikelihoodWithLinearModelForMeanAndProjData,
};
pub use ownership::{Borrowed, Family, ObjectHandle, Owned};
pub use params::{keys, Link, Param, ParamValue};
pub use prior::{Prior, PriorRef, QuadraticPrior};
pub use processor::{DataProcessor, DataProcessorRef, TruncateToCylindricalFovProcessor};
pub use projectors::{ProjectorsUsingMatrix, RayTracingMatrix};
pub use reconstruction::{IterativeReconstruction, OsmaposlReconstruction, OsspsReconstruction};
pub use shape::{EllipsoidalCylinder, Shape};

pub use stir_engine::Engine;
