//! # STIR Engine Boundary
//!
//! The native side of the reconstruction bridge, seen through the narrow
//! interface the bridge is allowed to use.
//!
//! ## Overview
//!
//! Every engine call returns a [`Handle`] to a *data handle*: a slot that
//! carries an execution status and, on success, an optional payload (a
//! boxed scalar or a reference to an engine object). Callers inspect the
//! status, extract the payload, and release the data handle.
//!
//! This crate provides:
//! - [`Handle`]: opaque, untyped reference to a data handle
//! - [`Engine`]: construction, parameter, verb, status and diagnostic APIs
//! - [`MemoryEngine`]: an in-process reference engine backed by a handle
//!   table, used to drive the bridge end to end
//! - [`Fault`]: engine-side failure with the raise-site file and line
//!
//! The reference engine stores objects and answers parameters, rasterizes
//! shapes, compares and truncates images and steps the reconstruction stage
//! machine. It performs no projection and no iterative update arithmetic.
//!
//! ## Module Structure
//!
//! - [`handle`]: the opaque handle type
//! - [`engine`]: the `Engine` trait
//! - [`fault`]: engine-side error values
//! - [`memory`]: the reference engine

#[macro_use]
pub mod fault;

pub mod engine;
pub mod handle;
pub mod memory;

pub use engine::{Engine, ALL_CHANNELS, ERROR_CHANNEL, INFO_CHANNEL, WARNING_CHANNEL};
pub use fault::{Fault, FaultResult};
pub use handle::Handle;
pub use memory::{ImageFile, MemoryEngine};
