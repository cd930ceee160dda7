//! # Reference Engine
//!
//! [`MemoryEngine`] keeps every data handle in a table keyed by handle id.
//! A slot holds either the payload of a successful call or the [`Fault`]
//! of a failed one.
//!
//! Objects live behind shared pointers: a data handle obtained by
//! [`Engine::ref_data_handle`] or by reading a handle-valued parameter
//! aliases the same object, keeps it alive after the creating handle is
//! deleted, and sees every mutation made through any other alias.
//!
//! ## Module Structure
//!
//! - `value`: handle payloads
//! - `objects`: engine object classes and parameter dispatch
//! - `image`: voxel grids and image operations
//! - `reconstruction`: the reconstruction stage machine
//! - `parfile`: reconstruction parameter files
//! - `channels`: diagnostic printers and channels

mod channels;
mod image;
mod objects;
mod parfile;
mod reconstruction;
mod value;

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::engine::{Engine, ERROR_CHANNEL, INFO_CHANNEL};
use crate::fault::{Fault, FaultResult};
use crate::handle::Handle;

use channels::{Channels, Printer};
use image::{Geometry, ImageData};
use objects::EngineObject;
use reconstruction::ReconState;
use value::{borrow, borrow_mut, Shared, Value};

// ============================================================================
// Image files
// ============================================================================

/// Contents of an image file served by [`MemoryEngine::image_from_file`]
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    /// Grid dimensions `[nx, ny, nz]`
    pub dims: [i32; 3],
    pub voxel_size: [f32; 3],
    pub origin: [f32; 3],
    /// Voxel values in `(z, y, x)` order
    pub values: Vec<f32>,
}

impl ImageFile {
    /// An image file whose every voxel holds `value`
    pub fn filled(dims: [i32; 3], voxel_size: [f32; 3], origin: [f32; 3], value: f32) -> Self {
        let len = dims.iter().map(|&n| n.max(0) as usize).product();
        ImageFile {
            dims,
            voxel_size,
            origin,
            values: vec![value; len],
        }
    }
}

// ============================================================================
// MemoryEngine
// ============================================================================

#[derive(Debug)]
enum Slot {
    Done(Option<Value>),
    Failed(Fault),
}

/// In-process engine backed by a handle table
#[derive(Debug)]
pub struct MemoryEngine {
    slots: RefCell<FxHashMap<u64, Slot>>,
    next_id: Cell<u64>,
    image_files: RefCell<FxHashMap<PathBuf, ImageFile>>,
    channels: Channels,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    pub fn new() -> Self {
        MemoryEngine {
            slots: RefCell::new(FxHashMap::default()),
            next_id: Cell::new(1),
            image_files: RefCell::new(FxHashMap::default()),
            channels: Channels::default(),
        }
    }

    /// Make `file` loadable through `image_from_file(path)`
    pub fn register_image_file(&self, path: impl Into<PathBuf>, file: ImageFile) {
        self.image_files.borrow_mut().insert(path.into(), file);
    }

    /// Number of data handles not yet released
    pub fn live_handles(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Number of open `(channel, printer)` pairs
    pub fn open_channels(&self) -> usize {
        self.channels.len()
    }

    fn issue(&self, result: FaultResult<Option<Value>>) -> Handle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let slot = match result {
            Ok(value) => Slot::Done(value),
            Err(fault) => {
                debug!(handle = id, file = fault.file, line = fault.line, "{}", fault.message);
                self.channels.emit(ERROR_CHANNEL, &fault.message);
                Slot::Failed(fault)
            }
        };
        self.slots.borrow_mut().insert(id, slot);
        Handle::from_raw(id)
    }

    fn done(&self, result: FaultResult<()>) -> Handle {
        self.issue(result.map(|()| None))
    }

    fn new_shared(&self, result: FaultResult<EngineObject>) -> Handle {
        self.issue(result.map(|object| {
            trace!(class = object.class_name(), "created object");
            Some(Value::Object(Rc::new(RefCell::new(object))))
        }))
    }

    fn fault_of(&self, handle: Handle) -> Option<Fault> {
        match self.slots.borrow().get(&handle.raw()) {
            Some(Slot::Done(_)) => None,
            Some(Slot::Failed(fault)) => Some(fault.clone()),
            None => Some(fault!("unknown data handle {}", handle)),
        }
    }

    fn payload(&self, handle: Handle) -> FaultResult<Value> {
        match self.slots.borrow().get(&handle.raw()) {
            Some(Slot::Done(Some(value))) => Ok(value.clone()),
            Some(Slot::Done(None)) => Err(fault!("data handle {} carries no value", handle)),
            Some(Slot::Failed(_)) => Err(fault!("data handle {} holds a failed call", handle)),
            None => Err(fault!("unknown data handle {}", handle)),
        }
    }

    fn object(&self, handle: Handle) -> FaultResult<Shared> {
        self.payload(handle)?.as_object()
    }

    fn printer(&self, handle: Handle) -> FaultResult<Rc<Printer>> {
        match self.payload(handle)? {
            Value::Printer(printer) => Ok(printer),
            other => Err(fault!("expected a printer, got {}", other.kind())),
        }
    }

    fn release_printer(&self, printer: Handle) {
        self.channels.forget(printer.raw());
        self.slots.borrow_mut().remove(&printer.raw());
    }

    fn info(&self, message: &str) {
        trace!("{}", message);
        self.channels.emit(INFO_CHANNEL, message);
    }

    // ------------------------------------------------------------------
    // Verbs
    // ------------------------------------------------------------------

    fn do_delete_object(&self, handle: Handle, base_class_name: &str) -> FaultResult<()> {
        let object = self.object(handle)?;
        let family = borrow(&object)?.family();
        if family != base_class_name {
            return Err(fault!(
                "cannot delete a {} object through base class {}",
                family,
                base_class_name
            ));
        }
        self.slots.borrow_mut().remove(&handle.raw());
        Ok(())
    }

    fn do_new_reconstruction(&self, algorithm: &str, par_file: &str) -> FaultResult<EngineObject> {
        let state = if par_file.is_empty() {
            ReconState::new(algorithm)?
        } else {
            ReconState::from_par_file(algorithm, Path::new(par_file))?
        };
        Ok(EngineObject::Reconstruction(state))
    }

    fn do_image_from_voxels(&self, voxels: Handle) -> FaultResult<EngineObject> {
        let voxels = self.object(voxels)?;
        let image = match &*borrow(&voxels)? {
            EngineObject::Voxels(geometry) => ImageData::zeros(geometry.clone()),
            other => return Err(fault!("expected Voxels, got a {}", other.class_name())),
        };
        Ok(EngineObject::Image(image))
    }

    fn do_image_from_image(&self, image: Handle) -> FaultResult<EngineObject> {
        let image = self.object(image)?;
        let copy = as_image(&*borrow(&image)?)?.clone();
        Ok(EngineObject::Image(copy))
    }

    fn do_image_from_file(&self, path: &str) -> FaultResult<EngineObject> {
        let files = self.image_files.borrow();
        let file = files
            .get(Path::new(path))
            .ok_or_else(|| fault!("cannot read image file {}: unknown file format", path))?;
        let geometry = Geometry::new(file.dims, file.voxel_size, file.origin)?;
        Ok(EngineObject::Image(ImageData::from_values(geometry, file.values.clone())?))
    }

    fn do_set_parameter(&self, object: Handle, class_name: &str, name: &str, value: Handle) -> FaultResult<()> {
        let value = self.payload(value)?;
        let object = self.object(object)?;
        let mut object = borrow_mut(&object)?;
        object.set_parameter(class_name, name, &value)
    }

    fn do_parameter(&self, object: Handle, class_name: &str, name: &str) -> FaultResult<Value> {
        let object = self.object(object)?;
        let object = borrow(&object)?;
        object.parameter(class_name, name)
    }

    fn do_setup_object(&self, class_name: &str, object: Handle) -> FaultResult<()> {
        let object = self.object(object)?;
        let mut object = borrow_mut(&object)?;
        object.set_up(class_name)
    }

    fn do_setup_reconstruction(&self, reconstruction: Handle, image: Handle) -> FaultResult<()> {
        let reconstruction = self.object(reconstruction)?;
        let image = self.object(image)?;
        let image = borrow(&image)?;
        let mut reconstruction = borrow_mut(&reconstruction)?;
        let state = as_reconstruction(&mut reconstruction)?;
        state.set_up(as_image(&image)?)?;
        self.info(&format!("{}: set-up complete", state.algorithm.name()));
        Ok(())
    }

    fn do_update_reconstruction(&self, reconstruction: Handle, image: Handle, until_finished: bool) -> FaultResult<()> {
        let reconstruction = self.object(reconstruction)?;
        let image = self.object(image)?;
        let mut image = borrow_mut(&image)?;
        let image = as_image_mut(&mut image)?;
        let mut reconstruction = borrow_mut(&reconstruction)?;
        let state = as_reconstruction(&mut reconstruction)?;
        loop {
            if until_finished && state.is_finished() {
                break;
            }
            let report = state.update(image)?;
            self.info(&format!(
                "{}: subiteration {} (subset {})",
                state.algorithm.name(),
                report.subiteration,
                report.subset
            ));
            if report.filtered {
                self.info("applied inter-iteration filter");
            }
            if let Some(name) = &report.saved {
                self.info(&format!("saved estimate {}", name));
            }
            if !until_finished {
                break;
            }
        }
        Ok(())
    }

    fn do_apply_data_processor(&self, processor: Handle, image: Handle) -> FaultResult<()> {
        let processor = self.object(processor)?;
        let image = self.object(image)?;
        let processor = borrow(&processor)?;
        let mut image = borrow_mut(&image)?;
        match &*processor {
            EngineObject::Processor(p) => {
                p.apply(as_image_mut(&mut image)?);
                Ok(())
            }
            other => Err(fault!("expected a DataProcessor, got a {}", other.class_name())),
        }
    }

    fn do_fill_image(&self, image: Handle, value: f64) -> FaultResult<()> {
        let image = self.object(image)?;
        let mut image = borrow_mut(&image)?;
        as_image_mut(&mut image)?.fill(value as f32);
        Ok(())
    }

    fn do_add_shape(&self, image: Handle, voxels: Option<Handle>, shape: Handle, scale: f32) -> FaultResult<()> {
        let shape = self.object(shape)?;
        let cylinder = match &*borrow(&shape)? {
            EngineObject::Shape(cylinder) => cylinder.clone(),
            other => return Err(fault!("expected a Shape, got a {}", other.class_name())),
        };
        let image = self.object(image)?;
        let mut image = borrow_mut(&image)?;
        let data = as_image_mut(&mut image)?;
        if let Some(voxels) = voxels {
            let voxels = self.object(voxels)?;
            let grid = borrow(&voxels)?;
            match &*grid {
                EngineObject::Voxels(grid) if *grid == data.geometry => {}
                EngineObject::Voxels(_) => return Err(fault!("voxel grid does not match the image")),
                other => return Err(fault!("expected Voxels, got a {}", other.class_name())),
            }
        }
        data.add_cylinder(&cylinder, scale)
    }

    fn do_images_difference(&self, first: Handle, second: Handle, rimsize: i32) -> FaultResult<f64> {
        let first = self.object(first)?;
        let second = self.object(second)?;
        let first = borrow(&first)?;
        let second = borrow(&second)?;
        as_image(&first)?.max_abs_difference(as_image(&second)?, rimsize)
    }

    fn do_image_dimensions(&self, image: Handle, dims: &mut [i32; 3]) -> FaultResult<()> {
        let image = self.object(image)?;
        let image = borrow(&image)?;
        *dims = as_image(&image)?.geometry.reported_dims();
        Ok(())
    }

    fn do_image_data(&self, image: Handle, data: &mut [f64]) -> FaultResult<()> {
        let image = self.object(image)?;
        let image = borrow(&image)?;
        as_image(&image)?.write_values(data)
    }
}

fn as_image(object: &EngineObject) -> FaultResult<&ImageData> {
    match object {
        EngineObject::Image(data) => Ok(data),
        other => Err(fault!("expected an Image, got a {}", other.class_name())),
    }
}

fn as_image_mut(object: &mut EngineObject) -> FaultResult<&mut ImageData> {
    match object {
        EngineObject::Image(data) => Ok(data),
        other => Err(fault!("expected an Image, got a {}", other.class_name())),
    }
}

fn as_reconstruction(object: &mut EngineObject) -> FaultResult<&mut ReconState> {
    match object {
        EngineObject::Reconstruction(state) => Ok(state),
        other => Err(fault!("expected a Reconstruction, got a {}", other.class_name())),
    }
}

// ============================================================================
// Engine implementation
// ============================================================================

impl Engine for MemoryEngine {
    fn execution_status(&self, handle: Handle) -> i32 {
        i32::from(self.fault_of(handle).is_some())
    }

    fn execution_error(&self, handle: Handle) -> String {
        self.fault_of(handle).map(|f| f.message).unwrap_or_default()
    }

    fn execution_error_file(&self, handle: Handle) -> String {
        self.fault_of(handle).map(|f| f.file.to_string()).unwrap_or_default()
    }

    fn execution_error_line(&self, handle: Handle) -> u32 {
        self.fault_of(handle).map_or(0, |f| f.line)
    }

    fn delete_data_handle(&self, handle: Handle) {
        self.slots.borrow_mut().remove(&handle.raw());
    }

    fn ref_data_handle(&self, handle: Handle) -> Handle {
        self.issue(self.object(handle).map(|object| Some(Value::Object(object))))
    }

    fn char_data_handle(&self, value: &str) -> Handle {
        self.issue(Ok(Some(Value::Char(value.into()))))
    }

    fn int_data_handle(&self, value: i32) -> Handle {
        self.issue(Ok(Some(Value::Int(value))))
    }

    fn float_data_handle(&self, value: f32) -> Handle {
        self.issue(Ok(Some(Value::Float(value))))
    }

    fn double_data_handle(&self, value: f64) -> Handle {
        self.issue(Ok(Some(Value::Double(value))))
    }

    fn char_data_from_handle(&self, handle: Handle) -> String {
        match self.payload(handle) {
            Ok(Value::Char(s)) => s.to_string(),
            Ok(Value::Int(v)) => v.to_string(),
            Ok(Value::Float(v)) => v.to_string(),
            Ok(Value::Double(v)) => v.to_string(),
            _ => String::new(),
        }
    }

    fn int_data_from_handle(&self, handle: Handle) -> i32 {
        self.payload(handle).and_then(|v| v.as_i32()).unwrap_or_default()
    }

    fn float_data_from_handle(&self, handle: Handle) -> f32 {
        self.payload(handle).and_then(|v| v.as_f32()).unwrap_or_default()
    }

    fn double_data_from_handle(&self, handle: Handle) -> f64 {
        match self.payload(handle) {
            Ok(Value::Double(v)) => v,
            Ok(other) => other.as_f32().map(f64::from).unwrap_or_default(),
            Err(_) => 0.0,
        }
    }

    fn new_object(&self, class_name: &str) -> Handle {
        self.new_shared(EngineObject::create(class_name))
    }

    fn delete_object(&self, handle: Handle, base_class_name: &str) -> Handle {
        self.done(self.do_delete_object(handle, base_class_name))
    }

    fn new_reconstruction(&self, algorithm: &str, par_file: &str) -> Handle {
        self.new_shared(self.do_new_reconstruction(algorithm, par_file))
    }

    fn voxels_3df(&self, dims: [i32; 3], voxel_size: [f32; 3], origin: [f32; 3]) -> Handle {
        self.new_shared(Geometry::new(dims, voxel_size, origin).map(EngineObject::Voxels))
    }

    fn image_from_voxels(&self, voxels: Handle) -> Handle {
        self.new_shared(self.do_image_from_voxels(voxels))
    }

    fn image_from_image(&self, image: Handle) -> Handle {
        self.new_shared(self.do_image_from_image(image))
    }

    fn image_from_file(&self, path: &str) -> Handle {
        self.new_shared(self.do_image_from_file(path))
    }

    fn set_parameter(&self, object: Handle, class_name: &str, name: &str, value: Handle) -> Handle {
        self.done(self.do_set_parameter(object, class_name, name, value))
    }

    fn parameter(&self, object: Handle, class_name: &str, name: &str) -> Handle {
        self.issue(self.do_parameter(object, class_name, name).map(Some))
    }

    fn setup_object(&self, class_name: &str, object: Handle) -> Handle {
        self.done(self.do_setup_object(class_name, object))
    }

    fn setup_reconstruction(&self, reconstruction: Handle, image: Handle) -> Handle {
        self.done(self.do_setup_reconstruction(reconstruction, image))
    }

    fn run_reconstruction(&self, reconstruction: Handle, image: Handle) -> Handle {
        self.done(self.do_update_reconstruction(reconstruction, image, true))
    }

    fn update_reconstruction(&self, reconstruction: Handle, image: Handle) -> Handle {
        self.done(self.do_update_reconstruction(reconstruction, image, false))
    }

    fn apply_data_processor(&self, processor: Handle, image: Handle) -> Handle {
        self.done(self.do_apply_data_processor(processor, image))
    }

    fn fill_image(&self, image: Handle, value: f64) -> Handle {
        self.done(self.do_fill_image(image, value))
    }

    fn add_shape(&self, image: Handle, voxels: Option<Handle>, shape: Handle, scale: f32) -> Handle {
        self.done(self.do_add_shape(image, voxels, shape, scale))
    }

    fn images_difference(&self, first: Handle, second: Handle, rimsize: i32) -> Handle {
        self.issue(
            self.do_images_difference(first, second, rimsize)
                .map(|d| Some(Value::Double(d))),
        )
    }

    fn image_dimensions(&self, image: Handle, dims: &mut [i32; 3]) -> Handle {
        self.done(self.do_image_dimensions(image, dims))
    }

    fn image_data(&self, image: Handle, data: &mut [f64]) -> Handle {
        self.done(self.do_image_data(image, data))
    }

    fn new_text_printer(&self, destination: &str) -> Handle {
        self.issue(Printer::console(destination).map(|p| Some(Value::Printer(Rc::new(p)))))
    }

    fn new_text_writer(&self, path: &str) -> Handle {
        self.issue(Printer::file(Path::new(path)).map(|p| Some(Value::Printer(Rc::new(p)))))
    }

    fn open_channel(&self, channel: i32, printer: Handle) -> Handle {
        let result = self
            .printer(printer)
            .and_then(|p| self.channels.open(channel, printer.raw(), p));
        self.done(result)
    }

    fn close_channel(&self, channel: i32, printer: Handle) -> Handle {
        self.done(self.channels.close(channel, printer.raw()))
    }

    fn delete_text_printer(&self, printer: Handle) {
        self.release_printer(printer);
    }

    fn delete_text_writer(&self, printer: Handle) {
        self.release_printer(printer);
    }
}
