//! The Engine Interface
//!
//! Everything the bridge may ask of the native reconstruction engine.
//!
//! ## Conventions
//!
//! - Every call that can fail returns a data [`Handle`] whose execution
//!   status must be inspected with [`Engine::execution_status`] and which
//!   must be released with [`Engine::delete_data_handle`] once done.
//! - Objects are addressed by the data handle returned from their
//!   construction call, paired with a class name at every parameter call.
//! - Objects are deleted through the *declared base class* of their
//!   family (`"Prior"`, `"Reconstruction"`, ...), not their concrete name.
//! - No call takes a lock. Calls against one handle must be serialized by
//!   the caller.

use crate::handle::Handle;

/// Diagnostic channel receiving every message
pub const ALL_CHANNELS: i32 = -1;
/// Diagnostic channel for informational messages
pub const INFO_CHANNEL: i32 = 0;
/// Diagnostic channel for warnings
pub const WARNING_CHANNEL: i32 = 1;
/// Diagnostic channel for errors
pub const ERROR_CHANNEL: i32 = 2;

/// Native reconstruction engine, consumed through opaque handles.
pub trait Engine {
    // ------------------------------------------------------------------
    // Status inspection and disposal
    // ------------------------------------------------------------------

    /// Execution status of the call that produced `handle`; non-zero means failure
    fn execution_status(&self, handle: Handle) -> i32;

    /// Diagnostic text of a failed call
    fn execution_error(&self, handle: Handle) -> String;

    /// Source file where a failed call raised its error
    fn execution_error_file(&self, handle: Handle) -> String;

    /// Source line where a failed call raised its error
    fn execution_error_line(&self, handle: Handle) -> u32;

    /// Release a data handle. Objects it references survive while other
    /// handles still reference them.
    fn delete_data_handle(&self, handle: Handle);

    /// Create a new data handle aliasing the object behind `handle`
    fn ref_data_handle(&self, handle: Handle) -> Handle;

    // ------------------------------------------------------------------
    // Value boxing
    // ------------------------------------------------------------------

    fn char_data_handle(&self, value: &str) -> Handle;
    fn int_data_handle(&self, value: i32) -> Handle;
    fn float_data_handle(&self, value: f32) -> Handle;
    fn double_data_handle(&self, value: f64) -> Handle;

    fn char_data_from_handle(&self, handle: Handle) -> String;
    fn int_data_from_handle(&self, handle: Handle) -> i32;
    fn float_data_from_handle(&self, handle: Handle) -> f32;
    fn double_data_from_handle(&self, handle: Handle) -> f64;

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Construct an object of the named concrete class
    fn new_object(&self, class_name: &str) -> Handle;

    /// Destroy an object through its declared base class
    fn delete_object(&self, handle: Handle, base_class_name: &str) -> Handle;

    /// Construct a reconstruction algorithm, optionally from a parameter file
    /// (an empty path means defaults)
    fn new_reconstruction(&self, algorithm: &str, par_file: &str) -> Handle;

    /// Construct a voxel grid; `dims` is `[nx, ny, nz]`
    fn voxels_3df(&self, dims: [i32; 3], voxel_size: [f32; 3], origin: [f32; 3]) -> Handle;

    /// Construct a zero image over a voxel grid
    fn image_from_voxels(&self, voxels: Handle) -> Handle;

    /// Deep-copy an image
    fn image_from_image(&self, image: Handle) -> Handle;

    /// Load an image from an engine-native image file
    fn image_from_file(&self, path: &str) -> Handle;

    // ------------------------------------------------------------------
    // Parameters
    // ------------------------------------------------------------------

    /// Set a named parameter; `value` is a boxed scalar or an object handle
    fn set_parameter(&self, object: Handle, class_name: &str, name: &str, value: Handle) -> Handle;

    /// Read a named parameter as a boxed scalar or an alias to an object
    fn parameter(&self, object: Handle, class_name: &str, name: &str) -> Handle;

    // ------------------------------------------------------------------
    // Verbs
    // ------------------------------------------------------------------

    fn setup_object(&self, class_name: &str, object: Handle) -> Handle;
    fn setup_reconstruction(&self, reconstruction: Handle, image: Handle) -> Handle;
    fn run_reconstruction(&self, reconstruction: Handle, image: Handle) -> Handle;
    fn update_reconstruction(&self, reconstruction: Handle, image: Handle) -> Handle;
    fn apply_data_processor(&self, processor: Handle, image: Handle) -> Handle;
    fn fill_image(&self, image: Handle, value: f64) -> Handle;

    /// Rasterize `shape` into `image` with weight `scale`. `voxels` is the
    /// grid the image was built from, when the caller tracks one.
    fn add_shape(&self, image: Handle, voxels: Option<Handle>, shape: Handle, scale: f32) -> Handle;

    /// Difference metric between two images, boxed as a double
    fn images_difference(&self, first: Handle, second: Handle, rimsize: i32) -> Handle;

    /// Write the image dimensions as `[nz, ny, nx]`
    fn image_dimensions(&self, image: Handle, dims: &mut [i32; 3]) -> Handle;

    /// Write the image values in `(z, y, x)` order
    fn image_data(&self, image: Handle, data: &mut [f64]) -> Handle;

    // ------------------------------------------------------------------
    // Diagnostic channels
    // ------------------------------------------------------------------

    /// Printer bound to `stdout`, `stderr`, `cout` or `cerr`
    fn new_text_printer(&self, destination: &str) -> Handle;

    /// Printer writing to a file
    fn new_text_writer(&self, path: &str) -> Handle;

    fn open_channel(&self, channel: i32, printer: Handle) -> Handle;
    fn close_channel(&self, channel: i32, printer: Handle) -> Handle;
    fn delete_text_printer(&self, printer: Handle);
    fn delete_text_writer(&self, printer: Handle);
}
