//! The engine wire protocol.
//!
//! Mirrors the `call_scilab` / `api_scilab` C entry points: every variable is
//! addressed by name in the engine's global namespace and every matrix travels
//! in column-major order.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Maximum number of messages kept on an engine error stack.
pub const MESSAGE_STACK_SIZE: usize = 5;

/// Error status returned by the matrix-level API calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SciErr {
    /// Zero on success.
    pub code: i32,
    /// Diagnostic messages, at most [`MESSAGE_STACK_SIZE`].
    pub messages: Vec<String>,
}

impl SciErr {
    /// A successful status.
    pub fn ok() -> Self {
        SciErr::default()
    }

    /// A failed status with a single message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        SciErr {
            code,
            messages: vec![message.into()],
        }
    }

    pub fn is_err(&self) -> bool {
        self.code != 0
    }
}

/// Arguments of `StartScilab`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOptions {
    /// Scilab home directory (the `SCI` path).
    pub sci_path: PathBuf,
    /// Inline startup script; `None` runs the default startup.
    #[serde(default)]
    pub startup_script: Option<String>,
    /// Stack size, 0 for the engine default.
    #[serde(default)]
    pub stack_size: i32,
}

/// Low-level access to one Scilab engine.
///
/// Implementations report failures the way the C API does: plain status codes
/// for scalar calls and [`SciErr`] for matrix calls. The [`Marshaller`]
/// turns those into typed errors.
///
/// [`Marshaller`]: crate::marshal::Marshaller
pub trait Engine: Send {
    /// Start the engine. Returns `false` on failure.
    fn start(&mut self, options: &StartOptions) -> bool;

    /// Stop the engine. Returns `false` on failure.
    fn terminate(&mut self, quit_script: Option<&str>) -> bool;

    /// Execute one line of Scilab. Returns the engine error code.
    fn send_job(&mut self, job: &str) -> i32;

    fn create_named_scalar_int32(&mut self, name: &str, value: i32) -> i32;

    fn create_named_scalar_double(&mut self, name: &str, value: f64) -> i32;

    /// Create a `rows × cols` matrix from column-major data.
    fn create_named_matrix_of_double(
        &mut self,
        name: &str,
        rows: usize,
        cols: usize,
        column_major: &[f64],
    ) -> SciErr;

    /// Return `(rows, cols)` of a named variable.
    fn get_named_var_dimension(&mut self, name: &str) -> Result<(usize, usize), SciErr>;

    fn get_named_scalar_int32(&mut self, name: &str) -> Result<i32, i32>;

    fn get_named_scalar_double(&mut self, name: &str) -> Result<f64, i32>;

    /// Read a `rows × cols` matrix as column-major data.
    fn read_named_matrix_of_double(
        &mut self,
        name: &str,
        rows: usize,
        cols: usize,
    ) -> Result<Vec<f64>, SciErr>;
}
