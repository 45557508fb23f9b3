//! Typed access to the engine's named variables.
//!
//! A [`Marshaller`] is the exclusive handle on a session's engine: every
//! primitive writes to or reads from the engine namespace directly, nothing is
//! cached locally. Vectors travel as `N × 1` matrices and matrices are
//! transposed to column-major before they are sent.

use std::path::Path;
use std::sync::MutexGuard;

use ndarray::{Array1, Array2, ArrayBase, Data, Dimension, ShapeBuilder};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::protocol::{Engine, SciErr};
use crate::value::Value;

/// Exclusive, typed access to an engine namespace.
///
/// Obtained from [`Session::lock`](crate::session::Session::lock); the
/// session stays locked until the marshaller is dropped.
pub struct Marshaller<'a, E: Engine> {
    engine: MutexGuard<'a, E>,
}

impl<'a, E: Engine> Marshaller<'a, E> {
    pub(crate) fn new(engine: MutexGuard<'a, E>) -> Self {
        Marshaller { engine }
    }

    /// Create or overwrite a named 32-bit integer.
    pub fn create_int(&mut self, name: &str, value: i32) -> Result<()> {
        check_name(name)?;
        let code = self.engine.create_named_scalar_int32(name, value);
        if code != 0 {
            return Err(EngineError::foreign(name, code));
        }
        Ok(())
    }

    /// Create or overwrite a named double.
    pub fn create_double(&mut self, name: &str, value: f64) -> Result<()> {
        check_name(name)?;
        let code = self.engine.create_named_scalar_double(name, value);
        if code != 0 {
            return Err(EngineError::foreign(name, code));
        }
        Ok(())
    }

    /// Create a named vector of doubles, stored as a column.
    pub fn create_double_vector<S, D>(
        &mut self,
        name: &str,
        values: &ArrayBase<S, D>,
    ) -> Result<()>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        check_name(name)?;
        if values.ndim() != 1 {
            return Err(EngineError::Contract {
                detail: format!(
                    "variable '{name}' must be one-dimensional, got shape {:?}",
                    values.shape()
                ),
            });
        }
        let data: Vec<f64> = values.iter().copied().collect();
        let status = self
            .engine
            .create_named_matrix_of_double(name, data.len(), 1, &data);
        check_status(name, status)
    }

    /// Create a named matrix of doubles.
    pub fn create_double_matrix<S, D>(
        &mut self,
        name: &str,
        values: &ArrayBase<S, D>,
    ) -> Result<()>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        check_name(name)?;
        if values.ndim() != 2 {
            return Err(EngineError::Contract {
                detail: format!(
                    "variable '{name}' must be two-dimensional, got shape {:?}",
                    values.shape()
                ),
            });
        }
        let (rows, cols) = (values.shape()[0], values.shape()[1]);
        // Logical iteration over the transpose walks the source column by column.
        let column_major: Vec<f64> = values.t().iter().copied().collect();
        let status = self
            .engine
            .create_named_matrix_of_double(name, rows, cols, &column_major);
        check_status(name, status)
    }

    pub fn get_int(&mut self, name: &str) -> Result<i32> {
        check_name(name)?;
        self.engine
            .get_named_scalar_int32(name)
            .map_err(|code| EngineError::foreign(name, code))
    }

    pub fn get_double(&mut self, name: &str) -> Result<f64> {
        check_name(name)?;
        self.engine
            .get_named_scalar_double(name)
            .map_err(|code| EngineError::foreign(name, code))
    }

    /// Return `(rows, cols)` of a named variable.
    pub fn get_variable_dim(&mut self, name: &str) -> Result<(usize, usize)> {
        check_name(name)?;
        self.engine
            .get_named_var_dimension(name)
            .map_err(|status| sci_err(name, status))
    }

    /// Read a named matrix of doubles.
    ///
    /// A single-column variable comes back as [`Value::Vector`], anything else
    /// as [`Value::Matrix`].
    pub fn get_double_array(&mut self, name: &str) -> Result<Value> {
        let (rows, cols) = self.get_variable_dim(name)?;
        let data = self
            .engine
            .read_named_matrix_of_double(name, rows, cols)
            .map_err(|status| sci_err(name, status))?;

        if cols == 1 {
            if data.len() != rows {
                return Err(short_read(name, rows, cols, data.len()));
            }
            return Ok(Value::Vector(Array1::from_vec(data)));
        }

        let len = data.len();
        Array2::from_shape_vec((rows, cols).f(), data)
            .map(Value::Matrix)
            .map_err(|_| short_read(name, rows, cols, len))
    }

    /// Submit one line of Scilab for execution.
    pub fn run_command(&mut self, command: &str) -> Result<()> {
        debug!(command, "sending Scilab job");
        let code = self.engine.send_job(command);
        if code != 0 {
            return Err(EngineError::foreign(command, code));
        }
        Ok(())
    }

    /// Compile every function file of a directory in the engine (`getd`).
    pub fn load_functions(&mut self, directory: &Path) -> Result<()> {
        let quoted = directory.display().to_string().replace('\'', "''");
        self.run_command(&format!("getd('{quoted}');"))
    }

    /// Write a value with the primitive matching its tag.
    pub fn put(&mut self, name: &str, value: &Value) -> Result<()> {
        match value {
            Value::Int32(v) => self.create_int(name, *v),
            Value::Float64(v) => self.create_double(name, *v),
            Value::Vector(v) => self.create_double_vector(name, v),
            Value::Matrix(m) => self.create_double_matrix(name, m),
        }
    }

    /// Read a value without a declared type: `1 × 1` variables are read as
    /// doubles, everything else as arrays.
    pub fn get_value(&mut self, name: &str) -> Result<Value> {
        match self.get_variable_dim(name)? {
            (1, 1) => self.get_double(name).map(Value::Float64),
            _ => self.get_double_array(name),
        }
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('\0') {
        return Err(EngineError::Contract {
            detail: format!("invalid variable name {name:?}"),
        });
    }
    Ok(())
}

fn check_status(name: &str, status: SciErr) -> Result<()> {
    if status.is_err() {
        return Err(sci_err(name, status));
    }
    Ok(())
}

fn sci_err(name: &str, status: SciErr) -> EngineError {
    EngineError::ForeignCall {
        target: name.to_string(),
        code: status.code,
        messages: status.messages,
    }
}

fn short_read(name: &str, rows: usize, cols: usize, len: usize) -> EngineError {
    EngineError::Contract {
        detail: format!("variable '{name}' is {rows}x{cols} but {len} values were read"),
    }
}
