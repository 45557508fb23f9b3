//! An in-process engine honouring the named-variable protocol.
//!
//! Variables are kept as column-major matrices exactly as the native API
//! stores them. Scilab functions are stood in for by Rust closures registered
//! under a name; the engine understands invocation lines
//! (`[a,b]=f(x,y);`, `a=f(x);`), `getd('dir');` and `clear`.

use std::collections::HashMap;

use ndarray::{Array1, Array2, ShapeBuilder};

use crate::protocol::{Engine, SciErr, StartOptions};
use crate::value::Value;

/// Error code for a command the engine cannot parse.
pub const INVALID_COMMAND: i32 = 2;
/// Error code for an undefined variable or function.
pub const UNDEFINED: i32 = 4;
/// Error code for a call with the wrong number of outputs.
pub const WRONG_OUTPUT_COUNT: i32 = 59;
/// Error code for a typed read of a variable holding another type.
pub const WRONG_TYPE: i32 = 999;
/// Error code for any call made outside a started engine.
pub const NOT_RUNNING: i32 = -1;

type Function = Box<dyn Fn(&[Value]) -> Vec<Value> + Send>;

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
    integer: bool,
}

/// Engine backed by an in-memory namespace.
#[derive(Default)]
pub struct MemoryEngine {
    running: bool,
    variables: HashMap<String, Slot>,
    functions: HashMap<String, Function>,
    jobs: Vec<String>,
    loaded: Vec<String>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function callable from invocation commands.
    pub fn register_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[Value]) -> Vec<Value> + Send + 'static,
    {
        self.functions.insert(name.to_string(), Box::new(function));
    }

    /// Builder form of [`register_function`](Self::register_function).
    pub fn with_function<F>(mut self, name: &str, function: F) -> Self
    where
        F: Fn(&[Value]) -> Vec<Value> + Send + 'static,
    {
        self.register_function(name, function);
        self
    }

    /// Every job sent so far, in order.
    pub fn jobs(&self) -> &[String] {
        &self.jobs
    }

    /// Directories passed to `getd`, in order.
    pub fn loaded_directories(&self) -> &[String] {
        &self.loaded
    }

    /// Column-major contents of a variable.
    pub fn raw_data(&self, name: &str) -> Option<Vec<f64>> {
        self.variables.get(name).map(|slot| slot.data.clone())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn store(&mut self, name: &str, value: &Value) {
        let slot = match value {
            Value::Int32(v) => Slot { rows: 1, cols: 1, data: vec![f64::from(*v)], integer: true },
            Value::Float64(v) => Slot { rows: 1, cols: 1, data: vec![*v], integer: false },
            Value::Vector(v) => Slot {
                rows: v.len(),
                cols: 1,
                data: v.to_vec(),
                integer: false,
            },
            Value::Matrix(m) => Slot {
                rows: m.nrows(),
                cols: m.ncols(),
                data: m.t().iter().copied().collect(),
                integer: false,
            },
        };
        self.variables.insert(name.to_string(), slot);
    }

    fn load(&self, name: &str) -> Option<Value> {
        let slot = self.variables.get(name)?;
        let value = match (slot.rows, slot.cols) {
            (1, 1) if slot.integer => Value::Int32(slot.data[0] as i32),
            (1, 1) => Value::Float64(slot.data[0]),
            (_, 1) => Value::Vector(Array1::from_vec(slot.data.clone())),
            (rows, cols) => Value::Matrix(
                Array2::from_shape_vec((rows, cols).f(), slot.data.clone()).ok()?,
            ),
        };
        Some(value)
    }

    /// A numeric literal, or the variable named by `token`.
    fn argument(&self, token: &str) -> Option<Value> {
        if token.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '.' | '+' | '-')) {
            return token.parse::<f64>().ok().map(Value::Float64);
        }
        self.load(token)
    }

    fn execute(&mut self, job: &str) -> i32 {
        let raw = job.trim().trim_end_matches(';').trim();

        if let Some(rest) = raw.strip_prefix("getd(") {
            let path = rest
                .strip_suffix(')')
                .map(str::trim)
                .and_then(|quoted| quoted.strip_prefix('\''))
                .and_then(|quoted| quoted.strip_suffix('\''));
            return match path {
                Some(path) => {
                    self.loaded.push(path.replace("''", "'"));
                    0
                }
                None => INVALID_COMMAND,
            };
        }

        if raw == "clear" {
            self.variables.clear();
            return 0;
        }
        if let Some(names) = raw.strip_prefix("clear ") {
            for name in names.split_whitespace() {
                self.variables.remove(name);
            }
            return 0;
        }

        let line: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        self.invoke(&line)
    }

    fn invoke(&mut self, line: &str) -> i32 {
        let Some((lhs, rhs)) = line.split_once('=') else {
            return INVALID_COMMAND;
        };
        let outputs: Vec<&str> = lhs
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .filter(|s| !s.is_empty())
            .collect();
        let Some((name, rest)) = rhs.split_once('(') else {
            return INVALID_COMMAND;
        };
        let Some(args) = rest.strip_suffix(')') else {
            return INVALID_COMMAND;
        };

        let mut inputs = Vec::new();
        for token in args.split(',').filter(|s| !s.is_empty()) {
            match self.argument(token) {
                Some(value) => inputs.push(value),
                None => return UNDEFINED,
            }
        }

        let Some(function) = self.functions.get(name) else {
            return UNDEFINED;
        };
        let results = function(&inputs);
        if results.len() < outputs.len() {
            return WRONG_OUTPUT_COUNT;
        }
        for (output, value) in outputs.iter().zip(results.iter()) {
            self.store(output, value);
        }
        0
    }
}

impl Engine for MemoryEngine {
    fn start(&mut self, _options: &StartOptions) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    fn terminate(&mut self, _quit_script: Option<&str>) -> bool {
        let was_running = self.running;
        self.running = false;
        self.variables.clear();
        was_running
    }

    fn send_job(&mut self, job: &str) -> i32 {
        if !self.running {
            return NOT_RUNNING;
        }
        self.jobs.push(job.to_string());
        self.execute(job)
    }

    fn create_named_scalar_int32(&mut self, name: &str, value: i32) -> i32 {
        if !self.running {
            return NOT_RUNNING;
        }
        self.store(name, &Value::Int32(value));
        0
    }

    fn create_named_scalar_double(&mut self, name: &str, value: f64) -> i32 {
        if !self.running {
            return NOT_RUNNING;
        }
        self.store(name, &Value::Float64(value));
        0
    }

    fn create_named_matrix_of_double(
        &mut self,
        name: &str,
        rows: usize,
        cols: usize,
        column_major: &[f64],
    ) -> SciErr {
        if !self.running {
            return SciErr::new(NOT_RUNNING, "engine is not running");
        }
        if column_major.len() != rows * cols {
            return SciErr::new(
                INVALID_COMMAND,
                format!("{name}: {} values for a {rows}x{cols} matrix", column_major.len()),
            );
        }
        self.variables.insert(
            name.to_string(),
            Slot {
                rows,
                cols,
                data: column_major.to_vec(),
                integer: false,
            },
        );
        SciErr::ok()
    }

    fn get_named_var_dimension(&mut self, name: &str) -> Result<(usize, usize), SciErr> {
        if !self.running {
            return Err(SciErr::new(NOT_RUNNING, "engine is not running"));
        }
        self.variables
            .get(name)
            .map(|slot| (slot.rows, slot.cols))
            .ok_or_else(|| SciErr::new(UNDEFINED, format!("Undefined variable: {name}")))
    }

    fn get_named_scalar_int32(&mut self, name: &str) -> Result<i32, i32> {
        if !self.running {
            return Err(NOT_RUNNING);
        }
        match self.variables.get(name) {
            Some(slot) if slot.integer => Ok(slot.data[0] as i32),
            Some(_) => Err(WRONG_TYPE),
            None => Err(UNDEFINED),
        }
    }

    fn get_named_scalar_double(&mut self, name: &str) -> Result<f64, i32> {
        if !self.running {
            return Err(NOT_RUNNING);
        }
        match self.variables.get(name) {
            Some(slot) if !slot.integer && slot.rows == 1 && slot.cols == 1 => Ok(slot.data[0]),
            Some(_) => Err(WRONG_TYPE),
            None => Err(UNDEFINED),
        }
    }

    fn read_named_matrix_of_double(
        &mut self,
        name: &str,
        rows: usize,
        cols: usize,
    ) -> Result<Vec<f64>, SciErr> {
        if !self.running {
            return Err(SciErr::new(NOT_RUNNING, "engine is not running"));
        }
        match self.variables.get(name) {
            Some(slot) if slot.integer => Err(SciErr::new(
                WRONG_TYPE,
                format!("{name}: not a matrix of doubles"),
            )),
            Some(slot) if slot.rows == rows && slot.cols == cols => Ok(slot.data.clone()),
            Some(slot) => Err(SciErr::new(
                WRONG_TYPE,
                format!("{name}: is {}x{}, not {rows}x{cols}", slot.rows, slot.cols),
            )),
            None => Err(SciErr::new(UNDEFINED, format!("Undefined variable: {name}"))),
        }
    }
}
