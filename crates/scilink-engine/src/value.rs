//! Tagged values crossing the engine boundary.

use ndarray::{Array1, Array2, ArrayD, Ix1, Ix2};

use crate::error::{EngineError, Result};

/// A value together with the wire primitive used to transmit it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(i32),
    Float64(f64),
    /// Sent as an `N × 1` matrix.
    Vector(Array1<f64>),
    /// Sent as `R × C`, column-major.
    Matrix(Array2<f64>),
}

/// The wire kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int32,
    Float64,
    Vector,
    Matrix,
}

impl Value {
    /// Resolve a dynamic-rank array to a vector or a matrix.
    pub fn from_array(array: ArrayD<f64>) -> Result<Self> {
        match array.ndim() {
            1 => Ok(Value::Vector(
                array
                    .into_dimensionality::<Ix1>()
                    .map_err(|e| EngineError::Contract { detail: e.to_string() })?,
            )),
            2 => Ok(Value::Matrix(
                array
                    .into_dimensionality::<Ix2>()
                    .map_err(|e| EngineError::Contract { detail: e.to_string() })?,
            )),
            rank => Err(EngineError::UnsupportedShape { rank }),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int32(_) => ValueKind::Int32,
            Value::Float64(_) => ValueKind::Float64,
            Value::Vector(_) => ValueKind::Vector,
            Value::Matrix(_) => ValueKind::Matrix,
        }
    }

    /// Scalar view of the value, if it holds a single number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            Value::Vector(v) if v.len() == 1 => Some(v[0]),
            Value::Matrix(m) if m.len() == 1 => Some(m[[0, 0]]),
            _ => None,
        }
    }

    /// Convert array values back to a dynamic-rank array.
    pub fn into_array(self) -> Option<ArrayD<f64>> {
        match self {
            Value::Vector(v) => Some(v.into_dyn()),
            Value::Matrix(m) => Some(m.into_dyn()),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<Array1<f64>> for Value {
    fn from(v: Array1<f64>) -> Self {
        Value::Vector(v)
    }
}

impl From<Array2<f64>> for Value {
    fn from(v: Array2<f64>) -> Self {
        Value::Matrix(v)
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueKind::Int32 => write!(f, "int32"),
            ValueKind::Float64 => write!(f, "float64"),
            ValueKind::Vector => write!(f, "vector"),
            ValueKind::Matrix => write!(f, "matrix"),
        }
    }
}
