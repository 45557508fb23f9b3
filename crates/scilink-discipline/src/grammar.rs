//! Input/output grammars.
//!
//! A grammar declares, for each variable of one side of a discipline, the
//! type its values must have.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::error::{DisciplineError, Result};

/// Declared type of a grammar variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VarType {
    Int32,
    Float64,
    /// A vector or a matrix of doubles.
    Float64Array,
}

impl VarType {
    /// Whether a value can be stored under this type.
    ///
    /// A one-element array is accepted as a `float64`.
    pub fn accepts(&self, value: &DataValue) -> bool {
        match (self, value) {
            (VarType::Int32, DataValue::Int32(_)) => true,
            (VarType::Float64, DataValue::Float64(_)) => true,
            (VarType::Float64, DataValue::Array(a)) => a.len() == 1,
            (VarType::Float64Array, DataValue::Array(_)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for VarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarType::Int32 => write!(f, "int32"),
            VarType::Float64 => write!(f, "float64"),
            VarType::Float64Array => write!(f, "float64-array"),
        }
    }
}

/// A value held by a discipline.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Int32(i32),
    Float64(f64),
    Array(ArrayD<f64>),
}

impl DataValue {
    /// The type this value naturally has.
    pub fn var_type(&self) -> VarType {
        match self {
            DataValue::Int32(_) => VarType::Int32,
            DataValue::Float64(_) => VarType::Float64,
            DataValue::Array(_) => VarType::Float64Array,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Int32(v) => Some(f64::from(*v)),
            DataValue::Float64(v) => Some(*v),
            DataValue::Array(a) if a.len() == 1 => a.iter().next().copied(),
            DataValue::Array(_) => None,
        }
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        DataValue::Int32(v)
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Float64(v)
    }
}

impl<D: ndarray::Dimension> From<ndarray::Array<f64, D>> for DataValue {
    fn from(v: ndarray::Array<f64, D>) -> Self {
        DataValue::Array(v.into_dyn())
    }
}

/// Variable name → value.
pub type DataMap = BTreeMap<String, DataValue>;

/// Declared names and types of one side of a discipline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Grammar {
    pub name: String,
    #[serde(default)]
    pub names_to_types: BTreeMap<String, VarType>,
}

impl Grammar {
    pub fn new(name: impl Into<String>) -> Self {
        Grammar {
            name: name.into(),
            names_to_types: BTreeMap::new(),
        }
    }

    /// Build a grammar from `(name, type)` pairs.
    pub fn from_types<I, S>(name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = (S, VarType)>,
        S: Into<String>,
    {
        Grammar {
            name: name.into(),
            names_to_types: types.into_iter().map(|(n, t)| (n.into(), t)).collect(),
        }
    }

    /// Declare one more variable.
    pub fn with(mut self, name: impl Into<String>, var_type: VarType) -> Self {
        self.names_to_types.insert(name.into(), var_type);
        self
    }

    /// Declared names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names_to_types.keys().map(String::as_str)
    }

    pub fn name_set(&self) -> BTreeSet<&str> {
        self.names().collect()
    }

    pub fn get_type(&self, name: &str) -> Option<VarType> {
        self.names_to_types.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, VarType)> {
        self.names_to_types.iter().map(|(n, t)| (n.as_str(), *t))
    }

    pub fn len(&self) -> usize {
        self.names_to_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names_to_types.is_empty()
    }

    /// Check that every declared variable is present with an acceptable value.
    ///
    /// Extra entries in `data` are ignored.
    pub fn validate(&self, data: &DataMap) -> Result<()> {
        for (name, var_type) in self.iter() {
            let value = data.get(name).ok_or_else(|| DisciplineError::Contract {
                detail: format!("{}: missing variable '{name}'", self.name),
            })?;
            if !var_type.accepts(value) {
                return Err(DisciplineError::Contract {
                    detail: format!(
                        "{}: variable '{name}' is declared {var_type} but holds {}",
                        self.name,
                        value.var_type()
                    ),
                });
            }
        }
        Ok(())
    }
}
