//! Registered Scilab functions as Rust callables.
//!
//! A call writes every argument into the engine under its declared name,
//! submits one invocation line, and reads every output back. Outputs are read
//! without a declared type: `1 × 1` results come back as doubles and larger
//! results as arrays.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use scilink_engine::{Engine, Marshaller, Value};
use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::signature::FunctionSignature;

/// What a call returns: a bare value for one output, a tuple otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutput {
    Single(Value),
    /// Values in declared output order.
    Tuple(Vec<Value>),
}

impl CallOutput {
    /// All output values, in declared order.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            CallOutput::Single(value) => vec![value],
            CallOutput::Tuple(values) => values,
        }
    }
}

/// A Scilab function found in a script directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ScilabFunction {
    signature: FunctionSignature,
    source: PathBuf,
    invocation: String,
}

impl ScilabFunction {
    pub fn new(signature: FunctionSignature, source: PathBuf) -> Self {
        let invocation = signature.invocation();
        ScilabFunction {
            signature,
            source,
            invocation,
        }
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    /// Argument names, in declaration order.
    pub fn args(&self) -> &[String] {
        &self.signature.arguments
    }

    /// Output names, in declaration order.
    pub fn outs(&self) -> &[String] {
        &self.signature.outputs
    }

    /// The file the definition was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The line submitted to the engine on each call.
    pub fn invocation(&self) -> &str {
        &self.invocation
    }

    /// Call with positional arguments.
    pub fn call<E: Engine>(
        &self,
        marshaller: &mut Marshaller<'_, E>,
        args: &[Value],
    ) -> Result<CallOutput> {
        let expected = self.signature.arguments.len();
        if args.len() != expected {
            return Err(RegistryError::Arity {
                function: self.signature.name.clone(),
                detail: format!("expected {expected} arguments, got {}", args.len()),
            });
        }
        for (name, value) in self.signature.arguments.iter().zip(args) {
            marshaller.put(name, value)?;
        }
        self.invoke(marshaller)
    }

    /// Call with arguments keyed by name.
    pub fn call_named<E: Engine>(
        &self,
        marshaller: &mut Marshaller<'_, E>,
        args: &BTreeMap<String, Value>,
    ) -> Result<CallOutput> {
        if let Some(unknown) = args.keys().find(|k| !self.signature.arguments.contains(k)) {
            return Err(RegistryError::Arity {
                function: self.signature.name.clone(),
                detail: format!("unexpected argument '{unknown}'"),
            });
        }
        for name in &self.signature.arguments {
            let value = args.get(name).ok_or_else(|| RegistryError::Arity {
                function: self.signature.name.clone(),
                detail: format!("missing argument '{name}'"),
            })?;
            marshaller.put(name, value)?;
        }
        self.invoke(marshaller)
    }

    fn invoke<E: Engine>(&self, marshaller: &mut Marshaller<'_, E>) -> Result<CallOutput> {
        debug!(function = %self.signature.name, "calling Scilab function");
        marshaller.run_command(&self.invocation)?;

        let mut values = Vec::with_capacity(self.signature.outputs.len());
        for name in &self.signature.outputs {
            values.push(marshaller.get_value(name)?);
        }
        if values.len() == 1 {
            Ok(CallOutput::Single(values.remove(0)))
        } else {
            Ok(CallOutput::Tuple(values))
        }
    }
}
