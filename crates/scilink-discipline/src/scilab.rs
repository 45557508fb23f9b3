//! Scilab functions as disciplines.
//!
//! A [`ScilabDiscipline`] binds one function of a script directory to a pair
//! of grammars whose names must be exactly the function's arguments and
//! outputs. Execution writes every input by its declared type, submits the
//! invocation line and reads every output back by its declared type, all
//! under one session lock.

use std::path::Path;
use std::sync::Arc;

use scilink_engine::{Engine, Marshaller, Session, Value};
use scilink_registry::{Registry, ScilabFunction};
use tracing::{debug, error, info};

use crate::discipline::Discipline;
use crate::error::{DisciplineError, Result};
use crate::grammar::{DataMap, DataValue, Grammar, VarType};

/// A discipline computed by a Scilab function.
pub struct ScilabDiscipline<E: Engine> {
    session: Arc<Session<E>>,
    function: ScilabFunction,
    input_grammar: Grammar,
    output_grammar: Grammar,
    local_data: DataMap,
}

impl<E: Engine> ScilabDiscipline<E> {
    /// Scan `script_dir` and bind `function_name` to the given grammars.
    pub fn new(
        session: Arc<Session<E>>,
        function_name: &str,
        script_dir: &Path,
        input_grammar: Grammar,
        output_grammar: Grammar,
    ) -> Result<Self> {
        let registry = Registry::scan(script_dir)?;
        Self::from_registry(session, &registry, function_name, input_grammar, output_grammar)
    }

    /// Bind `function_name` with grammars declaring every argument and
    /// output as a double array.
    pub fn with_default_grammars(
        session: Arc<Session<E>>,
        function_name: &str,
        script_dir: &Path,
    ) -> Result<Self> {
        let registry = Registry::scan(script_dir)?;
        let function = lookup(&registry, function_name)?;
        let (input_grammar, output_grammar) = default_grammars(function);
        Self::from_registry(session, &registry, function_name, input_grammar, output_grammar)
    }

    /// Bind a function of an already scanned registry.
    pub fn from_registry(
        session: Arc<Session<E>>,
        registry: &Registry,
        function_name: &str,
        input_grammar: Grammar,
        output_grammar: Grammar,
    ) -> Result<Self> {
        let function = lookup(registry, function_name)?.clone();
        check_names(&function, "input", function.args(), &input_grammar)?;
        check_names(&function, "output", function.outs(), &output_grammar)?;

        registry.load_into(&mut session.lock())?;
        info!(
            function = %function.name(),
            command = %function.invocation(),
            "Scilab discipline ready"
        );

        Ok(ScilabDiscipline {
            session,
            function,
            input_grammar,
            output_grammar,
            local_data: DataMap::new(),
        })
    }

    /// The bound function.
    pub fn function(&self) -> &ScilabFunction {
        &self.function
    }

    /// The line submitted on every execution.
    pub fn command(&self) -> &str {
        self.function.invocation()
    }

    /// The session shared with other disciplines.
    pub fn session(&self) -> &Arc<Session<E>> {
        &self.session
    }

    fn call(&self, inputs: &DataMap) -> Result<DataMap> {
        let mut marshaller = self.session.lock();

        for (name, var_type) in self.input_grammar.iter() {
            let value = inputs.get(name).ok_or_else(|| DisciplineError::Contract {
                detail: format!("missing input '{name}'"),
            })?;
            write_input(&mut marshaller, name, var_type, value)?;
        }

        debug!(command = %self.command(), "executing Scilab discipline");
        marshaller.run_command(self.command())?;

        let mut outputs = DataMap::new();
        for (name, var_type) in self.output_grammar.iter() {
            outputs.insert(name.to_string(), read_output(&mut marshaller, name, var_type)?);
        }
        Ok(outputs)
    }
}

impl<E: Engine> Discipline for ScilabDiscipline<E> {
    fn name(&self) -> &str {
        self.function.name()
    }

    fn input_grammar(&self) -> &Grammar {
        &self.input_grammar
    }

    fn output_grammar(&self) -> &Grammar {
        &self.output_grammar
    }

    fn local_data(&self) -> &DataMap {
        &self.local_data
    }

    fn store_local_data(&mut self, data: DataMap) {
        self.local_data.extend(data);
    }

    fn run(&mut self, inputs: &DataMap) -> Result<DataMap> {
        self.call(inputs).inspect_err(|e| {
            error!(
                discipline = %self.function.name(),
                command = %self.command(),
                error = %e,
                "Scilab discipline execution failed"
            );
        })
    }
}

/// Grammars declaring every argument and output of `function` as a double array.
pub fn default_grammars(function: &ScilabFunction) -> (Grammar, Grammar) {
    let input = Grammar::from_types(
        format!("{}_inputs", function.name()),
        function.args().iter().map(|name| (name.as_str(), VarType::Float64Array)),
    );
    let output = Grammar::from_types(
        format!("{}_outputs", function.name()),
        function.outs().iter().map(|name| (name.as_str(), VarType::Float64Array)),
    );
    (input, output)
}

fn lookup<'r>(registry: &'r Registry, function_name: &str) -> Result<&'r ScilabFunction> {
    registry
        .get(function_name)
        .ok_or_else(|| DisciplineError::UnknownFunction {
            function: function_name.to_string(),
            script_dir: registry.script_dir().display().to_string(),
        })
}

/// Grammar names must equal the signature names as sets.
fn check_names(
    function: &ScilabFunction,
    kind: &'static str,
    signature_names: &[String],
    grammar: &Grammar,
) -> Result<()> {
    let expected: std::collections::BTreeSet<&str> =
        signature_names.iter().map(String::as_str).collect();
    if expected == grammar.name_set() {
        return Ok(());
    }
    Err(DisciplineError::ContractMismatch {
        function: function.name().to_string(),
        kind,
        expected: signature_names.to_vec(),
        declared: grammar.names().map(str::to_string).collect(),
    })
}

fn write_input<E: Engine>(
    marshaller: &mut Marshaller<'_, E>,
    name: &str,
    var_type: VarType,
    value: &DataValue,
) -> Result<()> {
    match (var_type, value) {
        (VarType::Int32, DataValue::Int32(v)) => marshaller.create_int(name, *v)?,
        (VarType::Float64, DataValue::Float64(v)) => marshaller.create_double(name, *v)?,
        (VarType::Float64, DataValue::Array(a)) if a.len() == 1 => {
            let v = a.iter().next().copied().unwrap_or_default();
            marshaller.create_double(name, v)?
        }
        (VarType::Float64Array, DataValue::Array(a)) => match Value::from_array(a.clone()) {
            Ok(value) => marshaller.put(name, &value)?,
            Err(_) => {
                return Err(DisciplineError::UnsupportedShape {
                    name: name.to_string(),
                    rank: a.ndim(),
                })
            }
        },
        (var_type, value) => {
            return Err(DisciplineError::Contract {
                detail: format!(
                    "input '{name}' is declared {var_type} but holds {}",
                    value.var_type()
                ),
            })
        }
    }
    Ok(())
}

fn read_output<E: Engine>(
    marshaller: &mut Marshaller<'_, E>,
    name: &str,
    var_type: VarType,
) -> Result<DataValue> {
    let value = match var_type {
        VarType::Int32 => DataValue::Int32(marshaller.get_int(name)?),
        VarType::Float64 => DataValue::Float64(marshaller.get_double(name)?),
        VarType::Float64Array => {
            let array = marshaller
                .get_double_array(name)?
                .into_array()
                .ok_or_else(|| DisciplineError::Contract {
                    detail: format!("output '{name}' is not an array"),
                })?;
            DataValue::Array(array)
        }
    };
    Ok(value)
}
