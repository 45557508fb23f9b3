//! The discipline abstraction.
//!
//! A discipline is a named computation with a typed input grammar and a typed
//! output grammar. The provided [`Discipline::execute`] checks both grammars
//! around [`Discipline::run`] and keeps the last inputs and outputs as local
//! data.

use crate::error::Result;
use crate::grammar::{DataMap, Grammar};

/// A computation with declared inputs and outputs.
pub trait Discipline {
    fn name(&self) -> &str;

    fn input_grammar(&self) -> &Grammar;

    fn output_grammar(&self) -> &Grammar;

    /// Data stored by the last execution.
    fn local_data(&self) -> &DataMap;

    /// Merge `data` into the local data, replacing existing entries.
    fn store_local_data(&mut self, data: DataMap);

    /// Compute outputs from inputs that satisfy the input grammar.
    fn run(&mut self, inputs: &DataMap) -> Result<DataMap>;

    /// Validate `inputs`, run, validate the outputs and store both.
    fn execute(&mut self, inputs: &DataMap) -> Result<DataMap> {
        self.input_grammar().validate(inputs)?;
        let outputs = self.run(inputs)?;
        self.output_grammar().validate(&outputs)?;

        let mut data: DataMap = inputs
            .iter()
            .filter(|(name, _)| self.input_grammar().get_type(name).is_some())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        data.extend(outputs.iter().map(|(name, value)| (name.clone(), value.clone())));
        self.store_local_data(data);
        Ok(outputs)
    }

    /// Local values of the declared inputs.
    fn get_input_data(&self) -> DataMap {
        select(self.local_data(), self.input_grammar())
    }

    /// Local values of the declared outputs.
    fn get_output_data(&self) -> DataMap {
        select(self.local_data(), self.output_grammar())
    }
}

fn select(data: &DataMap, grammar: &Grammar) -> DataMap {
    grammar
        .names()
        .filter_map(|name| data.get(name).map(|value| (name.to_string(), value.clone())))
        .collect()
}
