//! Scilab functions as simulation disciplines.
//!
//! A discipline exposes one Scilab function to a multidisciplinary workflow:
//! it declares typed input and output grammars matching the function's
//! signature and computes outputs by running the function in a shared
//! Scilab session.
//!
//! ## Modules
//!
//! - [`grammar`] — Declared variable types and discipline data
//! - [`discipline`] — The [`Discipline`] trait
//! - [`scilab`] — Disciplines backed by Scilab functions
//! - [`config`] — TOML configuration of sessions and disciplines

pub mod config;
pub mod discipline;
pub mod error;
pub mod grammar;
pub mod scilab;

// Re-export key types for convenience
pub use config::{DisciplineConfig, EngineConfig, FunctionsConfig, ScilinkConfig};
pub use discipline::Discipline;
pub use error::{DisciplineError, Result};
pub use grammar::{DataMap, DataValue, Grammar, VarType};
pub use scilab::{default_grammars, ScilabDiscipline};
