//! Scilab function signature parsing and function registries.
//!
//! Scans directories of Scilab sources for `function [outs] = name(args)`
//! definitions and exposes each one as a callable that proxies through an
//! engine [`Marshaller`](scilink_engine::Marshaller).
//!
//! ## Modules
//!
//! - [`signature`] — Definition line parser
//! - [`registry`] — Script directory scanning
//! - [`function`] — Bound callables

pub mod error;
pub mod function;
pub mod registry;
pub mod signature;

// Re-export key types for convenience
pub use error::{RegistryError, Result};
pub use function::{CallOutput, ScilabFunction};
pub use registry::{Registry, DEFAULT_EXTENSION};
pub use signature::FunctionSignature;
