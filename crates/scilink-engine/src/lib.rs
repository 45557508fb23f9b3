//! Scilab engine sessions and named-variable marshalling.
//!
//! Scilab exposes its interpreter through a named-variable protocol: values
//! are created and read by name in a global namespace, and functions are run
//! by submitting lines of Scilab. This crate wraps that protocol in an owned
//! [`Session`] and a typed [`Marshaller`].
//!
//! ## Modules
//!
//! - [`protocol`] — The [`Engine`] trait mirroring the C entry points
//! - [`native`] — Runtime binding to a Scilab installation
//! - [`memory`] — In-process engine for tests and dry runs
//! - [`session`] — Owned session handle and teardown
//! - [`marshal`] — Typed create/read primitives and command submission
//! - [`value`] — Tagged values crossing the boundary

pub mod error;
pub mod marshal;
pub mod memory;
pub mod native;
pub mod protocol;
pub mod session;
pub mod value;

// Re-export key types for convenience
pub use error::{EngineError, Result};
pub use marshal::Marshaller;
pub use memory::MemoryEngine;
pub use native::NativeEngine;
pub use protocol::{Engine, SciErr, StartOptions};
pub use session::Session;
pub use value::{Value, ValueKind};
