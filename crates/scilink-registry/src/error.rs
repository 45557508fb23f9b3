//! Registry error types.

use std::path::PathBuf;

/// Errors that can occur while scanning or calling Scilab functions.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The script directory does not exist.
    #[error("script directory for Scilab sources '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    /// A function definition line does not match `[outs] = name(args)`.
    #[error("cannot parse function definition{} '{line}': {detail}", format_location(.location))]
    Parse {
        detail: String,
        line: String,
        /// `file:line` of the definition, when it came from a file.
        location: Option<String>,
    },

    /// A call supplied the wrong arguments for a signature.
    #[error("function '{function}': {detail}")]
    Arity { function: String, detail: String },

    /// Engine failure while calling a function.
    #[error(transparent)]
    Engine(#[from] scilink_engine::EngineError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_location(location: &Option<String>) -> String {
    match location {
        Some(location) => format!(" at {location}"),
        None => String::new(),
    }
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
