//! Discipline error types.

/// Errors that can occur while building or executing a discipline.
#[derive(Debug, thiserror::Error)]
pub enum DisciplineError {
    /// The requested function is not defined in the script directory.
    #[error("function '{function}' has not been detected in script directory '{script_dir}'")]
    UnknownFunction { function: String, script_dir: String },

    /// A declared grammar disagrees with the function signature.
    #[error(
        "{kind} grammar of '{function}' declares {declared:?} but the signature has {expected:?}"
    )]
    ContractMismatch {
        function: String,
        /// `"input"` or `"output"`.
        kind: &'static str,
        expected: Vec<String>,
        declared: Vec<String>,
    },

    /// Data does not satisfy a grammar.
    #[error("contract violation: {detail}")]
    Contract { detail: String },

    /// Only vectors and matrices can be sent to Scilab.
    #[error("variable '{name}' has rank {rank}; only rank 1 and 2 arrays are supported")]
    UnsupportedShape { name: String, rank: usize },

    /// Invalid configuration.
    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    /// Scanning or calling through the function registry failed.
    #[error(transparent)]
    Registry(#[from] scilink_registry::RegistryError),

    /// A marshalling call or the invocation command failed.
    #[error(transparent)]
    Engine(#[from] scilink_engine::EngineError),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for discipline operations.
pub type Result<T> = std::result::Result<T, DisciplineError>;
