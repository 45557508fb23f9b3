//! Engine error types.

/// Errors raised by the engine session and the marshaller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine reported a non-zero code for a variable access or a command.
    #[error(
        "Scilab call on '{target}' failed with error code {code}{}",
        format_messages(.messages)
    )]
    ForeignCall {
        /// Variable name or submitted command text.
        target: String,
        code: i32,
        /// Engine message stack, when the call exposes one.
        messages: Vec<String>,
    },

    /// A value or name cannot be transmitted as requested.
    #[error("contract violation: {detail}")]
    Contract { detail: String },

    /// Only rank 1 and rank 2 arrays cross the boundary.
    #[error("unsupported array rank {rank}: only vectors and matrices can be sent to Scilab")]
    UnsupportedShape { rank: usize },

    /// A native engine is already running in this process.
    #[error("a Scilab engine is already running in this process")]
    AlreadyStarted,

    /// `StartScilab` reported failure.
    #[error("failed to start Scilab from '{sci_path}'")]
    StartFailed { sci_path: String },

    /// `TerminateScilab` reported failure.
    #[error("failed to terminate Scilab")]
    TerminateFailed,

    /// The Scilab shared libraries could not be opened or lack a symbol.
    #[error("Scilab library error: {0}")]
    Library(#[from] libloading::Error),
}

fn format_messages(messages: &[String]) -> String {
    if messages.is_empty() {
        String::new()
    } else {
        format!(": {}", messages.join("; "))
    }
}

impl EngineError {
    pub(crate) fn foreign(target: &str, code: i32) -> Self {
        EngineError::ForeignCall {
            target: target.to_string(),
            code,
            messages: Vec::new(),
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
