use super::options::OptionsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Failed to load {target}: {source}")]
    Link {
        target: String,
        #[source]
        source: libloading::Error,
    },

    #[error("Error while running xtb (status is {status})")]
    Computation { status: i32, report: String },

    #[error("Invalid calculation options: {source}")]
    Options {
        #[from]
        source: OptionsError,
    },

    #[error("Scratch file error: {0}")]
    Scratch(#[from] std::io::Error),
}

impl EngineError {
    /// The native report drained from the scratch file, for failed computations.
    pub fn report(&self) -> Option<&str> {
        match self {
            EngineError::Computation { report, .. } => Some(report),
            _ => None,
        }
    }
}
