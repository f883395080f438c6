use strum::EnumIs;
use thiserror::Error;

/// Which part of the problem an error or warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum Target {
    Constraint(usize),
    Objective(usize),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Constraint(index) => write!(f, "constraint #{}", index),
            Target::Objective(index) => write!(f, "objective #{}", index),
        }
    }
}

#[derive(Debug, Error, EnumIs)]
pub enum NlError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file '{file}': {source}")]
    ConfigParseError {
        source: toml::de::Error,
        file: String,
    },

    #[error("Failed to write configuration file '{file}': {source}")]
    ConfigSerializeError {
        source: toml::ser::Error,
        file: String,
    },

    #[error("Invalid problem input: {0}")]
    InvalidInput(String),

    #[error("Error in nonlinear {target}: {source}")]
    Compile {
        target: Target,
        source: nlinstr::Error,
    },

    /// Warning only: recorded in the compile report, never returned as `Err`.
    #[error(
        "Nonlinear {target} evaluates to {value} but {expected} was expected (difference {difference})."
    )]
    ValidationMismatch {
        target: Target,
        value: f64,
        expected: f64,
        difference: f64,
    },

    #[error("The problem rejected nonlinear {target} while trying to {operation} (code {code}).")]
    SinkRejected {
        target: Target,
        operation: &'static str,
        code: i32,
    },

    #[error("Nonlinear {target} references variable {index} which the problem does not provide.")]
    UnresolvedVariable { target: Target, index: usize },
}

impl NlError {
    /// Problem part the error is attributed to, if any.
    pub fn target(&self) -> Option<Target> {
        match self {
            NlError::Compile { target, .. }
            | NlError::ValidationMismatch { target, .. }
            | NlError::SinkRejected { target, .. }
            | NlError::UnresolvedVariable { target, .. } => Some(*target),
            _ => None,
        }
    }
}

pub type NlResult<T> = Result<T, NlError>;
