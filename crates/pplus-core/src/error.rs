use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the P+ translation engine.
///
/// Most problems in a P+ program are recorded as diagnostics and translation
/// carries on; only the variants returned through `Result` abort a run.
#[derive(Error, Debug)]
pub enum PplusError {
    #[error("cannot open '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{}' includes itself", path.display())]
    IncludeCycle { path: PathBuf },

    #[error("substitution of '{subject}' did not settle after {passes} passes")]
    SubstitutionLoop { subject: String, passes: usize },

    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("calc: {0}")]
    Calc(#[from] CalcError),
}

impl PplusError {
    /// Create an I/O error for a source or output file
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a substitution loop error
    pub fn substitution_loop(subject: &str, passes: usize) -> Self {
        Self::SubstitutionLoop {
            subject: subject.to_string(),
            passes,
        }
    }
}

/// Constant expression evaluation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("missing '(' in expression '{0}'")]
    MissingOpenParen(String),

    #[error("missing ')' in expression '{0}'")]
    MissingCloseParen(String),

    #[error("unknown '{token}' in expression '{expression}'")]
    UnknownToken { token: String, expression: String },

    #[error("malformed expression '{0}'")]
    Malformed(String),

    #[error("integer width {width} of '{literal}' is outside 1..=64")]
    LiteralWidth { literal: String, width: String },
}
