//! Error types shared by the BQL front end, optimizer and option handling.

use thiserror::Error;

/// Errors raised while compiling a BQL statement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BqlError {
    /// The statement text could not be turned into a BQL tree.
    #[error("BQL syntax error: {message} (input: {bql})")]
    Syntax { bql: String, message: String },

    /// A placeholder that must be bound was absent from the option map.
    #[error("missing option `{0}`")]
    MissingOption(String),

    /// A supplied option value has a type no backend can bind.
    #[error("unsupported option, field: {field}, type: {kind}")]
    InvalidOption { field: String, kind: String },
}

impl BqlError {
    pub fn syntax(bql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            bql: bql.into(),
            message: message.into(),
        }
    }

    /// Name of the offending option, for `MissingOption` and `InvalidOption`.
    pub fn option_name(&self) -> Option<&str> {
        match self {
            Self::MissingOption(name) => Some(name),
            Self::InvalidOption { field, .. } => Some(field),
            Self::Syntax { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BqlError>;
