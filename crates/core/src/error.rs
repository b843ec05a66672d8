use crate::field::{Field, FieldKind};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV missing required headers: {0:?}")]
    MissingHeaders(Vec<String>),

    #[error("invalid rule: {0}")]
    InvalidRule(String),

    #[error("operator {operator} cannot be applied to {field} ({kind:?} field)")]
    TypeMismatch {
        field: Field,
        operator: String,
        kind: FieldKind,
    },

    #[error("invalid regex pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("record not found: {0}")]
    RecordNotFound(i64),

    #[error("no record with path: {0}")]
    PathNotFound(String),

    #[error("group not found: {0}")]
    GroupNotFound(i64),

    #[error("unknown field name: {0}")]
    UnknownField(String),

    #[error("field {0} is read-only")]
    ReadOnlyField(Field),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("rule execution cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
