use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed token stream or wrong argument arity. Fatal, never recovered.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Root file format version other than the supported one. Raised before
    /// any other field is looked at so callers can skip old-format files.
    #[error("unsupported format version {found}, only {supported} is supported")]
    Version { found: i64, supported: i64 },

    /// Schema field type or cardinality mismatch, unresolved union,
    /// corrupt identifier.
    #[error("validation error: {0}")]
    Validation(String),

    /// A recognized tag whose sub-variant has no implemented geometry or
    /// rendering. Distinct from a corrupt file.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn syntax(msg: impl Into<String>) -> Self {
        Error::Syntax(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Error::NotImplemented(msg.into())
    }
}
