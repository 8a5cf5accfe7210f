use thiserror::Error;

/// Errors produced by encode, decode, and registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerdeError {
    /// A native form is missing required fields or carries malformed ones.
    #[error("decode error: {0}")]
    Decode(String),

    /// The input bytes, hex, or JSON do not parse into any envelope shape.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The discriminator names a type that is not registered.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// The discriminator disagrees with the packed payload or the expected type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// The source object violates a required-field contract of its schema.
    #[error("encode error: {0}")]
    Encode(String),

    /// A different descriptor was registered under an existing name.
    #[error("conflicting registration for type {name}")]
    RegistrationConflict { name: String },

    /// Codec configuration could not be parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl SerdeError {
    /// Shorthand for [`SerdeError::TypeMismatch`].
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Result alias for serialization operations.
pub type SerdeResult<T> = Result<T, SerdeError>;
