/// Convenience result type used across the compositor.
pub type CompositeResult<T> = Result<T, CompositeError>;

/// Machine-checkable classification of a [`CompositeError`] or a recorded warning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Internal consistency failure.
    SanityCheck,
    /// Out-of-range or mismatched value supplied by the caller.
    InvalidValue,
    /// Operation is not legal in the current state.
    InvalidOperation,
    /// Unknown enumeration name.
    InvalidEnum,
    /// Failure reported by the communicator.
    Transport,
    /// Anything wrapped from outside the compositor.
    Other,
}

/// Top-level error taxonomy used by compositor APIs.
#[derive(thiserror::Error, Debug)]
pub enum CompositeError {
    /// Internal consistency failure: corrupt runs, size mismatches, aliased buffers.
    #[error("sanity check failed: {0}")]
    SanityCheck(String),

    /// Caller passed a value outside the accepted range.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The operation is illegal in the current state (for example while drawing).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Unknown format, mode or strategy name.
    #[error("invalid enum: {0}")]
    InvalidEnum(String),

    /// Errors surfaced by the communicator collaborator.
    #[error("transport error: {0}")]
    Transport(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CompositeError {
    /// Build a [`CompositeError::SanityCheck`] value.
    pub fn sanity(msg: impl Into<String>) -> Self {
        Self::SanityCheck(msg.into())
    }

    /// Build a [`CompositeError::InvalidValue`] value.
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// Build a [`CompositeError::InvalidOperation`] value.
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Build a [`CompositeError::InvalidEnum`] value.
    pub fn invalid_enum(msg: impl Into<String>) -> Self {
        Self::InvalidEnum(msg.into())
    }

    /// Build a [`CompositeError::Transport`] value.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// The machine-checkable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SanityCheck(_) => ErrorKind::SanityCheck,
            Self::InvalidValue(_) => ErrorKind::InvalidValue,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::InvalidEnum(_) => ErrorKind::InvalidEnum,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Other(_) => ErrorKind::Other,
        }
    }
}

/// A non-fatal condition recorded while drawing a frame.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Warning {
    pub kind: ErrorKind,
    pub message: String,
}

impl Warning {
    /// Emit `message` through `tracing` and keep it for the frame record.
    pub(crate) fn raise(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(?kind, "{message}");
        Self { kind, message }
    }
}

impl From<serde_json::Error> for CompositeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for CompositeError {
    fn from(err: std::io::Error) -> Self {
        Self::Other(anyhow::Error::new(err))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
