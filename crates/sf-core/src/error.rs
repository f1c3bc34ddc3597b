//! Error taxonomy
//!
//! Configuration errors are programming mistakes and abort setup. Transient
//! I/O and user input errors are caught where they happen and reported on the
//! status line; they never stop compliance for other items.

/// Fatal, programmer-facing misconfiguration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Field named \"{0}\" could not be found")]
    FieldNotFound(String),
    #[error("Field \"{key}\" of kind {kind} requires an explicit compliance action")]
    MissingComplianceAction { key: String, kind: &'static str },
    #[error("Field \"{key}\" is not a {expected} field")]
    KindMismatch { key: String, expected: &'static str },
    #[error("Invalid rule pattern: {0}")]
    InvalidPattern(String),
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
    #[error("Configuration store used before initialization")]
    NotInitialized,
}

/// Recoverable failure of an external resource.
#[derive(Debug, thiserror::Error)]
pub enum TransientIoError {
    #[error("Failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },
    #[error("Clipboard unavailable: {0}")]
    Clipboard(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}

/// Recoverable failure caused by user-supplied text.
#[derive(Debug, thiserror::Error)]
pub enum UserInputError {
    #[error("No settings provided")]
    EmptyRestorePayload,
    #[error("Malformed backup: {0}")]
    MalformedBackup(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    TransientIo(#[from] TransientIoError),
    #[error(transparent)]
    UserInput(#[from] UserInputError),
}

impl Error {
    /// Whether the error is reported to the user instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
