use thiserror::Error;

/// Everything that can go wrong between a song description and a sample buffer.
#[derive(Debug, Error)]
pub enum EdmError {
    /// Note text that doesn't name a pitch (e.g. `H4`, `C#x`).
    #[error("invalid note '{0}'")]
    InvalidNote(String),

    /// A DSP parameter outside the range a component accepts.
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A configuration field is missing or has the wrong shape.
    #[error("malformed config: {0}")]
    MalformedConfig(String),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Failure while encoding or writing the WAV container.
    #[error("I/O failure while writing WAV: {0}")]
    Wav(#[from] hound::Error),
}

impl EdmError {
    pub(crate) fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        EdmError::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}

impl From<serde_json::Error> for EdmError {
    fn from(e: serde_json::Error) -> Self {
        EdmError::MalformedConfig(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EdmError>;
