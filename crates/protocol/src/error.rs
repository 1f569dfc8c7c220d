use thiserror::Error;

/// Errors raised while decoding an inbound envelope.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The line is not valid JSON.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The JSON does not have the `[header, [command, args...]]` shape.
    #[error("invalid envelope: {message}")]
    InvalidEnvelope { message: String },

    /// A recognised command carried arguments of the wrong shape.
    #[error("invalid arguments for {command}: {message}")]
    InvalidArguments {
        command: &'static str,
        message: String,
    },
}

impl ProtocolError {
    pub fn invalid_envelope(message: impl Into<String>) -> Self {
        Self::InvalidEnvelope {
            message: message.into(),
        }
    }

    pub fn invalid_arguments(command: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            command,
            message: message.into(),
        }
    }
}
