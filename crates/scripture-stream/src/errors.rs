/// Errors returned by the answer consumer and the non-streaming endpoints.
///
/// A `ConsumeError` always means the call itself failed. A server that starts
/// streaming and then reports a failure does so in-band through
/// `StreamEvent::Error`, which is never converted into this type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsumeError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Connection, request, or body-read failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered with a non-success HTTP status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    /// A non-streaming response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// The caller aborted the stream before it ended.
    #[error("cancelled")]
    Cancelled,
    /// Internal channel misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ConsumeError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub(crate) fn status(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        Self::Status {
            status: status.as_u16(),
            body: body.into(),
        }
    }

    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// True when no usable response was ever obtained (connection failure or
    /// non-success status), as opposed to a cancelled or half-read stream.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }

    /// Returns the HTTP status code for `Status` errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
