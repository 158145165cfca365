use thiserror::Error;

/// Failures while splitting delivery units into frames or turning frame
/// payloads into messages.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Fewer than four bytes left where a length prefix was expected.
    #[error("truncated frame header: {remaining} byte(s) left in delivery unit")]
    TruncatedHeader { remaining: usize },

    /// Length prefix points past the end of the delivery unit.
    #[error("frame declares {declared} byte(s) but only {remaining} remain")]
    FrameOverrun { declared: usize, remaining: usize },

    /// Length prefix above the configured frame limit.
    #[error("frame declares {declared} byte(s), limit is {max}")]
    FrameTooLarge { declared: usize, max: usize },

    /// Bytes of an incomplete frame were left over when the stream ended.
    #[error("stream ended with {pending} byte(s) of an incomplete frame")]
    IncompleteFrame { pending: usize },

    /// Payload is not valid UTF-8 JSON.
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Payload parsed, but the top level is not a key/value mapping.
    #[error("payload is not a mapping (found {found})")]
    NotAMapping { found: &'static str },
}

impl CodecError {
    /// Framing errors desynchronise the stream and end the session; payload
    /// errors only cost the one frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Payload(_) | Self::NotAMapping { .. })
    }
}

/// Rejected ring-buffer capacity requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error("capacity must be at least 1")]
    Zero,
}

/// Unparseable `#RRGGBB` color strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{0}', expected #RRGGBB or #RRGGBBAA")]
pub struct ColorError(pub String);

/// Session-level failures. All of these end the session; none are retried.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("connection closed: {0}")]
    Closed(String),

    #[error("protocol error: {0}")]
    Framing(CodecError),

    #[error("invalid connection state transition: {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
}

/// Why a UI command could not be queued for the network context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command queue is full")]
    QueueFull,

    #[error("session has ended")]
    SessionEnded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_error_severity() {
        let overrun = CodecError::FrameOverrun {
            declared: 10,
            remaining: 2,
        };
        assert!(overrun.is_fatal());

        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!CodecError::Payload(bad_json).is_fatal());
        assert!(!CodecError::NotAMapping { found: "array" }.is_fatal());
    }
}
