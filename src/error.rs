//! Error taxonomy: transport failures, CDP connection failures, and the
//! closed BiDi error-kind set (spec.md §7), plus the wrap-into-closest-kind
//! policy between them.

use thiserror::Error;

pub type Result<T, E = CdpError> = std::result::Result<T, E>;

/// Failures from the underlying message pipe (WebSocket, pipe, binding).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    #[error("transport closed")]
    Closed,
}

/// Failures from the CDP connection/session layer.
#[derive(Debug, Error)]
pub enum CdpError {
    #[error("{0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Chrome(#[from] bidi_cdp_types::Error),
    #[error("received no response from the chromium instance")]
    NoResponse,
    #[error("connection closed")]
    Closed,
    #[error("no CDP client attached for session")]
    NoSuchSession,
    #[error("{0}")]
    ChannelSend(#[from] futures::channel::mpsc::SendError),
    #[error("{0}")]
    Canceled(#[from] futures::channel::oneshot::Canceled),
    #[error("{0}")]
    UnknownEvent(#[from] cdp_protocol::event::DecodeError),
    #[error("{0}")]
    Message(String),
}

impl CdpError {
    pub fn msg(msg: impl Into<String>) -> Self {
        CdpError::Message(msg.into())
    }
}

/// The closed set of BiDi error kinds from spec.md §7. This is the shape
/// serialized into an error reply's `error` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BidiErrorKind {
    InvalidArgument,
    NoSuchFrame,
    NoSuchAlert,
    NoSuchIntercept,
    NoSuchRequest,
    NoSuchUserContext,
    NoSuchHandle,
    NoSuchCollector,
    NoSuchWebExtension,
    InvalidWebExtension,
    UnsupportedOperation,
    UnknownError,
    UnknownCommand,
}

impl BidiErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BidiErrorKind::InvalidArgument => "invalid argument",
            BidiErrorKind::NoSuchFrame => "no such frame",
            BidiErrorKind::NoSuchAlert => "no such alert",
            BidiErrorKind::NoSuchIntercept => "no such intercept",
            BidiErrorKind::NoSuchRequest => "no such request",
            BidiErrorKind::NoSuchUserContext => "no such user context",
            BidiErrorKind::NoSuchHandle => "no such handle",
            BidiErrorKind::NoSuchCollector => "no such collector",
            BidiErrorKind::NoSuchWebExtension => "no such web extension",
            BidiErrorKind::InvalidWebExtension => "invalid web extension",
            BidiErrorKind::UnsupportedOperation => "unsupported operation",
            BidiErrorKind::UnknownError => "unknown error",
            BidiErrorKind::UnknownCommand => "unknown command",
        }
    }
}

/// A BiDi error reply: a closed-set `kind` plus a free-form message.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct BidiError {
    pub kind: BidiErrorKind,
    pub message: String,
}

impl BidiError {
    pub fn new(kind: BidiErrorKind, message: impl Into<String>) -> Self {
        BidiError {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(BidiErrorKind::InvalidArgument, message)
    }

    pub fn no_such_frame(message: impl Into<String>) -> Self {
        Self::new(BidiErrorKind::NoSuchFrame, message)
    }

    pub fn no_such_request(message: impl Into<String>) -> Self {
        Self::new(BidiErrorKind::NoSuchRequest, message)
    }

    pub fn no_such_intercept(message: impl Into<String>) -> Self {
        Self::new(BidiErrorKind::NoSuchIntercept, message)
    }

    pub fn unknown_command(message: impl Into<String>) -> Self {
        Self::new(BidiErrorKind::UnknownCommand, message)
    }

    pub fn unsupported_operation(message: impl Into<String>) -> Self {
        Self::new(BidiErrorKind::UnsupportedOperation, message)
    }
}

/// Wraps a CDP failure into the closest BiDi kind, per spec.md §7: messages
/// containing "Invalid header" become `invalid argument`; anything else
/// unmapped becomes `unknown error` with the original message preserved.
impl From<CdpError> for BidiError {
    fn from(err: CdpError) -> Self {
        match &err {
            CdpError::Closed => BidiError::new(BidiErrorKind::UnknownError, "closed"),
            _ => {
                let message = err.to_string();
                if message.contains("Invalid header") {
                    BidiError::invalid_argument(message)
                } else {
                    BidiError::new(BidiErrorKind::UnknownError, message)
                }
            }
        }
    }
}
