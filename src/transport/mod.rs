//! Transport variants (spec.md §6): a bidirectional text-message pipe that
//! delivers one JSON frame at a time, with no framing guarantees beyond
//! that. The CDP connection and the BiDi-facing half of the translator are
//! both written against the [`Transport`] trait so the same engine runs
//! over a WebSocket, an OS pipe, or an in-page binding pair.

mod binding;
mod pipe;
mod websocket;

pub use binding::BindingTransport;
pub use pipe::PipeTransport;
pub use websocket::WebSocketTransport;

use futures::{Sink, Stream};

use crate::error::TransportError;

/// One JSON text frame in, one JSON text frame out. Implementors carry no
/// framing beyond "one message per `Stream`/`Sink` item" — newline or NUL
/// delimiting, a WebSocket text frame, or a host binding call are all valid
/// realizations.
pub trait Transport:
    Stream<Item = Result<String, TransportError>> + Sink<String, Error = TransportError> + Unpin
{
}

impl<T> Transport for T where
    T: Stream<Item = Result<String, TransportError>> + Sink<String, Error = TransportError> + Unpin
{
}
