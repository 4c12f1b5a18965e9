//! WebSocket transport: the translator accepts one inbound connection from
//! a BiDi-speaking client, grounded on `spider_chrome/src/conn.rs`'s
//! `Connection<T>` (which instead dials *out* to the browser). Here the
//! translator is the server side.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

use crate::error::TransportError;

/// A single accepted WebSocket connection, framed as one JSON text frame
/// per BiDi/CDP message.
#[must_use = "streams do nothing unless polled"]
pub struct WebSocketTransport {
    ws: WebSocketStream<TcpStream>,
}

impl WebSocketTransport {
    pub fn new(ws: WebSocketStream<TcpStream>) -> Self {
        Self { ws }
    }

    /// Bind a listener and accept exactly one client connection, as the
    /// BiDi side of the translator is always a single session.
    pub async fn accept_one(addr: impl tokio::net::ToSocketAddrs) -> Result<Self, TransportError> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let (stream, _peer) = listener.accept().await?;
        let ws = tokio_tungstenite::accept_async(stream).await?;
        tracing::debug!("accepted websocket transport connection");
        Ok(Self { ws })
    }
}

impl Stream for WebSocketTransport {
    type Item = Result<String, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            return match futures::ready!(self.ws.poll_next_unpin(cx)) {
                Some(Ok(WsMessage::Text(text))) => Poll::Ready(Some(Ok(text.to_string()))),
                Some(Ok(WsMessage::Close(_))) | None => Poll::Ready(None),
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) => continue,
                Some(Ok(_other)) => continue,
                Some(Err(err)) => Poll::Ready(Some(Err(err.into()))),
            };
        }
    }
}

impl Sink<String> for WebSocketTransport {
    type Error = TransportError;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.ws.poll_ready_unpin(cx).map_err(Into::into)
    }

    fn start_send(mut self: Pin<&mut Self>, item: String) -> Result<(), Self::Error> {
        tracing::trace!("sending {}", item);
        self.ws
            .start_send_unpin(WsMessage::Text(item.into()))
            .map_err(Into::into)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.ws.poll_flush_unpin(cx).map_err(Into::into)
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.ws.poll_close_unpin(cx).map_err(Into::into)
    }
}
