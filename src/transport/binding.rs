//! Mapper-hosted binding mode (spec.md §6): when the translator is
//! embedded into a browser page rather than run as a standalone process,
//! the transport is two named bindings — `sendBidiResponse(string)` from
//! page to host, `window.onBidiMessage(string)` from host to page — with a
//! one-shot `"launched"` sentinel on `sendBidiResponse` marking readiness.
//! The actual binding plumbing is a host responsibility; this type stands
//! in the pair as two async channels so the rest of the engine is agnostic
//! to how the page bridges them to JS.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc;
use futures::{Sink, Stream, StreamExt};

use crate::error::TransportError;

pub const LAUNCHED_SENTINEL: &str = "launched";

pub struct BindingTransport {
    from_page: mpsc::UnboundedReceiver<String>,
    to_page: mpsc::UnboundedSender<String>,
    ready: bool,
}

impl BindingTransport {
    /// `from_page` carries calls to `sendBidiResponse`; `to_page` delivers
    /// calls to `window.onBidiMessage`. The first message on `from_page`
    /// must be the `"launched"` sentinel, which is consumed here rather
    /// than surfaced to the engine as a BiDi/CDP frame.
    pub fn new(
        from_page: mpsc::UnboundedReceiver<String>,
        to_page: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            from_page,
            to_page,
            ready: false,
        }
    }
}

impl Stream for BindingTransport {
    type Item = Result<String, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            return match futures::ready!(self.from_page.poll_next_unpin(cx)) {
                Some(msg) if !self.ready && msg == LAUNCHED_SENTINEL => {
                    self.ready = true;
                    tracing::debug!("binding transport received launched sentinel");
                    continue;
                }
                Some(msg) => Poll::Ready(Some(Ok(msg))),
                None => Poll::Ready(None),
            };
        }
    }
}

impl Sink<String> for BindingTransport {
    type Error = TransportError;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: String) -> Result<(), Self::Error> {
        self.to_page
            .unbounded_send(item)
            .map_err(|_| TransportError::Closed)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.to_page.close_channel();
        Poll::Ready(Ok(()))
    }
}
