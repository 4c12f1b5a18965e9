//! The CDP connection (spec.md §4.1): multiplexes a single transport among
//! many logical sessions. Grounded on `spider_chrome/src/conn.rs` (the
//! `Connection<T>` `Stream` that talks to one websocket) and
//! `handler/commandfuture.rs` (a command, and the oneshot reply it
//! resolves, traveling to a single owning task over an mpsc channel) — the
//! same split the teacher uses between its `Handler` task and the
//! `Page`/`CommandFuture` callers that send into it.
//!
//! Unlike the teacher, this connection does not fan events out to
//! per-session listener lists: the translator is single-threaded and
//! cooperative (spec.md §5), so every event is handed to the one `Mapper`
//! loop, which consults the target/context registry itself to decide who
//! cares. That also satisfies spec.md §4.1's "attach also emits on the
//! parent client" requirement for free — there is only one consumer.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use fnv::FnvHashMap;
use futures::channel::{mpsc, oneshot};
use futures::{Sink, SinkExt, Stream, StreamExt};

use bidi_cdp_types::{CallId, MethodId};
use cdp_protocol::event::{self, CdpEvent};
use cdp_protocol::target::{AttachedToTargetEvent, DetachedFromTargetEvent, SessionId};

use crate::error::{CdpError, Result};
use crate::transport::Transport;

/// What the connection hands back to the `Mapper` loop for every incoming
/// frame that is not a reply to one of our own commands.
#[derive(Debug)]
pub enum ConnEvent {
    Event {
        session: Option<SessionId>,
        event: CdpEvent,
    },
    /// Raised before the corresponding `Event` so the target registry can
    /// register the new session before anything tries to use it.
    AttachedToTarget(AttachedToTargetEvent),
    DetachedFromTarget(DetachedFromTargetEvent),
    /// The transport closed or errored; the connection is now terminal.
    Closed,
}

enum ConnCommand {
    Send {
        method: MethodId,
        session: Option<SessionId>,
        params: serde_json::Value,
        reply: oneshot::Sender<std::result::Result<serde_json::Value, bidi_cdp_types::Error>>,
    },
}

/// A cheap, cloneable handle used by [`crate::cdp_client::CdpClient`] to
/// submit commands to the connection task.
#[derive(Clone)]
pub struct CdpConnectionHandle {
    cmd_tx: mpsc::UnboundedSender<ConnCommand>,
}

impl CdpConnectionHandle {
    pub async fn send_command(
        &self,
        method: MethodId,
        session: Option<SessionId>,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .unbounded_send(ConnCommand::Send {
                method,
                session,
                params,
                reply,
            })
            .map_err(|_| CdpError::Closed)?;
        match rx.await.map_err(|_| CdpError::Closed)? {
            Ok(value) => Ok(value),
            Err(err) => Err(CdpError::Chrome(err)),
        }
    }
}

/// The connection task itself. Call [`CdpConnection::spawn`] to start it;
/// the returned handle and event receiver are all callers need from then
/// on.
pub struct CdpConnection<Tr> {
    transport: Tr,
    next_id: usize,
    pending: FnvHashMap<CallId, oneshot::Sender<std::result::Result<serde_json::Value, bidi_cdp_types::Error>>>,
    cmd_rx: mpsc::UnboundedReceiver<ConnCommand>,
    event_tx: mpsc::UnboundedSender<ConnEvent>,
    closed: bool,
}

impl<Tr: Transport + 'static> CdpConnection<Tr> {
    /// Spawns the connection's IO loop as its own task and returns a handle
    /// for submitting commands plus a receiver for incoming CDP events.
    pub fn spawn(transport: Tr) -> (CdpConnectionHandle, mpsc::UnboundedReceiver<ConnEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded();
        let (event_tx, event_rx) = mpsc::unbounded();
        let conn = CdpConnection {
            transport,
            next_id: 0,
            pending: FnvHashMap::default(),
            cmd_rx,
            event_tx,
            closed: false,
        };
        tokio::spawn(conn);
        (CdpConnectionHandle { cmd_tx }, event_rx)
    }

    fn next_call_id(&mut self) -> CallId {
        let id = CallId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    fn fail_all_pending(&mut self) {
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(bidi_cdp_types::Error {
                code: -32000,
                message: "closed".into(),
            }));
        }
    }

    fn handle_frame(&mut self, text: &str) {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(err) => {
                tracing::debug!("failed to parse CDP frame: {err}");
                return;
            }
        };

        if let Some(id) = value.get("id").and_then(|v| v.as_u64()) {
            let id = CallId::new(id as usize);
            let Some(tx) = self.pending.remove(&id) else {
                tracing::trace!("dropping reply for unknown call id {:?}", id);
                return;
            };
            if let Some(error) = value.get("error") {
                let err = serde_json::from_value::<bidi_cdp_types::Error>(error.clone())
                    .unwrap_or(bidi_cdp_types::Error {
                        code: -32000,
                        message: error.to_string(),
                    });
                let _ = tx.send(Err(err));
            } else {
                let result = value.get("result").cloned().unwrap_or(serde_json::Value::Null);
                let _ = tx.send(Ok(result));
            }
            return;
        }

        let Some(method) = value.get("method").and_then(|v| v.as_str()) else {
            return;
        };
        let session = value
            .get("sessionId")
            .and_then(|v| v.as_str())
            .map(|s| SessionId(s.to_string()));
        let params = value.get("params").cloned().unwrap_or(serde_json::Value::Null);

        if method == "Target.attachedToTarget" {
            if let Ok(ev) = serde_json::from_value::<AttachedToTargetEvent>(params.clone()) {
                let _ = self.event_tx.unbounded_send(ConnEvent::AttachedToTarget(ev));
            }
        }
        if method == "Target.detachedFromTarget" {
            if let Ok(ev) = serde_json::from_value::<DetachedFromTargetEvent>(params.clone()) {
                let _ = self
                    .event_tx
                    .unbounded_send(ConnEvent::DetachedFromTarget(ev));
            }
        }

        match event::decode(method, params) {
            Ok(decoded) => {
                let _ = self.event_tx.unbounded_send(ConnEvent::Event {
                    session,
                    event: decoded,
                });
            }
            Err(event::DecodeError::UnknownMethod(m)) => {
                tracing::trace!("dropping unhandled CDP event {m}");
            }
            Err(err) => tracing::debug!("failed to decode CDP event {method}: {err}"),
        }
    }
}

impl<Tr: Transport> Future for CdpConnection<Tr> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.closed {
            return Poll::Ready(());
        }

        loop {
            match this.cmd_rx.poll_next_unpin(cx) {
                Poll::Ready(Some(ConnCommand::Send {
                    method,
                    session,
                    params,
                    reply,
                })) => {
                    let id = this.next_call_id();
                    let call = bidi_cdp_types::MethodCall {
                        id,
                        method,
                        session_id: session.map(|s| s.0),
                        params,
                    };
                    match serde_json::to_string(&call) {
                        Ok(text) => {
                            this.pending.insert(id, reply);
                            if let Err(err) = Pin::new(&mut this.transport).start_send(text) {
                                tracing::debug!("transport send failed: {err}");
                                this.closed = true;
                                this.fail_all_pending();
                                let _ = this.event_tx.unbounded_send(ConnEvent::Closed);
                                return Poll::Ready(());
                            }
                        }
                        Err(err) => {
                            let _ = reply.send(Err(bidi_cdp_types::Error {
                                code: -32000,
                                message: err.to_string(),
                            }));
                        }
                    }
                }
                Poll::Ready(None) | Poll::Pending => break,
            }
        }

        let _ = Pin::new(&mut this.transport).poll_flush(cx);

        loop {
            match Pin::new(&mut this.transport).poll_next(cx) {
                Poll::Ready(Some(Ok(text))) => {
                    tracing::trace!("received CDP frame: {text}");
                    this.handle_frame(&text);
                }
                Poll::Ready(Some(Err(err))) => {
                    tracing::debug!("transport error: {err}");
                    this.closed = true;
                    this.fail_all_pending();
                    let _ = this.event_tx.unbounded_send(ConnEvent::Closed);
                    return Poll::Ready(());
                }
                Poll::Ready(None) => {
                    this.closed = true;
                    this.fail_all_pending();
                    let _ = this.event_tx.unbounded_send(ConnEvent::Closed);
                    return Poll::Ready(());
                }
                Poll::Pending => break,
            }
        }

        Poll::Pending
    }
}
