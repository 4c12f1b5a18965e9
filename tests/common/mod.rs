//! An in-memory [`Transport`](bidi_cdp::transport) double, plus the small
//! amount of plumbing every scenario test needs: spin up `bidi_cdp::run`
//! over a pair of these, attach one page target, and pump frames in both
//! directions by hand instead of through a socket.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::channel::mpsc;
use futures::{Sink, Stream, StreamExt};
use serde_json::{json, Value};

use bidi_cdp::error::TransportError;

/// One half of an in-memory channel pair, handed to `bidi_cdp::run` as a
/// `Transport`. The other half is a plain sender/receiver the test drives
/// directly.
pub struct ChannelTransport {
    rx: mpsc::UnboundedReceiver<Result<String, TransportError>>,
    tx: mpsc::UnboundedSender<String>,
}

impl Stream for ChannelTransport {
    type Item = Result<String, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_next_unpin(cx)
    }
}

impl Sink<String> for ChannelTransport {
    type Error = TransportError;

    fn poll_ready(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.tx.poll_ready(cx).map_err(|_| TransportError::Closed)
    }

    fn start_send(mut self: Pin<&mut Self>, item: String) -> Result<(), Self::Error> {
        self.tx.start_send(item).map_err(|_| TransportError::Closed)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.tx.poll_close(cx).map_err(|_| TransportError::Closed)
    }
}

/// The test-side handle for one `ChannelTransport`: push frames in, read
/// whatever the translator wrote out.
pub struct TestDriver {
    in_tx: mpsc::UnboundedSender<Result<String, TransportError>>,
    out_rx: mpsc::UnboundedReceiver<String>,
}

impl TestDriver {
    pub fn send_in(&self, text: impl Into<String>) {
        let _ = self.in_tx.unbounded_send(Ok(text.into()));
    }

    pub async fn recv_out(&mut self) -> Option<String> {
        self.out_rx.next().await
    }

    pub async fn recv_out_timeout(&mut self, dur: Duration) -> Option<String> {
        tokio::time::timeout(dur, self.out_rx.next()).await.ok().flatten()
    }
}

pub fn channel_pair() -> (ChannelTransport, TestDriver) {
    let (in_tx, in_rx) = mpsc::unbounded::<Result<String, TransportError>>();
    let (out_tx, out_rx) = mpsc::unbounded::<String>();
    (
        ChannelTransport { rx: in_rx, tx: out_tx },
        TestDriver { in_tx, out_rx },
    )
}

/// Keeps `bidi_cdp::run`'s CDP-side command traffic moving: every outgoing
/// `{"id": N, ...}` call gets a generic `null` result back immediately. The
/// translator's startup (`Target.setDiscoverTargets`/`setAutoAttach`) and
/// per-target `enable()` calls all resolve to `()`, so this is enough to
/// keep the loop from blocking on a reply no scenario test cares about.
pub fn spawn_cdp_autoacker(mut out_rx: mpsc::UnboundedReceiver<String>, in_tx: mpsc::UnboundedSender<Result<String, TransportError>>) {
    tokio::spawn(async move {
        while let Some(frame) = out_rx.next().await {
            let Ok(value) = serde_json::from_str::<Value>(&frame) else {
                continue;
            };
            let Some(id) = value.get("id") else {
                continue;
            };
            let ack = json!({ "id": id, "result": serde_json::Value::Null }).to_string();
            if in_tx.unbounded_send(Ok(ack)).is_err() {
                break;
            }
        }
    });
}

/// A running translator wired to two in-memory transports, plus the driver
/// handles the test uses to act as "the browser" (cdp side) and "the BiDi
/// client" (bidi side).
pub struct Harness {
    pub cdp: TestDriver,
    pub bidi: TestDriver,
}

impl Harness {
    pub async fn start() -> Self {
        // The cdp-side outgoing frames are consumed entirely by the
        // autoacker, so the harness only keeps the sender half to inject
        // synthetic browser events; reads happen only on the bidi side.
        let (cdp_in_tx, cdp_in_rx) = mpsc::unbounded::<Result<String, TransportError>>();
        let (cdp_out_tx, cdp_out_rx) = mpsc::unbounded::<String>();
        let cdp_transport = ChannelTransport { rx: cdp_in_rx, tx: cdp_out_tx };
        spawn_cdp_autoacker(cdp_out_rx, cdp_in_tx.clone());

        let (bidi_transport, bidi_driver) = channel_pair();

        tokio::spawn(async move {
            let _ = bidi_cdp::run(cdp_transport, bidi_transport, bidi_cdp::TranslatorConfig::builder().build()).await;
        });

        let cdp_driver = TestDriver {
            in_tx: cdp_in_tx,
            out_rx: mpsc::unbounded().1,
        };

        Harness { cdp: cdp_driver, bidi: bidi_driver }
    }

    /// Attaches a single page target and waits for the resulting
    /// `browsingContext.contextCreated` event, returning the new context id
    /// and the CDP session id every subsequent browser-side frame for this
    /// page must carry.
    pub async fn attach_page(&mut self) -> (String, String) {
        let target_id = "target-1";
        let session_id = "session-1";
        self.cdp.send_in(
            json!({
                "method": "Target.attachedToTarget",
                "params": {
                    "sessionId": session_id,
                    "targetInfo": {
                        "targetId": target_id,
                        "type": "page",
                        "title": "",
                        "url": "about:blank",
                        "attached": true,
                        "openerId": null,
                    },
                    "waitingForDebugger": false,
                },
            })
            .to_string(),
        );

        loop {
            let frame = self
                .bidi
                .recv_out_timeout(Duration::from_secs(5))
                .await
                .expect("translator produced no contextCreated event in time");
            let value: Value = serde_json::from_str(&frame).unwrap();
            if value.get("method").and_then(|m| m.as_str()) == Some("browsingContext.contextCreated") {
                let context = value["params"]["context"].as_str().unwrap().to_string();
                return (context, session_id.to_string());
            }
        }
    }

    /// Sends a BiDi command and returns its parsed success/error reply.
    pub async fn send_command(&mut self, id: u64, method: &str, params: Value) -> Value {
        self.bidi.send_in(json!({ "id": id, "method": method, "params": params }).to_string());
        loop {
            let frame = self
                .bidi
                .recv_out_timeout(Duration::from_secs(5))
                .await
                .expect("no reply to command in time");
            let value: Value = serde_json::from_str(&frame).unwrap();
            if value.get("id").and_then(|v| v.as_u64()) == Some(id) {
                return value;
            }
        }
    }

    /// Injects a CDP event as if it arrived over `session`.
    pub fn inject_cdp_event(&self, session: &str, method: &str, params: Value) {
        self.cdp.send_in(
            json!({
                "sessionId": session,
                "method": method,
                "params": params,
            })
            .to_string(),
        );
    }

    /// Collects every BiDi event emitted within `dur`, in delivery order.
    pub async fn collect_events(&mut self, dur: Duration) -> Vec<Value> {
        let mut out = Vec::new();
        loop {
            match self.bidi.recv_out_timeout(dur).await {
                Some(frame) => {
                    let value: Value = serde_json::from_str(&frame).unwrap();
                    if value.get("type").and_then(|t| t.as_str()) == Some("event") {
                        out.push(value);
                    }
                }
                None => break,
            }
        }
        out
    }
}

pub fn event_methods(events: &[Value]) -> Vec<String> {
    events
        .iter()
        .map(|e| e["method"].as_str().unwrap_or_default().to_string())
        .collect()
}
