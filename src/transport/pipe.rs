//! OS pipe transport: stdin/stdout framed with a `\0` delimiter per
//! spec.md §6. Reading and writing are each driven by a background task so
//! the blocking-ish line-oriented stdio APIs don't need a hand-rolled
//! `Future` — the same shape as `spider_chrome`'s `async_process.rs`, which
//! shuttles a child process's stdio through channels rather than polling
//! the file descriptors directly.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::TransportError;

pub struct PipeTransport {
    rx: mpsc::UnboundedReceiver<Result<String, TransportError>>,
    tx: mpsc::UnboundedSender<String>,
}

impl PipeTransport {
    /// Spawns reader/writer tasks over the process's own stdin/stdout.
    pub fn from_stdio() -> Self {
        let (read_tx, rx) = mpsc::unbounded();
        tokio::spawn(async move {
            let mut reader = BufReader::new(tokio::io::stdin());
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(0, &mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {
                        if buf.last() == Some(&0) {
                            buf.pop();
                        }
                        let frame = String::from_utf8_lossy(&buf).into_owned();
                        if read_tx.unbounded_send(Ok(frame)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = read_tx.unbounded_send(Err(err.into()));
                        break;
                    }
                }
            }
        });

        let (tx, mut write_rx) = mpsc::unbounded::<String>();
        tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(frame) = write_rx.next().await {
                if stdout.write_all(frame.as_bytes()).await.is_err() {
                    break;
                }
                if stdout.write_all(&[0]).await.is_err() {
                    break;
                }
                if stdout.flush().await.is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }
}

impl Stream for PipeTransport {
    type Item = Result<String, TransportError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_next_unpin(cx)
    }
}

impl Sink<String> for PipeTransport {
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
