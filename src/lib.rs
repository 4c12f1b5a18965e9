//! A translator that exposes a [WebDriver BiDi](https://w3c.github.io/webdriver-bidi/)
//! session on one side and drives a [Chrome DevTools
//! Protocol](https://chromedevtools.github.io/devtools-protocol/) session on
//! the other.
//!
//! A host process owns a transport (WebSocket server, OS pipe, or an
//! in-page binding pair) and a CDP connection to a running Chromium
//! instance, and hands both to [`run`]. From there the translator parses
//! incoming BiDi commands, routes them through the per-module processors in
//! [`processors`], issues the CDP calls those processors need, and folds CDP
//! events back into BiDi events on the way out.
//!
//! # Example
//! ```no_run
//! use bidi_cdp::config::TranslatorConfig;
//! use bidi_cdp::transport::{PipeTransport, WebSocketTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Chromium was launched with `--remote-debugging-pipe`; its CDP
//!     // connection speaks over our inherited stdio.
//!     let cdp_transport = PipeTransport::from_stdio();
//!     // A BiDi-speaking client dials in over a WebSocket.
//!     let bidi_transport = WebSocketTransport::accept_one("127.0.0.1:9222").await?;
//!     bidi_cdp::run(cdp_transport, bidi_transport, TranslatorConfig::builder().build()).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod bidi;
pub mod cdp_client;
pub mod cdp_conn;
pub mod config;
pub mod error;
pub mod events;
pub mod mapper;
pub mod network;
pub mod processors;
pub mod registry;
pub mod subscription;
pub mod transport;
pub mod urlpattern;

pub use crate::config::{InterceptMode, TranslatorConfig};
pub use crate::error::{BidiError, BidiErrorKind, CdpError, Result};
pub use crate::mapper::{run, Mapper};
