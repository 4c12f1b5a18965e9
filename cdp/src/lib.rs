//! Hand-written subset of the Chrome DevTools Protocol needed to drive a
//! WebDriver BiDi session.
//!
//! The upstream teacher generates its CDP types from the full PDL protocol
//! definition at build time (`chromiumoxide_cdp`, via `chromiumoxide_pdl`):
//! tens of thousands of lines covering every domain. This crate only speaks
//! the handful of domains the translator actually drives — `Target`,
//! `Page`, `Network`, `Fetch`, `Runtime` — so those are written out by hand,
//! one module per domain, with a closed [`event::CdpEvent`] enum standing in
//! for the generated crate's type-erased event dispatch.

pub mod event;
pub mod fetch;
pub mod network;
pub mod page;
pub mod runtime;
pub mod target;
