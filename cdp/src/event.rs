//! Event dispatch.
//!
//! The generated chromiumoxide protocol represents incoming events as
//! type-erased `Arc<dyn Event>` so that a library with hundreds of domains
//! can hand a caller a generic `EventStream<T>` for any one of them. This
//! crate only speaks a fixed, small set of domains, so a closed enum plays
//! the same role with no downcasting required: `decode` is the one place
//! that has to know the mapping from a CDP `method` string to a payload
//! shape.

use bidi_cdp_types::{Method, MethodId};
use serde_json::Value;

use crate::fetch;
use crate::network;
use crate::page;
use crate::runtime;
use crate::target;

/// A decoded CDP event, tagged by its originating domain.
#[derive(Debug, Clone)]
pub enum CdpEvent {
    Target(target::TargetEvent),
    Page(page::PageEvent),
    Network(network::NetworkEvent),
    Fetch(fetch::FetchEvent),
    Runtime(runtime::RuntimeEvent),
}

impl Method for CdpEvent {
    fn identifier(&self) -> MethodId {
        match self {
            CdpEvent::Target(e) => e.identifier(),
            CdpEvent::Page(e) => e.identifier(),
            CdpEvent::Network(e) => e.identifier(),
            CdpEvent::Fetch(e) => e.identifier(),
            CdpEvent::Runtime(e) => e.identifier(),
        }
    }
}

/// Errors produced while matching a `method` string against the known event
/// shapes and decoding its `params`.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown CDP event method: {0}")]
    UnknownMethod(String),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Decode a raw `(method, params)` pair into a typed [`CdpEvent`].
///
/// Domains/events this translator never consumes (e.g. `DOM.*`, emulation
/// events) are not registered here; they surface as `UnknownMethod` and the
/// CDP connection logs and drops them rather than failing the session.
pub fn decode(method: &str, params: Value) -> Result<CdpEvent, DecodeError> {
    let (domain, name) = method
        .split_once('.')
        .ok_or_else(|| DecodeError::UnknownMethod(method.to_string()))?;
    match domain {
        "Target" => target::TargetEvent::decode(name, params).map(CdpEvent::Target),
        "Page" => page::PageEvent::decode(name, params).map(CdpEvent::Page),
        "Network" => network::NetworkEvent::decode(name, params).map(CdpEvent::Network),
        "Fetch" => fetch::FetchEvent::decode(name, params).map(CdpEvent::Fetch),
        "Runtime" => runtime::RuntimeEvent::decode(name, params).map(CdpEvent::Runtime),
        _ => Err(DecodeError::UnknownMethod(method.to_string())),
    }
}
