//! Realm / context / target registry (spec.md §4.6): tracks browsing
//! contexts, execution realms, and CDP targets, and hands out the stable
//! BiDi ids the rest of the engine treats as opaque keys.

mod context;
mod navigation;
mod realm;
mod target;

pub use context::{ContextNode, ContextTree};
pub use navigation::{NavigationStatus, NavigationTracker};
pub use realm::{RealmRecord, RealmTable};
pub use target::{CdpTarget, TargetTable};

use serde::{Deserialize, Serialize};

/// A BiDi browsing-context id. Chosen by the translator when a target or
/// frame is first observed; stable for the context's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrowsingContextId(pub String);

impl std::fmt::Display for BrowsingContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<cdp_protocol::target::TargetId> for BrowsingContextId {
    fn from(id: cdp_protocol::target::TargetId) -> Self {
        BrowsingContextId(id.0)
    }
}

/// A BiDi user-context id; `"default"` is the implicit one every browser
/// starts with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserContextId(pub String);

impl UserContextId {
    pub fn default_context() -> Self {
        UserContextId("default".to_string())
    }
}

impl Default for UserContextId {
    fn default() -> Self {
        Self::default_context()
    }
}

/// A navigation UUID (spec.md §3), carried on every BiDi navigation event
/// for a given document load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigationId(pub uuid::Uuid);

impl NavigationId {
    pub fn new() -> Self {
        NavigationId(uuid::Uuid::new_v4())
    }
}

impl std::fmt::Display for NavigationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
