//! The CDP target (spec.md §4.4): owns the per-target CDP session, toggles
//! `Fetch.enable` when interception or response collection needs change,
//! and tracks the target ↔ browsing-context association the rest of the
//! registry looks up by.

use fnv::FnvHashMap;

use cdp_protocol::{fetch, network, page, runtime, target::{SessionId, TargetId}};

use crate::cdp_client::CdpClient;
use crate::error::Result;
use crate::registry::BrowsingContextId;

/// One attached CDP target. Enables `Page`/`Runtime`/`Network` eagerly on
/// attach; `Fetch` is toggled lazily as intercepts/collectors come and go.
pub struct CdpTarget {
    pub client: CdpClient,
    pub target_id: TargetId,
    pub session_id: SessionId,
    pub context_id: BrowsingContextId,
    fetch_enabled: bool,
    fetch_refcount: usize,
}

impl CdpTarget {
    pub fn new(
        client: CdpClient,
        target_id: TargetId,
        session_id: SessionId,
        context_id: BrowsingContextId,
    ) -> Self {
        CdpTarget {
            client,
            target_id,
            session_id,
            context_id,
            fetch_enabled: false,
            fetch_refcount: 0,
        }
    }

    /// Enables the always-on domains for a freshly attached target.
    pub async fn enable(&self) -> Result<()> {
        self.client.execute(page::EnableParams::default()).await?;
        self.client
            .execute(page::SetLifecycleEventsEnabledParams { enabled: true })
            .await?;
        self.client.execute(runtime::EnableParams::default()).await?;
        self.client.execute(network::EnableParams::default()).await?;
        Ok(())
    }

    /// Reference-counts the union of active intercepts and collectors that
    /// target this session (spec.md §5 "shared resources"). `patterns` is
    /// only consulted when the ref-count transitions 0→1.
    pub async fn bump_fetch(&mut self, patterns: Vec<fetch::RequestPattern>) -> Result<()> {
        self.fetch_refcount += 1;
        if !self.fetch_enabled {
            self.client
                .execute(fetch::EnableParams {
                    patterns,
                    handle_auth_requests: Some(true),
                })
                .await?;
            self.fetch_enabled = true;
        }
        Ok(())
    }

    pub async fn drop_fetch(&mut self) -> Result<()> {
        self.fetch_refcount = self.fetch_refcount.saturating_sub(1);
        if self.fetch_refcount == 0 && self.fetch_enabled {
            self.client.execute(fetch::DisableParams::default()).await?;
            self.fetch_enabled = false;
        }
        Ok(())
    }

    pub fn fetch_enabled(&self) -> bool {
        self.fetch_enabled
    }
}

#[derive(Default)]
pub struct TargetTable {
    by_session: FnvHashMap<SessionId, CdpTarget>,
    session_by_target: FnvHashMap<TargetId, SessionId>,
}

impl TargetTable {
    pub fn insert(&mut self, target: CdpTarget) {
        self.session_by_target
            .insert(target.target_id.clone(), target.session_id.clone());
        self.by_session.insert(target.session_id.clone(), target);
    }

    pub fn remove_by_session(&mut self, session_id: &SessionId) -> Option<CdpTarget> {
        let target = self.by_session.remove(session_id)?;
        self.session_by_target.remove(&target.target_id);
        Some(target)
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&CdpTarget> {
        self.by_session.get(session_id)
    }

    pub fn get_mut(&mut self, session_id: &SessionId) -> Option<&mut CdpTarget> {
        self.by_session.get_mut(session_id)
    }

    pub fn session_for_target(&self, target_id: &TargetId) -> Option<&SessionId> {
        self.session_by_target.get(target_id)
    }

    pub fn get_by_context_mut(&mut self, context_id: &BrowsingContextId) -> Option<&mut CdpTarget> {
        self.by_session
            .values_mut()
            .find(|t| &t.context_id == context_id)
    }

    pub fn all(&self) -> impl Iterator<Item = &CdpTarget> {
        self.by_session.values()
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut CdpTarget> {
        self.by_session.values_mut()
    }
}
