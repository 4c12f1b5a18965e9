//! Navigation tracking (spec.md §3/§4.6): a navigation id is a UUID chosen
//! when the document request is first observed, carried on every BiDi
//! navigation event, and superseded (with `navigationAborted` on the old
//! id) by the next navigation that preempts it.

use fnv::FnvHashMap;

use cdp_protocol::page::LoaderId;

use super::{BrowsingContextId, NavigationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationStatus {
    Pending,
    Committed,
    Failed,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct NavigationRecord {
    pub id: NavigationId,
    pub context: BrowsingContextId,
    pub start_url: String,
    pub committed_url: Option<String>,
    pub status: NavigationStatus,
}

/// The outcome of starting a navigation: the new record's id, and the
/// previous pending navigation for the same context, if any (the caller
/// must emit `navigationAborted` for it before emitting `navigationStarted`
/// for the new one).
pub struct NavigationStart {
    pub id: NavigationId,
    pub preempted: Option<NavigationId>,
}

#[derive(Debug, Default)]
pub struct NavigationTracker {
    by_context: FnvHashMap<BrowsingContextId, NavigationRecord>,
    by_loader: FnvHashMap<LoaderId, BrowsingContextId>,
}

impl NavigationTracker {
    pub fn start(
        &mut self,
        context: BrowsingContextId,
        loader_id: LoaderId,
        url: String,
    ) -> NavigationStart {
        let preempted = self
            .by_context
            .get(&context)
            .filter(|rec| rec.status == NavigationStatus::Pending)
            .map(|rec| rec.id);

        if let Some(id) = preempted {
            if let Some(rec) = self.by_context.get_mut(&context) {
                if rec.id == id {
                    rec.status = NavigationStatus::Aborted;
                }
            }
        }

        let id = NavigationId::new();
        self.by_loader.insert(loader_id, context.clone());
        self.by_context.insert(
            context.clone(),
            NavigationRecord {
                id,
                context,
                start_url: url,
                committed_url: None,
                status: NavigationStatus::Pending,
            },
        );
        NavigationStart { id, preempted }
    }

    pub fn navigation_id_for_context(&self, context: &BrowsingContextId) -> Option<NavigationId> {
        self.by_context.get(context).map(|rec| rec.id)
    }

    pub fn navigation_id_for_loader(&self, loader_id: &LoaderId) -> Option<NavigationId> {
        let context = self.by_loader.get(loader_id)?;
        self.navigation_id_for_context(context)
    }

    pub fn commit(&mut self, context: &BrowsingContextId, url: String) {
        if let Some(rec) = self.by_context.get_mut(context) {
            rec.committed_url = Some(url);
            rec.status = NavigationStatus::Committed;
        }
    }

    pub fn fail(&mut self, context: &BrowsingContextId) {
        if let Some(rec) = self.by_context.get_mut(context) {
            rec.status = NavigationStatus::Failed;
        }
    }

    pub fn remove_context(&mut self, context: &BrowsingContextId) {
        self.by_context.remove(context);
        self.by_loader.retain(|_, c| c != context);
    }
}
