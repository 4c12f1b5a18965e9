//! The browsing-context tree (spec.md §3/§4.6): the BiDi-visible frame tree
//! node, usually 1:1 with a CDP target for top-level frames, with nested
//! (iframe) contexts hanging off a top-level one.

use fnv::FnvHashMap;

use cdp_protocol::page::FrameId;
use cdp_protocol::target::TargetId;

use super::{BrowsingContextId, UserContextId};

#[derive(Debug, Clone)]
pub struct ContextNode {
    pub id: BrowsingContextId,
    pub parent: Option<BrowsingContextId>,
    pub user_context: UserContextId,
    pub url: String,
    pub target_id: Option<TargetId>,
    pub frame_id: Option<FrameId>,
}

impl ContextNode {
    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}

/// Owns the full context tree. Consumed contracts per spec.md §4.6:
/// `findTopLevelContextId`, plus lookups the network tracker and
/// browsing-context processor both need.
#[derive(Debug, Default)]
pub struct ContextTree {
    contexts: FnvHashMap<BrowsingContextId, ContextNode>,
    by_frame: FnvHashMap<FrameId, BrowsingContextId>,
}

impl ContextTree {
    pub fn insert_top_level(
        &mut self,
        id: BrowsingContextId,
        target_id: TargetId,
        user_context: UserContextId,
        url: String,
    ) {
        self.contexts.insert(
            id.clone(),
            ContextNode {
                id,
                parent: None,
                user_context,
                url,
                target_id: Some(target_id),
                frame_id: None,
            },
        );
    }

    pub fn insert_child(
        &mut self,
        id: BrowsingContextId,
        parent: BrowsingContextId,
        frame_id: FrameId,
        url: String,
    ) {
        let user_context = self
            .contexts
            .get(&parent)
            .map(|p| p.user_context.clone())
            .unwrap_or_default();
        self.by_frame.insert(frame_id.clone(), id.clone());
        self.contexts.insert(
            id.clone(),
            ContextNode {
                id,
                parent: Some(parent),
                user_context,
                url,
                target_id: None,
                frame_id: Some(frame_id),
            },
        );
    }

    pub fn bind_frame(&mut self, context: &BrowsingContextId, frame_id: FrameId) {
        self.by_frame.insert(frame_id, context.clone());
    }

    pub fn get(&self, id: &BrowsingContextId) -> Option<&ContextNode> {
        self.contexts.get(id)
    }

    pub fn get_mut(&mut self, id: &BrowsingContextId) -> Option<&mut ContextNode> {
        self.contexts.get_mut(id)
    }

    pub fn context_for_frame(&self, frame_id: &FrameId) -> Option<&BrowsingContextId> {
        self.by_frame.get(frame_id)
    }

    /// The defining contract consumed by the network tracker and the
    /// subscription manager: every context resolves to the top-level
    /// ancestor that owns its subscriptions and intercepts.
    pub fn find_top_level_context_id(
        &self,
        ctx_id: &BrowsingContextId,
    ) -> Option<BrowsingContextId> {
        let mut current = self.contexts.get(ctx_id)?;
        while let Some(parent_id) = &current.parent {
            current = self.contexts.get(parent_id)?;
        }
        Some(current.id.clone())
    }

    /// Every context id, used when a late subscriber needs the subscribe
    /// hook replayed for all already-existing contexts (spec.md §4.3).
    pub fn all_ids(&self) -> impl Iterator<Item = &BrowsingContextId> {
        self.contexts.keys()
    }

    pub fn children_of(&self, parent: &BrowsingContextId) -> Vec<BrowsingContextId> {
        self.contexts
            .values()
            .filter(|n| n.parent.as_ref() == Some(parent))
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn top_level_ids(&self) -> impl Iterator<Item = &BrowsingContextId> {
        self.contexts.values().filter(|n| n.is_top_level()).map(|n| &n.id)
    }

    /// Removes a context and, recursively, every descendant.
    pub fn remove(&mut self, id: &BrowsingContextId) -> Vec<BrowsingContextId> {
        let mut removed = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(next) = stack.pop() {
            stack.extend(self.children_of(&next));
            if let Some(node) = self.contexts.remove(&next) {
                if let Some(frame_id) = node.frame_id {
                    self.by_frame.remove(&frame_id);
                }
            }
            removed.push(next);
        }
        removed
    }
}
