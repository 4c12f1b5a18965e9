//! The subscription manager (spec.md §4.2): decides, for every
//! (event-name, context) pair, the ordered set of channel tags an outgoing
//! event must be delivered to. The single source of truth domain
//! processors consult before doing expensive CDP enabling (notably
//! `Fetch.enable` for interception).

use crate::error::BidiError;
use crate::registry::BrowsingContextId;

/// Module-level wildcards expand to this fixed event list at subscribe
/// time (spec.md §4.2: "Whole-module wildcards count as subscribing to
/// each of their expanded events at the time of the subscribe call").
fn expand_module(module: &str) -> Option<&'static [&'static str]> {
    match module {
        "browsingContext" => Some(&[
            "browsingContext.contextCreated",
            "browsingContext.contextDestroyed",
            "browsingContext.navigationStarted",
            "browsingContext.navigationCommitted",
            "browsingContext.domContentLoaded",
            "browsingContext.load",
            "browsingContext.navigationFailed",
            "browsingContext.navigationAborted",
            "browsingContext.fragmentNavigated",
            "browsingContext.userPromptOpened",
            "browsingContext.userPromptClosed",
        ]),
        "network" => Some(&[
            "network.beforeRequestSent",
            "network.responseStarted",
            "network.responseCompleted",
            "network.authRequired",
            "network.fetchError",
        ]),
        "script" => Some(&[
            "script.message",
            "script.realmCreated",
            "script.realmDestroyed",
        ]),
        _ => None,
    }
}

fn expand_events(requested: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for name in requested {
        if let Some(expanded) = expand_module(name) {
            for ev in expanded {
                if !out.iter().any(|e: &String| e == ev) {
                    out.push((*ev).to_string());
                }
            }
        } else if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: String,
    pub events: Vec<String>,
    pub contexts: Vec<BrowsingContextId>,
    pub user_contexts: Vec<String>,
    pub channel: String,
}

impl Subscription {
    fn is_global(&self) -> bool {
        self.contexts.is_empty() && self.user_contexts.is_empty()
    }

    fn matches_context(&self, top_level: &BrowsingContextId) -> bool {
        // `contexts` is the only scoping dimension with more than one
        // possible value today: a subscription that names no contexts
        // matches every context, whether it's unscoped entirely or scoped
        // by `user_contexts` instead (there is only the implicit default
        // user context, so "every context in this user context" and "every
        // context" coincide — see default_user_context()).
        self.contexts.is_empty() || self.contexts.iter().any(|c| c == top_level)
    }
}

#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Insertion order is significant: channel lookups return
    /// first-subscribed-first (spec.md §4.2).
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl SubscriptionManager {
    fn alloc_id(&mut self) -> String {
        let id = format!("sub-{}", self.next_id);
        self.next_id += 1;
        id
    }

    /// `contexts` must already be resolved to top-level ids — the caller
    /// (the session processor) is responsible for mapping a nested context
    /// to its top-level ancestor via `ContextTree::find_top_level_context_id`
    /// before calling this, per spec.md §4.2's "subscribing to a nested
    /// context subscribes to the enclosing top-level context".
    pub fn subscribe(
        &mut self,
        events: Vec<String>,
        contexts: Vec<BrowsingContextId>,
        user_contexts: Vec<String>,
        channel: String,
    ) -> String {
        let id = self.alloc_id();
        self.subscriptions.push(Subscription {
            id: id.clone(),
            events: expand_events(&events),
            contexts,
            user_contexts,
            channel,
        });
        id
    }

    /// Atomic over the named (event, context) pairs: if any pair has no
    /// matching subscription the whole call fails and state is unchanged.
    pub fn unsubscribe_by_attributes(
        &mut self,
        events: &[String],
        contexts: &[BrowsingContextId],
        channel: &str,
    ) -> Result<(), BidiError> {
        let events = expand_events(events);
        let context_candidates: Vec<Option<BrowsingContextId>> = if contexts.is_empty() {
            vec![None]
        } else {
            contexts.iter().cloned().map(Some).collect()
        };

        for event in &events {
            for ctx in &context_candidates {
                let found = self.subscriptions.iter().any(|s| {
                    s.channel == channel
                        && s.events.iter().any(|e| e == event)
                        && match ctx {
                            None => s.is_global(),
                            Some(c) => s.contexts.iter().any(|sc| sc == c),
                        }
                });
                if !found {
                    return Err(BidiError::invalid_argument(format!(
                        "no subscription found for {event} on {ctx:?}"
                    )));
                }
            }
        }

        for sub in &mut self.subscriptions {
            if sub.channel != channel {
                continue;
            }
            let matches_ctx = contexts.is_empty()
                || contexts.iter().any(|c| sub.contexts.iter().any(|sc| sc == c));
            if !matches_ctx {
                continue;
            }
            sub.events.retain(|e| !events.contains(e));
        }
        self.subscriptions.retain(|s| !s.events.is_empty());
        Ok(())
    }

    /// Atomic over the whole id list: any unknown or already-removed id
    /// fails the entire call.
    pub fn unsubscribe_by_ids(&mut self, ids: &[String]) -> Result<(), BidiError> {
        for id in ids {
            if !self.subscriptions.iter().any(|s| &s.id == id) {
                return Err(BidiError::invalid_argument(format!(
                    "no subscription with id {id}"
                )));
            }
        }
        self.subscriptions.retain(|s| !ids.contains(&s.id));
        Ok(())
    }

    /// Channels for (event, top-level context) in first-subscribed order,
    /// deduplicated.
    pub fn channels_for(&self, event: &str, top_level: Option<&BrowsingContextId>) -> Vec<String> {
        let mut out = Vec::new();
        for sub in &self.subscriptions {
            if !sub.events.iter().any(|e| e == event) {
                continue;
            }
            let matches = match top_level {
                Some(ctx) => sub.matches_context(ctx),
                None => sub.is_global(),
            };
            if matches && !out.contains(&sub.channel) {
                out.push(sub.channel.clone());
            }
        }
        out
    }

    pub fn is_subscribed_to(&self, event: &str, top_level: Option<&BrowsingContextId>) -> bool {
        !self.channels_for(event, top_level).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_are_first_subscribed_first_and_deduplicated() {
        let mut mgr = SubscriptionManager::default();
        let ctx = BrowsingContextId("ctx-1".into());
        mgr.subscribe(
            vec!["network.beforeRequestSent".into()],
            vec![],
            vec![],
            "a".into(),
        );
        mgr.subscribe(
            vec!["network.beforeRequestSent".into()],
            vec![ctx.clone()],
            vec![],
            "b".into(),
        );
        let channels = mgr.channels_for("network.beforeRequestSent", Some(&ctx));
        assert_eq!(channels, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn failed_unsubscribe_leaves_state_untouched() {
        let mut mgr = SubscriptionManager::default();
        mgr.subscribe(vec!["network.beforeRequestSent".into()], vec![], vec![], "a".into());
        let before = mgr.channels_for("network.beforeRequestSent", None);
        let err = mgr.unsubscribe_by_attributes(
            &["network.responseStarted".into()],
            &[],
            "a",
        );
        assert!(err.is_err());
        let after = mgr.channels_for("network.beforeRequestSent", None);
        assert_eq!(before, after);
    }

    #[test]
    fn module_wildcard_expands_to_fixed_event_list() {
        let mut mgr = SubscriptionManager::default();
        mgr.subscribe(vec!["network".into()], vec![], vec![], "a".into());
        assert!(mgr.is_subscribed_to("network.authRequired", None));
        assert!(mgr.is_subscribed_to("network.fetchError", None));
    }

    #[test]
    fn subscription_scoped_only_by_user_context_matches_every_context() {
        let mut mgr = SubscriptionManager::default();
        mgr.subscribe(
            vec!["network.beforeRequestSent".into()],
            vec![],
            vec!["default".into()],
            "a".into(),
        );
        let ctx = BrowsingContextId("ctx-1".into());
        assert!(mgr.is_subscribed_to("network.beforeRequestSent", Some(&ctx)));
        let channels = mgr.channels_for("network.beforeRequestSent", Some(&ctx));
        assert_eq!(channels, vec!["a".to_string()]);
    }
}
