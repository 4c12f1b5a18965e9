//! Active `network.addIntercept` registrations (spec.md §4.5.4): which
//! phase(s) and contexts an intercept applies to, and the URL patterns it
//! must match before a paused request is surfaced to the client instead of
//! being auto-continued.

use crate::error::BidiError;
use crate::registry::BrowsingContextId;
use crate::urlpattern::UrlPattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptPhase {
    BeforeRequestSent,
    ResponseStarted,
    AuthRequired,
}

#[derive(Debug, Clone)]
pub struct Intercept {
    pub id: String,
    pub phases: Vec<InterceptPhase>,
    pub url_patterns: Vec<UrlPattern>,
    pub contexts: Option<Vec<BrowsingContextId>>,
}

impl Intercept {
    fn matches_context(&self, top_level: Option<&BrowsingContextId>) -> bool {
        match (&self.contexts, top_level) {
            (None, _) => true,
            (Some(ctxs), Some(ctx)) => ctxs.iter().any(|c| c == ctx),
            (Some(_), None) => false,
        }
    }

    fn matches_url(&self, url: &str) -> bool {
        self.url_patterns.is_empty() || self.url_patterns.iter().any(|p| p.matches(url))
    }
}

#[derive(Default)]
pub struct InterceptRegistry {
    intercepts: Vec<Intercept>,
    next_id: u64,
}

impl InterceptRegistry {
    pub fn add(
        &mut self,
        phases: Vec<InterceptPhase>,
        url_patterns: Vec<UrlPattern>,
        contexts: Option<Vec<BrowsingContextId>>,
    ) -> String {
        let id = format!("intercept-{}", self.next_id);
        self.next_id += 1;
        self.intercepts.push(Intercept {
            id: id.clone(),
            phases,
            url_patterns,
            contexts,
        });
        id
    }

    pub fn remove(&mut self, id: &str) -> Result<(), BidiError> {
        let before = self.intercepts.len();
        self.intercepts.retain(|i| i.id != id);
        if self.intercepts.len() == before {
            return Err(BidiError::no_such_intercept(format!(
                "no intercept with id {id}"
            )));
        }
        Ok(())
    }

    /// Ids of every intercept matching `url`/`phase`/`top_level`, in
    /// registration order.
    pub fn matching(
        &self,
        url: &str,
        phase: InterceptPhase,
        top_level: Option<&BrowsingContextId>,
    ) -> Vec<String> {
        self.intercepts
            .iter()
            .filter(|i| i.phases.contains(&phase))
            .filter(|i| i.matches_context(top_level))
            .filter(|i| i.matches_url(url))
            .map(|i| i.id.clone())
            .collect()
    }

    pub fn any_matches(
        &self,
        url: &str,
        phase: InterceptPhase,
        top_level: Option<&BrowsingContextId>,
    ) -> bool {
        !self.matching(url, phase, top_level).is_empty()
    }

    /// Whether any intercept (in any phase) scopes to this target, used to
    /// decide the `Fetch.enable` patterns/refcount (spec.md §4.5.4).
    pub fn has_any_for_target(&self, top_level: &BrowsingContextId) -> bool {
        self.intercepts
            .iter()
            .any(|i| i.matches_context(Some(top_level)))
    }

    pub fn patterns_for_target(&self, top_level: &BrowsingContextId) -> Vec<cdp_protocol::fetch::RequestPattern> {
        use cdp_protocol::fetch::{RequestPattern, RequestStage};
        let mut saw_request = false;
        let mut saw_response = false;
        for intercept in &self.intercepts {
            if !intercept.matches_context(Some(top_level)) {
                continue;
            }
            for phase in &intercept.phases {
                match phase {
                    InterceptPhase::BeforeRequestSent => saw_request = true,
                    InterceptPhase::ResponseStarted => saw_response = true,
                    InterceptPhase::AuthRequired => saw_request = true,
                }
            }
        }
        let mut patterns = Vec::new();
        if saw_request {
            patterns.push(RequestPattern {
                url_pattern: Some("*".into()),
                request_stage: Some(RequestStage::Request),
            });
        }
        if saw_response {
            patterns.push(RequestPattern {
                url_pattern: Some("*".into()),
                request_stage: Some(RequestStage::Response),
            });
        }
        if patterns.is_empty() {
            patterns.push(RequestPattern {
                url_pattern: Some("*".into()),
                request_stage: Some(RequestStage::Request),
            });
        }
        patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_the_registered_phase() {
        let mut reg = InterceptRegistry::default();
        reg.add(
            vec![InterceptPhase::BeforeRequestSent],
            vec![UrlPattern::raw("*").unwrap()],
            None,
        );
        assert!(reg.any_matches("https://a.test/", InterceptPhase::BeforeRequestSent, None));
        assert!(!reg.any_matches("https://a.test/", InterceptPhase::ResponseStarted, None));
    }

    #[test]
    fn scoped_intercept_ignores_other_contexts() {
        let mut reg = InterceptRegistry::default();
        let ctx = BrowsingContextId("ctx-1".into());
        reg.add(
            vec![InterceptPhase::BeforeRequestSent],
            vec![],
            Some(vec![ctx.clone()]),
        );
        assert!(reg.any_matches("https://a.test/", InterceptPhase::BeforeRequestSent, Some(&ctx)));
        let other = BrowsingContextId("ctx-2".into());
        assert!(!reg.any_matches("https://a.test/", InterceptPhase::BeforeRequestSent, Some(&other)));
    }

    #[test]
    fn removing_unknown_id_errors() {
        let mut reg = InterceptRegistry::default();
        assert!(reg.remove("nope").is_err());
    }
}
