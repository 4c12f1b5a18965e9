//! Data collectors (spec.md §3): a client-registered request whose
//! response bodies should be retained, filtered by data type and
//! optionally scoped to a set of contexts/user-contexts. Body bytes
//! themselves flow through the JS-value serialization layer this
//! translator treats as an external collaborator (spec.md §1); this
//! registry owns only the bookkeeping a `network.*` collector command
//! needs: registration, scoping, and disposal.

use crate::error::BidiError;
use crate::registry::{BrowsingContextId, UserContextId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorDataType {
    Response,
    Request,
}

#[derive(Debug, Clone)]
pub struct DataCollector {
    pub id: String,
    pub max_encoded_data_size: u64,
    pub data_types: Vec<CollectorDataType>,
    pub contexts: Option<Vec<BrowsingContextId>>,
    pub user_contexts: Option<Vec<UserContextId>>,
}

impl DataCollector {
    fn applies_to(&self, context: Option<&BrowsingContextId>) -> bool {
        match (&self.contexts, context) {
            (None, _) => true,
            (Some(ctxs), Some(ctx)) => ctxs.iter().any(|c| c == ctx),
            (Some(_), None) => false,
        }
    }
}

#[derive(Default)]
pub struct DataCollectorRegistry {
    collectors: Vec<DataCollector>,
    next_id: u64,
}

impl DataCollectorRegistry {
    pub fn add(
        &mut self,
        max_encoded_data_size: u64,
        data_types: Vec<CollectorDataType>,
        contexts: Option<Vec<BrowsingContextId>>,
        user_contexts: Option<Vec<UserContextId>>,
    ) -> String {
        let id = format!("collector-{}", self.next_id);
        self.next_id += 1;
        self.collectors.push(DataCollector {
            id: id.clone(),
            max_encoded_data_size,
            data_types,
            contexts,
            user_contexts,
        });
        id
    }

    pub fn remove(&mut self, id: &str) -> Result<(), BidiError> {
        let before = self.collectors.len();
        self.collectors.retain(|c| c.id != id);
        if self.collectors.len() == before {
            return Err(BidiError::new(
                crate::error::BidiErrorKind::NoSuchCollector,
                format!("no collector with id {id}"),
            ));
        }
        Ok(())
    }

    pub fn disown(&mut self, collector_id: &str, _request_ids: &[String]) -> Result<(), BidiError> {
        if !self.collectors.iter().any(|c| c.id == collector_id) {
            return Err(BidiError::new(
                crate::error::BidiErrorKind::NoSuchCollector,
                format!("no collector with id {collector_id}"),
            ));
        }
        Ok(())
    }

    /// Whether any collector currently applies to `context`, used to decide
    /// whether `Fetch.enable` must stay on for this target even with no
    /// matching intercept (spec.md §4.4).
    pub fn has_any_for_context(&self, context: &BrowsingContextId) -> bool {
        self.collectors.iter().any(|c| c.applies_to(Some(context)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_unknown_collector_errors() {
        let mut reg = DataCollectorRegistry::default();
        assert!(reg.remove("nope").is_err());
    }

    #[test]
    fn scoped_collector_only_applies_to_its_context() {
        let mut reg = DataCollectorRegistry::default();
        let ctx = BrowsingContextId("ctx-1".into());
        reg.add(
            1_000_000,
            vec![CollectorDataType::Response],
            Some(vec![ctx.clone()]),
            None,
        );
        assert!(reg.has_any_for_context(&ctx));
        assert!(!reg.has_any_for_context(&BrowsingContextId("ctx-2".into())));
    }
}
