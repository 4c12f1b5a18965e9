//! Realm bookkeeping: JavaScript execution contexts within a target.
//! Serializing values between realms is out of scope (spec.md §1); this
//! table exists purely so the context registry and processors can answer
//! "which realm(s) does this context currently have".

use fnv::FnvHashMap;

use cdp_protocol::runtime::{ExecutionContextDescription, ExecutionContextId};

use super::BrowsingContextId;

#[derive(Debug, Clone)]
pub struct RealmRecord {
    pub id: ExecutionContextId,
    pub context: Option<BrowsingContextId>,
    pub is_default: bool,
}

#[derive(Debug, Default)]
pub struct RealmTable {
    realms: FnvHashMap<ExecutionContextId, RealmRecord>,
}

impl RealmTable {
    pub fn insert(&mut self, context: Option<BrowsingContextId>, desc: &ExecutionContextDescription) {
        let is_default = desc
            .aux_data
            .as_ref()
            .and_then(|aux| aux.is_default)
            .unwrap_or(false);
        self.realms.insert(
            desc.id,
            RealmRecord {
                id: desc.id,
                context,
                is_default,
            },
        );
    }

    pub fn remove(&mut self, id: ExecutionContextId) -> Option<RealmRecord> {
        self.realms.remove(&id)
    }

    pub fn clear(&mut self) {
        self.realms.clear();
    }

    pub fn clear_for_context(&mut self, context: &BrowsingContextId) {
        self.realms
            .retain(|_, realm| realm.context.as_ref() != Some(context));
    }

    pub fn realms_for_context(&self, context: &BrowsingContextId) -> Vec<&RealmRecord> {
        self.realms
            .values()
            .filter(|r| r.context.as_ref() == Some(context))
            .collect()
    }

    pub fn default_realm_for_context(&self, context: &BrowsingContextId) -> Option<&RealmRecord> {
        self.realms
            .values()
            .find(|r| r.context.as_ref() == Some(context) && r.is_default)
    }
}
