//! `session.*` commands (spec.md §4.2): subscribe/unsubscribe are the
//! client-facing surface of the subscription manager; `status`/`new`/`end`
//! are the session-lifecycle commands every BiDi endpoint answers, kept
//! minimal since this translator serves exactly one already-established
//! session per process (spec.md §1: "It does not persist state across
//! sessions").

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::BidiError;
use crate::mapper::Mapper;
use crate::registry::{BrowsingContextId, UserContextId};

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SubscribeParams {
    events: Vec<String>,
    #[serde(default)]
    contexts: Option<Vec<String>>,
    #[serde(default)]
    user_contexts: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UnsubscribeByAttributesParams {
    events: Vec<String>,
    #[serde(default)]
    contexts: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct UnsubscribeByIdParams {
    subscriptions: Vec<String>,
}

/// Resolves requested context ids to their top-level ancestors (spec.md
/// §4.2: "Subscribing to a nested context subscribes to the enclosing
/// top-level context"), dropping ids the context tree doesn't know about
/// rather than failing the whole subscribe — a client may legitimately
/// subscribe ahead of a context it expects to be created shortly is NOT
/// tolerated by spec, so unknown ids are instead rejected outright.
fn resolve_top_level_contexts(
    mapper: &Mapper,
    contexts: &Option<Vec<String>>,
) -> Result<Vec<BrowsingContextId>, BidiError> {
    let Some(contexts) = contexts else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for raw in contexts {
        let id = BrowsingContextId(raw.clone());
        let top_level = mapper
            .contexts
            .find_top_level_context_id(&id)
            .ok_or_else(|| BidiError::no_such_frame(format!("no such context {raw}")))?;
        if !out.contains(&top_level) {
            out.push(top_level);
        }
    }
    Ok(out)
}

pub async fn dispatch(mapper: &mut Mapper, command: &str, params: Value, channel: Option<String>) -> Result<Value, BidiError> {
    match command {
        "subscribe" => subscribe(mapper, params, channel).await,
        "unsubscribe" => unsubscribe(mapper, params, channel).await,
        "status" => Ok(json!({"ready": false, "message": "already connected"})),
        "new" => Ok(json!({
            "sessionId": "1",
            "capabilities": {
                "browserName": "chrome",
                "acceptInsecureCerts": false,
            }
        })),
        "end" => Ok(Value::Null),
        _ => Err(BidiError::unknown_command(format!("session.{command}"))),
    }
}

async fn subscribe(mapper: &mut Mapper, params: Value, channel: Option<String>) -> Result<Value, BidiError> {
    let params: SubscribeParams = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    let contexts = resolve_top_level_contexts(mapper, &params.contexts)?;
    let user_contexts = params
        .user_contexts
        .unwrap_or_default()
        .into_iter()
        .collect::<Vec<_>>();
    let channel = channel.unwrap_or_default();

    let id = mapper
        .subscriptions
        .subscribe(params.events, contexts.clone(), user_contexts, channel);

    for ctx in &contexts {
        mapper.replay_subscribe_hook_for_context(ctx);
    }
    if contexts.is_empty() {
        mapper.replay_subscribe_hook_all();
    }
    mapper.refresh_fetch_enablement().await;

    Ok(json!({ "subscription": id }))
}

async fn unsubscribe(mapper: &mut Mapper, params: Value, channel: Option<String>) -> Result<Value, BidiError> {
    if let Some(ids) = params.get("subscriptions") {
        let params: UnsubscribeByIdParams = serde_json::from_value(json!({"subscriptions": ids}))
            .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
        mapper.subscriptions.unsubscribe_by_ids(&params.subscriptions)?;
        mapper.refresh_fetch_enablement().await;
        return Ok(Value::Null);
    }

    let params: UnsubscribeByAttributesParams = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    let contexts = resolve_top_level_contexts(mapper, &params.contexts)?;
    let channel = channel.unwrap_or_default();
    mapper
        .subscriptions
        .unsubscribe_by_attributes(&params.events, &contexts, &channel)?;
    mapper.refresh_fetch_enablement().await;
    Ok(Value::Null)
}

/// A user-context id is currently accepted but not filtered against — the
/// translator has no multi-profile/`Target.createBrowserContext` support
/// yet, so every context belongs to the implicit [`UserContextId::default_context`].
pub fn default_user_context() -> UserContextId {
    UserContextId::default_context()
}
