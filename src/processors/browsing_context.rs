//! `browsingContext.*` commands (spec.md §4.6): the thin command surface
//! the core exposes over the browsing-context tree and navigation
//! tracker it otherwise only consumes internally. `create`/`navigate`/
//! `close`/`getTree` are the four commands the network tracker and event
//! manager's own contracts (`findTopLevelContextId`, `getNavigationId`,
//! the `contextCreated` subscribe-hook replay) are built to serve.

use serde::Deserialize;
use serde_json::{json, Value};

use cdp_protocol::page::NavigateParams;
use cdp_protocol::target::{AttachToTargetParams, CloseTargetParams, CreateTargetParams};

use crate::error::BidiError;
use crate::mapper::Mapper;
use crate::registry::BrowsingContextId;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CreateParams {
    #[serde(default)]
    r#type: Option<String>,
    #[serde(default)]
    reference_context: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NavigateParamsIn {
    context: String,
    url: String,
    #[serde(default)]
    wait: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloseParamsIn {
    context: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GetTreeParamsIn {
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    max_depth: Option<u32>,
}

pub async fn dispatch(mapper: &mut Mapper, command: &str, params: Value) -> Result<Value, BidiError> {
    match command {
        "create" => create(mapper, params).await,
        "navigate" => navigate(mapper, params).await,
        "close" => close(mapper, params).await,
        "getTree" => get_tree(mapper, params),
        _ => Err(BidiError::unknown_command(format!("browsingContext.{command}"))),
    }
}

async fn create(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    let _params: CreateParams = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;

    let created = mapper
        .root_client()
        .execute(CreateTargetParams {
            url: "about:blank".into(),
            browser_context_id: None,
        })
        .await
        .map_err(|e| BidiError::from(e))?;

    let attached = mapper
        .root_client()
        .execute(AttachToTargetParams {
            target_id: created.target_id.clone(),
            flatten: Some(true),
        })
        .await
        .map_err(|e| BidiError::from(e))?;

    let context_id = mapper
        .ensure_top_level_context(created.target_id, attached.session_id)
        .await
        .map_err(|e| BidiError::from(e))?;

    Ok(json!({ "context": context_id.0 }))
}

async fn navigate(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    let params: NavigateParamsIn = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    let context = BrowsingContextId(params.context.clone());
    if mapper.contexts.get(&context).is_none() {
        return Err(BidiError::no_such_frame(format!("no such context {}", params.context)));
    }
    let Some(target) = mapper.targets.get_by_context_mut(&context) else {
        return Err(BidiError::no_such_frame(format!("no such context {}", params.context)));
    };
    let result = target
        .client
        .execute(NavigateParams {
            url: params.url.clone(),
            referrer: None,
            frame_id: None,
        })
        .await
        .map_err(|e| BidiError::from(e))?;

    if let Some(error_text) = result.error_text {
        return Err(BidiError::new(
            crate::error::BidiErrorKind::UnknownError,
            error_text,
        ));
    }
    let loader_id = result.loader_id.unwrap_or(cdp_protocol::page::LoaderId(String::new()));
    let navigation = mapper.start_navigation(context.clone(), loader_id, params.url.clone());

    Ok(json!({ "navigation": navigation.to_string(), "url": params.url }))
}

async fn close(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    let params: CloseParamsIn = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    let context = BrowsingContextId(params.context.clone());
    let Some(node) = mapper.contexts.get(&context) else {
        return Err(BidiError::no_such_frame(format!("no such context {}", params.context)));
    };
    let target_id = node.target_id.clone();
    if let Some(target_id) = target_id {
        let _ = mapper
            .root_client()
            .execute(CloseTargetParams { target_id })
            .await;
    }
    mapper.remove_context_tree(&context);
    Ok(Value::Null)
}

fn get_tree(mapper: &Mapper, params: Value) -> Result<Value, BidiError> {
    let params: GetTreeParamsIn = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;

    let roots: Vec<BrowsingContextId> = match &params.root {
        Some(raw) => vec![BrowsingContextId(raw.clone())],
        None => mapper.contexts.top_level_ids().cloned().collect(),
    };

    let max_depth = params.max_depth.unwrap_or(u32::MAX);
    let mut out = Vec::new();
    for root in roots {
        if let Some(node) = build_node(mapper, &root, 0, max_depth) {
            out.push(node);
        }
    }
    Ok(json!({ "contexts": out }))
}

fn build_node(mapper: &Mapper, id: &BrowsingContextId, depth: u32, max_depth: u32) -> Option<Value> {
    let node = mapper.contexts.get(id)?;
    let children = if depth >= max_depth {
        Value::Null
    } else {
        let kids: Vec<Value> = mapper
            .contexts
            .children_of(id)
            .iter()
            .filter_map(|c| build_node(mapper, c, depth + 1, max_depth))
            .collect();
        Value::Array(kids)
    };
    Some(json!({
        "context": node.id.0,
        "url": node.url,
        "userContext": node.user_context.0,
        "parent": node.parent.as_ref().map(|p| p.0.clone()),
        "children": children,
    }))
}
