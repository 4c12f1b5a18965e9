//! `network.*` commands that don't flow through the request tracker's own
//! event-driven path (spec.md §4.5.3): intercept registration and the
//! five interception-reply commands, plus data-collector registration.

use serde::Deserialize;
use serde_json::{json, Value};

use cdp_protocol::fetch;
use cdp_protocol::network::RequestId;

use crate::error::BidiError;
use crate::mapper::Mapper;
use crate::network::collector::CollectorDataType;
use crate::network::intercept::InterceptPhase;
use crate::network::InterceptCommand;
use crate::registry::BrowsingContextId;
use crate::urlpattern::UrlPattern;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum UrlPatternIn {
    String {
        pattern: String,
    },
    Pattern {
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        hostname: Option<String>,
        #[serde(default)]
        port: Option<String>,
        #[serde(default)]
        pathname: Option<String>,
        #[serde(default)]
        search: Option<String>,
    },
}

impl UrlPatternIn {
    fn into_pattern(self) -> Result<UrlPattern, BidiError> {
        match self {
            UrlPatternIn::String { pattern } => UrlPattern::raw(pattern),
            UrlPatternIn::Pattern {
                protocol,
                hostname,
                port,
                pathname,
                search,
            } => UrlPattern::structured(protocol, hostname, port, pathname, search),
        }
    }
}

fn parse_phase(raw: &str) -> Result<InterceptPhase, BidiError> {
    match raw {
        "beforeRequestSent" => Ok(InterceptPhase::BeforeRequestSent),
        "responseStarted" => Ok(InterceptPhase::ResponseStarted),
        "authRequired" => Ok(InterceptPhase::AuthRequired),
        other => Err(BidiError::invalid_argument(format!("unknown phase {other}"))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddInterceptParams {
    phases: Vec<String>,
    #[serde(default)]
    url_patterns: Vec<UrlPatternIn>,
    #[serde(default)]
    contexts: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct InterceptIdParams {
    intercept: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct HeaderIn {
    name: String,
    value: String,
}

/// Header-value validation (spec.md §4.5.3): no leading/trailing
/// whitespace, no `\n`, no `\0`.
fn validate_header_value(value: &str) -> Result<(), BidiError> {
    if value != value.trim() || value.contains('\n') || value.contains('\0') {
        return Err(BidiError::invalid_argument(format!(
            "Invalid header value: {value:?}"
        )));
    }
    Ok(())
}

/// Method token validation against the RFC 9110 token production (spec.md
/// §4.5.3): visible ASCII minus the delimiter set.
fn validate_method(method: &str) -> Result<(), BidiError> {
    const DELIMS: &[char] = &[
        '(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=', '{', '}', ' ',
        '\t',
    ];
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_graphic() && !DELIMS.contains(&c)) {
        return Err(BidiError::invalid_argument(format!(
            "invalid method token {method:?}"
        )));
    }
    Ok(())
}

fn headers_to_cdp(headers: &[HeaderIn]) -> Result<Vec<fetch::HeaderEntry>, BidiError> {
    headers
        .iter()
        .map(|h| {
            validate_header_value(&h.value)?;
            Ok(fetch::HeaderEntry {
                name: h.name.clone(),
                value: h.value.clone(),
            })
        })
        .collect()
}

pub async fn dispatch(mapper: &mut Mapper, command: &str, params: Value) -> Result<Value, BidiError> {
    match command {
        "addIntercept" => add_intercept(mapper, params).await,
        "removeIntercept" => remove_intercept(mapper, params).await,
        "continueRequest" => continue_request(mapper, params).await,
        "continueResponse" => continue_response(mapper, params).await,
        "continueWithAuth" => continue_with_auth(mapper, params).await,
        "failRequest" => fail_request(mapper, params).await,
        "provideResponse" => provide_response(mapper, params).await,
        "addDataCollector" => add_data_collector(mapper, params),
        "removeDataCollector" => remove_data_collector(mapper, params),
        "disownData" => disown_data(mapper, params),
        "getData" => Err(BidiError::unsupported_operation(
            "response body retrieval requires JS-value serialization, out of scope",
        )),
        "setCacheBehavior" => Err(BidiError::unsupported_operation(
            "network.setCacheBehavior is not implemented",
        )),
        _ => Err(BidiError::unknown_command(format!("network.{command}"))),
    }
}

async fn add_intercept(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    let params: AddInterceptParams = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    if params.phases.is_empty() {
        return Err(BidiError::invalid_argument("phases must not be empty"));
    }
    let phases = params
        .phases
        .iter()
        .map(|p| parse_phase(p))
        .collect::<Result<Vec<_>, _>>()?;
    let url_patterns = params
        .url_patterns
        .into_iter()
        .map(|p| p.into_pattern())
        .collect::<Result<Vec<_>, _>>()?;
    let contexts = match params.contexts {
        Some(raw) => {
            let mut out = Vec::new();
            for id in raw {
                let ctx = BrowsingContextId(id.clone());
                if mapper.contexts.get(&ctx).is_none() {
                    return Err(BidiError::no_such_frame(format!("no such context {id}")));
                }
                out.push(ctx);
            }
            Some(out)
        }
        None => None,
    };

    let id = mapper.intercepts.add(phases, url_patterns, contexts);
    mapper.refresh_fetch_enablement().await;
    Ok(json!({ "intercept": id }))
}

async fn remove_intercept(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    let params: InterceptIdParams = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    mapper.intercepts.remove(&params.intercept)?;
    mapper.refresh_fetch_enablement().await;
    Ok(Value::Null)
}

fn add_data_collector(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Params {
        max_encoded_data_size: u64,
        data_types: Vec<String>,
        #[serde(default)]
        contexts: Option<Vec<String>>,
    }
    let params: Params = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    let data_types = params
        .data_types
        .iter()
        .map(|t| match t.as_str() {
            "response" => Ok(CollectorDataType::Response),
            "request" => Ok(CollectorDataType::Request),
            other => Err(BidiError::invalid_argument(format!("unknown data type {other}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let contexts = params
        .contexts
        .map(|ids| ids.into_iter().map(BrowsingContextId).collect());
    let id = mapper
        .collectors
        .add(params.max_encoded_data_size, data_types, contexts, None);
    Ok(json!({ "collector": id }))
}

fn remove_data_collector(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    #[derive(Debug, Deserialize)]
    struct Params {
        collector: String,
    }
    let params: Params = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    mapper.collectors.remove(&params.collector)?;
    Ok(Value::Null)
}

fn disown_data(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Params {
        collector: String,
        request: String,
    }
    let params: Params = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    mapper.collectors.disown(&params.collector, &[params.request])?;
    Ok(Value::Null)
}

async fn continue_request(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    #[derive(Debug, Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct Params {
        request: String,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        method: Option<String>,
        #[serde(default)]
        headers: Option<Vec<HeaderIn>>,
        #[serde(default)]
        body: Option<String>,
    }
    let params: Params = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    if let Some(method) = &params.method {
        validate_method(method)?;
    }
    let headers = match &params.headers {
        Some(h) => Some(headers_to_cdp(h)?),
        None => None,
    };

    let request_id = RequestId(params.request.clone());
    let context = mapper.network_request_context(&request_id)?;
    mapper
        .network
        .gate_intercept_command(&request_id, InterceptCommand::ContinueRequest)?;
    let client = mapper.client_for_context(&context)?;
    client
        .execute(fetch::ContinueRequestParams {
            request_id,
            url: params.url,
            method: params.method,
            post_data: params.body,
            headers,
        })
        .await
        .map_err(BidiError::from)?;
    Ok(Value::Null)
}

async fn continue_response(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    #[derive(Debug, Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct Params {
        request: String,
        #[serde(default)]
        status_code: Option<i64>,
        #[serde(default)]
        reason_phrase: Option<String>,
        #[serde(default)]
        headers: Option<Vec<HeaderIn>>,
    }
    let params: Params = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    let headers = match &params.headers {
        Some(h) => Some(headers_to_cdp(h)?),
        None => None,
    };

    let request_id = RequestId(params.request.clone());
    let context = mapper.network_request_context(&request_id)?;
    let was_auth = mapper.network_request_intercept_phase(&request_id)
        == Some(InterceptPhase::AuthRequired);
    mapper
        .network
        .gate_intercept_command(&request_id, InterceptCommand::ContinueResponse)?;
    let client = mapper.client_for_context(&context)?;

    // Decision (SPEC_FULL §D): `continueResponse` during `authRequired` maps
    // to declining credentials rather than a no-op, so it always produces a
    // CDP call.
    if was_auth {
        client
            .execute(fetch::ContinueWithAuthParams {
                request_id,
                auth_challenge_response: fetch::AuthChallengeResponse::default_handling(),
            })
            .await
            .map_err(BidiError::from)?;
    } else {
        client
            .execute(fetch::ContinueResponseParams {
                request_id,
                response_code: params.status_code,
                response_phrase: params.reason_phrase,
                response_headers: headers,
            })
            .await
            .map_err(BidiError::from)?;
    }
    Ok(Value::Null)
}

async fn continue_with_auth(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase", tag = "action")]
    enum Action {
        #[serde(rename = "default")]
        Default,
        #[serde(rename = "cancel")]
        Cancel,
        #[serde(rename = "provideCredentials")]
        ProvideCredentials {
            credentials: Credentials,
        },
    }
    #[derive(Debug, Deserialize)]
    struct Credentials {
        username: String,
        password: String,
    }
    #[derive(Debug, Deserialize)]
    struct Params {
        request: String,
        #[serde(flatten)]
        action: Action,
    }
    let params: Params = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;

    let request_id = RequestId(params.request.clone());
    let context = mapper.network_request_context(&request_id)?;
    mapper
        .network
        .gate_intercept_command(&request_id, InterceptCommand::ContinueWithAuth)?;
    let client = mapper.client_for_context(&context)?;

    let response = match params.action {
        Action::Default => fetch::AuthChallengeResponse::default_handling(),
        Action::Cancel => fetch::AuthChallengeResponse::cancel(),
        Action::ProvideCredentials { credentials } => {
            fetch::AuthChallengeResponse::credentials(credentials.username, credentials.password)
        }
    };
    client
        .execute(fetch::ContinueWithAuthParams {
            request_id,
            auth_challenge_response: response,
        })
        .await
        .map_err(BidiError::from)?;
    Ok(Value::Null)
}

async fn fail_request(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    #[derive(Debug, Deserialize)]
    struct Params {
        request: String,
    }
    let params: Params = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    let request_id = RequestId(params.request.clone());
    let context = mapper.network_request_context(&request_id)?;
    mapper
        .network
        .gate_intercept_command(&request_id, InterceptCommand::FailRequest)?;
    let client = mapper.client_for_context(&context)?;
    client
        .execute(fetch::FailRequestParams {
            request_id,
            error_reason: fetch::ErrorReason::Failed,
        })
        .await
        .map_err(BidiError::from)?;
    Ok(Value::Null)
}

async fn provide_response(mapper: &mut Mapper, params: Value) -> Result<Value, BidiError> {
    #[derive(Debug, Deserialize, Default)]
    #[serde(rename_all = "camelCase")]
    struct Params {
        request: String,
        #[serde(default)]
        status_code: Option<i64>,
        #[serde(default)]
        headers: Option<Vec<HeaderIn>>,
        #[serde(default)]
        body: Option<String>,
    }
    let params: Params = serde_json::from_value(params)
        .map_err(|err| BidiError::invalid_argument(err.to_string()))?;
    let headers = match &params.headers {
        Some(h) => Some(headers_to_cdp(h)?),
        None => None,
    };

    let request_id = RequestId(params.request.clone());
    let context = mapper.network_request_context(&request_id)?;
    mapper
        .network
        .gate_intercept_command(&request_id, InterceptCommand::ProvideResponse)?;
    let client = mapper.client_for_context(&context)?;
    client
        .execute(fetch::FulfillRequestParams {
            request_id,
            response_code: params.status_code.unwrap_or(200),
            response_headers: headers,
            body: params.body,
        })
        .await
        .map_err(BidiError::from)?;
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_header_value_with_embedded_newline() {
        assert!(validate_header_value("a\nb").is_err());
    }

    #[test]
    fn rejects_header_value_with_leading_whitespace() {
        assert!(validate_header_value(" a").is_err());
    }

    #[test]
    fn rejects_method_with_delimiter() {
        assert!(validate_method("GET/POST").is_err());
    }

    #[test]
    fn accepts_well_formed_method_token() {
        assert!(validate_method("PROPFIND").is_ok());
    }
}
