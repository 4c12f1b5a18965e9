//! `Network` domain: the five events the request tracker correlates, plus
//! the handful of commands the translator issues (header/cache toggles,
//! cookie access).

use std::collections::HashMap;

use bidi_cdp_types::{Command, Method, MethodId};
use serde::{Deserialize, Serialize};

use crate::event::DecodeError;
use crate::fetch::InterceptionId;
use crate::page::{FrameId, LoaderId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId(s)
    }
}

impl From<RequestId> for String {
    fn from(r: RequestId) -> Self {
        r.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<InterceptionId> for RequestId {
    fn from(id: InterceptionId) -> Self {
        RequestId(id.0)
    }
}

pub type Headers = HashMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiator {
    #[serde(rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub request_id: Option<RequestId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(rename = "postData", default)]
    pub post_data: Option<String>,
    #[serde(rename = "hasPostData", default)]
    pub has_post_data: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTiming {
    pub request_time: f64,
    #[serde(default)]
    pub send_start: f64,
    #[serde(default)]
    pub send_end: f64,
    #[serde(default)]
    pub receive_headers_end: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub url: String,
    pub status: i64,
    pub status_text: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub from_disk_cache: bool,
    #[serde(default)]
    pub from_service_worker: bool,
    #[serde(default)]
    pub has_extra_info: bool,
    #[serde(default)]
    pub timing: Option<ResourceTiming>,
    #[serde(default)]
    pub remote_ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedCookieEntry {
    #[serde(default)]
    pub blocked_reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieParam {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
}

// --- Commands -----------------------------------------------------------

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableParams {}

impl Method for EnableParams {
    fn identifier(&self) -> MethodId {
        "Network.enable".into()
    }
}

impl Command for EnableParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetExtraHttpHeadersParams {
    pub headers: Headers,
}

impl Method for SetExtraHttpHeadersParams {
    fn identifier(&self) -> MethodId {
        "Network.setExtraHTTPHeaders".into()
    }
}

impl Command for SetExtraHttpHeadersParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCacheDisabledParams {
    pub cache_disabled: bool,
}

impl Method for SetCacheDisabledParams {
    fn identifier(&self) -> MethodId {
        "Network.setCacheDisabled".into()
    }
}

impl Command for SetCacheDisabledParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCookiesParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
}

impl DeleteCookiesParams {
    /// Build a delete request that targets exactly the cookie `param` set.
    pub fn from_cookie(param: &CookieParam) -> Self {
        DeleteCookiesParams {
            name: param.name.clone(),
            url: param.url.clone(),
            domain: param.domain.clone(),
            path: param.path.clone(),
            partition_key: param.partition_key.clone(),
        }
    }
}

impl Method for DeleteCookiesParams {
    fn identifier(&self) -> MethodId {
        "Network.deleteCookies".into()
    }
}

impl Command for DeleteCookiesParams {
    type Response = ();
}

// --- Events -----------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSentEvent {
    pub request_id: RequestId,
    pub loader_id: LoaderId,
    pub document_url: String,
    pub request: Request,
    pub wall_time: f64,
    pub initiator: Initiator,
    #[serde(default)]
    pub redirect_has_extra_info: bool,
    #[serde(default)]
    pub redirect_response: Option<Response>,
    #[serde(default)]
    pub frame_id: Option<FrameId>,
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWillBeSentExtraInfoEvent {
    pub request_id: RequestId,
    #[serde(default)]
    pub associated_cookies: Vec<serde_json::Value>,
    pub headers: Headers,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceivedEvent {
    pub request_id: RequestId,
    pub loader_id: LoaderId,
    pub response: Response,
    #[serde(rename = "type", default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub frame_id: Option<FrameId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReceivedExtraInfoEvent {
    pub request_id: RequestId,
    pub headers: Headers,
    #[serde(default)]
    pub blocked_cookies: Vec<BlockedCookieEntry>,
    #[serde(default)]
    pub status_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestServedFromCacheEvent {
    pub request_id: RequestId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFailedEvent {
    pub request_id: RequestId,
    pub error_text: String,
    #[serde(default)]
    pub canceled: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingFinishedEvent {
    pub request_id: RequestId,
    #[serde(default)]
    pub encoded_data_length: f64,
}

#[derive(Debug, Clone)]
pub enum NetworkEvent {
    RequestWillBeSent(RequestWillBeSentEvent),
    RequestWillBeSentExtraInfo(RequestWillBeSentExtraInfoEvent),
    ResponseReceived(ResponseReceivedEvent),
    ResponseReceivedExtraInfo(ResponseReceivedExtraInfoEvent),
    RequestServedFromCache(RequestServedFromCacheEvent),
    LoadingFailed(LoadingFailedEvent),
    LoadingFinished(LoadingFinishedEvent),
}

impl Method for NetworkEvent {
    fn identifier(&self) -> MethodId {
        match self {
            NetworkEvent::RequestWillBeSent(_) => "Network.requestWillBeSent".into(),
            NetworkEvent::RequestWillBeSentExtraInfo(_) => {
                "Network.requestWillBeSentExtraInfo".into()
            }
            NetworkEvent::ResponseReceived(_) => "Network.responseReceived".into(),
            NetworkEvent::ResponseReceivedExtraInfo(_) => {
                "Network.responseReceivedExtraInfo".into()
            }
            NetworkEvent::RequestServedFromCache(_) => "Network.requestServedFromCache".into(),
            NetworkEvent::LoadingFailed(_) => "Network.loadingFailed".into(),
            NetworkEvent::LoadingFinished(_) => "Network.loadingFinished".into(),
        }
    }
}

impl NetworkEvent {
    pub(crate) fn decode(name: &str, params: serde_json::Value) -> Result<Self, DecodeError> {
        Ok(match name {
            "requestWillBeSent" => {
                NetworkEvent::RequestWillBeSent(serde_json::from_value(params)?)
            }
            "requestWillBeSentExtraInfo" => {
                NetworkEvent::RequestWillBeSentExtraInfo(serde_json::from_value(params)?)
            }
            "responseReceived" => NetworkEvent::ResponseReceived(serde_json::from_value(params)?),
            "responseReceivedExtraInfo" => {
                NetworkEvent::ResponseReceivedExtraInfo(serde_json::from_value(params)?)
            }
            "requestServedFromCache" => {
                NetworkEvent::RequestServedFromCache(serde_json::from_value(params)?)
            }
            "loadingFailed" => NetworkEvent::LoadingFailed(serde_json::from_value(params)?),
            "loadingFinished" => NetworkEvent::LoadingFinished(serde_json::from_value(params)?),
            _ => return Err(DecodeError::UnknownMethod(format!("Network.{name}"))),
        })
    }
}
