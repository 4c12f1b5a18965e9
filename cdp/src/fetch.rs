//! `Fetch` domain: request interception and auth challenges.

use bidi_cdp_types::{Command, Method, MethodId};
use serde::{Deserialize, Serialize};

use crate::event::DecodeError;
use crate::network::{Request, RequestId};
use crate::page::FrameId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterceptionId(pub String);

impl From<String> for InterceptionId {
    fn from(s: String) -> Self {
        InterceptionId(s)
    }
}

impl From<RequestId> for InterceptionId {
    fn from(id: RequestId) -> Self {
        InterceptionId(id.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestStage {
    Request,
    Response,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPattern {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_stage: Option<RequestStage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorReason {
    Failed,
    Aborted,
    TimedOut,
    AccessDenied,
    ConnectionClosed,
    ConnectionReset,
    ConnectionRefused,
    ConnectionAborted,
    ConnectionFailed,
    NameNotResolved,
    InternetDisconnected,
    AddressUnreachable,
    BlockedByClient,
    BlockedByResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthChallengeSource {
    Server,
    Proxy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthChallenge {
    #[serde(default)]
    pub source: Option<AuthChallengeSource>,
    pub origin: String,
    pub scheme: String,
    pub realm: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuthChallengeResponseKind {
    Default,
    CancelAuth,
    ProvideCredentials,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthChallengeResponse {
    pub response: AuthChallengeResponseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl AuthChallengeResponse {
    pub fn default_handling() -> Self {
        AuthChallengeResponse {
            response: AuthChallengeResponseKind::Default,
            username: None,
            password: None,
        }
    }

    pub fn cancel() -> Self {
        AuthChallengeResponse {
            response: AuthChallengeResponseKind::CancelAuth,
            username: None,
            password: None,
        }
    }

    pub fn credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthChallengeResponse {
            response: AuthChallengeResponseKind::ProvideCredentials,
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }
}

// --- Commands -----------------------------------------------------------

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableParams {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<RequestPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_auth_requests: Option<bool>,
}

impl Method for EnableParams {
    fn identifier(&self) -> MethodId {
        "Fetch.enable".into()
    }
}

impl Command for EnableParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DisableParams {}

impl Method for DisableParams {
    fn identifier(&self) -> MethodId {
        "Fetch.disable".into()
    }
}

impl Command for DisableParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContinueRequestParams {
    pub request_id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<HeaderEntry>>,
}

impl Method for ContinueRequestParams {
    fn identifier(&self) -> MethodId {
        "Fetch.continueRequest".into()
    }
}

impl Command for ContinueRequestParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContinueResponseParams {
    pub request_id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_phrase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<Vec<HeaderEntry>>,
}

impl Method for ContinueResponseParams {
    fn identifier(&self) -> MethodId {
        "Fetch.continueResponse".into()
    }
}

impl Command for ContinueResponseParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueWithAuthParams {
    pub request_id: RequestId,
    pub auth_challenge_response: AuthChallengeResponse,
}

impl Method for ContinueWithAuthParams {
    fn identifier(&self) -> MethodId {
        "Fetch.continueWithAuth".into()
    }
}

impl Command for ContinueWithAuthParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailRequestParams {
    pub request_id: RequestId,
    pub error_reason: ErrorReason,
}

impl Method for FailRequestParams {
    fn identifier(&self) -> MethodId {
        "Fetch.failRequest".into()
    }
}

impl Command for FailRequestParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FulfillRequestParams {
    pub request_id: RequestId,
    pub response_code: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<Vec<HeaderEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Method for FulfillRequestParams {
    fn identifier(&self) -> MethodId {
        "Fetch.fulfillRequest".into()
    }
}

impl Command for FulfillRequestParams {
    type Response = ();
}

// --- Events -----------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestPausedEvent {
    pub request_id: RequestId,
    pub request: Request,
    #[serde(default)]
    pub frame_id: Option<FrameId>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub response_error_reason: Option<ErrorReason>,
    #[serde(default)]
    pub response_status_code: Option<i64>,
    #[serde(default)]
    pub response_headers: Option<Vec<HeaderEntry>>,
    #[serde(default)]
    pub network_id: Option<RequestId>,
}

impl RequestPausedEvent {
    /// Distinguishes request-phase pauses from response-phase ones, per the
    /// presence of response fields.
    pub fn is_response_phase(&self) -> bool {
        self.response_status_code.is_some() || self.response_error_reason.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequiredEvent {
    pub request_id: RequestId,
    pub request: Request,
    #[serde(default)]
    pub frame_id: Option<FrameId>,
    #[serde(default)]
    pub resource_type: Option<String>,
    pub auth_challenge: AuthChallenge,
}

#[derive(Debug, Clone)]
pub enum FetchEvent {
    RequestPaused(RequestPausedEvent),
    AuthRequired(AuthRequiredEvent),
}

impl Method for FetchEvent {
    fn identifier(&self) -> MethodId {
        match self {
            FetchEvent::RequestPaused(_) => "Fetch.requestPaused".into(),
            FetchEvent::AuthRequired(_) => "Fetch.authRequired".into(),
        }
    }
}

impl FetchEvent {
    pub(crate) fn decode(name: &str, params: serde_json::Value) -> Result<Self, DecodeError> {
        Ok(match name {
            "requestPaused" => FetchEvent::RequestPaused(serde_json::from_value(params)?),
            "authRequired" => FetchEvent::AuthRequired(serde_json::from_value(params)?),
            _ => return Err(DecodeError::UnknownMethod(format!("Fetch.{name}"))),
        })
    }
}
