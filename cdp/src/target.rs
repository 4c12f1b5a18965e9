//! `Target` domain: attach/detach lifecycle and the flat target table.

use bidi_cdp_types::{Command, Method, MethodId};
use serde::{Deserialize, Serialize};

use crate::event::DecodeError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl From<String> for TargetId {
    fn from(s: String) -> Self {
        TargetId(s)
    }
}

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        SessionId(s)
    }
}

impl From<SessionId> for String {
    fn from(s: SessionId) -> Self {
        s.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    pub target_id: TargetId,
    #[serde(rename = "type")]
    pub r#type: String,
    pub title: String,
    pub url: String,
    pub attached: bool,
    pub opener_id: Option<TargetId>,
    #[serde(default)]
    pub browser_context_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetParams {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_context_id: Option<String>,
}

impl Default for CreateTargetParams {
    fn default() -> Self {
        CreateTargetParams {
            url: "about:blank".to_string(),
            browser_context_id: None,
        }
    }
}

impl Method for CreateTargetParams {
    fn identifier(&self) -> MethodId {
        "Target.createTarget".into()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTargetReturns {
    pub target_id: TargetId,
}

impl Command for CreateTargetParams {
    type Response = CreateTargetReturns;
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetParams {
    pub target_id: TargetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
}

impl Method for AttachToTargetParams {
    fn identifier(&self) -> MethodId {
        "Target.attachToTarget".into()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachToTargetReturns {
    pub session_id: SessionId,
}

impl Command for AttachToTargetParams {
    type Response = AttachToTargetReturns;
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetsParams {}

impl Method for GetTargetsParams {
    fn identifier(&self) -> MethodId {
        "Target.getTargets".into()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTargetsReturns {
    pub target_infos: Vec<TargetInfo>,
}

impl Command for GetTargetsParams {
    type Response = GetTargetsReturns;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDiscoverTargetsParams {
    pub discover: bool,
}

impl Method for SetDiscoverTargetsParams {
    fn identifier(&self) -> MethodId {
        "Target.setDiscoverTargets".into()
    }
}

impl Command for SetDiscoverTargetsParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAutoAttachParams {
    pub auto_attach: bool,
    pub wait_for_debugger_on_start: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flatten: Option<bool>,
}

impl Method for SetAutoAttachParams {
    fn identifier(&self) -> MethodId {
        "Target.setAutoAttach".into()
    }
}

impl Command for SetAutoAttachParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseTargetParams {
    pub target_id: TargetId,
}

impl Method for CloseTargetParams {
    fn identifier(&self) -> MethodId {
        "Target.closeTarget".into()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloseTargetReturns {
    #[serde(default)]
    pub success: bool,
}

impl Command for CloseTargetParams {
    type Response = CloseTargetReturns;
}

// --- Events -----------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedToTargetEvent {
    pub session_id: SessionId,
    pub target_info: TargetInfo,
    #[serde(default)]
    pub waiting_for_debugger: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachedFromTargetEvent {
    pub session_id: SessionId,
    pub target_id: Option<TargetId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCreatedEvent {
    pub target_info: TargetInfo,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDestroyedEvent {
    pub target_id: TargetId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfoChangedEvent {
    pub target_info: TargetInfo,
}

#[derive(Debug, Clone)]
pub enum TargetEvent {
    AttachedToTarget(AttachedToTargetEvent),
    DetachedFromTarget(DetachedFromTargetEvent),
    TargetCreated(TargetCreatedEvent),
    TargetDestroyed(TargetDestroyedEvent),
    TargetInfoChanged(TargetInfoChangedEvent),
}

impl Method for TargetEvent {
    fn identifier(&self) -> MethodId {
        match self {
            TargetEvent::AttachedToTarget(_) => "Target.attachedToTarget".into(),
            TargetEvent::DetachedFromTarget(_) => "Target.detachedFromTarget".into(),
            TargetEvent::TargetCreated(_) => "Target.targetCreated".into(),
            TargetEvent::TargetDestroyed(_) => "Target.targetDestroyed".into(),
            TargetEvent::TargetInfoChanged(_) => "Target.targetInfoChanged".into(),
        }
    }
}

impl TargetEvent {
    pub(crate) fn decode(name: &str, params: serde_json::Value) -> Result<Self, DecodeError> {
        Ok(match name {
            "attachedToTarget" => TargetEvent::AttachedToTarget(serde_json::from_value(params)?),
            "detachedFromTarget" => {
                TargetEvent::DetachedFromTarget(serde_json::from_value(params)?)
            }
            "targetCreated" => TargetEvent::TargetCreated(serde_json::from_value(params)?),
            "targetDestroyed" => TargetEvent::TargetDestroyed(serde_json::from_value(params)?),
            "targetInfoChanged" => {
                TargetEvent::TargetInfoChanged(serde_json::from_value(params)?)
            }
            _ => return Err(DecodeError::UnknownMethod(format!("Target.{name}"))),
        })
    }
}
