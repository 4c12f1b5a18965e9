//! `Runtime` domain: only the execution-context lifecycle events the realm
//! registry needs. Serializing JS values between CDP and BiDi is explicitly
//! out of scope (spec.md §1); no `RemoteObject`/`evaluate` types live here.

use bidi_cdp_types::{Command, Method, MethodId};
use serde::{Deserialize, Serialize};

use crate::event::DecodeError;
use crate::page::FrameId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionContextId(pub i64);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextAuxData {
    #[serde(default)]
    pub frame_id: Option<FrameId>,
    #[serde(default)]
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextDescription {
    pub id: ExecutionContextId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub aux_data: Option<ExecutionContextAuxData>,
    #[serde(default)]
    pub unique_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableParams {}

impl Method for EnableParams {
    fn identifier(&self) -> MethodId {
        "Runtime.enable".into()
    }
}

impl Command for EnableParams {
    type Response = ();
}

// --- Events -----------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextCreatedEvent {
    pub context: ExecutionContextDescription,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextDestroyedEvent {
    pub execution_context_id: ExecutionContextId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContextsClearedEvent {}

#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    ExecutionContextCreated(ExecutionContextCreatedEvent),
    ExecutionContextDestroyed(ExecutionContextDestroyedEvent),
    ExecutionContextsCleared(ExecutionContextsClearedEvent),
}

impl Method for RuntimeEvent {
    fn identifier(&self) -> MethodId {
        match self {
            RuntimeEvent::ExecutionContextCreated(_) => "Runtime.executionContextCreated".into(),
            RuntimeEvent::ExecutionContextDestroyed(_) => {
                "Runtime.executionContextDestroyed".into()
            }
            RuntimeEvent::ExecutionContextsCleared(_) => {
                "Runtime.executionContextsCleared".into()
            }
        }
    }
}

impl RuntimeEvent {
    pub(crate) fn decode(name: &str, params: serde_json::Value) -> Result<Self, DecodeError> {
        Ok(match name {
            "executionContextCreated" => {
                RuntimeEvent::ExecutionContextCreated(serde_json::from_value(params)?)
            }
            "executionContextDestroyed" => {
                RuntimeEvent::ExecutionContextDestroyed(serde_json::from_value(params)?)
            }
            "executionContextsCleared" => {
                RuntimeEvent::ExecutionContextsCleared(serde_json::from_value(params)?)
            }
            _ => return Err(DecodeError::UnknownMethod(format!("Runtime.{name}"))),
        })
    }
}
