//! `Page` domain: frame tree, navigation, and lifecycle events.

use bidi_cdp_types::{Command, Method, MethodId};
use serde::{Deserialize, Serialize};

use crate::event::DecodeError;
use crate::network::RequestId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameId(pub String);

impl From<String> for FrameId {
    fn from(s: String) -> Self {
        FrameId(s)
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoaderId(pub String);

impl From<String> for LoaderId {
    fn from(s: String) -> Self {
        LoaderId(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: FrameId,
    #[serde(default)]
    pub parent_id: Option<FrameId>,
    pub loader_id: LoaderId,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTree {
    pub frame: Frame,
    #[serde(default)]
    pub child_frames: Vec<FrameTree>,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EnableParams {}

impl Method for EnableParams {
    fn identifier(&self) -> MethodId {
        "Page.enable".into()
    }
}

impl Command for EnableParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLifecycleEventsEnabledParams {
    pub enabled: bool,
}

impl Method for SetLifecycleEventsEnabledParams {
    fn identifier(&self) -> MethodId {
        "Page.setLifecycleEventsEnabled".into()
    }
}

impl Command for SetLifecycleEventsEnabledParams {
    type Response = ();
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetFrameTreeParams {}

impl Method for GetFrameTreeParams {
    fn identifier(&self) -> MethodId {
        "Page.getFrameTree".into()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFrameTreeReturns {
    pub frame_tree: FrameTree,
}

impl Command for GetFrameTreeParams {
    type Response = GetFrameTreeReturns;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateParams {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<FrameId>,
}

impl NavigateParams {
    pub const IDENTIFIER: &'static str = "Page.navigate";
}

impl Method for NavigateParams {
    fn identifier(&self) -> MethodId {
        Self::IDENTIFIER.into()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigateReturns {
    pub frame_id: FrameId,
    #[serde(default)]
    pub loader_id: Option<LoaderId>,
    #[serde(default)]
    pub error_text: Option<String>,
}

impl Command for NavigateParams {
    type Response = NavigateReturns;
}

// --- Events -----------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameAttachedEvent {
    pub frame_id: FrameId,
    pub parent_frame_id: FrameId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDetachedEvent {
    pub frame_id: FrameId,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameNavigatedEvent {
    pub frame: Frame,
    #[serde(default)]
    pub r#type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigatedWithinDocumentEvent {
    pub frame_id: FrameId,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStartedLoadingEvent {
    pub frame_id: FrameId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStoppedLoadingEvent {
    pub frame_id: FrameId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEventEvent {
    pub frame_id: FrameId,
    pub loader_id: LoaderId,
    pub name: String,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequestedNavigationEvent {
    pub frame_id: FrameId,
    pub reason: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavascriptDialogOpeningEvent {
    pub url: String,
    pub message: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavascriptDialogClosedEvent {
    pub result: bool,
}

/// Not part of the CDP wire shape; an alias used by callers that correlate a
/// request id across the `Network` and `Page` domains.
pub type NavigationRequestId = RequestId;

#[derive(Debug, Clone)]
pub enum PageEvent {
    FrameAttached(FrameAttachedEvent),
    FrameDetached(FrameDetachedEvent),
    FrameNavigated(FrameNavigatedEvent),
    NavigatedWithinDocument(NavigatedWithinDocumentEvent),
    FrameStartedLoading(FrameStartedLoadingEvent),
    FrameStoppedLoading(FrameStoppedLoadingEvent),
    LifecycleEvent(LifecycleEventEvent),
    FrameRequestedNavigation(FrameRequestedNavigationEvent),
    JavascriptDialogOpening(JavascriptDialogOpeningEvent),
    JavascriptDialogClosed(JavascriptDialogClosedEvent),
}

impl Method for PageEvent {
    fn identifier(&self) -> MethodId {
        match self {
            PageEvent::FrameAttached(_) => "Page.frameAttached".into(),
            PageEvent::FrameDetached(_) => "Page.frameDetached".into(),
            PageEvent::FrameNavigated(_) => "Page.frameNavigated".into(),
            PageEvent::NavigatedWithinDocument(_) => "Page.navigatedWithinDocument".into(),
            PageEvent::FrameStartedLoading(_) => "Page.frameStartedLoading".into(),
            PageEvent::FrameStoppedLoading(_) => "Page.frameStoppedLoading".into(),
            PageEvent::LifecycleEvent(_) => "Page.lifecycleEvent".into(),
            PageEvent::FrameRequestedNavigation(_) => "Page.frameRequestedNavigation".into(),
            PageEvent::JavascriptDialogOpening(_) => "Page.javascriptDialogOpening".into(),
            PageEvent::JavascriptDialogClosed(_) => "Page.javascriptDialogClosed".into(),
        }
    }
}

impl PageEvent {
    pub(crate) fn decode(name: &str, params: serde_json::Value) -> Result<Self, DecodeError> {
        Ok(match name {
            "frameAttached" => PageEvent::FrameAttached(serde_json::from_value(params)?),
            "frameDetached" => PageEvent::FrameDetached(serde_json::from_value(params)?),
            "frameNavigated" => PageEvent::FrameNavigated(serde_json::from_value(params)?),
            "navigatedWithinDocument" => {
                PageEvent::NavigatedWithinDocument(serde_json::from_value(params)?)
            }
            "frameStartedLoading" => {
                PageEvent::FrameStartedLoading(serde_json::from_value(params)?)
            }
            "frameStoppedLoading" => {
                PageEvent::FrameStoppedLoading(serde_json::from_value(params)?)
            }
            "lifecycleEvent" => PageEvent::LifecycleEvent(serde_json::from_value(params)?),
            "frameRequestedNavigation" => {
                PageEvent::FrameRequestedNavigation(serde_json::from_value(params)?)
            }
            "javascriptDialogOpening" => {
                PageEvent::JavascriptDialogOpening(serde_json::from_value(params)?)
            }
            "javascriptDialogClosed" => {
                PageEvent::JavascriptDialogClosed(serde_json::from_value(params)?)
            }
            _ => return Err(DecodeError::UnknownMethod(format!("Page.{name}"))),
        })
    }
}
