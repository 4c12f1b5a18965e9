//! Shared wire-message primitives.
//!
//! Both the CDP side (`cdp_protocol`) and the BiDi side of the translator
//! need the same shape of thing: a method name, a numeric correlation id, a
//! params/result payload, and a way to tell a reply apart from an event in an
//! untagged JSON union. This crate holds exactly that, independent of which
//! protocol is speaking it.

use std::borrow::Cow;
use std::fmt;
use std::fmt::Debug;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub type MethodId = Cow<'static, str>;

/// A request sent over the wire, identified by `id`.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct MethodCall {
    /// Must be unique among calls outstanding on the same connection.
    pub id: CallId,
    pub method: MethodId,
    /// The CDP session id, if any; absent for the root/browser client.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub params: serde_json::Value,
}

/// Identifier for an in-flight call. Callers must not reuse an id until its
/// reply (or a connection close) has retired it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(usize);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

impl CallId {
    pub fn new(id: usize) -> Self {
        CallId(id)
    }
}

/// A request type that can be serialized and has a known method identifier.
pub trait Command: serde::ser::Serialize + Method {
    /// The response payload this command resolves to.
    type Response: serde::de::DeserializeOwned + fmt::Debug;

    fn response_from_value(response: serde_json::Value) -> serde_json::Result<Self::Response> {
        serde_json::from_value(response)
    }
}

/// A successful response with the `result` payload deserialized into
/// `Command::Response`.
pub struct CommandResponse<T>
where
    T: fmt::Debug,
{
    pub id: CallId,
    pub result: T,
    pub method: MethodId,
}

/// Either `Command::Response` or an `Error` carried over the wire.
pub type CommandResult<T> = Result<CommandResponse<T>, Error>;

impl<T: fmt::Debug> Deref for CommandResponse<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.result
    }
}

/// Method name plus the session it targets plus its raw json params, used as
/// the catch-all event shape before a concrete event type is matched.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct JsonEventMessage {
    pub method: MethodId,
    pub session_id: Option<String>,
    pub params: serde_json::Value,
}

impl Method for JsonEventMessage {
    fn identifier(&self) -> MethodId {
        self.method.clone()
    }
}

impl EventMessage for JsonEventMessage {
    fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

/// Marks a type as an event that can be routed by CDP session id.
pub trait EventMessage: Method + DeserializeOwned + Debug {
    fn session_id(&self) -> Option<&str>;
}

/// Types that carry the wire field `method = Self::identifier()`.
pub trait Method {
    /// The full identifier, e.g. `Network.requestWillBeSent`.
    fn identifier(&self) -> MethodId;

    /// The domain part, e.g. `Network`.
    fn domain_name(&self) -> MethodId {
        self.split().0
    }

    /// The method part, e.g. `requestWillBeSent`.
    fn method_name(&self) -> MethodId {
        self.split().1
    }

    fn split(&self) -> (MethodId, MethodId) {
        match self.identifier() {
            Cow::Borrowed(id) => {
                let mut iter = id.split('.');
                (iter.next().unwrap().into(), iter.next().unwrap().into())
            }
            Cow::Owned(id) => {
                let mut iter = id.split('.');
                (
                    Cow::Owned(iter.next().unwrap().into()),
                    Cow::Owned(iter.next().unwrap().into()),
                )
            }
        }
    }
}

/// Identifies a method at the type level, independent of any instance.
pub trait MethodType {
    fn method_id() -> MethodId
    where
        Self: Sized;
}

/// A json-serialized outgoing request, as written to the wire.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Request {
    pub method: MethodId,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub params: serde_json::Value,
}

impl Request {
    pub fn new(method: MethodId, params: serde_json::Value) -> Self {
        Self {
            method,
            params,
            session_id: None,
        }
    }

    pub fn with_session(
        method: MethodId,
        params: serde_json::Value,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            method,
            params,
            session_id: Some(session_id.into()),
        }
    }
}

/// A reply to a `MethodCall`.
#[derive(Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Response {
    pub id: CallId,
    pub result: Option<serde_json::Value>,
    pub error: Option<Error>,
}

/// An incoming frame is either a reply to something we sent (has `id`) or an
/// event pushed by the peer. `#[serde(untagged)]` picks whichever shape
/// matches; this is why `Response` and the event type must not overlap in
/// required fields.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
#[allow(clippy::large_enum_variant)]
pub enum Message<T = JsonEventMessage> {
    Response(Response),
    Event(T),
}

/// The error payload of a failed `Response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    pub code: i64,
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}
