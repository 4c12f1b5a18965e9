//! The BiDi wire envelope (spec.md §6) and the command router: dispatches
//! a parsed command to the processor owning its module prefix and wraps
//! whatever it returns into a success or error reply.

use serde::{Deserialize, Serialize};

use crate::error::{BidiError, BidiErrorKind};

/// An incoming BiDi command, per spec.md §6's command shape. `channel` is
/// the optional `"goog:channel"` tag echoed on every event/reply it causes.
#[derive(Debug, Clone, Deserialize)]
pub struct BidiCommand {
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(rename = "goog:channel", default)]
    pub channel: Option<String>,
}

/// Parses one incoming text frame into a [`BidiCommand`]. Parser failures
/// (spec.md §7: "Parser errors produce a response; they do not terminate
/// the session") are reported by the caller, which doesn't yet have a
/// command `id` to reply against if this itself fails.
pub fn parse_command(text: &str) -> Result<BidiCommand, BidiError> {
    serde_json::from_str(text)
        .map_err(|err| BidiError::invalid_argument(format!("malformed command: {err}")))
}

/// `method` split into its module and bare-command halves, e.g.
/// `"network.addIntercept"` -> `("network", "addIntercept")`.
pub fn split_method(method: &str) -> Result<(&str, &str), BidiError> {
    method
        .split_once('.')
        .ok_or_else(|| BidiError::unknown_command(format!("malformed method {method}")))
}

/// One outgoing BiDi wire message: a success reply, an error reply, or an
/// event (spec.md §6).
#[derive(Debug, Clone)]
pub enum BidiMessageOut {
    Success {
        id: u64,
        result: serde_json::Value,
        channel: Option<String>,
    },
    Error {
        id: Option<u64>,
        kind: BidiErrorKind,
        message: String,
        channel: Option<String>,
    },
    Event {
        method: String,
        params: serde_json::Value,
        channel: Option<String>,
    },
}

impl BidiMessageOut {
    pub fn success(id: u64, result: serde_json::Value, channel: Option<String>) -> Self {
        BidiMessageOut::Success {
            id,
            result,
            channel,
        }
    }

    pub fn error(id: Option<u64>, err: BidiError, channel: Option<String>) -> Self {
        BidiMessageOut::Error {
            id,
            kind: err.kind,
            message: err.message,
            channel,
        }
    }

    pub fn event(method: impl Into<String>, params: serde_json::Value, channel: Option<String>) -> Self {
        BidiMessageOut::Event {
            method: method.into(),
            params,
            channel,
        }
    }

    /// Serializes this message to its wire JSON shape (spec.md §6).
    pub fn to_json(&self) -> serde_json::Value {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Success<'a> {
            id: u64,
            r#type: &'static str,
            result: &'a serde_json::Value,
            #[serde(rename = "goog:channel", skip_serializing_if = "Option::is_none")]
            channel: &'a Option<String>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct ErrorMsg<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            id: Option<u64>,
            r#type: &'static str,
            error: &'static str,
            message: &'a str,
            #[serde(rename = "goog:channel", skip_serializing_if = "Option::is_none")]
            channel: &'a Option<String>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct EventMsg<'a> {
            r#type: &'static str,
            method: &'a str,
            params: &'a serde_json::Value,
            #[serde(rename = "goog:channel", skip_serializing_if = "Option::is_none")]
            channel: &'a Option<String>,
        }

        match self {
            BidiMessageOut::Success {
                id,
                result,
                channel,
            } => serde_json::to_value(Success {
                id: *id,
                r#type: "success",
                result,
                channel,
            })
            .unwrap_or(serde_json::Value::Null),
            BidiMessageOut::Error {
                id,
                kind,
                message,
                channel,
            } => serde_json::to_value(ErrorMsg {
                id: *id,
                r#type: "error",
                error: kind.as_str(),
                message,
                channel,
            })
            .unwrap_or(serde_json::Value::Null),
            BidiMessageOut::Event {
                method,
                params,
                channel,
            } => serde_json::to_value(EventMsg {
                r#type: "event",
                method,
                params,
                channel,
            })
            .unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn to_wire_string(&self) -> String {
        self.to_json().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_command() {
        let cmd = parse_command(
            r#"{"id":1,"method":"session.subscribe","params":{"events":["network"]}}"#,
        )
        .unwrap();
        assert_eq!(cmd.id, 1);
        assert_eq!(cmd.method, "session.subscribe");
        assert!(cmd.channel.is_none());
    }

    #[test]
    fn malformed_json_is_invalid_argument() {
        let err = parse_command("not json").unwrap_err();
        assert_eq!(err.kind, BidiErrorKind::InvalidArgument);
    }

    #[test]
    fn success_reply_round_trips_field_shape() {
        let msg = BidiMessageOut::success(7, serde_json::json!({"ok": true}), Some("c1".into()));
        let value = msg.to_json();
        assert_eq!(value["id"], 7);
        assert_eq!(value["type"], "success");
        assert_eq!(value["goog:channel"], "c1");
    }

    #[test]
    fn error_reply_uses_closed_error_kind_strings() {
        let msg = BidiMessageOut::error(
            Some(3),
            BidiError::no_such_frame("nope"),
            None,
        );
        let value = msg.to_json();
        assert_eq!(value["error"], "no such frame");
    }
}
