//! `input.*` commands (spec.md §1 Non-goals): the input-action interpreter
//! (key/pointer/wheel source state machines) is an external collaborator.
//! Recognized here only so the router can answer `unsupported operation`
//! instead of `unknown command`.

use serde_json::Value;

use crate::error::BidiError;
use crate::mapper::Mapper;

pub async fn dispatch(_mapper: &mut Mapper, command: &str, _params: Value) -> Result<Value, BidiError> {
    match command {
        "performActions" | "releaseActions" | "setFiles" => Err(BidiError::unsupported_operation(
            format!("input.{command} requires the input-action interpreter, out of scope"),
        )),
        _ => Err(BidiError::unknown_command(format!("input.{command}"))),
    }
}
