//! `script.*` commands (spec.md §1 Non-goals): JS-value serialization,
//! realm/preload-script management, and expression evaluation are left to
//! an external collaborator. This module exists so the router can
//! recognize every `script.*` command name and answer `unsupported
//! operation` instead of `unknown command`.

use serde_json::Value;

use crate::error::BidiError;
use crate::mapper::Mapper;

pub async fn dispatch(_mapper: &mut Mapper, command: &str, _params: Value) -> Result<Value, BidiError> {
    match command {
        "evaluate" | "callFunction" | "disown" | "getRealms" | "addPreloadScript"
        | "removePreloadScript" => Err(BidiError::unsupported_operation(format!(
            "script.{command} requires JS-value serialization, out of scope"
        ))),
        _ => Err(BidiError::unknown_command(format!("script.{command}"))),
    }
}
