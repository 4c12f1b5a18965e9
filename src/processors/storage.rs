//! `storage.*` commands (spec.md §1 Non-goals): cookie/storage-partition
//! management is an external collaborator. Recognized here only so the
//! router can answer `unsupported operation` instead of `unknown command`.

use serde_json::Value;

use crate::error::BidiError;
use crate::mapper::Mapper;

pub async fn dispatch(_mapper: &mut Mapper, command: &str, _params: Value) -> Result<Value, BidiError> {
    match command {
        "getCookies" | "setCookie" | "deleteCookies" => Err(BidiError::unsupported_operation(
            format!("storage.{command} is not implemented"),
        )),
        _ => Err(BidiError::unknown_command(format!("storage.{command}"))),
    }
}
