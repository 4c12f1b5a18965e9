//! The CDP client (spec.md §4): a thin per-session handle over the shared
//! [`CdpConnectionHandle`]. There is always one root "browser" client with
//! `session_id: None`; every attached target gets its own with a real
//! session id. Mirrors `spider_chrome`'s per-session `Handler` lookup, but
//! as a value type rather than a task-addressed actor, since nothing here
//! needs its own polling loop.

use bidi_cdp_types::{Command, Method};
use cdp_protocol::target::SessionId;

use crate::cdp_conn::CdpConnectionHandle;
use crate::error::Result;

#[derive(Clone)]
pub struct CdpClient {
    conn: CdpConnectionHandle,
    session_id: Option<SessionId>,
}

impl CdpClient {
    pub fn root(conn: CdpConnectionHandle) -> Self {
        CdpClient {
            conn,
            session_id: None,
        }
    }

    pub fn for_session(conn: CdpConnectionHandle, session_id: SessionId) -> Self {
        CdpClient {
            conn,
            session_id: Some(session_id),
        }
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Issues `cmd` and deserializes the CDP result into its declared
    /// response type.
    pub async fn execute<C: Command>(&self, cmd: C) -> Result<C::Response> {
        let method = cmd.identifier();
        let params = serde_json::to_value(&cmd)?;
        let result = self
            .conn
            .send_command(method, self.session_id.clone(), params)
            .await?;
        Ok(C::response_from_value(result)?)
    }
}
