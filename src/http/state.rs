use std::sync::Arc;

use uuid::Uuid;

use crate::allowlist::AllowList;
use crate::cdp::registry::RequestRegistry;
use crate::session::table::SessionTable;
use crate::session::SessionContext;

/// Shared state behind every HTTP handler and every WebSocket session.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RequestRegistry>,
    pub sessions: Arc<SessionTable>,
    pub browser_uuid: Uuid,
    pub allow_list: Option<Arc<AllowList>>,
}

impl AppState {
    pub fn browser_debugger_path(&self) -> String {
        format!("/devtools/browser/{}", self.browser_uuid)
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            registry: self.registry.clone(),
            sessions: self.sessions.clone(),
            allow_list: self.allow_list.clone(),
        }
    }
}
