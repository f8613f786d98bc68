pub mod session_loop;
pub mod table;

use std::sync::Arc;

use crate::allowlist::AllowList;
use crate::cdp::registry::RequestRegistry;
use table::SessionTable;

/// What a newly upgraded WebSocket attaches to.
pub enum AttachTarget {
    /// `/devtools/browser/<uuid>` — browser-level, flat session.
    Browser,
    /// `/devtools/page/{id}` — target-level, nested session.
    Page(String),
}

/// Everything a session loop needs, shared with the HTTP layer so both
/// sides operate on the same dispatcher/session-table/allow-list.
#[derive(Clone)]
pub struct SessionContext {
    pub registry: Arc<RequestRegistry>,
    pub sessions: Arc<SessionTable>,
    pub allow_list: Option<Arc<AllowList>>,
}
