//! The session table: sessionId → inbox, shared between the dispatcher
//! (which delivers into it) and session loops (which own the receiving
//! end and register/deregister themselves).

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::mpsc;

/// Whether a session was established via `Target.attachToBrowserTarget`
/// (flat: messages carry `sessionId` at top level) or
/// `Target.attachToTarget` (nested: messages are wrapped in
/// `Target.sendMessageToTarget`/`Target.receivedMessageFromTarget`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Flat,
    Nested,
}

/// An item delivered into a session's inbox.
pub enum InboxItem {
    Message(Value),
    /// The session is gone: Chromium detached it, or the pipe closed.
    Detach,
}

struct Entry {
    mode: SessionMode,
    tx: mpsc::UnboundedSender<InboxItem>,
}

#[derive(Default)]
pub struct SessionTable {
    entries: DashMap<String, Entry>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    pub fn insert(
        &self,
        session_id: String,
        mode: SessionMode,
    ) -> mpsc::UnboundedReceiver<InboxItem> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.entries.insert(session_id, Entry { mode, tx });
        rx
    }

    pub fn remove(&self, session_id: &str) {
        self.entries.remove(session_id);
    }

    /// Deliver to `session_id` only if it is live and flat-mode. Used by
    /// dispatcher step 1.
    pub fn deliver_if_flat(&self, session_id: &str, message: Value) -> bool {
        if let Some(entry) = self.entries.get(session_id) {
            if entry.mode == SessionMode::Flat {
                return entry.tx.send(InboxItem::Message(message)).is_ok();
            }
        }
        false
    }

    /// Deliver to `session_id` regardless of mode. Used for nested-mode
    /// event/reply delivery and detach-sentinel delivery.
    pub fn deliver_any(&self, session_id: &str, message: Value) -> bool {
        if let Some(entry) = self.entries.get(session_id) {
            return entry.tx.send(InboxItem::Message(message)).is_ok();
        }
        false
    }

    pub fn detach(&self, session_id: &str) -> bool {
        if let Some(entry) = self.entries.get(session_id) {
            return entry.tx.send(InboxItem::Detach).is_ok();
        }
        false
    }

    /// Push the detach sentinel into every live session. Called once by
    /// the dispatcher on pipe EOF.
    pub fn detach_all(&self) {
        for entry in self.entries.iter() {
            let _ = entry.tx.send(InboxItem::Detach);
        }
    }
}
