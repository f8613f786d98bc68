//! The single reader task. Owns the pipe decoder and demultiplexes every
//! decoded message into either a pending-request completion or a
//! session's inbox, following a fixed precedence (see `route`).

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cdp::message::{message_id, message_method, message_session_id, reply_to_result};
use crate::cdp::registry::RequestRegistry;
use crate::pipe::FrameReader;
use crate::session::table::SessionTable;

pub struct Dispatcher {
    reader: FrameReader,
    registry: Arc<RequestRegistry>,
    sessions: Arc<SessionTable>,
}

impl Dispatcher {
    pub fn new(reader: FrameReader, registry: Arc<RequestRegistry>, sessions: Arc<SessionTable>) -> Self {
        Self { reader, registry, sessions }
    }

    /// Run until the pipe closes or a framing error occurs. Either way,
    /// every pending call is failed and every session is sent the detach
    /// sentinel before returning.
    pub async fn run(mut self) {
        loop {
            match self.reader.read_frame().await {
                Ok(Some(message)) => route(message, &self.registry, &self.sessions),
                Ok(None) => {
                    debug!("pipe closed cleanly");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "protocol framing error, tearing down");
                    break;
                }
            }
        }
        self.registry.fail_all();
        self.sessions.detach_all();
    }
}

/// Apply the dispatcher's fixed precedence to one decoded message.
/// Step 1 must precede step 2: in flat mode, replies carry both `id` and
/// `sessionId`, but the session's own setup-time RPCs (e.g. the
/// `attachToTarget` call itself) are issued before the session exists in
/// the table, so those replies correctly fall through to step 2.
fn route(message: Value, registry: &Arc<RequestRegistry>, sessions: &Arc<SessionTable>) {
    if let Some(session_id) = message_session_id(&message) {
        if sessions.deliver_if_flat(session_id, message.clone()) {
            return;
        }
    }

    if let Some(id) = message_id(&message) {
        if let Some(complete) = registry.take_pending(id) {
            complete(reply_to_result(&message));
            return;
        }
    }

    match message_method(&message) {
        Some("Target.receivedMessageFromTarget") => deliver_nested(&message, sessions),
        Some("Target.detachedFromTarget") => {
            if let Some(session_id) = message
                .get("params")
                .and_then(|p| p.get("sessionId"))
                .and_then(Value::as_str)
            {
                sessions.detach(session_id);
            }
        }
        _ => debug!(?message, "dropping unhandled browser-scope event"),
    }
}

fn deliver_nested(message: &Value, sessions: &Arc<SessionTable>) {
    let Some(params) = message.get("params") else { return };
    let Some(session_id) = params.get("sessionId").and_then(Value::as_str) else { return };
    let Some(raw) = params.get("message").and_then(Value::as_str) else { return };
    match serde_json::from_str::<Value>(raw) {
        Ok(sub_message) => {
            sessions.deliver_any(session_id, sub_message);
        }
        Err(err) => warn!(error = %err, "malformed Target.receivedMessageFromTarget payload"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::FrameWriter;
    use crate::session::table::{InboxItem, SessionMode};
    use serde_json::json;

    fn registry_pair() -> (Arc<RequestRegistry>, tokio::net::unix::OwnedReadHalf) {
        let (a, b) = tokio::net::UnixStream::pair().unwrap();
        let (_ar, aw) = a.into_split();
        let (br, _bw) = b.into_split();
        (Arc::new(RequestRegistry::new(FrameWriter::new(aw))), br)
    }

    #[tokio::test]
    async fn flat_session_reply_goes_to_inbox_not_registry() {
        let (registry, _unused) = registry_pair();
        let sessions = Arc::new(SessionTable::new());
        let mut rx = sessions.insert("S1".into(), SessionMode::Flat);

        // a flat id=5 call is pending in the registry too, but the
        // sessionId must win per step 1 preceding step 2.
        let registry2 = registry.clone();
        let pending = tokio::spawn(async move { registry2.call("Foo", None).await });
        tokio::task::yield_now().await;

        route(json!({"id": 0, "sessionId": "S1", "result": {}}), &registry, &sessions);

        match rx.try_recv() {
            Ok(InboxItem::Message(m)) => assert_eq!(m, json!({"id": 0, "sessionId": "S1", "result": {}})),
            other => panic!("expected inbox message, got {other:?}"),
        }

        // the pending registry call is untouched; fail it explicitly to
        // let the spawned task finish.
        registry.fail_all();
        let _ = pending.await;
    }

    #[tokio::test]
    async fn setup_time_reply_without_session_in_table_falls_through_to_registry() {
        let (registry, _unused) = registry_pair();
        let sessions = Arc::new(SessionTable::new());

        let registry2 = registry.clone();
        let handle = tokio::spawn(async move { registry2.call("Target.attachToTarget", None).await });
        tokio::task::yield_now().await;

        // reply carries sessionId (the newly attached session) but that
        // session is not registered yet, so id-based lookup must apply.
        route(
            json!({"id": 0, "sessionId": "NEW", "result": {"sessionId": "NEW"}}),
            &registry,
            &sessions,
        );

        let result = handle.await.unwrap().unwrap();
        assert_eq!(result, json!({"sessionId": "NEW"}));
    }

    #[tokio::test]
    async fn nested_event_unwraps_and_delivers_by_session() {
        let (registry, _unused) = registry_pair();
        let sessions = Arc::new(SessionTable::new());
        let mut rx = sessions.insert("S1".into(), SessionMode::Nested);

        route(
            json!({
                "method": "Target.receivedMessageFromTarget",
                "params": {"sessionId": "S1", "message": "{\"id\":5,\"result\":{}}"}
            }),
            &registry,
            &sessions,
        );

        match rx.try_recv() {
            Ok(InboxItem::Message(m)) => assert_eq!(m, json!({"id": 5, "result": {}})),
            other => panic!("expected inbox message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn detached_from_target_pushes_sentinel() {
        let (registry, _unused) = registry_pair();
        let sessions = Arc::new(SessionTable::new());
        let mut rx = sessions.insert("S1".into(), SessionMode::Nested);

        route(
            json!({"method": "Target.detachedFromTarget", "params": {"sessionId": "S1"}}),
            &registry,
            &sessions,
        );

        assert!(matches!(rx.try_recv().unwrap(), InboxItem::Detach));
    }

    #[tokio::test]
    async fn unhandled_event_is_dropped_without_panicking() {
        let (registry, _unused) = registry_pair();
        let sessions = Arc::new(SessionTable::new());
        route(json!({"method": "Network.requestWillBeSent", "params": {}}), &registry, &sessions);
    }
}
