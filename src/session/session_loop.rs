//! Per-WebSocket session state machine: attach, forward inbound and
//! outbound traffic, enforce the allow-list, detach and close.

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, StreamExt};
use serde_json::{json, Value};
use tracing::{debug, trace, warn};

use crate::cdp::message::strip_session_id;
use crate::error::ProxyError;
use crate::session::table::{InboxItem, SessionMode};
use crate::session::{AttachTarget, SessionContext};

/// Drive one WebSocket connection for its whole lifetime. Returns once
/// the session is fully torn down (table entry removed, detach attempted,
/// socket closed).
pub async fn run(socket: WebSocket, target: AttachTarget, ctx: SessionContext) {
    let (session_id, mode) = match attach(&target, &ctx).await {
        Ok(pair) => pair,
        Err(err) => {
            warn!(error = %err, "attach failed, refusing connection");
            return;
        }
    };

    debug!(session_id = %session_id, ?mode, "session attached");
    let mut inbox = ctx.sessions.insert(session_id.clone(), mode);
    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            item = inbox.recv() => {
                match item {
                    Some(InboxItem::Message(message)) => {
                        let outgoing = strip_session_id(message);
                        trace!(session_id = %session_id, "forwarding outbound frame");
                        if ws_tx.send(Message::Text(outgoing.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    Some(InboxItem::Detach) | None => break,
                }
            }
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if handle_inbound(&text, &session_id, mode, &ctx, &mut ws_tx).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => break, // binary/ping/pong: non-text frame, exit per spec
                    Some(Err(err)) => {
                        warn!(session_id = %session_id, error = %err, "websocket error");
                        break;
                    }
                }
            }
        }
    }

    teardown(&session_id, &ctx).await;
    let _ = ws_tx.close().await;
}

async fn attach(target: &AttachTarget, ctx: &SessionContext) -> Result<(String, SessionMode), ProxyError> {
    let (result, mode) = match target {
        AttachTarget::Browser => (
            ctx.registry.call("Target.attachToBrowserTarget", None).await?,
            SessionMode::Flat,
        ),
        AttachTarget::Page(target_id) => (
            ctx.registry
                .call("Target.attachToTarget", Some(json!({"targetId": target_id, "flatten": false})))
                .await?,
            SessionMode::Nested,
        ),
    };

    let session_id = result
        .get("sessionId")
        .and_then(Value::as_str)
        .ok_or_else(|| ProxyError::Transport("attach reply missing sessionId".into()))?
        .to_string();

    Ok((session_id, mode))
}

async fn handle_inbound(
    text: &str,
    session_id: &str,
    mode: SessionMode,
    ctx: &SessionContext,
    ws_tx: &mut (impl Sink<Message, Error = axum::Error> + Unpin),
) -> Result<(), ProxyError> {
    let needs_parse = ctx.allow_list.is_some() || mode == SessionMode::Flat;

    let parsed = if needs_parse {
        Some(serde_json::from_str::<Value>(text).map_err(|e| {
            ProxyError::Transport(format!("malformed client message: {e}"))
        })?)
    } else {
        None
    };

    if let Some(allow_list) = &ctx.allow_list {
        let message = parsed.as_ref().expect("parsed when allow_list is set");
        if !allow_list.allows(message) {
            let client_id = message.get("id").cloned().unwrap_or(Value::Null);
            debug!(session_id = %session_id, method = ?message.get("method"), "allow-list denied message");
            let deny = json!({"id": client_id, "error": {"code": -32000, "message": "not allowed"}});
            let _ = ws_tx.send(Message::Text(deny.to_string().into())).await;
            return Ok(());
        }
    }

    match mode {
        SessionMode::Nested => {
            // The envelope call's own reply is discarded: the real reply
            // arrives later via Target.receivedMessageFromTarget, routed
            // by the dispatcher to this session's inbox.
            let _ = ctx
                .registry
                .call(
                    "Target.sendMessageToTarget",
                    Some(json!({"sessionId": session_id, "message": text})),
                )
                .await;
        }
        SessionMode::Flat => {
            let mut message = parsed.expect("parsed in flat mode");
            if let Some(obj) = message.as_object_mut() {
                obj.insert("sessionId".to_string(), Value::String(session_id.to_string()));
            }
            ctx.registry.raw_send(message).await?;
        }
    }

    Ok(())
}

async fn teardown(session_id: &str, ctx: &SessionContext) {
    ctx.sessions.remove(session_id);
    match ctx
        .registry
        .call("Target.detachFromTarget", Some(json!({"sessionId": session_id})))
        .await
    {
        Ok(_) => {}
        Err(err) if err.is_invalid_params() => {
            // session already gone on Chromium's side; expected.
        }
        Err(err) => warn!(session_id = %session_id, error = %err, "detach failed"),
    }
    debug!(session_id = %session_id, "session detached and removed");
}
