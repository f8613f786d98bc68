//! Monotonic id allocation and request/reply correlation for the pipe.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::cdp::message::CdpRequest;
use crate::error::ProxyError;
use crate::pipe::FrameWriter;

/// A single in-flight request awaiting its reply.
struct PendingRequest {
    tx: oneshot::Sender<Result<Value, ProxyError>>,
}

/// Id allocator, pending-request table, and the single writer lock that
/// serializes every outbound frame. Id allocation and frame emission are
/// one critical section: the writer lock is held across both, so wire
/// order always matches allocation order.
pub struct RequestRegistry {
    writer: tokio::sync::Mutex<FrameWriter>,
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingRequest>>,
}

impl RequestRegistry {
    pub fn new(writer: FrameWriter) -> Self {
        Self {
            writer: tokio::sync::Mutex::new(writer),
            next_id: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a browser-scoped CDP call and await its reply.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, ProxyError> {
        self.call_with_session(method, params, None).await
    }

    /// Issue a session-scoped CDP call (the envelope itself carries
    /// `sessionId`) and await its reply.
    pub async fn call_with_session(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<String>,
    ) -> Result<Value, ProxyError> {
        let (tx, rx) = oneshot::channel();

        let mut writer = self.writer.lock().await;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().insert(id, PendingRequest { tx });

        let request = CdpRequest { id, method: method.to_string(), params, session_id };
        if let Err(err) = writer.write_frame(&serde_json::to_value(&request)?).await {
            self.pending.lock().remove(&id);
            return Err(err);
        }
        drop(writer);

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(ProxyError::PipeClosed),
        }
    }

    /// Flat-mode fire-and-forget: write a pre-formed, already
    /// `sessionId`-bearing message directly, still serialized under the
    /// writer lock, without allocating an id or registering a completion.
    pub async fn raw_send(&self, message: Value) -> Result<(), ProxyError> {
        let mut writer = self.writer.lock().await;
        writer.write_frame(&message).await
    }

    /// Remove and return the pending entry for `id`, if any. Called by
    /// the dispatcher when a reply with a matching id arrives.
    pub fn take_pending(&self, id: u64) -> Option<impl FnOnce(Result<Value, ProxyError>)> {
        let entry = self.pending.lock().remove(&id)?;
        Some(move |result: Result<Value, ProxyError>| {
            let _ = entry.tx.send(result);
        })
    }

    /// Drain the registry, failing every pending request. Called once by
    /// the dispatcher on pipe EOF.
    pub fn fail_all(&self) {
        let entries: Vec<_> = self.pending.lock().drain().map(|(_, v)| v).collect();
        for entry in entries {
            let _ = entry.tx.send(Err(ProxyError::PipeClosed));
        }
    }
}

pub type SharedRegistry = Arc<RequestRegistry>;
