//! CDP wire-level message shapes and small helpers for picking fields out
//! of a decoded message without committing to one strict schema — the
//! dispatcher has to tell requests, replies, and events apart by presence
//! of fields, the same way the protocol itself does.

use serde::Serialize;
use serde_json::Value;

use crate::error::ProxyError;

/// An outbound client-to-browser CDP request, as written to the pipe.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// `message.id`, if present and representable as a non-negative integer.
pub fn message_id(message: &Value) -> Option<u64> {
    message.get("id").and_then(Value::as_u64)
}

/// `message.sessionId`, if present.
pub fn message_session_id(message: &Value) -> Option<&str> {
    message.get("sessionId").and_then(Value::as_str)
}

/// `message.method`, if present.
pub fn message_method(message: &Value) -> Option<&str> {
    message.get("method").and_then(Value::as_str)
}

/// Convert a decoded browser-to-client reply's `result`/`error` fields
/// into a `Result`, per the CDP error taxonomy.
pub fn reply_to_result(message: &Value) -> Result<Value, ProxyError> {
    if let Some(error) = message.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
        let msg = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown CDP error")
            .to_string();
        return Err(ProxyError::Cdp { code, message: msg });
    }
    Ok(message.get("result").cloned().unwrap_or(Value::Null))
}

/// Remove `sessionId` from a message before handing it to a client —
/// clients must never observe the proxy's internal session framing.
pub fn strip_session_id(mut message: Value) -> Value {
    if let Some(obj) = message.as_object_mut() {
        obj.remove("sessionId");
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_to_result_extracts_result_on_success() {
        let msg = json!({"id": 1, "result": {"ok": true}});
        assert_eq!(reply_to_result(&msg).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn reply_to_result_extracts_cdp_error() {
        let msg = json!({"id": 1, "error": {"code": -32602, "message": "bad session"}});
        let err = reply_to_result(&msg).unwrap_err();
        assert!(matches!(err, ProxyError::Cdp { code: -32602, .. }));
    }

    #[test]
    fn strip_session_id_removes_field_only() {
        let msg = json!({"id": 1, "result": {}, "sessionId": "S1"});
        let stripped = strip_session_id(msg);
        assert_eq!(stripped, json!({"id": 1, "result": {}}));
    }

    #[test]
    fn field_accessors_return_none_when_absent() {
        let msg = json!({"foo": "bar"});
        assert_eq!(message_id(&msg), None);
        assert_eq!(message_session_id(&msg), None);
        assert_eq!(message_method(&msg), None);
    }
}
