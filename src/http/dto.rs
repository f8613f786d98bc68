//! DevTools-compatible JSON response shapes.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "Protocol-Version")]
    pub protocol_version: String,
    #[serde(rename = "User-Agent")]
    pub user_agent: String,
    #[serde(rename = "V8-Version")]
    pub v8_version: String,
    #[serde(rename = "WebKit-Version")]
    pub webkit_version: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TargetRecord {
    pub description: String,
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub target_type: String,
    pub url: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

impl TargetRecord {
    pub fn from_target_info(info: &serde_json::Value) -> Option<TargetRecord> {
        let id = info.get("targetId")?.as_str()?.to_string();
        Some(TargetRecord {
            description: String::new(),
            title: info.get("title").and_then(serde_json::Value::as_str).unwrap_or("").to_string(),
            target_type: info.get("type").and_then(serde_json::Value::as_str).unwrap_or("").to_string(),
            url: info.get("url").and_then(serde_json::Value::as_str).unwrap_or("").to_string(),
            web_socket_debugger_url: format!("ws:/devtools/page/{id}"),
            id,
        })
    }
}
