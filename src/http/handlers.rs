use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use regex::Regex;
use serde_json::{json, Value};

use crate::error::ProxyError;
use crate::http::dto::{BrowserVersion, TargetRecord};
use crate::http::state::AppState;

/// Wraps `ProxyError` so handlers can return it directly with `?` and
/// have it become a 500 response.
pub struct HttpError(ProxyError);

impl From<ProxyError> for HttpError {
    fn from(err: ProxyError) -> Self {
        HttpError(err)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

fn webkit_version(user_agent: &str, revision: &str) -> String {
    let pattern = Regex::new(r"AppleWebKit/(\d+)\.(\d+)").expect("valid static regex");
    match pattern.captures(user_agent) {
        Some(caps) => format!("{}.{} ({})", &caps[1], &caps[2], revision),
        None => format!("0.0 ({revision})"),
    }
}

pub async fn json_version(State(state): State<Arc<AppState>>) -> Result<Json<BrowserVersion>, HttpError> {
    let result = state.registry.call("Browser.getVersion", None).await?;

    let field = |name: &str| result.get(name).and_then(Value::as_str).unwrap_or("").to_string();
    let user_agent = field("userAgent");
    let revision = field("revision");

    Ok(Json(BrowserVersion {
        browser: field("product"),
        protocol_version: field("protocolVersion"),
        webkit_version: webkit_version(&user_agent, &revision),
        user_agent,
        v8_version: field("jsVersion"),
        web_socket_debugger_url: format!("ws:{}", state.browser_debugger_path()),
    }))
}

pub async fn json_new(State(state): State<Arc<AppState>>) -> Result<Json<TargetRecord>, HttpError> {
    let created = state
        .registry
        .call("Target.createTarget", Some(json!({"url": ""})))
        .await?;
    let target_id = created
        .get("targetId")
        .and_then(Value::as_str)
        .ok_or_else(|| ProxyError::MissingTarget("createTarget reply missing targetId".into()))?;

    let targets = state.registry.call("Target.getTargets", None).await?;
    let record = targets
        .get("targetInfos")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|info| info.get("targetId").and_then(Value::as_str) == Some(target_id))
        .and_then(TargetRecord::from_target_info)
        .ok_or_else(|| ProxyError::MissingTarget(target_id.to_string()))?;

    Ok(Json(record))
}

pub async fn json_list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TargetRecord>>, HttpError> {
    let targets = state.registry.call("Target.getTargets", None).await?;
    let records = targets
        .get("targetInfos")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(TargetRecord::from_target_info)
        .collect();

    Ok(Json(records))
}

pub async fn json_close(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Response, HttpError> {
    let result = state
        .registry
        .call("Target.closeTarget", Some(json!({"targetId": id})))
        .await?;
    let success = result.get("success").and_then(Value::as_bool).unwrap_or(false);

    if success {
        Ok((StatusCode::OK, "Target is closing").into_response())
    } else {
        Ok((StatusCode::NOT_FOUND, format!("No such target id: {id}")).into_response())
    }
}
