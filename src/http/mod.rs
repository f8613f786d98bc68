pub mod dto;
pub mod handlers;
pub mod state;
pub mod ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the DevTools-compatible HTTP+WebSocket router. The browser
/// debugger path is baked in per-process, since it is a fresh UUID each
/// run (see `AppState::browser_debugger_path`).
pub fn build_router(state: Arc<AppState>) -> Router {
    let browser_path = state.browser_debugger_path();

    Router::new()
        .route("/json/version", get(handlers::json_version))
        .route("/json/new", get(handlers::json_new))
        .route("/json/list", get(handlers::json_list))
        .route("/json/close/{id}", get(handlers::json_close))
        .route("/devtools/page/{id}", get(ws::ws_page_handler))
        .route(&browser_path, get(ws::ws_browser_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::AllowList;
    use crate::cdp::registry::RequestRegistry;
    use crate::pipe::{FrameReader, FrameWriter};
    use crate::session::table::SessionTable;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    /// Spawn a tiny mock "Chromium" that replies to every request with a
    /// fixed result, keyed by method name, so handlers can be exercised
    /// through a real `Router` without a real subprocess.
    fn mock_dispatcher(replies: Vec<(&'static str, Value)>) -> Arc<AppState> {
        let (a, b) = tokio::net::UnixStream::pair().unwrap();
        let (mock_read, mock_write) = a.into_split();
        let (proxy_read, proxy_write) = b.into_split();

        tokio::spawn(async move {
            let mut reader = FrameReader::new(mock_read);
            let mut writer = FrameWriter::new(mock_write);
            while let Ok(Some(request)) = reader.read_frame().await {
                let id = request["id"].clone();
                let method = request["method"].as_str().unwrap_or_default();
                let result = replies
                    .iter()
                    .find(|(m, _)| *m == method)
                    .map(|(_, r)| r.clone())
                    .unwrap_or(json!({}));
                let _ = writer.write_frame(&json!({"id": id, "result": result})).await;
            }
        });

        let registry = Arc::new(RequestRegistry::new(FrameWriter::new(proxy_write)));
        // keep the proxy's read half alive by driving a throwaway dispatcher
        let sessions = Arc::new(SessionTable::new());
        let dispatcher = crate::cdp::dispatcher::Dispatcher::new(
            FrameReader::new(proxy_read),
            registry.clone(),
            sessions.clone(),
        );
        tokio::spawn(dispatcher.run());

        Arc::new(AppState {
            registry,
            sessions,
            browser_uuid: Uuid::new_v4(),
            allow_list: None::<Arc<AllowList>>,
        })
    }

    #[tokio::test]
    async fn json_list_returns_empty_array() {
        let state = mock_dispatcher(vec![("Target.getTargets", json!({"targetInfos": []}))]);
        let router = build_router(state);

        let response = router
            .oneshot(Request::builder().uri("/json/list").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"[]");
    }

    #[tokio::test]
    async fn json_version_reports_webkit_version_and_debugger_url() {
        let state = mock_dispatcher(vec![(
            "Browser.getVersion",
            json!({
                "product": "HeadlessChrome/120",
                "revision": "@abcd",
                "protocolVersion": "1.3",
                "userAgent": "Mozilla/5.0 ... AppleWebKit/537.36 ...",
                "jsVersion": "12.0"
            }),
        )]);
        let expected_uuid = state.browser_uuid;
        let router = build_router(state);

        let response = router
            .oneshot(Request::builder().uri("/json/version").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["WebKit-Version"], "537.36 (@abcd)");
        assert_eq!(json["webSocketDebuggerUrl"], format!("ws:/devtools/browser/{expected_uuid}"));
    }

    #[tokio::test]
    async fn json_close_returns_404_with_compliant_body_on_failure() {
        let state = mock_dispatcher(vec![("Target.closeTarget", json!({"success": false}))]);
        let router = build_router(state);

        let response = router
            .oneshot(Request::builder().uri("/json/close/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"No such target id: missing");
    }

    #[tokio::test]
    async fn json_new_surfaces_missing_target_as_500() {
        let state = mock_dispatcher(vec![
            ("Target.createTarget", json!({"targetId": "T1"})),
            ("Target.getTargets", json!({"targetInfos": []})),
        ]);
        let router = build_router(state);

        let response = router
            .oneshot(Request::builder().uri("/json/new").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
