use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::http::state::AppState;
use crate::session::{session_loop, AttachTarget};

pub async fn ws_page_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let ctx = state.session_context();
    ws.on_upgrade(move |socket| session_loop::run(socket, AttachTarget::Page(id), ctx))
}

pub async fn ws_browser_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ctx = state.session_context();
    ws.on_upgrade(move |socket| session_loop::run(socket, AttachTarget::Browser, ctx))
}
