use std::future::Future;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::{Any, CorsLayer};

use common::log;

use crate::game_server::GameServer;
use crate::server_config::{MAX_TEXT_FRAME_BYTES, WEBSOCKET_PATH};
use crate::ws_handler::handle_websocket;

#[derive(Clone)]
pub struct WebServerState {
    pub game_server: GameServer,
}

pub fn build_router(game_server: GameServer) -> Router {
    let state = WebServerState { game_server };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(WEBSOCKET_PATH, get(ws_upgrade_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn run_web_server<F>(game_server: GameServer, bind_address: &str, shutdown: F) -> Result<(), String>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(game_server);

    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", bind_address, e))?;
    log!("Snake arena listening on ws://{}{}", bind_address, WEBSOCKET_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| format!("Web server error: {}", e))
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<WebServerState>,
) -> impl IntoResponse {
    ws.max_message_size(MAX_TEXT_FRAME_BYTES)
        .on_upgrade(move |socket| handle_websocket(socket, state))
}
