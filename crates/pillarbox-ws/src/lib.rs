mod connection;
mod handler;

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use pillarbox_core::Bridge;

#[derive(Debug, Clone, Copy)]
pub struct GatewaySettings {
    /// Dispose the sessions and views a connection created when it closes.
    pub dispose_on_disconnect: bool,
    /// Log every frame on the `wire` target.
    pub wire_trace: bool,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            dispose_on_disconnect: true,
            wire_trace: false,
        }
    }
}

#[derive(Clone)]
pub struct GatewayState {
    pub bridge: Arc<Bridge>,
    pub settings: GatewaySettings,
}

pub fn channel_router() -> Router<GatewayState> {
    Router::new().route("/channel", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handler::handle_connection(socket, state))
}
