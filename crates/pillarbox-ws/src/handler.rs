use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use pillarbox_models::channel::ChannelFrame;
use pillarbox_models::error::ErrorCode;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;

use crate::connection::Connection;
use crate::GatewayState;

const WIRE_PREVIEW_MAX_CHARS: usize = 256;

/// Close code sent to peers that fell behind the event bus.
const CLOSE_TRY_AGAIN_LATER: u16 = 1013;

fn payload_preview(payload: &str) -> &str {
    match payload.char_indices().nth(WIRE_PREVIEW_MAX_CHARS) {
        Some((end, _)) => &payload[..end],
        None => payload,
    }
}

fn wire_log_in(enabled: bool, connection_id: &str, payload: &str) {
    if !enabled {
        return;
    }
    tracing::info!(
        target: "wire",
        transport = "channel_ws",
        direction = "in",
        connection_id,
        bytes = payload.len(),
        payload_preview = payload_preview(payload),
        "server_in"
    );
}

fn wire_log_out(enabled: bool, connection_id: &str, payload: &str, frame_type: &str) {
    if !enabled {
        return;
    }
    tracing::info!(
        target: "wire",
        transport = "channel_ws",
        direction = "out",
        frame_type,
        connection_id,
        bytes = payload.len(),
        payload_preview = payload_preview(payload),
        "server_out"
    );
}

async fn send_frame_logged(
    sender: &mut (impl SinkExt<Message> + Unpin),
    frame: &ChannelFrame,
    wire_trace: bool,
    connection_id: &str,
    frame_type: &str,
) -> Result<(), ()> {
    let payload = match frame.encode() {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(connection_id, "failed to encode {frame_type} frame: {err}");
            return Ok(());
        }
    };
    wire_log_out(wire_trace, connection_id, &payload, frame_type);
    sender.send(Message::Text(payload.into())).await.map_err(|_| ())
}

async fn send_close_logged(
    sender: &mut (impl SinkExt<Message> + Unpin),
    code: u16,
    reason: &str,
    wire_trace: bool,
    connection_id: &str,
) -> Result<(), ()> {
    if wire_trace {
        tracing::info!(
            target: "wire",
            transport = "channel_ws",
            direction = "out",
            frame_type = "close",
            connection_id,
            code,
            reason,
            "server_out"
        );
    }
    sender
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await
        .map_err(|_| ())
}

pub async fn handle_connection(socket: WebSocket, state: GatewayState) {
    let (mut sender, mut receiver) = socket.split();
    let mut connection = Connection::new();
    let mut event_rx = state.bridge.subscribe();
    let wire_trace = state.settings.wire_trace;

    tracing::info!(connection_id = %connection.connection_id, "channel connection opened");

    let disconnect_reason = loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        wire_log_in(wire_trace, &connection.connection_id, &text);
                        if let Some(reply) = handle_client_frame(&state, &mut connection, &text).await {
                            if send_frame_logged(&mut sender, &reply, wire_trace, &connection.connection_id, "reply")
                                .await
                                .is_err()
                            {
                                break "websocket send error".to_string();
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(frame) => format!(
                                "client close frame (code={}, reason={})",
                                frame.code, frame.reason
                            ),
                            None => "client close frame (no code/reason)".to_string(),
                        };
                    }
                    Some(Err(err)) => {
                        break format!("websocket receive error: {err}");
                    }
                    None => {
                        break "websocket stream ended".to_string();
                    }
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        if !connection.should_receive_event(&event) {
                            continue;
                        }
                        let frame = state.bridge.event_frame(&event);
                        if send_frame_logged(&mut sender, &frame, wire_trace, &connection.connection_id, "event")
                            .await
                            .is_err()
                        {
                            break "websocket send error".to_string();
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            connection_id = %connection.connection_id,
                            "event stream lagged (missed {skipped} events); closing connection"
                        );
                        let _ = send_close_logged(
                            &mut sender,
                            CLOSE_TRY_AGAIN_LATER,
                            "Event stream fell behind; reconnect required",
                            wire_trace,
                            &connection.connection_id,
                        )
                        .await;
                        break format!("event stream lagged by {skipped} events");
                    }
                    Err(RecvError::Closed) => {
                        break "event stream closed".to_string();
                    }
                }
            }
        }
    };

    tracing::info!(
        connection_id = %connection.connection_id,
        "channel connection closed: {disconnect_reason}"
    );

    if state.settings.dispose_on_disconnect {
        for channel in connection.take_owned() {
            state.bridge.release_channel(channel).await;
        }
    }
}

/// Dispatches one inbound text frame. Returns the reply to send, if any.
async fn handle_client_frame(state: &GatewayState, connection: &mut Connection, text: &str) -> Option<ChannelFrame> {
    let frame = match ChannelFrame::decode(text) {
        Ok(frame) => frame,
        Err(err) => {
            // Best effort: answer under the caller's id when there is one.
            let id = serde_json::from_str::<Value>(text)
                .ok()
                .and_then(|payload| payload.get("id").and_then(Value::as_u64))
                .unwrap_or(0);
            return Some(ChannelFrame::Error {
                id,
                code: ErrorCode::MalformedFrame,
                message: err.to_string(),
            });
        }
    };

    let ChannelFrame::Call {
        id,
        channel,
        method,
        args,
    } = frame
    else {
        tracing::debug!(connection_id = %connection.connection_id, "ignoring non-call frame from client");
        return None;
    };

    match state.bridge.handle_call(&channel, &method, args).await {
        Ok(reply) => {
            if let Some(effect) = reply.effect {
                connection.apply(effect);
            }
            Some(ChannelFrame::Success {
                id,
                result: reply.result,
            })
        }
        Err(err) => {
            tracing::debug!(
                connection_id = %connection.connection_id,
                channel = %channel,
                method = %method,
                code = err.code().as_str(),
                "call failed: {err}"
            );
            Some(ChannelFrame::Error {
                id,
                code: err.code(),
                message: err.to_string(),
            })
        }
    }
}
