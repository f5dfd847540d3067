//! HTTP/WebSocket server: route table, the join handshake, and the
//! per-connection message dispatcher.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedSender};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::constants::JOIN_HANDSHAKE_TIMEOUT_MS;
use crate::docs::ApiDoc;
use crate::protocol::{
    envelope, ErrorPayload, InputPayload, JoinPayload, JoinedPayload, LobbyStatePayload,
    PingPayload, RawEnvelope, ReadyPayload, SetSettingsPayload,
};
use crate::room::{Room, RoomManager};

#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RoomManager>,
    pub static_dir: String,
}

pub fn create_app(config: &Config) -> Router {
    let state = AppState { rooms: Arc::new(RoomManager::new()), static_dir: config.static_dir.clone() };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .route("/", get(serve_index))
        .route("/play", get(|| async { Redirect::temporary("/play/") }))
        .nest_service("/play", ServeDir::new(&config.static_dir))
        .route("/docs", get(serve_docs))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-spec.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cube_snake=info,tower_http=info".into()),
        )
        .init();

    let app = create_app(&config);
    let addr: SocketAddr = config.socket_addr();

    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses((status = 200, description = "Server is healthy", body = String))
)]
pub(crate) async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

const DEBUG_PAGE: &str = r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8" />
  <title>cube-snake backend</title>
  <style>
    body { font-family: ui-sans-serif, system-ui, sans-serif; margin: 24px; }
    #log { white-space: pre-wrap; background: #111; color: #ddd; padding: 12px; border-radius: 8px; min-height: 180px; }
    input, button { padding: 8px; }
  </style>
</head>
<body>
  <h1>cube-snake backend</h1>
  <p>WebSocket endpoint at <code>/ws</code>, health check at <code>/healthz</code>.</p>
  <div>
    <label>Name <input id="name" value="Player" /></label>
    <label>Room ID <input id="roomId" placeholder="optional" /></label>
    <button id="connect">Connect</button>
    <button id="ready" disabled>Ready</button>
  </div>
  <h3>Log</h3>
  <div id="log"></div>
  <script>
    const log = (line) => { const el = document.getElementById("log"); el.textContent += line + "\n"; el.scrollTop = el.scrollHeight; };
    let ws = null;
    document.getElementById("connect").onclick = () => {
      if (ws) ws.close();
      const proto = location.protocol === "https:" ? "wss" : "ws";
      ws = new WebSocket(`${proto}://${location.host}/ws`);
      ws.onopen = () => {
        document.getElementById("ready").disabled = false;
        const roomId = document.getElementById("roomId").value.trim();
        const payload = { name: document.getElementById("name").value || "Player" };
        if (roomId) payload.roomId = roomId;
        ws.send(JSON.stringify({ v: 1, type: "join", payload }));
      };
      ws.onmessage = (ev) => log(`<- ${ev.data}`);
      ws.onclose = () => log("closed");
      ws.onerror = () => log("error");
    };
    document.getElementById("ready").onclick = () => {
      if (!ws || ws.readyState !== WebSocket.OPEN) return;
      ws.send(JSON.stringify({ v: 1, type: "ready", payload: { ready: true } }));
    };
  </script>
</body>
</html>"#;

async fn serve_index() -> impl IntoResponse {
    Html(DEBUG_PAGE)
}

async fn serve_docs() -> impl IntoResponse {
    Html(format!(
        "<!doctype html><html><head><title>cube-snake protocol</title>\
         <style>body{{font-family:ui-sans-serif,system-ui,sans-serif;margin:24px;}}pre{{background:#f4f4f4;padding:12px;border-radius:6px;white-space:pre-wrap;}}</style>\
         </head><body><h1>cube-snake protocol reference</h1><pre>{}</pre></body></html>",
        html_escape(crate::docs::PROTOCOL_REFERENCE)
    ))
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn send_error(tx: &UnboundedSender<String>, code: &'static str, message: impl Into<String>) {
    let env = envelope("error", ErrorPayload { code, message: message.into() });
    if let Ok(text) = serde_json::to_string(&env) {
        let _ = tx.send(text);
    }
}

fn send_envelope<T: serde::Serialize>(tx: &UnboundedSender<String>, kind: &'static str, payload: T) {
    if let Ok(text) = serde_json::to_string(&envelope(kind, payload)) {
        let _ = tx.send(text);
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let outbound = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut room: Option<Arc<Room>> = None;
    let mut player_id: Option<String> = None;

    run_connection(&mut ws_receiver, &state, &tx, &mut room, &mut player_id).await;

    if let (Some(room), Some(pid)) = (room, player_id) {
        state.rooms.leave(&room, &pid).await;
        let lobby = room.lobby_state().await;
        room.broadcast_envelope("lobby_state", LobbyStatePayload { lobby }).await;
    }

    drop(tx);
    outbound.abort();
}

/// An absent, empty, or whitespace-only name all default to "Player".
fn normalize_join_name(name: Option<String>) -> String {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Player".to_string())
}

async fn run_connection(
    receiver: &mut futures_util::stream::SplitStream<WebSocket>,
    state: &AppState,
    tx: &UnboundedSender<String>,
    room_slot: &mut Option<Arc<Room>>,
    player_slot: &mut Option<String>,
) {
    let join_text = match tokio::time::timeout(
        Duration::from_millis(JOIN_HANDSHAKE_TIMEOUT_MS),
        receiver.next(),
    )
    .await
    {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(_))) | Ok(Some(Err(_))) => {
            send_error(tx, "bad_join", "first message must be join");
            return;
        }
        Ok(None) => return,
        Err(_) => {
            send_error(tx, "join_timeout", "join timed out");
            return;
        }
    };

    let raw: RawEnvelope = match serde_json::from_str(&join_text) {
        Ok(v) => v,
        Err(_) => {
            send_error(tx, "bad_join", "first message must be join");
            return;
        }
    };
    if raw.kind != "join" {
        send_error(tx, "bad_join", "first message must be join");
        return;
    }
    let payload: JoinPayload = serde_json::from_value(raw.payload).unwrap_or(JoinPayload {
        name: None,
        room_id: None,
    });
    let name = normalize_join_name(payload.name);

    let (room, pid, is_host) = match state.rooms.join(payload.room_id, name, tx.clone()).await {
        Ok(v) => v,
        Err(e) => {
            send_error(tx, e.code(), e.to_string());
            return;
        }
    };
    *room_slot = Some(Arc::clone(&room));
    *player_slot = Some(pid.clone());

    let lobby = room.lobby_state().await;
    send_envelope(
        tx,
        "joined",
        JoinedPayload { player_id: pid.clone(), room_id: room.room_id.clone(), is_host, lobby: lobby.clone() },
    );
    room.broadcast_envelope("lobby_state", LobbyStatePayload { lobby }).await;

    loop {
        match receiver.next().await {
            Some(Ok(Message::Text(text))) => {
                if dispatch_message(&text, &room, &pid, tx).await.is_break() {
                    return;
                }
            }
            Some(Ok(Message::Close(_))) | None => return,
            Some(Ok(_)) => continue,
            Some(Err(e)) => {
                warn!("websocket error for player {pid}: {e}");
                return;
            }
        }
    }
}

async fn dispatch_message(
    text: &str,
    room: &Arc<Room>,
    player_id: &str,
    tx: &UnboundedSender<String>,
) -> std::ops::ControlFlow<()> {
    use std::ops::ControlFlow;

    let raw: RawEnvelope = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => return ControlFlow::Continue(()),
    };

    match raw.kind.as_str() {
        "leave" => return ControlFlow::Break(()),
        "ping" => {
            let payload: PingPayload = serde_json::from_value(raw.payload).unwrap_or(PingPayload {
                client_time_ms: None,
            });
            let pong = room.pong(payload.client_time_ms).await;
            send_envelope(tx, "pong", pong);
        }
        "set_settings" => {
            let Ok(payload) = serde_json::from_value::<SetSettingsPayload>(raw.payload) else {
                return ControlFlow::Continue(());
            };
            if room.set_settings(player_id, payload.cube_n, payload.round_seconds, payload.tick_rate).await {
                let lobby = room.lobby_state().await;
                room.broadcast_envelope("lobby_state", LobbyStatePayload { lobby }).await;
            }
        }
        "ready" => {
            let Ok(payload) = serde_json::from_value::<ReadyPayload>(raw.payload) else {
                return ControlFlow::Continue(());
            };
            if room.set_ready(player_id, payload.ready.unwrap_or(false)).await {
                let lobby = room.lobby_state().await;
                room.broadcast_envelope("lobby_state", LobbyStatePayload { lobby }).await;
                if let Err(e) = room.maybe_start(false).await {
                    room
                        .broadcast_envelope(
                            "error",
                            ErrorPayload { code: e.code(), message: e.to_string() },
                        )
                        .await;
                }
            }
        }
        "input" => {
            let Ok(payload) = serde_json::from_value::<InputPayload>(raw.payload) else {
                return ControlFlow::Continue(());
            };
            room.submit_inputs(player_id, payload.inputs).await;
        }
        _ => {
            // Unknown message type: a protocol error, dropped silently.
        }
    }

    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomManager;
    use tokio::sync::mpsc;

    async fn joined_room() -> (Arc<Room>, String, UnboundedSender<String>, mpsc::UnboundedReceiver<String>) {
        let manager = RoomManager::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let (room, pid, _) = manager.join(None, "Alice".into(), tx.clone()).await.unwrap();
        (room, pid, tx, rx)
    }

    #[tokio::test]
    async fn ping_gets_a_pong_with_the_echoed_client_time() {
        let (room, pid, tx, mut rx) = joined_room().await;
        dispatch_message(r#"{"v":1,"type":"ping","payload":{"clientTimeMs":42}}"#, &room, &pid, &tx)
            .await;

        let text = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "pong");
        assert_eq!(value["payload"]["clientTimeMs"], 42);
    }

    #[tokio::test]
    async fn leave_breaks_the_dispatch_loop() {
        let (room, pid, tx, _rx) = joined_room().await;
        let flow = dispatch_message(r#"{"v":1,"type":"leave","payload":{}}"#, &room, &pid, &tx).await;
        assert!(flow.is_break());
    }

    #[tokio::test]
    async fn unknown_message_type_is_dropped_silently() {
        let (room, pid, tx, mut rx) = joined_room().await;
        let flow =
            dispatch_message(r#"{"v":1,"type":"not_a_real_type","payload":{}}"#, &room, &pid, &tx).await;
        assert!(flow.is_continue());
        assert!(rx.try_recv().is_err(), "unknown message types must not produce a reply");
    }

    #[tokio::test]
    async fn malformed_json_is_dropped_silently() {
        let (room, pid, tx, mut rx) = joined_room().await;
        let flow = dispatch_message("not json at all", &room, &pid, &tx).await;
        assert!(flow.is_continue());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn normalize_join_name_defaults_absent_empty_and_whitespace_names() {
        assert_eq!(normalize_join_name(None), "Player");
        assert_eq!(normalize_join_name(Some("".into())), "Player");
        assert_eq!(normalize_join_name(Some("   ".into())), "Player");
        assert_eq!(normalize_join_name(Some("  Bob  ".into())), "Bob");
        assert_eq!(normalize_join_name(Some("Alice".into())), "Alice");
    }

    #[tokio::test]
    async fn non_host_set_settings_is_ignored() {
        let (room, host_pid, host_tx, mut host_rx) = joined_room().await;

        dispatch_message(
            r#"{"v":1,"type":"set_settings","payload":{"cubeN":40}}"#,
            &room,
            "not-a-real-player-id",
            &host_tx,
        )
        .await;
        assert!(host_rx.try_recv().is_err(), "a non-member set_settings must not broadcast");

        // Sanity: the real host's request does take effect and does broadcast.
        dispatch_message(
            r#"{"v":1,"type":"set_settings","payload":{"cubeN":40}}"#,
            &room,
            &host_pid,
            &host_tx,
        )
        .await;
        let text = host_rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "lobby_state");
        assert_eq!(value["payload"]["lobby"]["settings"]["cubeN"], 40);
    }
}
