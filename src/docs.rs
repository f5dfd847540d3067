//! OpenAPI documentation for the REST-style surface, plus a plain-text
//! reference for the WebSocket message catalog. The wire protocol's tagged
//! envelope doesn't map cleanly onto an OpenAPI schema, so it gets a
//! human-readable reference instead of a generated one.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(crate::server::healthz),
    tags(
        (name = "health", description = "Health check endpoint"),
    ),
    info(
        title = "cube-snake API",
        version = "1.0.0",
        description = "Realtime multiplayer snake-on-a-cube server. Gameplay runs over \
                        the /ws WebSocket endpoint, documented separately at /docs.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

pub const PROTOCOL_REFERENCE: &str = r#"
cube-snake wire protocol
========================

Every message in either direction is a JSON object:

  { "v": 1, "type": "<name>", "payload": { ... } }

Client -> server
-----------------
join           first message on a new connection
                 payload: { name?: string, roomId?: string }
leave          close the connection from the server's side
ping           payload: { clientTimeMs?: number }
set_settings   host only, lobby only
                 payload: { cubeN?, roundSeconds?, tickRate? }
ready          payload: { ready: boolean }
input          payload: { inputs: [{ tick: number, turn: -1|0|1 }] }

Server -> client
-----------------
joined         sent once, right after a successful join
                 payload: { playerId, roomId, isHost, lobby }
lobby_state    payload: { lobby }
start          round begins after a countdown
                 payload: { settings, seed, startTick, startServerTimeMs, players }
state          one per tick while running
                 payload: { tick, serverTimeMs, timerMsLeft, snakes, fruits, scores, inputAck }
end            payload: { finalScores }
pong           payload: { clientTimeMs, serverTimeMs }
error          payload: { code, message }
                 codes: bad_join, join_timeout, room_in_progress, room_full, server_error

A malformed or unrecognized message is dropped silently, except for the
very first message on a connection, which gets a bad_join error.
"#;
