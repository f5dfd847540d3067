//! Wire protocol: JSON envelopes over a duplex message stream.
//! `{v: 1, type: string, payload: object}` in both directions.

use serde::{Deserialize, Serialize};

use crate::constants::PROTOCOL_VERSION;
use crate::geometry::Direction;
use crate::sim::FruitKind;

/// Wraps any serializable payload in the `{v, type, payload}` envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub v: u8,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub payload: T,
}

pub fn envelope<T>(kind: &'static str, payload: T) -> Envelope<T> {
    Envelope { v: PROTOCOL_VERSION, kind, payload }
}

/// A raw incoming message, deserialized just enough to dispatch on `type`
/// before the payload is parsed against a specific shape. A message that
/// doesn't even parse to this shape is a protocol error dropped silently
/// by the caller, except for the first message, which gets `bad_join`.
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    #[allow(dead_code)]
    pub v: Option<u8>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct JoinPayload {
    pub name: Option<String>,
    #[serde(rename = "roomId")]
    pub room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PingPayload {
    #[serde(rename = "clientTimeMs")]
    pub client_time_ms: Option<i64>,
}

/// Signed so an out-of-range value (including negative) still deserializes
/// and can be clamped per field, instead of failing to parse and dropping
/// the whole message along with any other, in-range field it carried.
#[derive(Debug, Deserialize)]
pub struct SetSettingsPayload {
    #[serde(rename = "cubeN")]
    pub cube_n: Option<i64>,
    #[serde(rename = "roundSeconds")]
    pub round_seconds: Option<i64>,
    #[serde(rename = "tickRate")]
    pub tick_rate: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReadyPayload {
    pub ready: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct InputItem {
    pub tick: Option<i64>,
    pub turn: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct InputPayload {
    #[serde(default)]
    pub inputs: Vec<InputItem>,
}

// --- Server -> client payloads -------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct LobbyPlayerView {
    #[serde(rename = "playerId")]
    pub player_id: String,
    pub name: String,
    pub ready: bool,
    pub color: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomSettingsView {
    #[serde(rename = "cubeN")]
    pub cube_n: u32,
    #[serde(rename = "roundSeconds")]
    pub round_seconds: u32,
    #[serde(rename = "tickRate")]
    pub tick_rate: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbyView {
    #[serde(rename = "roomId")]
    pub room_id: String,
    #[serde(rename = "hostId")]
    pub host_id: Option<String>,
    pub players: Vec<LobbyPlayerView>,
    pub settings: RoomSettingsView,
}

#[derive(Debug, Serialize)]
pub struct JoinedPayload {
    #[serde(rename = "playerId")]
    pub player_id: String,
    #[serde(rename = "roomId")]
    pub room_id: String,
    #[serde(rename = "isHost")]
    pub is_host: bool,
    pub lobby: LobbyView,
}

#[derive(Debug, Serialize)]
pub struct LobbyStatePayload {
    pub lobby: LobbyView,
}

#[derive(Debug, Serialize)]
pub struct StartSettingsView {
    #[serde(rename = "cubeN")]
    pub cube_n: u32,
    #[serde(rename = "roundSeconds")]
    pub round_seconds: u32,
    #[serde(rename = "tickRate")]
    pub tick_rate: u32,
    #[serde(rename = "fruitTarget")]
    pub fruit_target: usize,
}

#[derive(Debug, Serialize)]
pub struct StartPlayerView {
    #[serde(rename = "playerId")]
    pub player_id: String,
    pub name: String,
    pub color: u32,
}

#[derive(Debug, Serialize)]
pub struct StartPayload {
    pub settings: StartSettingsView,
    pub seed: u64,
    #[serde(rename = "startTick")]
    pub start_tick: u64,
    #[serde(rename = "startServerTimeMs")]
    pub start_server_time_ms: i64,
    pub players: Vec<StartPlayerView>,
}

#[derive(Debug, Serialize)]
pub struct SnakeView {
    #[serde(rename = "playerId")]
    pub player_id: String,
    pub alive: bool,
    pub dir: Direction,
    pub cells: Vec<u32>,
    #[serde(rename = "respawnInMs", skip_serializing_if = "Option::is_none")]
    pub respawn_in_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FruitView {
    pub id: String,
    pub cell: u32,
    pub kind: FruitKind,
    pub value: u32,
}

#[derive(Debug, Serialize)]
pub struct StatePayload {
    pub tick: u64,
    #[serde(rename = "serverTimeMs")]
    pub server_time_ms: i64,
    #[serde(rename = "timerMsLeft")]
    pub timer_ms_left: i64,
    pub snakes: Vec<SnakeView>,
    pub fruits: Vec<FruitView>,
    pub scores: std::collections::HashMap<String, u32>,
    #[serde(rename = "inputAck")]
    pub input_ack: std::collections::HashMap<String, i64>,
}

#[derive(Debug, Serialize)]
pub struct EndPayload {
    #[serde(rename = "finalScores")]
    pub final_scores: std::collections::HashMap<String, u32>,
}

#[derive(Debug, Serialize)]
pub struct PongPayload {
    #[serde(rename = "clientTimeMs")]
    pub client_time_ms: Option<i64>,
    #[serde(rename = "serverTimeMs")]
    pub server_time_ms: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_has_v_type_payload_shape() {
        let env = envelope("pong", PongPayload { client_time_ms: Some(1), server_time_ms: 2 });
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["v"], 1);
        assert_eq!(value["type"], "pong");
        assert_eq!(value["payload"]["serverTimeMs"], 2);
    }

    #[test]
    fn raw_envelope_ignores_unknown_fields() {
        let raw: RawEnvelope =
            serde_json::from_str(r#"{"v":1,"type":"ready","payload":{"ready":true,"bogus":1}}"#)
                .unwrap();
        assert_eq!(raw.kind, "ready");
        let payload: ReadyPayload = serde_json::from_value(raw.payload).unwrap();
        assert_eq!(payload.ready, Some(true));
    }
}
