//! Room lifecycle: lobby, countdown, running, end, back to lobby.
//!
//! A [`Room`] is one mutex-guarded match. `RoomManager` owns the room
//! table and the join/leave bookkeeping (color assignment, host handoff,
//! id allocation). The tick driver is a plain tokio task that takes the
//! lock once per tick, mutates the simulation, and broadcasts the result
//! only after releasing it — a stalled or slow send never holds up the
//! next tick's lock acquisition.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::constants::{
    COLOR_PALETTE, COUNTDOWN_MS, DEFAULT_CUBE_N, DEFAULT_ROUND_SECONDS, DEFAULT_TICK_RATE,
    MAX_PLAYERS_PER_ROOM, TICK_DRIVER_POLL_MS,
};
use crate::error::RoomError;
use crate::geometry::CellId;
use crate::ids::new_player_id;
use crate::protocol::{
    envelope, EndPayload, FruitView, InputItem, LobbyPlayerView, LobbyStatePayload, LobbyView,
    PongPayload, RoomSettingsView, SnakeView, StartPayload, StartPlayerView, StartSettingsView,
    StatePayload,
};
use crate::sim::{self, GameSettings, GameState, Snake, TickCommand};

pub fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_millis() as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lobby,
    Running,
    Ended,
}

#[derive(Debug)]
pub struct PlayerConn {
    pub player_id: String,
    pub name: String,
    pub tx: UnboundedSender<String>,
    pub ready: bool,
    pub color: u32,
    pub input_by_tick: HashMap<u64, i64>,
    pub last_ack_tick: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct RoomSettings {
    pub cube_n: u32,
    pub round_seconds: u32,
    pub tick_rate: u32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        RoomSettings {
            cube_n: DEFAULT_CUBE_N,
            round_seconds: DEFAULT_ROUND_SECONDS,
            tick_rate: DEFAULT_TICK_RATE,
        }
    }
}

struct RoomInner {
    host_id: Option<String>,
    settings: RoomSettings,
    players: HashMap<String, PlayerConn>,
    phase: Phase,
    game: Option<GameState>,
    task: Option<JoinHandle<()>>,
}

pub struct Room {
    pub room_id: String,
    inner: Mutex<RoomInner>,
}

impl Room {
    pub fn new(room_id: String) -> Self {
        Room {
            room_id,
            inner: Mutex::new(RoomInner {
                host_id: None,
                settings: RoomSettings::default(),
                players: HashMap::new(),
                phase: Phase::Lobby,
                game: None,
                task: None,
            }),
        }
    }

    fn lobby_view_locked(inner: &RoomInner, room_id: &str) -> LobbyView {
        let mut players: Vec<&PlayerConn> = inner.players.values().collect();
        players.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        LobbyView {
            room_id: room_id.to_string(),
            host_id: inner.host_id.clone(),
            players: players
                .into_iter()
                .map(|p| LobbyPlayerView {
                    player_id: p.player_id.clone(),
                    name: p.name.clone(),
                    ready: p.ready,
                    color: p.color,
                })
                .collect(),
            settings: RoomSettingsView {
                cube_n: inner.settings.cube_n,
                round_seconds: inner.settings.round_seconds,
                tick_rate: inner.settings.tick_rate,
            },
        }
    }

    pub async fn lobby_state(&self) -> LobbyView {
        let inner = self.inner.lock().await;
        Self::lobby_view_locked(&inner, &self.room_id)
    }

    /// Sends `text` to every connected player, then drops anyone whose
    /// channel is closed (socket already gone) and hands off the host
    /// role if it was theirs.
    pub async fn broadcast(&self, text: String) {
        let conns: Vec<(String, UnboundedSender<String>)> = {
            let inner = self.inner.lock().await;
            inner.players.values().map(|p| (p.player_id.clone(), p.tx.clone())).collect()
        };

        let mut stale = Vec::new();
        for (pid, tx) in conns {
            if tx.send(text.clone()).is_err() {
                stale.push(pid);
            }
        }

        if stale.is_empty() {
            return;
        }
        let mut inner = self.inner.lock().await;
        for pid in stale {
            inner.players.remove(&pid);
            if inner.host_id.as_deref() == Some(pid.as_str()) {
                inner.host_id = inner.players.keys().next().cloned();
            }
        }
    }

    pub async fn broadcast_envelope<T: serde::Serialize>(&self, kind: &'static str, payload: T) {
        match serde_json::to_string(&envelope(kind, payload)) {
            Ok(text) => self.broadcast(text).await,
            Err(e) => warn!("failed to serialize broadcast payload: {e}"),
        }
    }

    pub async fn set_settings(
        &self,
        player_id: &str,
        cube_n: Option<i64>,
        round_seconds: Option<i64>,
        tick_rate: Option<i64>,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.phase != Phase::Lobby {
            return false;
        }
        if inner.host_id.as_deref() != Some(player_id) {
            return false;
        }
        if let Some(v) = cube_n {
            inner.settings.cube_n = GameSettings::clamp_cube_n(v);
        }
        if let Some(v) = round_seconds {
            inner.settings.round_seconds = GameSettings::clamp_round_seconds(v);
        }
        if let Some(v) = tick_rate {
            inner.settings.tick_rate = GameSettings::clamp_tick_rate(v);
        }
        true
    }

    pub async fn set_ready(&self, player_id: &str, ready: bool) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.phase != Phase::Lobby {
            return false;
        }
        match inner.players.get_mut(player_id) {
            Some(p) => {
                p.ready = ready;
                true
            }
            None => false,
        }
    }

    pub async fn submit_inputs(&self, player_id: &str, items: Vec<InputItem>) {
        let mut inner = self.inner.lock().await;
        let Some(p) = inner.players.get_mut(player_id) else { return };
        for item in items {
            let (Some(tick), Some(turn)) = (item.tick, item.turn) else { continue };
            if tick < 0 || !(-1..=1).contains(&turn) {
                continue;
            }
            p.input_by_tick.insert(tick as u64, turn);
        }
    }

    pub async fn pong(&self, client_time_ms: Option<i64>) -> PongPayload {
        PongPayload { client_time_ms, server_time_ms: now_ms() }
    }

    /// Starts the round if every player is ready (or, with `force`, if at
    /// least one is — used when the host starts early). No-op outside the
    /// lobby or while a round is already starting. Fails with
    /// `RoomError::PlacementFailed` if a starting snake could not be placed;
    /// the caller is responsible for turning that into a wire `error`.
    pub async fn maybe_start(self: &Arc<Self>, force: bool) -> Result<(), RoomError> {
        let payload = {
            let mut inner = self.inner.lock().await;
            if inner.phase != Phase::Lobby || inner.task.is_some() || inner.players.is_empty() {
                return Ok(());
            }

            let starting: Vec<String> = if force {
                inner.players.values().filter(|p| p.ready).map(|p| p.player_id.clone()).collect()
            } else if inner.players.values().all(|p| p.ready) {
                inner.players.keys().cloned().collect()
            } else {
                Vec::new()
            };
            if starting.is_empty() {
                return Ok(());
            }

            let fruit_target = starting.len();
            let seed: u64 = rand::thread_rng().gen_range(0u64..(1u64 << 31));
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

            let start_time = now_ms() + COUNTDOWN_MS;
            let ends_at = start_time + inner.settings.round_seconds as i64 * 1000;
            let settings = GameSettings {
                cube_n: inner.settings.cube_n,
                round_seconds: inner.settings.round_seconds,
                tick_rate: inner.settings.tick_rate,
                fruit_target,
            };

            let mut occupied: std::collections::HashSet<CellId> = std::collections::HashSet::new();
            let mut snakes: HashMap<String, Snake> = HashMap::new();
            let mut placement_ok = true;
            for pid in &starting {
                match sim::try_place_snake(
                    pid.clone(),
                    settings.cube_n,
                    &mut rng,
                    &mut occupied,
                    crate::constants::PLACEMENT_ATTEMPTS_START,
                ) {
                    Some(snake) => {
                        snakes.insert(pid.clone(), snake);
                    }
                    None => {
                        placement_ok = false;
                        break;
                    }
                }
            }
            if !placement_ok {
                warn!(room_id = %self.room_id, "failed to place all snakes at round start");
                return Err(RoomError::PlacementFailed);
            }

            let mut game = GameState {
                seed,
                rng,
                settings,
                tick: 0,
                start_server_time_ms: start_time,
                ends_at_ms: ends_at,
                snakes,
                fruits: HashMap::new(),
            };
            sim::ensure_fruit_target(&mut game);

            let mut starting_sorted = starting.clone();
            starting_sorted.sort();
            let players_view: Vec<StartPlayerView> = starting_sorted
                .iter()
                .filter_map(|pid| inner.players.get(pid))
                .map(|p| StartPlayerView {
                    player_id: p.player_id.clone(),
                    name: p.name.clone(),
                    color: p.color,
                })
                .collect();

            let payload = StartPayload {
                settings: StartSettingsView {
                    cube_n: game.settings.cube_n,
                    round_seconds: game.settings.round_seconds,
                    tick_rate: game.settings.tick_rate,
                    fruit_target: game.settings.fruit_target,
                },
                seed,
                start_tick: 0,
                start_server_time_ms: start_time,
                players: players_view,
            };

            inner.game = Some(game);
            inner.phase = Phase::Running;
            inner.task = Some(tokio::spawn(run_loop(Arc::clone(self))));

            payload
        };

        self.broadcast_envelope("start", payload).await;
        Ok(())
    }
}

/// Drives one room's simulation at a fixed tick interval until the round
/// timer expires, then resets the room to the lobby.
async fn run_loop(room: Arc<Room>) {
    let start_at = {
        let inner = room.inner.lock().await;
        match &inner.game {
            Some(g) => g.start_server_time_ms,
            None => return,
        }
    };
    while now_ms() < start_at {
        tokio::time::sleep(std::time::Duration::from_millis(TICK_DRIVER_POLL_MS)).await;
    }

    let tick_rate = {
        let inner = room.inner.lock().await;
        inner.settings.tick_rate.max(1)
    };
    let tick_interval = std::time::Duration::from_secs_f64(1.0 / tick_rate as f64);
    let mut next_tick_time = tokio::time::Instant::now();

    loop {
        let now_inst = tokio::time::Instant::now();
        if now_inst < next_tick_time {
            tokio::time::sleep(next_tick_time - now_inst).await;
        }
        next_tick_time += tick_interval;

        let outcome = {
            let mut inner = room.inner.lock().await;
            if inner.phase != Phase::Running || inner.game.is_none() {
                return;
            }

            let now = now_ms();
            let timer_left = inner.game.as_ref().unwrap().ends_at_ms - now;
            if timer_left <= 0 {
                inner.phase = Phase::Ended;
                let final_scores: HashMap<String, u32> = inner
                    .game
                    .as_ref()
                    .unwrap()
                    .snakes
                    .iter()
                    .map(|(pid, s)| (pid.clone(), s.score))
                    .collect();
                TickOutcome::Ended(EndPayload { final_scores })
            } else {
                let tick_now = inner.game.as_ref().unwrap().tick;
                let mut inputs: HashMap<String, TickCommand> = HashMap::new();
                for (pid, p) in inner.players.iter_mut() {
                    let turn = p.input_by_tick.remove(&tick_now);
                    inputs.insert(pid.clone(), TickCommand { dir: None, turn });
                    p.last_ack_tick = tick_now as i64;
                }

                let game = inner.game.as_mut().unwrap();
                let players = &inner.players;

                // A logic error anywhere in the simulation step must end
                // only this room, never take the whole process down with
                // it (spec: a tick-driver exception is caught at the task
                // boundary and logged, with the room reset to lobby).
                let stepped = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    sim::tick(game, &inputs, now);

                    let snakes_payload: Vec<SnakeView> = game
                        .snakes
                        .iter()
                        .map(|(pid, s)| SnakeView {
                            player_id: pid.clone(),
                            alive: s.alive,
                            dir: s.dir,
                            cells: s.cells.iter().copied().collect(),
                            respawn_in_ms: s.respawn_at_ms.map(|t| (t - now).max(0)),
                        })
                        .collect();

                    let mut fruits_payload: Vec<FruitView> = game
                        .fruits
                        .values()
                        .map(|f| FruitView { id: f.id.clone(), cell: f.cell, kind: f.kind, value: f.value })
                        .collect();
                    fruits_payload.sort_by(|a, b| a.id.cmp(&b.id));

                    let scores: HashMap<String, u32> =
                        game.snakes.iter().map(|(pid, s)| (pid.clone(), s.score)).collect();
                    let input_ack: HashMap<String, i64> =
                        players.iter().map(|(pid, p)| (pid.clone(), p.last_ack_tick)).collect();

                    StatePayload {
                        tick: game.tick,
                        server_time_ms: now,
                        timer_ms_left: timer_left,
                        snakes: snakes_payload,
                        fruits: fruits_payload,
                        scores,
                        input_ack,
                    }
                }));

                match stepped {
                    Ok(payload) => TickOutcome::State(payload),
                    Err(panic) => TickOutcome::Panicked(panic_message(&panic)),
                }
            }
        };

        match outcome {
            TickOutcome::State(payload) => {
                room.broadcast_envelope("state", payload).await;
            }
            TickOutcome::Ended(payload) => {
                room.broadcast_envelope("end", payload).await;
                reset_to_lobby(&room).await;
                debug!(room_id = %room.room_id, "round ended, room reset to lobby");
                return;
            }
            TickOutcome::Panicked(message) => {
                tracing::error!(room_id = %room.room_id, "tick driver failed, resetting room to lobby: {message}");
                room.broadcast_envelope(
                    "error",
                    crate::protocol::ErrorPayload { code: "server_error", message },
                )
                .await;
                reset_to_lobby(&room).await;
                return;
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "tick driver panicked".to_string()
    }
}

/// Clears a room's round state and sends a fresh `lobby_state`. Shared by
/// the normal end-of-round path and panic recovery.
async fn reset_to_lobby(room: &Arc<Room>) {
    {
        let mut inner = room.inner.lock().await;
        inner.phase = Phase::Lobby;
        inner.game = None;
        inner.task = None;
        for p in inner.players.values_mut() {
            p.ready = false;
            p.input_by_tick.clear();
            p.last_ack_tick = -1;
        }
    }
    let lobby = room.lobby_state().await;
    room.broadcast_envelope("lobby_state", LobbyStatePayload { lobby }).await;
}

enum TickOutcome {
    State(StatePayload),
    Ended(EndPayload),
    Panicked(String),
}

/// Owns the room table: creation on first join, eviction on last leave.
pub struct RoomManager {
    rooms: Mutex<HashMap<String, Arc<Room>>>,
}

impl RoomManager {
    pub fn new() -> Self {
        RoomManager { rooms: Mutex::new(HashMap::new()) }
    }

    fn first_free_color(inner_players: &HashMap<String, PlayerConn>) -> u32 {
        let taken: std::collections::HashSet<u32> = inner_players.values().map(|p| p.color).collect();
        COLOR_PALETTE.iter().copied().find(|c| !taken.contains(c)).unwrap_or(COLOR_PALETTE[0])
    }

    /// Joins `room_id` (or a freshly minted one), failing if the room is
    /// mid-round or already full.
    pub async fn join(
        &self,
        room_id: Option<String>,
        name: String,
        tx: UnboundedSender<String>,
    ) -> Result<(Arc<Room>, String, bool), RoomError> {
        let room = {
            let mut rooms = self.rooms.lock().await;
            let rid = room_id.unwrap_or_else(crate::ids::new_room_id);
            Arc::clone(rooms.entry(rid.clone()).or_insert_with(|| Arc::new(Room::new(rid))))
        };

        let mut inner = room.inner.lock().await;
        if inner.phase != Phase::Lobby {
            return Err(RoomError::RoomInProgress);
        }
        if inner.players.len() >= MAX_PLAYERS_PER_ROOM {
            return Err(RoomError::RoomFull);
        }

        let player_id = new_player_id();
        let color = Self::first_free_color(&inner.players);
        inner.players.insert(
            player_id.clone(),
            PlayerConn {
                player_id: player_id.clone(),
                name,
                tx,
                ready: false,
                color,
                input_by_tick: HashMap::new(),
                last_ack_tick: -1,
            },
        );
        if inner.host_id.is_none() {
            inner.host_id = Some(player_id.clone());
        }
        let is_host = inner.host_id.as_deref() == Some(player_id.as_str());
        drop(inner);

        Ok((room, player_id, is_host))
    }

    /// Removes `player_id` from `room`, handing off host if needed, and
    /// evicts the room entirely once its last player has left.
    pub async fn leave(&self, room: &Arc<Room>, player_id: &str) {
        let became_empty = {
            let mut inner = room.inner.lock().await;
            inner.players.remove(player_id);
            if inner.host_id.as_deref() == Some(player_id) {
                inner.host_id = inner.players.keys().next().cloned();
            }
            if inner.players.is_empty() {
                if let Some(task) = inner.task.take() {
                    task.abort();
                }
                true
            } else {
                false
            }
        };

        if became_empty {
            let mut rooms = self.rooms.lock().await;
            rooms.remove(&room.room_id);
        }
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn channel() -> (UnboundedSender<String>, tokio::sync::mpsc::UnboundedReceiver<String>) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn join_assigns_host_and_first_color() {
        let manager = RoomManager::new();
        let (tx, _rx) = channel();
        let (room, pid, is_host) = manager.join(None, "Alice".into(), tx).await.unwrap();
        assert!(is_host);
        let lobby = room.lobby_state().await;
        assert_eq!(lobby.host_id, Some(pid));
        assert_eq!(lobby.players.len(), 1);
        assert_eq!(lobby.players[0].color, COLOR_PALETTE[0]);
    }

    #[tokio::test]
    async fn second_join_gets_next_color_and_is_not_host() {
        let manager = RoomManager::new();
        let (tx1, _rx1) = channel();
        let (room, _pid1, _) = manager.join(None, "Alice".into(), tx1).await.unwrap();

        let (tx2, _rx2) = channel();
        let (room2, _pid2, is_host2) =
            manager.join(Some(room.room_id.clone()), "Bob".into(), tx2).await.unwrap();
        assert!(Arc::ptr_eq(&room, &room2));
        assert!(!is_host2);

        let lobby = room.lobby_state().await;
        let colors: Vec<u32> = lobby.players.iter().map(|p| p.color).collect();
        assert_eq!(colors, vec![COLOR_PALETTE[0], COLOR_PALETTE[1]]);
    }

    #[tokio::test]
    async fn room_full_rejects_a_ninth_player() {
        let manager = RoomManager::new();
        let (room0_id,) = {
            let (tx, _rx) = channel();
            let (room, _pid, _) = manager.join(None, "p0".into(), tx).await.unwrap();
            (room.room_id.clone(),)
        };
        for i in 1..MAX_PLAYERS_PER_ROOM {
            let (tx, _rx) = channel();
            manager.join(Some(room0_id.clone()), format!("p{i}"), tx).await.unwrap();
        }
        let (tx, _rx) = channel();
        let err = manager.join(Some(room0_id), "overflow".into(), tx).await.unwrap_err();
        assert_eq!(err, RoomError::RoomFull);
    }

    #[tokio::test]
    async fn leave_hands_off_host_and_evicts_empty_room() {
        let manager = RoomManager::new();
        let (tx1, _rx1) = channel();
        let (room, pid1, _) = manager.join(None, "Alice".into(), tx1).await.unwrap();
        let (tx2, _rx2) = channel();
        let (_, pid2, _) = manager.join(Some(room.room_id.clone()), "Bob".into(), tx2).await.unwrap();

        manager.leave(&room, &pid1).await;
        let lobby = room.lobby_state().await;
        assert_eq!(lobby.host_id, Some(pid2.clone()));

        manager.leave(&room, &pid2).await;
        let rooms = manager.rooms.lock().await;
        assert!(!rooms.contains_key(&room.room_id));
    }

    #[tokio::test]
    async fn set_settings_is_host_only_and_clamps() {
        let manager = RoomManager::new();
        let (tx1, _rx1) = channel();
        let (room, pid1, _) = manager.join(None, "Alice".into(), tx1).await.unwrap();
        let (tx2, _rx2) = channel();
        let (_, pid2, _) = manager.join(Some(room.room_id.clone()), "Bob".into(), tx2).await.unwrap();

        assert!(!room.set_settings(&pid2, Some(999), None, None).await);
        assert!(room.set_settings(&pid1, Some(999), None, None).await);
        let lobby = room.lobby_state().await;
        assert_eq!(lobby.settings.cube_n, crate::constants::CUBE_N_MAX);
    }

    #[tokio::test]
    async fn set_settings_clamps_a_negative_field_without_dropping_the_rest() {
        let manager = RoomManager::new();
        let (tx1, _rx1) = channel();
        let (room, pid1, _) = manager.join(None, "Alice".into(), tx1).await.unwrap();

        assert!(room.set_settings(&pid1, Some(-5), Some(60), None).await);
        let lobby = room.lobby_state().await;
        assert_eq!(lobby.settings.cube_n, crate::constants::CUBE_N_MIN);
        assert_eq!(lobby.settings.round_seconds, 60);
    }

    #[tokio::test]
    async fn join_after_phase_running_is_rejected() {
        let manager = RoomManager::new();
        let (tx1, _rx1) = channel();
        let (room, _pid1, _) = manager.join(None, "Alice".into(), tx1).await.unwrap();
        {
            let mut inner = room.inner.lock().await;
            inner.phase = Phase::Running;
        }

        let (tx2, _rx2) = channel();
        let err = manager
            .join(Some(room.room_id.clone()), "Bob".into(), tx2)
            .await
            .unwrap_err();
        assert_eq!(err, RoomError::RoomInProgress);
    }

    #[tokio::test]
    async fn submit_inputs_drops_out_of_range_turns_and_keeps_last_write_per_tick() {
        let manager = RoomManager::new();
        let (tx, _rx) = channel();
        let (room, pid, _) = manager.join(None, "Alice".into(), tx).await.unwrap();

        room.submit_inputs(
            &pid,
            vec![
                InputItem { tick: Some(5), turn: Some(1) },
                InputItem { tick: Some(5), turn: Some(-1) }, // overwrites tick 5
                InputItem { tick: Some(6), turn: Some(2) },  // out of range, dropped
                InputItem { tick: None, turn: Some(0) },     // missing field, dropped
            ],
        )
        .await;

        let inner = room.inner.lock().await;
        let stored = &inner.players[&pid].input_by_tick;
        assert_eq!(stored.get(&5), Some(&-1));
        assert!(!stored.contains_key(&6));
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn maybe_start_requires_every_player_ready() {
        let manager = RoomManager::new();
        let (tx1, _rx1) = channel();
        let (room, pid1, _) = manager.join(None, "Alice".into(), tx1).await.unwrap();
        let (tx2, _rx2) = channel();
        let (_, pid2, _) = manager.join(Some(room.room_id.clone()), "Bob".into(), tx2).await.unwrap();

        room.set_ready(&pid1, true).await;
        room.maybe_start(false).await.unwrap();
        assert_eq!(room.inner.lock().await.phase, Phase::Lobby);

        room.set_ready(&pid2, true).await;
        room.maybe_start(false).await.unwrap();
        assert_eq!(room.inner.lock().await.phase, Phase::Running);

        // Cleanup: cancel the spawned tick driver so the test process can exit.
        let mut inner = room.inner.lock().await;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
    }
}
