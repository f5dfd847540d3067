//! Deterministic tick simulation.
//!
//! `tick` mutates a [`GameState`] by exactly one step: respawn, input
//! application, movement, fruit consumption, collision, bite resolution,
//! death finalization, and fruit maintenance, in that order. Everything
//! here is plain data manipulation: no I/O, no locking, no wire format.

use std::collections::{HashMap, HashSet, VecDeque};

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CUBE_N_MAX, CUBE_N_MIN, FRUIT_SPAWN_ATTEMPTS, INITIAL_SNAKE_LEN, ROUND_SECONDS_MAX,
    ROUND_SECONDS_MIN, TICK_RATE_MAX, TICK_RATE_MIN,
};
use crate::geometry::{decode_cell, encode_cell, step, CellId, Direction};
use crate::ids::new_fruit_id;

/// A kind of fruit. `value` is a pure function of `kind` (a fixed table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FruitKind {
    Berry,
    Apple,
    Banana,
    Watermelon,
}

impl FruitKind {
    pub fn value(self) -> u32 {
        match self {
            FruitKind::Berry => 2,
            FruitKind::Apple => 3,
            FruitKind::Banana => 5,
            FruitKind::Watermelon => 10,
        }
    }

    fn base_weight(self) -> f64 {
        match self {
            FruitKind::Berry => 5.0,
            FruitKind::Apple => 4.0,
            FruitKind::Banana => 2.0,
            FruitKind::Watermelon => 1.0,
        }
    }

    const ALL: [FruitKind; 4] = [
        FruitKind::Berry,
        FruitKind::Apple,
        FruitKind::Banana,
        FruitKind::Watermelon,
    ];
}

#[derive(Debug, Clone)]
pub struct Fruit {
    pub id: String,
    pub cell: CellId,
    pub kind: FruitKind,
    pub value: u32,
}

/// A player's snake. Invariant while `alive`: `cells.len() >= 4` and no
/// duplicate cells (bites may truncate the body but never interleave it).
#[derive(Debug, Clone)]
pub struct Snake {
    pub player_id: String,
    pub alive: bool,
    pub dir: Direction,
    pub cells: VecDeque<CellId>,
    pub pending_growth: u32,
    pub score: u32,
    pub respawn_at_ms: Option<i64>,
}

impl Snake {
    pub fn head(&self) -> Option<CellId> {
        self.cells.front().copied()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GameSettings {
    pub cube_n: u32,
    pub round_seconds: u32,
    pub tick_rate: u32,
    pub fruit_target: usize,
}

impl GameSettings {
    /// Clamps a signed, possibly out-of-range (including negative) input
    /// into `[CUBE_N_MIN, CUBE_N_MAX]`. Signed so a negative wire value
    /// clamps to the minimum instead of failing to deserialize.
    pub fn clamp_cube_n(v: i64) -> u32 {
        v.clamp(CUBE_N_MIN as i64, CUBE_N_MAX as i64) as u32
    }

    pub fn clamp_round_seconds(v: i64) -> u32 {
        v.clamp(ROUND_SECONDS_MIN as i64, ROUND_SECONDS_MAX as i64) as u32
    }

    pub fn clamp_tick_rate(v: i64) -> u32 {
        v.clamp(TICK_RATE_MIN as i64, TICK_RATE_MAX as i64) as u32
    }
}

/// The full mutable state of one running round.
pub struct GameState {
    pub seed: u64,
    pub rng: StdRng,
    pub settings: GameSettings,
    pub tick: u64,
    pub start_server_time_ms: i64,
    pub ends_at_ms: i64,
    pub snakes: HashMap<String, Snake>,
    pub fruits: HashMap<String, Fruit>,
}

/// One player's per-tick command. The wire protocol only ever sends
/// `turn`; `dir` exists so the reversal rule stays directly testable
/// against an absolute heading, without going through a room's settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickCommand {
    pub dir: Option<Direction>,
    pub turn: Option<i64>,
}

fn occupied_cells(snakes: &HashMap<String, Snake>) -> HashMap<CellId, Vec<(String, usize)>> {
    let mut occ: HashMap<CellId, Vec<(String, usize)>> = HashMap::new();
    for (pid, s) in snakes {
        if !s.alive {
            continue;
        }
        for (idx, &cell) in s.cells.iter().enumerate() {
            occ.entry(cell).or_default().push((pid.clone(), idx));
        }
    }
    occ
}

fn is_forward_clear(
    head: CellId,
    dir: Direction,
    n: u32,
    steps: u32,
    occupied: &HashSet<CellId>,
) -> bool {
    let mut cell = head;
    let mut d = dir;
    for _ in 0..steps {
        let (c2, d2) = step(cell, d, n);
        if occupied.contains(&c2) {
            return false;
        }
        cell = c2;
        d = d2;
    }
    true
}

/// Randomized placement: pick a random head + direction, require three
/// forward cells clear, then walk three cells backward to build a
/// length-4 body. Adds the placed body to `occupied` on success.
pub fn try_place_snake(
    player_id: String,
    n: u32,
    rng: &mut StdRng,
    occupied: &mut HashSet<CellId>,
    attempts: u32,
) -> Option<Snake> {
    for _ in 0..attempts {
        let face = rng.gen_range(0u8..6);
        let u = rng.gen_range(0u32..n);
        let v = rng.gen_range(0u32..n);
        let dir = Direction::from_index(rng.gen_range(0i64..4)).unwrap();
        let head = encode_cell(face, u, v, n);

        if occupied.contains(&head) {
            continue;
        }
        if !is_forward_clear(head, dir, n, 3, occupied) {
            continue;
        }

        let mut body = VecDeque::with_capacity(INITIAL_SNAKE_LEN);
        body.push_back(head);
        let mut cell = head;
        let mut back_dir = dir.reverse();
        let mut ok = true;
        for _ in 0..3 {
            let (c2, d2) = step(cell, back_dir, n);
            if occupied.contains(&c2) {
                ok = false;
                break;
            }
            body.push_back(c2);
            cell = c2;
            back_dir = d2;
        }
        if !ok {
            continue;
        }

        for &c in &body {
            occupied.insert(c);
        }

        return Some(Snake {
            player_id,
            alive: true,
            dir,
            cells: body,
            pending_growth: 0,
            score: 0,
            respawn_at_ms: None,
        });
    }
    None
}

/// Weighted random fruit choice. Each kind's base weight is divided by
/// `1 + count(kind on board)`, so rarer/larger fruit gets scarcer as more
/// of it accumulates.
pub fn pick_fruit_kind(rng: &mut StdRng, fruits_on_board: &HashMap<String, Fruit>) -> (FruitKind, u32) {
    let mut counts: HashMap<FruitKind, u32> = HashMap::new();
    for f in fruits_on_board.values() {
        *counts.entry(f.kind).or_insert(0) += 1;
    }

    let weights: Vec<f64> = FruitKind::ALL
        .iter()
        .map(|k| k.base_weight() / (1.0 + *counts.get(k).unwrap_or(&0) as f64))
        .collect();

    let dist = WeightedIndex::new(&weights).expect("fruit base weights are always positive");
    let kind = FruitKind::ALL[dist.sample(rng)];
    (kind, kind.value())
}

fn spawn_fruit(
    n: u32,
    rng: &mut StdRng,
    occupied: &HashSet<CellId>,
    fruits: &HashMap<String, Fruit>,
    attempts: u32,
) -> Option<Fruit> {
    for _ in 0..attempts {
        let face = rng.gen_range(0u8..6);
        let u = rng.gen_range(0u32..n);
        let v = rng.gen_range(0u32..n);
        let cell = encode_cell(face, u, v, n);
        if occupied.contains(&cell) {
            continue;
        }

        let (kind, value) = pick_fruit_kind(rng, fruits);
        return Some(Fruit { id: new_fruit_id(), cell, kind, value });
    }
    None
}

/// While `|fruits| < fruit_target`, attempt placement on a free cell.
/// Gives up for this call if an attempt batch is exhausted without
/// finding a free cell (bounded, does not loop forever on a full board).
pub fn ensure_fruit_target(state: &mut GameState) {
    let n = state.settings.cube_n;
    let mut occupied: HashSet<CellId> = occupied_cells(&state.snakes).into_keys().collect();
    occupied.extend(state.fruits.values().map(|f| f.cell));

    while state.fruits.len() < state.settings.fruit_target {
        match spawn_fruit(n, &mut state.rng, &occupied, &state.fruits, FRUIT_SPAWN_ATTEMPTS) {
            Some(fruit) => {
                occupied.insert(fruit.cell);
                state.fruits.insert(fruit.id.clone(), fruit);
            }
            None => break,
        }
    }
}

/// Advance `state` by exactly one tick, in eight numbered phases: respawn,
/// input application, movement and fruit consumption, head-on collision,
/// bite resolution, death finalization, fruit maintenance, tick increment.
pub fn tick(state: &mut GameState, inputs: &HashMap<String, TickCommand>, now_ms: i64) {
    let n = state.settings.cube_n;

    // 1. Respawn pass.
    let due: Vec<String> = state
        .snakes
        .iter()
        .filter(|(_, s)| !s.alive && s.respawn_at_ms.is_some_and(|t| t <= now_ms))
        .map(|(pid, _)| pid.clone())
        .collect();

    for pid in due {
        let mut occupied: HashSet<CellId> = occupied_cells(&state.snakes).into_keys().collect();
        occupied.extend(state.fruits.values().map(|f| f.cell));

        let old_score = state.snakes.get(&pid).map(|s| s.score).unwrap_or(0);
        match try_place_snake(
            pid.clone(),
            n,
            &mut state.rng,
            &mut occupied,
            crate::constants::PLACEMENT_ATTEMPTS_RESPAWN,
        ) {
            Some(mut placed) => {
                placed.score = old_score;
                state.snakes.insert(pid, placed);
            }
            None => {
                if let Some(s) = state.snakes.get_mut(&pid) {
                    s.respawn_at_ms = Some(now_ms + crate::constants::RESPAWN_RETRY_BACKOFF_MS);
                }
            }
        }
    }

    // 2. Input application & head projection.
    let mut planned: HashMap<String, CellId> = HashMap::new();
    for (pid, s) in state.snakes.iter_mut() {
        if !s.alive {
            continue;
        }
        if let Some(cmd) = inputs.get(pid) {
            if let Some(new_dir) = cmd.dir {
                if new_dir.reverse() != s.dir {
                    s.dir = new_dir;
                }
            } else if let Some(t) = cmd.turn {
                if (-1..=1).contains(&t) {
                    s.dir = s.dir.turn(t);
                }
            }
        }

        let head = s.cells[0];
        let (next_head, new_dir) = step(head, s.dir, n);
        s.dir = new_dir;
        planned.insert(pid.clone(), next_head);
    }

    // 3. Move & eat.
    let fruit_by_cell: HashMap<CellId, String> =
        state.fruits.values().map(|f| (f.cell, f.id.clone())).collect();

    for (pid, s) in state.snakes.iter_mut() {
        if !s.alive {
            continue;
        }
        let next_head = planned[pid];
        s.cells.push_front(next_head);
        if s.pending_growth > 0 {
            s.pending_growth -= 1;
        } else {
            s.cells.pop_back();
        }

        if let Some(fid) = fruit_by_cell.get(&next_head) {
            // `remove` is the tie-break: only the first snake (in
            // iteration order) to reach an already-claimed cell actually
            // gets credit, matching a single fruit being single-use.
            if let Some(fruit) = state.fruits.remove(fid) {
                s.pending_growth += fruit.value;
                s.score += fruit.value;
            }
        }
    }

    // 4. Head-on collision.
    let mut head_cells: HashMap<CellId, Vec<String>> = HashMap::new();
    for (pid, s) in &state.snakes {
        if s.alive {
            head_cells.entry(s.cells[0]).or_default().push(pid.clone());
        }
    }
    let mut dead: HashSet<String> = HashSet::new();
    for pids in head_cells.values() {
        if pids.len() >= 2 {
            dead.extend(pids.iter().cloned());
        }
    }

    // 5. Bite resolution.
    let occ = occupied_cells(&state.snakes);
    let mut bites_by_victim: HashMap<String, HashMap<usize, Vec<String>>> = HashMap::new();
    for (attacker_id, s) in &state.snakes {
        if !s.alive || dead.contains(attacker_id) {
            continue;
        }
        let head = s.cells[0];
        if let Some(occupants) = occ.get(&head) {
            for (victim_id, seg_idx) in occupants {
                if *seg_idx == 0 {
                    continue;
                }
                bites_by_victim
                    .entry(victim_id.clone())
                    .or_default()
                    .entry(*seg_idx)
                    .or_default()
                    .push(attacker_id.clone());
            }
        }
    }

    for (victim_id, bites_at) in &bites_by_victim {
        let still_alive = state
            .snakes
            .get(victim_id)
            .map(|v| v.alive)
            .unwrap_or(false);
        if !still_alive || dead.contains(victim_id) {
            continue;
        }

        let mut bite_points: Vec<usize> = bites_at.keys().copied().collect();
        bite_points.sort_unstable();
        let cut_at = bite_points[0];

        // Snapshotted after the new head was prepended but before
        // truncation: shifts scoring totals by one if this snapshot
        // point ever moves.
        let old_len = state.snakes[victim_id].cells.len();

        state.snakes.get_mut(victim_id).unwrap().cells.truncate(cut_at);

        for (i, &k) in bite_points.iter().enumerate() {
            let next_k = bite_points.get(i + 1).copied().unwrap_or(old_len);
            let portion_len = next_k.saturating_sub(k);
            if portion_len == 0 {
                continue;
            }
            let mut attackers: Vec<String> = bites_at[&k].clone();
            attackers.sort();
            if attackers.is_empty() {
                continue;
            }

            let share = (portion_len / attackers.len()) as u32;
            let rem = (portion_len % attackers.len()) as u32;
            for a in &attackers {
                if let Some(asnake) = state.snakes.get_mut(a) {
                    asnake.score += share;
                }
            }
            if rem > 0 {
                if let Some(asnake) = state.snakes.get_mut(&attackers[0]) {
                    asnake.score += rem;
                }
            }
        }

        if state.snakes[victim_id].cells.len() < INITIAL_SNAKE_LEN {
            dead.insert(victim_id.clone());
        }
    }

    // 6. Death finalization.
    for pid in &dead {
        if let Some(s) = state.snakes.get_mut(pid) {
            s.alive = false;
            s.cells.clear();
            s.pending_growth = 0;
            s.respawn_at_ms = Some(now_ms + crate::constants::RESPAWN_DELAY_MS);
        }
    }

    // 7. Fruit maintenance.
    ensure_fruit_target(state);

    // 8.
    state.tick += 1;
}
