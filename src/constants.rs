//! Game constants for the cube-snake server.
//!
//! Centralizes the magic numbers referenced throughout `sim`, `room`, and
//! `server` in one place instead of scattering them through the logic.

/// Room lifecycle
pub const MAX_PLAYERS_PER_ROOM: usize = 8;
pub const ROOM_ID_LEN: usize = 6;
pub const ROOM_ID_ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// 8 distinct snake colors (0xRRGGBB), assigned first-unused on join.
pub const COLOR_PALETTE: [u32; 8] = [
    0xDB2777, // magenta
    0xEF4444, // red
    0xF97316, // orange
    0xFACC15, // yellow
    0x22C55E, // green
    0x06B6D4, // cyan
    0x3B82F6, // blue
    0x8B5CF6, // violet
];

/// Default room settings (before host customization).
pub const DEFAULT_CUBE_N: u32 = 24;
pub const DEFAULT_ROUND_SECONDS: u32 = 180;
pub const DEFAULT_TICK_RATE: u32 = 12;

/// Clamp ranges for `set_settings`.
pub const CUBE_N_MIN: u32 = 8;
pub const CUBE_N_MAX: u32 = 80;
pub const ROUND_SECONDS_MIN: u32 = 30;
pub const ROUND_SECONDS_MAX: u32 = 30 * 60;
pub const TICK_RATE_MIN: u32 = 5;
pub const TICK_RATE_MAX: u32 = 30;

/// Timing
pub const JOIN_HANDSHAKE_TIMEOUT_MS: u64 = 10_000;
pub const COUNTDOWN_MS: i64 = 3_500;
pub const RESPAWN_DELAY_MS: i64 = 3_000;
pub const RESPAWN_RETRY_BACKOFF_MS: i64 = 250;
pub const TICK_DRIVER_POLL_MS: u64 = 5;

/// Snake placement
pub const INITIAL_SNAKE_LEN: usize = 4;
pub const PLACEMENT_ATTEMPTS_START: u32 = 2000;
pub const PLACEMENT_ATTEMPTS_RESPAWN: u32 = 4000;
pub const FRUIT_SPAWN_ATTEMPTS: u32 = 2000;

pub const PROTOCOL_VERSION: u8 = 1;
