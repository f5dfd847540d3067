//! Error taxonomy for room-level failures.
//!
//! Protocol errors (malformed envelope, unknown message type) are dropped
//! silently at the dispatch site and are not represented here, except for
//! the distinguished first-message case (`bad_join`), which the dispatcher
//! sends directly without routing through `RoomError`. Capacity/state
//! errors and internal invariants surface to clients as an `error` wire
//! message carrying one of these codes.

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    #[error("room is in progress")]
    RoomInProgress,

    #[error("room is full")]
    RoomFull,

    #[error("internal invariant violated")]
    PlacementFailed,
}

impl RoomError {
    /// The wire `error.code` string for this failure.
    pub fn code(self) -> &'static str {
        match self {
            RoomError::RoomInProgress => "room_in_progress",
            RoomError::RoomFull => "room_full",
            RoomError::PlacementFailed => "server_error",
        }
    }
}
