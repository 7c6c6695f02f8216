//! Types shared by the host and every participant of a snake session.
//!
//! The host and the clients must agree on the grid, on the snake rules and on
//! the exact shape of every document that crosses the transport, so all of
//! that lives here:
//!
//! - `snake`: grid positions, directions, the snake body and combo scoring
//! - `model`: the Session Context aggregate and its player slots
//! - `document`: tolerant accessors over `serde_json::Value`
//! - `codec`: snapshot (de)serialization of the whole context
//! - `protocol`: typed game messages and their type tags
//! - `queue`: the optional fixed-capacity envelope queue
//! - `transport`: the pub/sub contract consumed by the session, plus errors
//! - `loopback`: an in-process transport used by tests and the demo binary
//! - `naming`: display-name metadata markers and identity namespacing
//! - `config`: tunables with their defaults

pub mod codec;
pub mod config;
pub mod document;
pub mod loopback;
pub mod model;
pub mod naming;
pub mod protocol;
pub mod queue;
pub mod snake;
pub mod transport;

pub use config::{SessionConfig, TieBreak};
pub use model::{
    GameMode, PlayerSlot, SessionContext, SessionState, TurnAttempt, TurnBattleMode,
};
pub use protocol::{GameMessage, RosterEntry, StartPhase, TurnReport};
pub use snake::{combo_multiplier, Combo, Direction, Position, Snake};
pub use transport::{
    DirectoryEntry, HostedSession, JoinedSession, ListenerId, SessionMetadata, Transport,
    TransportError, TransportEvent,
};

/// Hard cap on player slots in a session.
pub const MAX_PLAYERS: usize = 10;
/// Solo runs each participant plays in a turn battle.
pub const ATTEMPTS_PER_PLAYER: usize = 3;
/// Food items on the real-time board.
pub const FOOD_COUNT: usize = 2;
/// Points for one food before the combo multiplier.
pub const BASE_POINTS: u32 = 10;
pub const INITIAL_SNAKE_LENGTH: usize = 3;
pub const MAX_NAME_LEN: usize = 16;

/// Milliseconds since the unix epoch, saturating to zero on a broken clock.
pub fn get_timestamp() -> u64 {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// Trims a player or room name and enforces the length cap.
///
/// Returns `None` for names that are empty after trimming.
pub fn sanitize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_NAME_LEN).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name_trims_and_truncates() {
        assert_eq!(sanitize_name("  viper  ").as_deref(), Some("viper"));
        assert_eq!(
            sanitize_name("abcdefghijklmnopqrstuvwxyz").as_deref(),
            Some("abcdefghijklmnop")
        );
    }

    #[test]
    fn test_sanitize_name_rejects_blank() {
        assert!(sanitize_name("").is_none());
        assert!(sanitize_name("   ").is_none());
    }

    #[test]
    fn test_get_timestamp_advances() {
        let t1 = get_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let t2 = get_timestamp();
        assert!(t2 > t1);
    }
}
