//! Session tunables.

use serde::{Deserialize, Serialize};

use crate::MAX_PLAYERS;

/// How a tie for the best turn-battle score is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TieBreak {
    /// The tied player in the lowest slot wins. Only agrees across peers
    /// when every peer holds the same slot order.
    #[default]
    FirstSeenSlot,
    /// A tie at the top produces no winner.
    Draw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Group tag used to namespace sessions on a shared transport.
    pub team_tag: String,
    pub max_players: usize,
    pub broadcast_interval_ms: u64,
    pub base_speed_ms: u64,
    pub speed_step_ms: u64,
    pub min_speed_ms: u64,
    pub countdown_ms: u64,
    pub combo_timeout_ms: u64,
    pub grid_width: i32,
    pub grid_height: i32,
    pub chat_capacity: usize,
    pub queue_capacity: usize,
    /// Route inbound events through the envelope queue instead of
    /// dispatching them straight from the poll callback.
    pub buffered_dispatch: bool,
    pub tie_break: TieBreak,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            team_tag: "SNK".to_string(),
            max_players: MAX_PLAYERS,
            broadcast_interval_ms: 16,
            base_speed_ms: 150,
            speed_step_ms: 5,
            min_speed_ms: 60,
            countdown_ms: 3_000,
            combo_timeout_ms: 3_000,
            grid_width: 40,
            grid_height: 30,
            chat_capacity: 50,
            queue_capacity: 64,
            buffered_dispatch: false,
            tie_break: TieBreak::FirstSeenSlot,
        }
    }
}

impl SessionConfig {
    /// Player cap clamped to what a session can hold.
    pub fn player_cap(&self) -> usize {
        self.max_players.clamp(2, MAX_PLAYERS)
    }

    /// Movement interval after one more food has been eaten.
    pub fn faster(&self, current_ms: u64) -> u64 {
        current_ms
            .saturating_sub(self.speed_step_ms)
            .max(self.min_speed_ms)
    }
}
