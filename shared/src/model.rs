//! The Session Context aggregate and everything it owns.
//!
//! One `SessionContext` exists per match attempt. It is owned by the frame
//! loop and mutated in place; nothing here is shared across threads.

use std::collections::VecDeque;

use log::debug;

use crate::config::SessionConfig;
use crate::snake::{Combo, Direction, Position, Snake};
use crate::{ATTEMPTS_PER_PLAYER, FOOD_COUNT, MAX_PLAYERS};

/// Lifecycle states. The discriminant is the snapshot's `mpState` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Menu = 0,
    EnteringName = 1,
    Browsing = 2,
    Hosting = 3,
    Joining = 4,
    Lobby = 5,
    Chatting = 6,
    ChangingNick = 7,
    ModeSelect = 8,
    ReadyUp = 9,
    Countdown = 10,
    Playing = 11,
    TurnPlaying = 12,
    TurnWaiting = 13,
    TurnResults = 14,
    GameOver = 15,
    Disconnected = 16,
}

impl SessionState {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> SessionState {
        match code {
            1 => SessionState::EnteringName,
            2 => SessionState::Browsing,
            3 => SessionState::Hosting,
            4 => SessionState::Joining,
            5 => SessionState::Lobby,
            6 => SessionState::Chatting,
            7 => SessionState::ChangingNick,
            8 => SessionState::ModeSelect,
            9 => SessionState::ReadyUp,
            10 => SessionState::Countdown,
            11 => SessionState::Playing,
            12 => SessionState::TurnPlaying,
            13 => SessionState::TurnWaiting,
            14 => SessionState::TurnResults,
            15 => SessionState::GameOver,
            16 => SessionState::Disconnected,
            _ => SessionState::Menu,
        }
    }

    /// Overlay states remember where to return to.
    pub fn is_overlay(self) -> bool {
        matches!(self, SessionState::Chatting | SessionState::ChangingNick)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameMode {
    /// Continuous 1v1 on a shared board, simulated by the host.
    #[default]
    RealTime = 0,
    /// Sequential solo attempts, ranked at the end.
    TurnBattle = 1,
}

impl GameMode {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> GameMode {
        match code {
            1 => GameMode::TurnBattle,
            _ => GameMode::RealTime,
        }
    }
}

/// Ruleset handed to the solo engine during a turn battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnBattleMode {
    #[default]
    Classic = 0,
    PowerUp = 1,
}

impl TurnBattleMode {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> TurnBattleMode {
        match code {
            1 => TurnBattleMode::PowerUp,
            _ => TurnBattleMode::Classic,
        }
    }
}

/// One recorded solo run. Never modified after it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnAttempt {
    pub score: u32,
    pub length: u32,
    pub survival_ms: u64,
}

/// One participant. Only `joined` is meaningful while `joined` is false.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerSlot {
    pub joined: bool,
    pub client_id: String,
    pub name: String,
    pub ready: bool,
    pub alive: bool,
    pub is_local: bool,
    pub is_host: bool,
    pub score: u32,
    pub combo: Combo,
    pub snake: Snake,
    pub attempts: [TurnAttempt; ATTEMPTS_PER_PLAYER],
    pub completed_attempts: usize,
    pub best_score: u32,
    pub turn_finished: bool,
    /// Attempt the player is currently on, mirrored from `start_attempt`.
    pub current_attempt: usize,
}

impl PlayerSlot {
    pub fn occupy(&mut self, client_id: &str, name: &str, is_host: bool) {
        *self = PlayerSlot {
            joined: true,
            client_id: client_id.to_string(),
            name: name.to_string(),
            is_host,
            alive: true,
            ..PlayerSlot::default()
        };
    }

    pub fn clear(&mut self) {
        *self = PlayerSlot::default();
    }

    /// Stores the next attempt. Returns false once all attempts are used.
    pub fn record_attempt(&mut self, attempt: TurnAttempt) -> bool {
        if self.completed_attempts >= ATTEMPTS_PER_PLAYER {
            return false;
        }
        self.attempts[self.completed_attempts] = attempt;
        self.completed_attempts += 1;
        self.best_score = self.recorded_attempts().iter().map(|a| a.score).max().unwrap_or(0);
        true
    }

    pub fn recorded_attempts(&self) -> &[TurnAttempt] {
        &self.attempts[..self.completed_attempts.min(ATTEMPTS_PER_PLAYER)]
    }

    pub fn reset_turn_battle(&mut self) {
        self.attempts = [TurnAttempt::default(); ATTEMPTS_PER_PLAYER];
        self.completed_attempts = 0;
        self.best_score = 0;
        self.turn_finished = false;
        self.current_attempt = 0;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatLine {
    pub name: String,
    pub text: String,
}

/// Bounded chat history, oldest lines evicted first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatLog {
    lines: VecDeque<ChatLine>,
    capacity: usize,
}

impl ChatLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, name: &str, text: &str) {
        if self.capacity == 0 {
            return;
        }
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(ChatLine {
            name: name.to_string(),
            text: text.to_string(),
        });
    }

    pub fn lines(&self) -> impl Iterator<Item = &ChatLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Root aggregate for one match attempt.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub local_client_id: String,
    pub is_host: bool,
    pub state: SessionState,
    /// State an overlay returns to.
    pub previous_state: Option<SessionState>,
    pub players: [PlayerSlot; MAX_PLAYERS],
    pub max_players: usize,
    /// Index of the local slot, or -1 while unassigned.
    pub local_player_index: i32,
    pub food: [Position; FOOD_COUNT],
    pub game_mode: GameMode,
    pub turn_battle_mode: TurnBattleMode,
    pub selected_map: u32,
    pub current_speed_ms: u64,
    pub countdown_deadline_ms: Option<u64>,
    pub room_name: String,
    pub chat: ChatLog,
    pub last_error: Option<String>,
    pub selection_index: usize,
    /// Slot ranking of the last finished round, best first.
    pub results: Vec<usize>,
    pub winner: Option<usize>,
}

impl SessionContext {
    pub fn new(config: &SessionConfig, is_host: bool) -> Self {
        Self {
            session_id: String::new(),
            local_client_id: String::new(),
            is_host,
            state: if is_host {
                SessionState::Hosting
            } else {
                SessionState::Joining
            },
            previous_state: None,
            players: std::array::from_fn(|_| PlayerSlot::default()),
            max_players: config.player_cap(),
            local_player_index: -1,
            food: initial_food(config),
            game_mode: GameMode::default(),
            turn_battle_mode: TurnBattleMode::default(),
            selected_map: 0,
            current_speed_ms: config.base_speed_ms,
            countdown_deadline_ms: None,
            room_name: String::new(),
            chat: ChatLog::new(config.chat_capacity),
            last_error: None,
            selection_index: 0,
            results: Vec::new(),
            winner: None,
        }
    }

    pub fn joined_count(&self) -> usize {
        self.players.iter().filter(|p| p.joined).count()
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.joined && p.alive).count()
    }

    pub fn joined_indices(&self) -> Vec<usize> {
        self.players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.joined)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn slot_by_client(&self, client_id: &str) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.joined && p.client_id == client_id)
    }

    pub fn first_free_slot(&self) -> Option<usize> {
        self.players[..self.max_players]
            .iter()
            .position(|p| !p.joined)
    }

    pub fn all_ready(&self) -> bool {
        self.players.iter().filter(|p| p.joined).all(|p| p.ready)
    }

    /// Re-derives `is_local` and `local_player_index` from the local client id.
    pub fn recompute_local_index(&mut self) {
        self.local_player_index = -1;
        for (index, slot) in self.players.iter_mut().enumerate() {
            slot.is_local = slot.joined && slot.client_id == self.local_client_id;
            if slot.is_local && self.local_player_index < 0 {
                self.local_player_index = index as i32;
            }
        }
    }

    pub fn local_index(&self) -> Option<usize> {
        usize::try_from(self.local_player_index)
            .ok()
            .filter(|i| *i < MAX_PLAYERS)
    }

    pub fn local_slot(&self) -> Option<&PlayerSlot> {
        self.local_index().map(|i| &self.players[i])
    }

    pub fn local_slot_mut(&mut self) -> Option<&mut PlayerSlot> {
        match self.local_index() {
            Some(index) => Some(&mut self.players[index]),
            None => None,
        }
    }

    pub fn host_index(&self) -> Option<usize> {
        self.players.iter().position(|p| p.joined && p.is_host)
    }

    /// Resets per-round fields ahead of a countdown.
    pub fn prepare_round(&mut self, config: &SessionConfig) {
        self.results.clear();
        self.winner = None;
        self.current_speed_ms = config.base_speed_ms;
        self.food = initial_food(config);

        let spawns = spawn_points(config);
        let mut next_spawn = spawns.iter();
        for slot in self.players.iter_mut().filter(|p| p.joined) {
            slot.score = 0;
            slot.combo = Combo::default();
            slot.reset_turn_battle();
            match (self.game_mode, next_spawn.next()) {
                (GameMode::RealTime, Some((head, facing))) => {
                    slot.snake = Snake::spawn(*head, *facing);
                    slot.alive = true;
                }
                (GameMode::RealTime, None) => {
                    slot.snake = Snake::default();
                    slot.alive = false;
                }
                (GameMode::TurnBattle, _) => {
                    slot.snake = Snake::default();
                    slot.alive = true;
                }
            }
        }
        debug!(
            "Prepared {:?} round for {} players",
            self.game_mode,
            self.joined_count()
        );
    }

    /// Clears round results and readiness on the way back to the lobby.
    pub fn reset_for_lobby(&mut self) {
        self.results.clear();
        self.winner = None;
        self.countdown_deadline_ms = None;
        for slot in self.players.iter_mut().filter(|p| p.joined) {
            slot.ready = false;
            slot.alive = true;
            slot.score = 0;
            slot.combo = Combo::default();
            slot.snake = Snake::default();
            slot.reset_turn_battle();
        }
    }
}

fn initial_food(config: &SessionConfig) -> [Position; FOOD_COUNT] {
    let x = config.grid_width / 2;
    [
        Position::new(x, config.grid_height / 3),
        Position::new(x, config.grid_height * 2 / 3),
    ]
}

/// Head positions of the two real-time snakes, facing each other.
fn spawn_points(config: &SessionConfig) -> [(Position, Direction); 2] {
    let y = config.grid_height / 2;
    [
        (Position::new(config.grid_width / 4, y), Direction::Right),
        (
            Position::new(config.grid_width * 3 / 4, y),
            Direction::Left,
        ),
    ]
}
