//! Typed game messages and their type tags.
//!
//! Documents are validated into `GameMessage` at the router boundary; the
//! handlers behind it only ever see typed variants. Every field read goes
//! through `document`, so malformed payloads decode to zero values. Only a
//! missing or unknown type tag rejects a document.

use serde_json::{json, Map, Value};

use crate::document::{array, boolean, field, int, string, type_tag, uint};
use crate::model::{GameMode, TurnAttempt, TurnBattleMode};
use crate::snake::Direction;
use crate::ATTEMPTS_PER_PLAYER;

pub const TAG_GAME_STATE: &str = "game_state";
pub const TAG_INPUT: &str = "input";
pub const TAG_PLAYER_SYNC: &str = "player_sync";
pub const TAG_READY: &str = "ready";
pub const TAG_START_GAME: &str = "start_game";
pub const TAG_RESTART_GAME: &str = "restart_game";
pub const TAG_CHAT: &str = "chat";
pub const TAG_NICK_CHANGE: &str = "nick_change";
pub const TAG_HOST_DISCONNECT: &str = "host_disconnect";
pub const TAG_MODE_CHANGE: &str = "turn_battle_mode";
pub const TAG_TURN_RESULTS: &str = "turn_results";
pub const TAG_SHOW_RESULTS: &str = "show_results";
pub const TAG_START_ATTEMPT: &str = "start_attempt";
pub const TAG_RETURN_TO_LOBBY: &str = "return_to_lobby";
pub const TAG_CANCEL_READY: &str = "cancel_ready";
pub const TAG_PLAYER_LEFT: &str = "player_left";
pub const TAG_PLAYER_LEAVING: &str = "player_leaving";

/// Which step of the start sequence a `start_game` message triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPhase {
    ReadyUp,
    Countdown,
}

impl StartPhase {
    fn as_str(self) -> &'static str {
        match self {
            StartPhase::ReadyUp => "ready_up",
            StartPhase::Countdown => "countdown",
        }
    }

    fn parse(raw: &str) -> StartPhase {
        match raw {
            "countdown" => StartPhase::Countdown,
            _ => StartPhase::ReadyUp,
        }
    }
}

/// One slot of the host's roster broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub index: usize,
    pub client_id: String,
    pub name: String,
    pub ready: bool,
    pub is_host: bool,
}

/// A player's finished turn-battle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnReport {
    pub player_index: usize,
    pub best_score: u32,
    pub attempts: [TurnAttempt; ATTEMPTS_PER_PLAYER],
}

impl TurnReport {
    pub fn to_document(&self) -> Value {
        let attempts: Vec<Value> = self
            .attempts
            .iter()
            .map(|a| {
                json!({
                    "score": a.score,
                    "length": a.length,
                    "survivalTime": a.survival_ms,
                })
            })
            .collect();
        json!({
            "playerIndex": self.player_index,
            "bestScore": self.best_score,
            "attempts": attempts,
        })
    }

    pub fn from_document(doc: &Value) -> TurnReport {
        let mut attempts = [TurnAttempt::default(); ATTEMPTS_PER_PLAYER];
        for (slot, entry) in attempts.iter_mut().zip(array(doc, "attempts")) {
            *slot = TurnAttempt {
                score: uint(entry, "score") as u32,
                length: uint(entry, "length") as u32,
                survival_ms: uint(entry, "survivalTime"),
            };
        }
        TurnReport {
            player_index: uint(doc, "playerIndex") as usize,
            best_score: uint(doc, "bestScore") as u32,
            attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameMessage {
    /// Full snapshot from the host.
    GameState(Value),
    /// Direction change request from a client.
    Input { direction: Direction },
    /// Roster broadcast from the host.
    PlayerSync { roster: Vec<RosterEntry> },
    Ready { ready: bool },
    StartGame {
        game_mode: GameMode,
        turn_battle_mode: TurnBattleMode,
        map: u32,
        phase: StartPhase,
    },
    RestartGame,
    Chat { name: String, text: String },
    NickChange { name: String },
    HostDisconnect,
    ModeChange {
        game_mode: GameMode,
        turn_battle_mode: TurnBattleMode,
        map: u32,
    },
    TurnResults(TurnReport),
    ShowResults {
        ranking: Vec<usize>,
        reports: Vec<TurnReport>,
    },
    StartAttempt { player_index: usize, attempt: usize },
    ReturnToLobby,
    CancelReady,
    /// Host notice that a participant is gone.
    PlayerLeft { client_id: String },
    /// Sent by a participant on its way out.
    PlayerLeaving,
}

impl GameMessage {
    pub fn tag(&self) -> &'static str {
        match self {
            GameMessage::GameState(_) => TAG_GAME_STATE,
            GameMessage::Input { .. } => TAG_INPUT,
            GameMessage::PlayerSync { .. } => TAG_PLAYER_SYNC,
            GameMessage::Ready { .. } => TAG_READY,
            GameMessage::StartGame { .. } => TAG_START_GAME,
            GameMessage::RestartGame => TAG_RESTART_GAME,
            GameMessage::Chat { .. } => TAG_CHAT,
            GameMessage::NickChange { .. } => TAG_NICK_CHANGE,
            GameMessage::HostDisconnect => TAG_HOST_DISCONNECT,
            GameMessage::ModeChange { .. } => TAG_MODE_CHANGE,
            GameMessage::TurnResults(_) => TAG_TURN_RESULTS,
            GameMessage::ShowResults { .. } => TAG_SHOW_RESULTS,
            GameMessage::StartAttempt { .. } => TAG_START_ATTEMPT,
            GameMessage::ReturnToLobby => TAG_RETURN_TO_LOBBY,
            GameMessage::CancelReady => TAG_CANCEL_READY,
            GameMessage::PlayerLeft { .. } => TAG_PLAYER_LEFT,
            GameMessage::PlayerLeaving => TAG_PLAYER_LEAVING,
        }
    }

    /// Encodes the message as a tagged document.
    pub fn to_document(&self) -> Value {
        let mut doc = match self {
            GameMessage::GameState(snapshot) => match snapshot {
                Value::Object(map) => map.clone(),
                _ => Map::new(),
            },
            GameMessage::Input { direction } => object(json!({"direction": direction.code()})),
            GameMessage::PlayerSync { roster } => {
                let players: Vec<Value> = roster
                    .iter()
                    .map(|e| {
                        json!({
                            "index": e.index,
                            "clientId": e.client_id,
                            "name": e.name,
                            "ready": e.ready,
                            "isHost": e.is_host,
                        })
                    })
                    .collect();
                object(json!({ "players": players }))
            }
            GameMessage::Ready { ready } => object(json!({ "ready": ready })),
            GameMessage::StartGame {
                game_mode,
                turn_battle_mode,
                map,
                phase,
            } => object(json!({
                "game_mode": game_mode.code(),
                "turn_battle_mode": turn_battle_mode.code(),
                "map": map,
                "phase": phase.as_str(),
            })),
            GameMessage::Chat { name, text } => object(json!({"name": name, "text": text})),
            GameMessage::NickChange { name } => object(json!({ "name": name })),
            GameMessage::ModeChange {
                game_mode,
                turn_battle_mode,
                map,
            } => object(json!({
                "game_mode": game_mode.code(),
                "turn_battle_mode": turn_battle_mode.code(),
                "map": map,
            })),
            GameMessage::TurnResults(report) => object(report.to_document()),
            GameMessage::ShowResults { ranking, reports } => {
                let results: Vec<Value> = reports.iter().map(TurnReport::to_document).collect();
                object(json!({"ranking": ranking, "results": results}))
            }
            GameMessage::StartAttempt {
                player_index,
                attempt,
            } => object(json!({"playerIndex": player_index, "attempt": attempt})),
            GameMessage::PlayerLeft { client_id } => object(json!({ "clientId": client_id })),
            GameMessage::RestartGame
            | GameMessage::HostDisconnect
            | GameMessage::ReturnToLobby
            | GameMessage::CancelReady
            | GameMessage::PlayerLeaving => Map::new(),
        };
        doc.insert("type".into(), Value::String(self.tag().to_string()));
        Value::Object(doc)
    }

    /// Decodes a tagged document. Unknown or missing tags yield `None`.
    pub fn from_document(doc: &Value) -> Option<GameMessage> {
        let message = match type_tag(doc)? {
            TAG_GAME_STATE => GameMessage::GameState(doc.clone()),
            TAG_INPUT => GameMessage::Input {
                direction: Direction::from_code(int(doc, "direction")),
            },
            TAG_PLAYER_SYNC => GameMessage::PlayerSync {
                roster: array(doc, "players")
                    .iter()
                    .map(|e| RosterEntry {
                        index: uint(e, "index") as usize,
                        client_id: string(e, "clientId"),
                        name: string(e, "name"),
                        ready: boolean(e, "ready"),
                        is_host: boolean(e, "isHost"),
                    })
                    .collect(),
            },
            TAG_READY => GameMessage::Ready {
                ready: boolean(doc, "ready"),
            },
            TAG_START_GAME => GameMessage::StartGame {
                game_mode: GameMode::from_code(int(doc, "game_mode")),
                turn_battle_mode: TurnBattleMode::from_code(int(doc, "turn_battle_mode")),
                map: uint(doc, "map") as u32,
                phase: StartPhase::parse(field(doc, "phase").as_str().unwrap_or_default()),
            },
            TAG_RESTART_GAME => GameMessage::RestartGame,
            TAG_CHAT => GameMessage::Chat {
                name: string(doc, "name"),
                text: string(doc, "text"),
            },
            TAG_NICK_CHANGE => GameMessage::NickChange {
                name: string(doc, "name"),
            },
            TAG_HOST_DISCONNECT => GameMessage::HostDisconnect,
            TAG_MODE_CHANGE => GameMessage::ModeChange {
                game_mode: GameMode::from_code(int(doc, "game_mode")),
                turn_battle_mode: TurnBattleMode::from_code(int(doc, "turn_battle_mode")),
                map: uint(doc, "map") as u32,
            },
            TAG_TURN_RESULTS => GameMessage::TurnResults(TurnReport::from_document(doc)),
            TAG_SHOW_RESULTS => GameMessage::ShowResults {
                ranking: array(doc, "ranking")
                    .iter()
                    .filter_map(Value::as_u64)
                    .map(|i| i as usize)
                    .collect(),
                reports: array(doc, "results")
                    .iter()
                    .map(TurnReport::from_document)
                    .collect(),
            },
            TAG_START_ATTEMPT => GameMessage::StartAttempt {
                player_index: uint(doc, "playerIndex") as usize,
                attempt: uint(doc, "attempt") as usize,
            },
            TAG_RETURN_TO_LOBBY => GameMessage::ReturnToLobby,
            TAG_CANCEL_READY => GameMessage::CancelReady,
            TAG_PLAYER_LEFT => GameMessage::PlayerLeft {
                client_id: string(doc, "clientId"),
            },
            TAG_PLAYER_LEAVING => GameMessage::PlayerLeaving,
            _ => return None,
        };
        Some(message)
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(message: GameMessage) {
        let doc = message.to_document();
        assert_eq!(type_tag(&doc), Some(message.tag()));
        assert_eq!(GameMessage::from_document(&doc), Some(message));
    }

    #[test]
    fn test_every_variant_survives_encoding() {
        let report = TurnReport {
            player_index: 2,
            best_score: 90,
            attempts: [
                TurnAttempt { score: 40, length: 5, survival_ms: 9_000 },
                TurnAttempt { score: 90, length: 9, survival_ms: 21_000 },
                TurnAttempt { score: 10, length: 3, survival_ms: 2_500 },
            ],
        };
        let messages = vec![
            GameMessage::Input { direction: Direction::Left },
            GameMessage::PlayerSync {
                roster: vec![RosterEntry {
                    index: 0,
                    client_id: "c0".into(),
                    name: "Ana".into(),
                    ready: true,
                    is_host: true,
                }],
            },
            GameMessage::Ready { ready: true },
            GameMessage::StartGame {
                game_mode: GameMode::TurnBattle,
                turn_battle_mode: TurnBattleMode::PowerUp,
                map: 3,
                phase: StartPhase::Countdown,
            },
            GameMessage::RestartGame,
            GameMessage::Chat { name: "Ana".into(), text: "gg".into() },
            GameMessage::NickChange { name: "Bo".into() },
            GameMessage::HostDisconnect,
            GameMessage::ModeChange {
                game_mode: GameMode::RealTime,
                turn_battle_mode: TurnBattleMode::Classic,
                map: 1,
            },
            GameMessage::TurnResults(report),
            GameMessage::ShowResults { ranking: vec![2, 0], reports: vec![report] },
            GameMessage::StartAttempt { player_index: 1, attempt: 2 },
            GameMessage::ReturnToLobby,
            GameMessage::CancelReady,
            GameMessage::PlayerLeft { client_id: "c4".into() },
            GameMessage::PlayerLeaving,
        ];
        for message in messages {
            roundtrip(message);
        }
    }

    #[test]
    fn test_unknown_and_missing_tags_rejected() {
        assert_eq!(GameMessage::from_document(&json!({"type": "dance"})), None);
        assert_eq!(GameMessage::from_document(&json!({"ready": true})), None);
        assert_eq!(GameMessage::from_document(&json!("ready")), None);
    }

    #[test]
    fn test_malformed_payload_decodes_to_zero_values() {
        let doc = json!({"type": "turn_results", "playerIndex": "one", "attempts": [{"score": 7}]});
        match GameMessage::from_document(&doc) {
            Some(GameMessage::TurnResults(report)) => {
                assert_eq!(report.player_index, 0);
                assert_eq!(report.best_score, 0);
                assert_eq!(report.attempts[0].score, 7);
                assert_eq!(report.attempts[1], TurnAttempt::default());
            }
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn test_start_phase_defaults_to_ready_up() {
        let doc = json!({"type": "start_game", "phase": 12});
        match GameMessage::from_document(&doc) {
            Some(GameMessage::StartGame { phase, game_mode, .. }) => {
                assert_eq!(phase, StartPhase::ReadyUp);
                assert_eq!(game_mode, GameMode::RealTime);
            }
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn test_game_state_keeps_snapshot_body() {
        let snapshot = json!({"mpState": 11, "food": [{"x": 1, "y": 2}]});
        let doc = GameMessage::GameState(snapshot).to_document();
        assert_eq!(doc["type"], "game_state");
        assert_eq!(doc["mpState"], 11);
        assert_eq!(doc["food"][0]["y"], 2);
    }
}
