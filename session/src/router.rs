//! Message router.
//!
//! Transport events come in as `joined`, `leaved` or `game`. Game documents
//! are validated into `GameMessage` here and each variant goes to exactly one
//! handler. Documents with a missing or unknown type tag are dropped.

use log::{debug, info, warn};
use serde_json::Value;
use shared::queue::Envelope;
use shared::{
    sanitize_name, Direction, GameMessage, GameMode, RosterEntry, SessionState, StartPhase,
    Transport, TransportEvent, TurnBattleMode, TurnReport, MAX_PLAYERS,
};

use host::{results, roster, InputVerdict};

use crate::machine::{Origin, SessionMachine};
use crate::sync;
use crate::turn::SoloEngine;

const KIND_JOINED: &str = "joined";
const KIND_LEAVED: &str = "leaved";
const KIND_GAME: &str = "game";

/// Routes one transport event into the machine.
pub fn dispatch<T: Transport, E: SoloEngine>(
    machine: &mut SessionMachine<T, E>,
    event: TransportEvent,
    now_ms: u64,
) {
    if machine.context.is_none() {
        debug!("No session, dropping {} event", event.kind());
        return;
    }

    match event {
        TransportEvent::Joined { client_id } => machine.on_joined(&client_id),
        TransportEvent::Leaved { client_id } => machine.on_leaved(&client_id, now_ms),
        TransportEvent::Game { sender, document } => match GameMessage::from_document(&document) {
            Some(message) => {
                debug!("Routing {} from {}", message.tag(), sender);
                machine.on_message(&sender, message, now_ms);
            }
            None => debug!("Ignoring untagged or unknown message from {}", sender),
        },
    }
}

/// Splits an event into envelope parts: kind, payload and sender.
/// The kind is always the transport event kind, never a document's tag.
pub(crate) fn to_envelope(event: TransportEvent) -> (String, Value, String) {
    let kind = event.kind().to_string();
    match event {
        TransportEvent::Joined { client_id } | TransportEvent::Leaved { client_id } => {
            (kind, Value::Null, client_id)
        }
        TransportEvent::Game { sender, document } => (kind, document, sender),
    }
}

/// Routes a queued envelope, rebuilding the event it came from.
pub(crate) fn dispatch_envelope<T: Transport, E: SoloEngine>(
    machine: &mut SessionMachine<T, E>,
    envelope: Envelope,
    now_ms: u64,
) {
    let event = match envelope.kind.as_str() {
        KIND_JOINED => TransportEvent::Joined {
            client_id: envelope.sender,
        },
        KIND_LEAVED => TransportEvent::Leaved {
            client_id: envelope.sender,
        },
        KIND_GAME => TransportEvent::Game {
            sender: envelope.sender,
            document: envelope.payload,
        },
        other => {
            warn!("Dropping envelope of unknown kind {:?}", other);
            return;
        }
    };
    dispatch(machine, event, now_ms);
}

impl<T: Transport, E: SoloEngine> SessionMachine<T, E> {
    pub(crate) fn on_message(&mut self, sender: &str, message: GameMessage, now_ms: u64) {
        match message {
            GameMessage::GameState(snapshot) => self.on_game_state(sender, &snapshot),
            GameMessage::Input { direction } => self.on_input(sender, direction),
            GameMessage::PlayerSync { roster } => self.on_player_sync(sender, &roster),
            GameMessage::Ready { ready } => self.on_ready(sender, ready, now_ms),
            GameMessage::StartGame {
                game_mode,
                turn_battle_mode,
                map,
                phase,
            } => self.on_start_game(sender, game_mode, turn_battle_mode, map, phase, now_ms),
            GameMessage::RestartGame => self.on_restart_game(sender, now_ms),
            GameMessage::Chat { name, text } => self.on_chat(&name, &text),
            GameMessage::NickChange { name } => self.on_nick_change(sender, &name),
            GameMessage::HostDisconnect => self.on_host_disconnect(sender),
            GameMessage::ModeChange {
                game_mode,
                turn_battle_mode,
                map,
            } => self.on_mode_change(sender, game_mode, turn_battle_mode, map),
            GameMessage::TurnResults(report) => self.on_turn_results(sender, &report),
            GameMessage::ShowResults { ranking, reports } => {
                self.on_show_results(sender, &ranking, &reports)
            }
            GameMessage::StartAttempt {
                player_index,
                attempt,
            } => self.on_start_attempt(player_index, attempt),
            GameMessage::ReturnToLobby => self.on_return_to_lobby(sender),
            GameMessage::CancelReady => self.on_cancel_ready(sender),
            GameMessage::PlayerLeft { client_id } => self.on_player_left(sender, &client_id),
            GameMessage::PlayerLeaving => self.on_player_leaving(sender, now_ms),
        }
    }

    /// Host-issued messages are only taken from the slot marked as host.
    /// Before the first roster arrives the host is unknown and trusted.
    fn from_host(&self, sender: &str) -> bool {
        let Some(ctx) = self.context.as_ref() else {
            return false;
        };
        if ctx.is_host {
            return false;
        }
        let trusted = ctx
            .host_index()
            .map_or(true, |index| ctx.players[index].client_id == sender);
        if !trusted {
            warn!("Ignoring host-only message from {}", sender);
        }
        trusted
    }

    fn on_joined(&mut self, client_id: &str) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if !ctx.is_host {
            debug!("{} joined, waiting for roster", client_id);
            return;
        }

        let Some(index) = roster::assign(ctx, client_id) else {
            return;
        };
        let in_round = !matches!(
            ctx.state,
            SessionState::Lobby
                | SessionState::ModeSelect
                | SessionState::ReadyUp
                | SessionState::Chatting
                | SessionState::ChangingNick
        );
        if in_round {
            // Late joiners sit the current round out.
            let slot = &mut ctx.players[index];
            slot.alive = false;
            slot.turn_finished = true;
        }

        let mode = GameMessage::ModeChange {
            game_mode: ctx.game_mode,
            turn_battle_mode: ctx.turn_battle_mode,
            map: ctx.selected_map,
        };
        self.broadcast_roster();
        self.send(&mode);
    }

    fn on_leaved(&mut self, client_id: &str, now_ms: u64) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if ctx.is_host {
            self.remove_player(client_id, now_ms);
            return;
        }

        let host_left = ctx
            .host_index()
            .is_some_and(|index| ctx.players[index].client_id == client_id);
        if host_left {
            warn!("Host {} left the session", client_id);
            self.shut_down(Some("host left the session".to_string()));
        } else {
            roster::release(ctx, client_id);
        }
    }

    /// Host side of a departure: free the slot, tell everyone, and re-check
    /// anything that was waiting on the departed player.
    fn remove_player(&mut self, client_id: &str, now_ms: u64) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if roster::release(ctx, client_id).is_none() {
            return;
        }

        self.send(&GameMessage::PlayerLeft {
            client_id: client_id.to_string(),
        });
        self.broadcast_roster();
        self.check_ready_up(now_ms);
        self.check_turn_completion();
    }

    fn on_game_state(&mut self, sender: &str, snapshot: &Value) {
        if !self.from_host(sender) {
            return;
        }
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        let Some(target) = sync::apply_snapshot(ctx, snapshot) else {
            return;
        };
        if self.change_state(target, Origin::Remote).is_err() {
            return;
        }

        if target == SessionState::GameOver {
            if let Some(ctx) = self.context.as_mut() {
                let survivor = ctx
                    .players
                    .iter()
                    .position(|slot| slot.joined && slot.alive);
                ctx.results = survivor.into_iter().collect();
                ctx.winner = survivor;
            }
        }
    }

    fn on_input(&mut self, sender: &str, direction: Direction) {
        let Some(ctx) = self.context.as_mut().filter(|ctx| ctx.is_host) else {
            return;
        };
        match roster::validate_input(ctx, sender, direction) {
            InputVerdict::Applied => debug!("{} turned {:?}", sender, direction),
            verdict => debug!("Input {:?} from {}: {:?}", direction, sender, verdict),
        }
    }

    fn on_player_sync(&mut self, sender: &str, roster: &[RosterEntry]) {
        if !self.from_host(sender) {
            return;
        }
        if let Some(ctx) = self.context.as_mut() {
            sync::apply_roster(ctx, roster);
            debug!("Roster synced: {} players", ctx.joined_count());
        }
    }

    fn on_ready(&mut self, sender: &str, ready: bool, now_ms: u64) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        let Some(index) = ctx.slot_by_client(sender) else {
            warn!("Ready from unknown client {}", sender);
            return;
        };
        ctx.players[index].ready = ready;

        if ctx.is_host {
            self.broadcast_roster();
            self.check_ready_up(now_ms);
        }
    }

    fn on_start_game(
        &mut self,
        sender: &str,
        game_mode: GameMode,
        turn_battle_mode: TurnBattleMode,
        map: u32,
        phase: StartPhase,
        now_ms: u64,
    ) {
        if !self.from_host(sender) {
            return;
        }
        if let Some(ctx) = self.context.as_mut() {
            ctx.game_mode = game_mode;
            ctx.turn_battle_mode = turn_battle_mode;
            ctx.selected_map = map;
        }

        let entered = match phase {
            StartPhase::ReadyUp => self.enter_ready_up(Origin::Remote),
            StartPhase::Countdown => self.enter_countdown(now_ms, Origin::Remote, true),
        };
        if let Err(e) = entered {
            debug!("Ignoring start ({:?}): {}", phase, e);
        }
    }

    fn on_restart_game(&mut self, sender: &str, now_ms: u64) {
        if !self.from_host(sender) {
            return;
        }
        if let Err(e) = self.enter_countdown(now_ms, Origin::Remote, true) {
            debug!("Ignoring restart: {}", e);
        }
    }

    fn on_chat(&mut self, name: &str, text: &str) {
        if let Some(ctx) = self.context.as_mut() {
            ctx.chat.push(name, text);
        }
    }

    fn on_nick_change(&mut self, sender: &str, name: &str) {
        let Some(name) = sanitize_name(name) else {
            warn!("Ignoring blank nickname from {}", sender);
            return;
        };
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        let Some(index) = ctx.slot_by_client(sender) else {
            debug!("Nickname for unknown client {}", sender);
            return;
        };
        info!("Slot {} is now {}", index, name);
        ctx.players[index].name = name;

        if ctx.is_host {
            self.broadcast_roster();
        }
    }

    fn on_host_disconnect(&mut self, sender: &str) {
        if !self.from_host(sender) {
            return;
        }
        warn!("Host {} closed the session", sender);
        self.shut_down(Some("host disconnected".to_string()));
    }

    fn on_mode_change(
        &mut self,
        sender: &str,
        game_mode: GameMode,
        turn_battle_mode: TurnBattleMode,
        map: u32,
    ) {
        if !self.from_host(sender) {
            return;
        }
        if let Some(ctx) = self.context.as_mut() {
            ctx.game_mode = game_mode;
            ctx.turn_battle_mode = turn_battle_mode;
            ctx.selected_map = map;
        }
    }

    fn on_turn_results(&mut self, sender: &str, report: &TurnReport) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        // The sender's own slot, whatever index the report claims.
        let Some(index) = ctx.slot_by_client(sender) else {
            warn!("Turn results from unknown client {}", sender);
            return;
        };
        results::apply_report(ctx, index, report);

        if ctx.is_host {
            self.check_turn_completion();
        }
    }

    fn on_show_results(&mut self, sender: &str, ranking: &[usize], reports: &[TurnReport]) {
        if !self.from_host(sender) {
            return;
        }
        let tie_break = self.config.tie_break;
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        for report in reports {
            results::apply_report(ctx, report.player_index, report);
        }
        ctx.results = ranking
            .iter()
            .copied()
            .filter(|index| *index < MAX_PLAYERS && ctx.players[*index].joined)
            .collect();
        ctx.winner = results::winner(ctx, tie_break);

        if let Err(e) = self.change_state(SessionState::TurnResults, Origin::Remote) {
            debug!("Results arrived early: {}", e);
        }
    }

    fn on_start_attempt(&mut self, player_index: usize, attempt: usize) {
        let Some(slot) = self
            .context
            .as_mut()
            .and_then(|ctx| ctx.players.get_mut(player_index))
            .filter(|slot| slot.joined)
        else {
            return;
        };
        slot.current_attempt = attempt;
        debug!("Slot {} started attempt {}", player_index, attempt + 1);
    }

    fn on_return_to_lobby(&mut self, sender: &str) {
        if !self.from_host(sender) {
            return;
        }
        if self.change_state(SessionState::Lobby, Origin::Remote).is_err() {
            return;
        }
        if let Some(ctx) = self.context.as_mut() {
            ctx.reset_for_lobby();
        }
        self.turn.reset();
    }

    fn on_cancel_ready(&mut self, sender: &str) {
        if !self.from_host(sender) {
            return;
        }
        if self.change_state(SessionState::Lobby, Origin::Remote).is_ok() {
            self.clear_ready_flags();
        }
    }

    fn on_player_left(&mut self, sender: &str, client_id: &str) {
        if !self.from_host(sender) {
            return;
        }
        if let Some(ctx) = self.context.as_mut() {
            if client_id != ctx.local_client_id {
                roster::release(ctx, client_id);
            }
        }
    }

    fn on_player_leaving(&mut self, sender: &str, now_ms: u64) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if ctx.is_host {
            self.remove_player(sender, now_ms);
        } else {
            roster::release(ctx, sender);
        }
    }
}
