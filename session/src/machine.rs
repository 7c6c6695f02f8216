//! Session state machine.
//!
//! `SessionMachine` owns the transport, the Session Context and every
//! per-session controller. The frame loop calls `frame` once per frame and
//! the local action methods in response to player input. Remote messages
//! reach the machine through the router during `frame`.
//!
//! Before a session exists (Menu, EnteringName, Browsing) the state lives on
//! the machine itself. From Hosting/Joining on it lives in the context, and
//! reaching Disconnected destroys the context.

use log::{debug, error, info, warn};
use shared::naming::{encode_display_name, namespace_id};
use shared::queue::MessageQueue;
use shared::{
    codec, sanitize_name, Direction, GameMessage, GameMode, SessionConfig, SessionContext,
    SessionMetadata, SessionState, StartPhase, Transport, TransportError, TurnBattleMode,
};

use host::{results, roster, HostSimulation};

use crate::browser::{browse, BrowseableSession};
use crate::error::{Result, SessionError};
use crate::router;
use crate::sync;
use crate::turn::{SoloEngine, TurnBattle, TurnStep};

/// Whether `from -> to` is a permitted transition.
///
/// Overlays (Chatting, ChangingNick) may return to either state they can be
/// opened from; the machine restores the exact one it saved.
pub fn allowed(from: SessionState, to: SessionState) -> bool {
    use SessionState::*;

    if to == Disconnected {
        return from != Disconnected;
    }
    matches!(
        (from, to),
        (Menu, EnteringName | Hosting | Browsing)
            | (EnteringName, Menu | Hosting | Browsing)
            | (Browsing, Joining | Menu)
            | (Hosting | Joining, Lobby)
            | (Lobby, ReadyUp | Countdown | ModeSelect | Chatting | ChangingNick)
            | (ModeSelect, Lobby)
            | (Chatting | ChangingNick, Lobby | ReadyUp)
            | (ReadyUp, Countdown | Lobby | Chatting | ChangingNick)
            | (Countdown, Playing | TurnPlaying)
            | (Playing, GameOver)
            | (TurnPlaying, TurnWaiting | Countdown)
            | (TurnWaiting, TurnResults)
            | (TurnResults, Lobby)
            | (GameOver, Lobby | Countdown)
    )
}

/// Who asked for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// A local action. Overlays must be closed explicitly.
    Local,
    /// A peer's message. An open overlay is closed first when the underlying
    /// state permits the transition.
    Remote,
}

pub struct SessionMachine<T: Transport, E: SoloEngine> {
    pub(crate) config: SessionConfig,
    pub(crate) transport: T,
    pub(crate) engine: E,
    pub(crate) context: Option<SessionContext>,
    /// State while no context exists.
    pub(crate) front_state: SessionState,
    pub(crate) player_name: String,
    pub(crate) simulation: HostSimulation,
    pub(crate) turn: TurnBattle,
    pub(crate) queue: Option<MessageQueue>,
    pub(crate) sessions: Vec<BrowseableSession>,
    pub(crate) last_error: Option<String>,
}

impl<T: Transport, E: SoloEngine> SessionMachine<T, E> {
    pub fn new(config: SessionConfig, transport: T, engine: E) -> Self {
        let queue = config
            .buffered_dispatch
            .then(|| MessageQueue::new(config.queue_capacity));
        Self {
            config,
            transport,
            engine,
            context: None,
            front_state: SessionState::Menu,
            player_name: "Player".to_string(),
            simulation: HostSimulation::new(rand::random()),
            turn: TurnBattle::default(),
            queue,
            sessions: Vec::new(),
            last_error: None,
        }
    }

    /// Replaces the food placement generator with a seeded one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.simulation = HostSimulation::new(seed);
        self
    }

    pub fn state(&self) -> SessionState {
        self.context
            .as_ref()
            .map_or(self.front_state, |ctx| ctx.state)
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut SessionContext> {
        self.context.as_mut()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn sessions(&self) -> &[BrowseableSession] {
        &self.sessions
    }

    /// Message from the last failure that ended a session.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_host(&self) -> bool {
        self.context.as_ref().is_some_and(|ctx| ctx.is_host)
    }

    /// Envelopes lost to a full inbound queue.
    pub fn dropped_messages(&self) -> u64 {
        self.queue.as_ref().map_or(0, MessageQueue::dropped)
    }

    /// Applies a validated transition.
    pub(crate) fn transition(&mut self, to: SessionState) -> Result<()> {
        self.change_state(to, Origin::Local)
    }

    pub(crate) fn change_state(&mut self, to: SessionState, origin: Origin) -> Result<()> {
        let from = self.state();

        let base = match (origin, self.context.as_ref()) {
            (Origin::Remote, Some(ctx)) if from.is_overlay() && to != SessionState::Disconnected => {
                ctx.previous_state.unwrap_or(from)
            }
            _ => from,
        };
        if !allowed(base, to) {
            debug!("Rejected {:?} transition {:?} -> {:?}", origin, from, to);
            return Err(SessionError::InvalidTransition { from, to });
        }

        match self.context.as_mut() {
            Some(ctx) => {
                if base != from {
                    ctx.previous_state = None;
                }
                if to.is_overlay() {
                    ctx.previous_state = Some(base);
                }
                ctx.state = to;
            }
            None => self.front_state = to,
        }
        info!("State {:?} -> {:?}", from, to);
        Ok(())
    }

    fn ctx_mut(&mut self) -> Result<&mut SessionContext> {
        self.context.as_mut().ok_or(SessionError::NoContext)
    }

    fn host_ctx_mut(&mut self) -> Result<&mut SessionContext> {
        let ctx = self.ctx_mut()?;
        if !ctx.is_host {
            return Err(SessionError::NotHost);
        }
        Ok(ctx)
    }

    /// Broadcasts a message. Sends are best-effort: a failure is logged and
    /// the session carries on.
    pub(crate) fn send(&mut self, message: &GameMessage) -> bool {
        match self.transport.send_game_message(&message.to_document()) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to send {}: {}", message.tag(), e);
                false
            }
        }
    }

    /// Ends the session: leaves the transport and destroys the context.
    pub(crate) fn shut_down(&mut self, reason: Option<String>) {
        let from = self.state();
        if let Some(reason) = reason {
            if let Some(ctx) = self.context.as_mut() {
                ctx.last_error = Some(reason.clone());
            }
            self.last_error = Some(reason);
        }

        self.transport.leave();
        self.context = None;
        self.front_state = SessionState::Disconnected;
        self.turn.reset();
        self.simulation.reset_round();
        if let Some(queue) = self.queue.as_mut() {
            while queue.pop().is_some() {}
        }
        info!("State {:?} -> {:?}", from, SessionState::Disconnected);
    }

    fn fail(&mut self, err: TransportError) -> SessionError {
        error!("Transport failure: {}", err);
        self.shut_down(Some(err.to_string()));
        SessionError::Transport(err)
    }

    // Pre-session actions

    pub fn begin_name_entry(&mut self) -> Result<()> {
        self.transition(SessionState::EnteringName)
    }

    /// Stores the player name and returns to the menu.
    pub fn enter_name(&mut self, name: &str) -> Result<()> {
        let name = sanitize_name(name).ok_or(SessionError::InvalidName)?;
        if self.state() == SessionState::EnteringName {
            self.transition(SessionState::Menu)?;
        }
        self.player_name = name;
        Ok(())
    }

    pub fn open_browser(&mut self) -> Result<()> {
        self.transition(SessionState::Browsing)
    }

    /// Refreshes the session list. A transport failure ends in Disconnected.
    pub fn refresh_browser(&mut self) -> Result<&[BrowseableSession]> {
        if self.state() != SessionState::Browsing {
            return Err(SessionError::InvalidTransition {
                from: self.state(),
                to: SessionState::Browsing,
            });
        }
        match browse(&mut self.transport, &self.config) {
            Ok(sessions) => self.sessions = sessions,
            Err(e) => return Err(self.fail(e)),
        }
        Ok(&self.sessions)
    }

    pub fn back_to_menu(&mut self) -> Result<()> {
        self.transition(SessionState::Menu)?;
        self.sessions.clear();
        Ok(())
    }

    /// Clears a finished session and returns to the menu.
    pub fn acknowledge_disconnect(&mut self) {
        if self.state() == SessionState::Disconnected {
            self.context = None;
            self.front_state = SessionState::Menu;
            self.sessions.clear();
            debug!("Back to menu after disconnect");
        }
    }

    /// Hosts a new session and enters its lobby.
    pub fn host_game(&mut self, room: &str, game_mode: GameMode, map: u32) -> Result<()> {
        let room = sanitize_name(room).ok_or(SessionError::InvalidName)?;
        if !allowed(self.state(), SessionState::Hosting) {
            return Err(SessionError::InvalidTransition {
                from: self.state(),
                to: SessionState::Hosting,
            });
        }
        info!("State {:?} -> {:?}", self.state(), SessionState::Hosting);

        let mut ctx = SessionContext::new(&self.config, true);
        ctx.room_name = room.clone();
        ctx.game_mode = game_mode;
        ctx.selected_map = map;
        self.context = Some(ctx);
        self.last_error = None;

        let metadata = SessionMetadata {
            display_name: encode_display_name(&self.config.team_tag, &room, map, game_mode),
            max_clients: self.config.player_cap(),
            public: true,
            namespace: namespace_id(&self.config.team_tag),
        };
        let hosted = match self.transport.host(&metadata) {
            Ok(hosted) => hosted,
            Err(e) => return Err(self.fail(e)),
        };
        if let Err(e) = self.transport.listen() {
            return Err(self.fail(e));
        }

        let name = self.player_name.clone();
        let ctx = self.ctx_mut()?;
        ctx.session_id = hosted.session_id;
        ctx.local_client_id = hosted.client_id.clone();
        if let Some(index) = roster::assign(ctx, &hosted.client_id) {
            ctx.players[index].name = name;
        }
        self.transition(SessionState::Lobby)
    }

    /// Joins a session from the browser and enters its lobby.
    pub fn join_game(&mut self, session_id: &str) -> Result<()> {
        if !allowed(self.state(), SessionState::Joining) {
            return Err(SessionError::InvalidTransition {
                from: self.state(),
                to: SessionState::Joining,
            });
        }
        info!("State {:?} -> {:?}", self.state(), SessionState::Joining);

        let mut ctx = SessionContext::new(&self.config, false);
        if let Some(listed) = self.sessions.iter().find(|s| s.id == session_id) {
            ctx.room_name = listed.name.clone();
            ctx.game_mode = listed.mode;
            ctx.selected_map = listed.map;
        }
        self.context = Some(ctx);
        self.last_error = None;

        let metadata = SessionMetadata {
            display_name: self.player_name.clone(),
            max_clients: self.config.player_cap(),
            public: false,
            namespace: namespace_id(&self.config.team_tag),
        };
        let joined = match self.transport.join(session_id, &metadata) {
            Ok(joined) => joined,
            Err(e) => return Err(self.fail(e)),
        };
        if let Err(e) = self.transport.listen() {
            return Err(self.fail(e));
        }
        debug!(
            "Joined {} alongside {:?}",
            joined.session_id, joined.existing_clients
        );

        let ctx = self.ctx_mut()?;
        ctx.session_id = joined.session_id;
        ctx.local_client_id = joined.client_id;
        self.transition(SessionState::Lobby)?;

        let name = self.player_name.clone();
        self.send(&GameMessage::NickChange { name });
        Ok(())
    }

    /// Leaves the session and tells the peers, best-effort.
    pub fn leave(&mut self) {
        if self.context.is_none() {
            return;
        }
        let notice = if self.is_host() {
            GameMessage::HostDisconnect
        } else {
            GameMessage::PlayerLeaving
        };
        self.send(&notice);
        self.shut_down(None);
    }

    // Lobby actions

    pub fn open_mode_select(&mut self) -> Result<()> {
        self.host_ctx_mut()?;
        self.transition(SessionState::ModeSelect)
    }

    /// Sets mode, ruleset and map for the next round and tells the peers.
    pub fn set_mode(
        &mut self,
        game_mode: GameMode,
        turn_battle_mode: TurnBattleMode,
        map: u32,
    ) -> Result<()> {
        let ctx = self.host_ctx_mut()?;
        ctx.game_mode = game_mode;
        ctx.turn_battle_mode = turn_battle_mode;
        ctx.selected_map = map;
        if ctx.state == SessionState::ModeSelect {
            self.transition(SessionState::Lobby)?;
        }
        self.send(&GameMessage::ModeChange {
            game_mode,
            turn_battle_mode,
            map,
        });
        Ok(())
    }

    /// Starts the selected mode: turn battles go through ReadyUp, real-time
    /// rounds go straight to the countdown.
    pub fn start_game(&mut self, now_ms: u64) -> Result<()> {
        let ctx = self.host_ctx_mut()?;
        if ctx.state != SessionState::Lobby {
            return Err(SessionError::InvalidTransition {
                from: ctx.state,
                to: SessionState::Countdown,
            });
        }
        check_player_count(ctx)?;

        let (game_mode, turn_battle_mode, map) =
            (ctx.game_mode, ctx.turn_battle_mode, ctx.selected_map);
        let phase = match game_mode {
            GameMode::TurnBattle => StartPhase::ReadyUp,
            GameMode::RealTime => StartPhase::Countdown,
        };
        self.send(&GameMessage::StartGame {
            game_mode,
            turn_battle_mode,
            map,
            phase,
        });

        match phase {
            StartPhase::ReadyUp => self.enter_ready_up(Origin::Local),
            StartPhase::Countdown => self.enter_countdown(now_ms, Origin::Local, true),
        }
    }

    /// Starts a new real-time round from the game-over screen.
    pub fn restart(&mut self, now_ms: u64) -> Result<()> {
        let ctx = self.host_ctx_mut()?;
        if ctx.state != SessionState::GameOver {
            return Err(SessionError::InvalidTransition {
                from: ctx.state,
                to: SessionState::Countdown,
            });
        }
        check_player_count(ctx)?;

        self.send(&GameMessage::RestartGame);
        self.enter_countdown(now_ms, Origin::Local, true)
    }

    pub fn set_ready(&mut self, ready: bool, now_ms: u64) -> Result<()> {
        let ctx = self.ctx_mut()?;
        if !matches!(ctx.state, SessionState::Lobby | SessionState::ReadyUp) {
            return Err(SessionError::InvalidTransition {
                from: ctx.state,
                to: SessionState::ReadyUp,
            });
        }
        if let Some(slot) = ctx.local_slot_mut() {
            slot.ready = ready;
        }

        self.send(&GameMessage::Ready { ready });
        if self.is_host() {
            self.broadcast_roster();
            self.check_ready_up(now_ms);
        }
        Ok(())
    }

    /// Host only: abandons ReadyUp and sends everyone back to the lobby.
    pub fn cancel_ready(&mut self) -> Result<()> {
        self.host_ctx_mut()?;
        self.transition(SessionState::Lobby)?;
        self.clear_ready_flags();
        self.send(&GameMessage::CancelReady);
        Ok(())
    }

    pub fn open_chat(&mut self) -> Result<()> {
        self.transition(SessionState::Chatting)
    }

    pub fn open_nick(&mut self) -> Result<()> {
        self.transition(SessionState::ChangingNick)
    }

    /// Closes an open overlay, returning to the state it was opened from.
    pub fn close_overlay(&mut self) -> Result<()> {
        let ctx = self.ctx_mut()?;
        let Some(previous) = ctx.previous_state.filter(|_| ctx.state.is_overlay()) else {
            return Err(SessionError::InvalidTransition {
                from: ctx.state,
                to: ctx.state,
            });
        };
        self.transition(previous)?;
        if let Some(ctx) = self.context.as_mut() {
            ctx.previous_state = None;
        }
        Ok(())
    }

    /// Sends a chat line and closes the chat overlay.
    pub fn send_chat(&mut self, text: &str) -> Result<()> {
        let name = self.player_name.clone();
        let ctx = self.ctx_mut()?;
        if ctx.state != SessionState::Chatting {
            return Err(SessionError::InvalidTransition {
                from: ctx.state,
                to: SessionState::Chatting,
            });
        }

        let text = text.trim();
        if !text.is_empty() {
            ctx.chat.push(&name, text);
            self.send(&GameMessage::Chat {
                name,
                text: text.to_string(),
            });
        }
        self.close_overlay()
    }

    /// Renames the local player and closes the nickname overlay.
    pub fn change_nick(&mut self, name: &str) -> Result<()> {
        let name = sanitize_name(name).ok_or(SessionError::InvalidName)?;
        let ctx = self.ctx_mut()?;
        if ctx.state != SessionState::ChangingNick {
            return Err(SessionError::InvalidTransition {
                from: ctx.state,
                to: SessionState::ChangingNick,
            });
        }
        if let Some(slot) = ctx.local_slot_mut() {
            slot.name = name.clone();
        }
        self.player_name = name.clone();

        self.send(&GameMessage::NickChange { name });
        if self.is_host() {
            self.broadcast_roster();
        }
        self.close_overlay()
    }

    /// Host only: leaves the results screen for the lobby, taking everyone.
    pub fn return_to_lobby(&mut self) -> Result<()> {
        self.host_ctx_mut()?;
        self.transition(SessionState::Lobby)?;
        if let Some(ctx) = self.context.as_mut() {
            ctx.reset_for_lobby();
        }
        self.turn.reset();
        self.send(&GameMessage::ReturnToLobby);
        self.broadcast_roster();
        Ok(())
    }

    /// Requests a turn for the local snake.
    ///
    /// In a real-time round the host applies it directly and a client sends
    /// it to the host after checking the same reversal rule. In a turn battle
    /// it goes to the solo engine.
    pub fn queue_direction(&mut self, direction: Direction) -> bool {
        let Some(ctx) = self.context.as_mut() else {
            return false;
        };
        match ctx.state {
            SessionState::TurnPlaying => self.turn.queue_direction(&mut self.engine, direction),
            SessionState::Playing => {
                let is_host = ctx.is_host;
                let Some(slot) = ctx.local_slot_mut().filter(|slot| slot.alive) else {
                    return false;
                };
                if direction == slot.snake.direction.opposite() {
                    return false;
                }
                if is_host {
                    return slot.snake.queue_direction(direction);
                }
                match sync::send_direction(&mut self.transport, direction) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Failed to send direction: {}", e);
                        false
                    }
                }
            }
            _ => false,
        }
    }

    // Frame loop

    /// Runs one frame: delivers pending transport events, then advances
    /// countdowns, the host simulation and the turn controller.
    pub fn frame(&mut self, now_ms: u64) {
        self.pump(now_ms);
        if self.context.is_none() {
            return;
        }
        // Readiness or completion may have landed while an overlay was open.
        self.check_ready_up(now_ms);
        self.check_turn_completion();
        self.update_countdown(now_ms);
        self.update_simulation(now_ms);
        self.update_turn(now_ms);
    }

    fn pump(&mut self, now_ms: u64) {
        let mut events = Vec::new();
        self.transport.poll(&mut |event| events.push(event));

        if let Some(queue) = self.queue.as_mut() {
            for event in events {
                let (kind, payload, sender) = router::to_envelope(event);
                queue.push(&kind, payload, &sender, now_ms);
            }
            while let Some(envelope) = self.queue.as_mut().and_then(MessageQueue::pop) {
                router::dispatch_envelope(self, envelope, now_ms);
            }
        } else {
            for event in events {
                router::dispatch(self, event, now_ms);
            }
        }
    }

    fn update_countdown(&mut self, now_ms: u64) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if ctx.state != SessionState::Countdown {
            return;
        }
        match ctx.countdown_deadline_ms {
            Some(deadline) if now_ms >= deadline => ctx.countdown_deadline_ms = None,
            _ => return,
        }

        let target = match ctx.game_mode {
            GameMode::RealTime => SessionState::Playing,
            GameMode::TurnBattle => SessionState::TurnPlaying,
        };
        if self.transition(target).is_err() {
            return;
        }
        if target == SessionState::TurnPlaying {
            self.begin_attempt(now_ms);
        }
    }

    fn update_simulation(&mut self, now_ms: u64) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        let outcome = self.simulation.tick(ctx, now_ms, &self.config);
        if outcome.broadcast {
            self.broadcast_snapshot();
        }
        if outcome.game_over {
            info!("State {:?} -> {:?}", SessionState::Playing, SessionState::GameOver);
        }
    }

    fn update_turn(&mut self, now_ms: u64) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if ctx.state != SessionState::TurnPlaying {
            return;
        }

        match self.turn.step(ctx, &mut self.engine, now_ms) {
            TurnStep::Idle => {}
            TurnStep::NextAttempt(_) => {
                // The next attempt gets its own countdown, without a fresh round.
                if let Err(e) = self.enter_countdown(now_ms, Origin::Local, false) {
                    warn!("Could not count down to the next attempt: {}", e);
                }
            }
            TurnStep::Finished(report) => {
                self.send(&GameMessage::TurnResults(report));
                if self.transition(SessionState::TurnWaiting).is_ok() && self.is_host() {
                    self.check_turn_completion();
                }
            }
        }
    }

    fn begin_attempt(&mut self, now_ms: u64) {
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        let player_index = ctx.local_index();
        if let (Some(attempt), Some(player_index)) = (
            self.turn.begin_attempt(ctx, &mut self.engine, now_ms),
            player_index,
        ) {
            self.send(&GameMessage::StartAttempt {
                player_index,
                attempt,
            });
        }
    }

    // Shared transitions with side effects, used by local actions and the router

    pub(crate) fn enter_countdown(
        &mut self,
        now_ms: u64,
        origin: Origin,
        fresh_round: bool,
    ) -> Result<()> {
        self.change_state(SessionState::Countdown, origin)?;
        if let Some(ctx) = self.context.as_mut() {
            if fresh_round {
                ctx.prepare_round(&self.config);
            }
            ctx.countdown_deadline_ms = Some(now_ms + self.config.countdown_ms);
        }
        if fresh_round {
            self.simulation.reset_round();
            self.turn.reset();
        }
        Ok(())
    }

    pub(crate) fn enter_ready_up(&mut self, origin: Origin) -> Result<()> {
        self.change_state(SessionState::ReadyUp, origin)?;
        self.clear_ready_flags();
        Ok(())
    }

    pub(crate) fn clear_ready_flags(&mut self) {
        if let Some(ctx) = self.context.as_mut() {
            for slot in ctx.players.iter_mut().filter(|p| p.joined) {
                slot.ready = false;
            }
        }
    }

    pub(crate) fn broadcast_roster(&mut self) {
        let Some(ctx) = self.context.as_ref().filter(|ctx| ctx.is_host) else {
            return;
        };
        let roster = roster::entries(ctx);
        self.send(&GameMessage::PlayerSync { roster });
    }

    pub(crate) fn broadcast_snapshot(&mut self) {
        let Some(ctx) = self.context.as_ref().filter(|ctx| ctx.is_host) else {
            return;
        };
        let snapshot = codec::serialize(ctx);
        self.send(&GameMessage::GameState(snapshot));
    }

    /// Host only: issues the countdown once every player in ReadyUp is ready.
    pub(crate) fn check_ready_up(&mut self, now_ms: u64) {
        let Some(ctx) = self.context.as_ref() else {
            return;
        };
        if !ctx.is_host || ctx.state != SessionState::ReadyUp || !ctx.all_ready() {
            return;
        }

        info!("All {} players ready", ctx.joined_count());
        let message = GameMessage::StartGame {
            game_mode: ctx.game_mode,
            turn_battle_mode: ctx.turn_battle_mode,
            map: ctx.selected_map,
            phase: StartPhase::Countdown,
        };
        self.send(&message);
        if let Err(e) = self.enter_countdown(now_ms, Origin::Local, true) {
            warn!("Could not start countdown: {}", e);
        }
    }

    /// Host only: publishes the ranking once every joined player is done.
    pub(crate) fn check_turn_completion(&mut self) {
        let tie_break = self.config.tie_break;
        let Some(ctx) = self.context.as_mut() else {
            return;
        };
        if !ctx.is_host || ctx.state != SessionState::TurnWaiting || !results::all_finished(ctx) {
            return;
        }

        let ranking = results::rank(ctx);
        let reports = results::reports(ctx, &ranking);
        ctx.winner = results::winner(ctx, tie_break);
        ctx.results = ranking.clone();
        match ctx.winner {
            Some(index) => info!("Turn battle won by slot {} ({})", index, ctx.players[index].name),
            None => info!("Turn battle ended in a draw"),
        }

        self.send(&GameMessage::ShowResults { ranking, reports });
        if let Err(e) = self.transition(SessionState::TurnResults) {
            warn!("Could not show results: {}", e);
        }
    }
}

/// Real-time rounds are strictly 1v1; turn battles need somebody to play.
fn check_player_count(ctx: &SessionContext) -> Result<()> {
    let joined = ctx.joined_count();
    match ctx.game_mode {
        GameMode::RealTime if joined != 2 => Err(SessionError::InvalidPlayerCount { needed: 2, joined }),
        GameMode::TurnBattle if joined == 0 => {
            Err(SessionError::InvalidPlayerCount { needed: 1, joined })
        }
        _ => Ok(()),
    }
}
