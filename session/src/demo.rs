//! Loopback match between a host and scripted bots.
//!
//! Everything runs in one process on a `LoopbackHub`. The host and every bot
//! are full `SessionMachine`s; the bots browse, join, ready up and steer with
//! a seeded generator, so a given seed always plays the same match.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::loopback::{LoopbackHub, LoopbackTransport};
use shared::naming::namespace_id;
use shared::{
    Direction, GameMode, SessionConfig, SessionContext, SessionState, TransportError,
    TurnBattleMode,
};

use crate::error::{Result, SessionError};
use crate::machine::SessionMachine;
use crate::turn::{RunSummary, ScriptedEngine};

pub type DemoMachine = SessionMachine<LoopbackTransport, ScriptedEngine>;

const DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub room: String,
    pub host_name: String,
    pub bots: usize,
    pub mode: GameMode,
    pub ruleset: TurnBattleMode,
    pub map: u32,
    pub seed: u64,
    pub config: SessionConfig,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            room: "Den".to_string(),
            host_name: "Host".to_string(),
            bots: 1,
            mode: GameMode::RealTime,
            ruleset: TurnBattleMode::Classic,
            map: 0,
            seed: 7,
            config: SessionConfig::default(),
        }
    }
}

/// How a finished match ended, as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoOutcome {
    pub state: SessionState,
    pub winner: Option<String>,
    /// Joined players with their round score, best first.
    pub standings: Vec<(String, u32)>,
}

pub struct Demo {
    // Keeps the sessions alive for as long as the machines use them.
    _hub: LoopbackHub,
    host: DemoMachine,
    bots: Vec<DemoMachine>,
    rng: StdRng,
    started: bool,
    /// Bots decide at most once per move.
    next_think_ms: u64,
}

impl Demo {
    /// Hosts the room and joins every bot through the session browser.
    pub fn new(options: DemoOptions) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(options.seed);
        let cap = options.config.player_cap();
        let bots = match options.mode {
            GameMode::RealTime if options.bots != 1 => {
                warn!("Real-time rounds are 1v1, using one bot instead of {}", options.bots);
                1
            }
            GameMode::RealTime => 1,
            GameMode::TurnBattle => options.bots.min(cap - 1),
        };

        let hub = LoopbackHub::new();
        let namespace = namespace_id(&options.config.team_tag);

        let mut host = SessionMachine::new(
            options.config.clone(),
            hub.connect(&namespace),
            scripted_engine(&mut rng),
        )
        .with_seed(rng.gen());
        host.enter_name(&options.host_name)?;
        host.host_game(&options.room, options.mode, options.map)?;
        host.set_mode(options.mode, options.ruleset, options.map)?;
        let session_id = host
            .context()
            .map(|ctx| ctx.session_id.clone())
            .unwrap_or_default();
        info!("Hosting {:?} as {}", options.room, session_id);

        let mut joined = Vec::with_capacity(bots);
        for number in 1..=bots {
            let mut bot = SessionMachine::new(
                options.config.clone(),
                hub.connect(&namespace),
                scripted_engine(&mut rng),
            );
            bot.enter_name(&format!("Bot {}", number))?;
            bot.open_browser()?;
            let listed = bot.refresh_browser()?.iter().any(|s| s.id == session_id);
            if !listed {
                return Err(SessionError::Transport(TransportError::SessionNotFound(
                    session_id,
                )));
            }
            bot.join_game(&session_id)?;
            debug!("Bot {} joined", number);
            joined.push(bot);
        }

        Ok(Self {
            _hub: hub,
            host,
            bots: joined,
            rng,
            started: false,
            next_think_ms: 0,
        })
    }

    pub fn host(&self) -> &DemoMachine {
        &self.host
    }

    pub fn bots(&self) -> &[DemoMachine] {
        &self.bots
    }

    /// Runs one frame on every machine and plays the bots' part.
    /// Returns the outcome once the host reaches a results screen.
    pub fn step(&mut self, now_ms: u64) -> Option<DemoOutcome> {
        self.host.frame(now_ms);
        for bot in &mut self.bots {
            bot.frame(now_ms);
        }

        if !self.started && self.everyone_in_lobby() {
            match self.host.start_game(now_ms) {
                Ok(()) => self.started = true,
                Err(e) => warn!("Could not start: {}", e),
            }
        }

        let think = now_ms >= self.next_think_ms;
        if think {
            self.next_think_ms = now_ms + self.host.config().base_speed_ms;
        }

        for machine in std::iter::once(&mut self.host).chain(self.bots.iter_mut()) {
            match machine.state() {
                SessionState::ReadyUp => {
                    let ready = machine
                        .context()
                        .and_then(SessionContext::local_slot)
                        .is_some_and(|slot| slot.ready);
                    if !ready {
                        let _ = machine.set_ready(true, now_ms);
                    }
                }
                SessionState::Playing if think => {
                    let turn = machine
                        .context()
                        .and_then(|ctx| steer(ctx, machine.config(), &mut self.rng));
                    if let Some(direction) = turn {
                        machine.queue_direction(direction);
                    }
                }
                _ => {}
            }
        }

        self.outcome()
    }

    fn everyone_in_lobby(&self) -> bool {
        let seated = self
            .host
            .context()
            .is_some_and(|ctx| ctx.joined_count() == self.bots.len() + 1);
        seated
            && self.host.state() == SessionState::Lobby
            && self.bots.iter().all(|bot| bot.state() == SessionState::Lobby)
    }

    pub fn outcome(&self) -> Option<DemoOutcome> {
        let ctx = self.host.context()?;
        let state = ctx.state;
        if !matches!(state, SessionState::GameOver | SessionState::TurnResults) {
            return None;
        }

        let mut standings: Vec<(String, u32)> = ctx
            .players
            .iter()
            .filter(|slot| slot.joined)
            .map(|slot| {
                let score = match ctx.game_mode {
                    GameMode::RealTime => slot.score,
                    GameMode::TurnBattle => slot.best_score,
                };
                (slot.name.clone(), score)
            })
            .collect();
        standings.sort_by(|a, b| b.1.cmp(&a.1));

        Some(DemoOutcome {
            state,
            winner: ctx.winner.map(|index| ctx.players[index].name.clone()),
            standings,
        })
    }
}

/// Three runs of random length and score for a turn battle.
fn scripted_engine(rng: &mut StdRng) -> ScriptedEngine {
    ScriptedEngine::new((0..3).map(|_| {
        let eaten = rng.gen_range(0..12u32);
        RunSummary {
            score: eaten * 10,
            length: 3 + eaten,
            survival_ms: rng.gen_range(800..4_000),
        }
    }))
}

/// Picks a turn for the local snake. Mostly keeps going while the cell
/// ahead is free and turns toward a free cell when it is not.
fn steer(ctx: &SessionContext, config: &SessionConfig, rng: &mut StdRng) -> Option<Direction> {
    let snake = &ctx.local_slot().filter(|slot| slot.alive)?.snake;
    let head = snake.head()?;
    let heading = snake.heading();

    let free = |direction: Direction| {
        let cell = head.offset(direction);
        cell.in_bounds(config.grid_width, config.grid_height)
            && !ctx
                .players
                .iter()
                .any(|slot| slot.joined && slot.snake.occupies(cell))
    };

    if free(heading) && !rng.gen_bool(0.08) {
        return None;
    }
    // Bots are not perfect.
    if rng.gen_bool(0.1) {
        return None;
    }
    let options: Vec<Direction> = DIRECTIONS
        .into_iter()
        .filter(|d| *d != heading && *d != snake.direction.opposite() && free(*d))
        .collect();
    if options.is_empty() {
        return None;
    }
    Some(options[rng.gen_range(0..options.len())])
}
