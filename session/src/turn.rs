//! Turn-battle controller.
//!
//! Each participant plays three solo runs on the single-player engine. The
//! engine owns movement and collisions; this module only starts runs,
//! records what they produced and says what should happen next.

use std::collections::VecDeque;

use log::{debug, info};
use shared::{
    Direction, SessionContext, TurnAttempt, TurnBattleMode, TurnReport, ATTEMPTS_PER_PLAYER,
};

/// Final numbers of one solo run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub score: u32,
    pub length: u32,
    pub survival_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoloStatus {
    Running,
    Finished(RunSummary),
}

/// The single-player engine a turn battle runs on.
pub trait SoloEngine {
    fn start(&mut self, ruleset: TurnBattleMode, map: u32, now_ms: u64);

    /// Same reversal rule as the real-time board.
    fn queue_direction(&mut self, direction: Direction) -> bool;

    fn step(&mut self, now_ms: u64) -> SoloStatus;
}

/// What the session should do after a controller step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStep {
    /// No run in progress, or the run goes on.
    Idle,
    /// A run ended and the given attempt is next.
    NextAttempt(usize),
    /// All attempts are in. The report goes to the host.
    Finished(TurnReport),
}

#[derive(Debug, Default)]
pub struct TurnBattle {
    running: bool,
}

impl TurnBattle {
    pub fn reset(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starts the local player's next run. Returns its attempt index, or
    /// `None` when the local player has no attempts left.
    pub fn begin_attempt<E: SoloEngine + ?Sized>(
        &mut self,
        ctx: &mut SessionContext,
        engine: &mut E,
        now_ms: u64,
    ) -> Option<usize> {
        let (ruleset, map) = (ctx.turn_battle_mode, ctx.selected_map);
        let slot = ctx.local_slot_mut()?;
        if slot.completed_attempts >= ATTEMPTS_PER_PLAYER {
            return None;
        }

        let attempt = slot.completed_attempts;
        slot.current_attempt = attempt;
        engine.start(ruleset, map, now_ms);
        self.running = true;

        info!("Attempt {} of {} started", attempt + 1, ATTEMPTS_PER_PLAYER);
        Some(attempt)
    }

    pub fn queue_direction<E: SoloEngine + ?Sized>(
        &self,
        engine: &mut E,
        direction: Direction,
    ) -> bool {
        self.running && engine.queue_direction(direction)
    }

    /// Advances the engine and records the run if it just ended.
    pub fn step<E: SoloEngine + ?Sized>(
        &mut self,
        ctx: &mut SessionContext,
        engine: &mut E,
        now_ms: u64,
    ) -> TurnStep {
        if !self.running {
            return TurnStep::Idle;
        }
        let SoloStatus::Finished(summary) = engine.step(now_ms) else {
            return TurnStep::Idle;
        };
        self.running = false;

        let local = ctx.local_index();
        let Some(slot) = ctx.local_slot_mut() else {
            return TurnStep::Idle;
        };
        slot.record_attempt(TurnAttempt {
            score: summary.score,
            length: summary.length,
            survival_ms: summary.survival_ms,
        });
        debug!(
            "Run ended: score {}, length {}, {} ms",
            summary.score, summary.length, summary.survival_ms
        );

        if slot.completed_attempts < ATTEMPTS_PER_PLAYER {
            return TurnStep::NextAttempt(slot.completed_attempts);
        }

        slot.turn_finished = true;
        info!("All attempts done, best score {}", slot.best_score);
        TurnStep::Finished(TurnReport {
            player_index: local.unwrap_or_default(),
            best_score: slot.best_score,
            attempts: slot.attempts,
        })
    }
}

/// Deterministic stand-in for the single-player engine.
///
/// Plays back queued run summaries: each run ends once its `survival_ms`
/// has elapsed. Runs beyond the script end immediately with zero score.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    script: VecDeque<RunSummary>,
    current: Option<RunSummary>,
    started_at_ms: u64,
    facing: Direction,
    pub starts: Vec<(TurnBattleMode, u32)>,
}

impl ScriptedEngine {
    pub fn new(runs: impl IntoIterator<Item = RunSummary>) -> Self {
        Self {
            script: runs.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl SoloEngine for ScriptedEngine {
    fn start(&mut self, ruleset: TurnBattleMode, map: u32, now_ms: u64) {
        self.current = Some(self.script.pop_front().unwrap_or_default());
        self.started_at_ms = now_ms;
        self.facing = Direction::Right;
        self.starts.push((ruleset, map));
    }

    fn queue_direction(&mut self, direction: Direction) -> bool {
        if self.current.is_none() || direction == self.facing.opposite() {
            return false;
        }
        self.facing = direction;
        true
    }

    fn step(&mut self, now_ms: u64) -> SoloStatus {
        match self.current {
            Some(run) if now_ms.saturating_sub(self.started_at_ms) >= run.survival_ms => {
                self.current = None;
                SoloStatus::Finished(run)
            }
            _ => SoloStatus::Running,
        }
    }
}
