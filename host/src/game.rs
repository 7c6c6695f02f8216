//! Authoritative real-time simulation run by the hosting participant
//!
//! Two cadences run off the same frame clock:
//! - Broadcast: every `broadcast_interval_ms`, whether or not anything moved
//! - Movement: every `current_speed_ms`, which shrinks as food is eaten
//!
//! Collisions are judged against the bodies as they stood before the tick,
//! so the order in which slots are processed never decides a collision.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Position, SessionConfig, SessionContext, SessionState, FOOD_COUNT};

/// Random placement attempts before falling back to a full board scan
const RANDOM_FOOD_ATTEMPTS: usize = 64;

/// What one call to `HostSimulation::tick` did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// A movement tick ran
    pub moved: bool,
    /// The caller should serialize and send the context now
    pub broadcast: bool,
    /// The round ended on this tick
    pub game_over: bool,
}

/// Host-side cadence clocks and the food placement generator
#[derive(Debug)]
pub struct HostSimulation {
    last_broadcast_ms: Option<u64>,
    last_move_ms: Option<u64>,
    rng: StdRng,
}

impl HostSimulation {
    pub fn new(seed: u64) -> Self {
        Self {
            last_broadcast_ms: None,
            last_move_ms: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Re-arms both cadences for a fresh round
    ///
    /// The first tick after a reset broadcasts immediately and starts the
    /// movement clock without moving.
    pub fn reset_round(&mut self) {
        self.last_broadcast_ms = None;
        self.last_move_ms = None;
    }

    /// Advances the simulation for one frame
    ///
    /// Does nothing unless the context is hosting a running real-time round.
    /// When the round ends the context moves to `GameOver` and a broadcast is
    /// forced so clients see the final board without waiting for the cadence.
    pub fn tick(
        &mut self,
        ctx: &mut SessionContext,
        now_ms: u64,
        config: &SessionConfig,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        if !ctx.is_host || ctx.state != SessionState::Playing {
            return outcome;
        }

        match self.last_move_ms {
            None => self.last_move_ms = Some(now_ms),
            Some(last) if now_ms.saturating_sub(last) >= ctx.current_speed_ms => {
                self.last_move_ms = Some(now_ms);
                self.step_movement(ctx, now_ms, config);
                outcome.moved = true;
            }
            Some(_) => {}
        }

        let broadcast_due = self
            .last_broadcast_ms
            .map_or(true, |last| now_ms.saturating_sub(last) >= config.broadcast_interval_ms);
        if broadcast_due {
            self.last_broadcast_ms = Some(now_ms);
            outcome.broadcast = true;
        }

        if outcome.moved && ctx.alive_count() <= 1 {
            finish_round(ctx);
            self.last_broadcast_ms = Some(now_ms);
            outcome.broadcast = true;
            outcome.game_over = true;
        }

        outcome
    }

    /// Runs one movement tick over every joined, living snake
    pub fn step_movement(&mut self, ctx: &mut SessionContext, now_ms: u64, config: &SessionConfig) {
        let bodies: Vec<Vec<Position>> = ctx
            .players
            .iter()
            .filter(|slot| slot.joined)
            .map(|slot| slot.snake.segments.iter().copied().collect())
            .collect();

        for slot in ctx.players.iter_mut().filter(|p| p.joined) {
            slot.combo.expire(now_ms, config.combo_timeout_ms);
        }

        for index in 0..ctx.players.len() {
            let slot = &mut ctx.players[index];
            if !slot.joined || !slot.alive {
                continue;
            }
            let Some(next) = slot.snake.next_head() else {
                continue;
            };

            let blocked = !next.in_bounds(config.grid_width, config.grid_height)
                || bodies.iter().any(|body| body.contains(&next));
            if blocked {
                slot.alive = false;
                slot.snake.alive = false;
                info!("Slot {} crashed at ({}, {})", index, next.x, next.y);
                continue;
            }

            let food_index = ctx.food.iter().position(|food| *food == next);
            let slot = &mut ctx.players[index];
            slot.snake.advance(food_index.is_some());

            if let Some(food_index) = food_index {
                let points = slot.combo.register_food(now_ms, config.combo_timeout_ms);
                slot.score += points;
                debug!(
                    "Slot {} ate food {} for {} points (combo {})",
                    index, food_index, points, slot.combo.count
                );
                ctx.current_speed_ms = config.faster(ctx.current_speed_ms);
                self.respawn_food(ctx, food_index, config);
            }
        }
    }

    /// Moves a food item to a random cell held by no snake and no other food
    ///
    /// Leaves the item in place if the board has no free cell.
    pub fn respawn_food(&mut self, ctx: &mut SessionContext, index: usize, config: &SessionConfig) {
        if index >= FOOD_COUNT || config.grid_width <= 0 || config.grid_height <= 0 {
            return;
        }

        let is_free = |ctx: &SessionContext, cell: Position| {
            let on_snake = ctx
                .players
                .iter()
                .any(|slot| slot.joined && slot.snake.occupies(cell));
            let on_food = ctx
                .food
                .iter()
                .enumerate()
                .any(|(other, food)| other != index && *food == cell);
            !on_snake && !on_food
        };

        for _ in 0..RANDOM_FOOD_ATTEMPTS {
            let cell = Position::new(
                self.rng.gen_range(0..config.grid_width),
                self.rng.gen_range(0..config.grid_height),
            );
            if is_free(ctx, cell) {
                ctx.food[index] = cell;
                return;
            }
        }

        let scan = (0..config.grid_height)
            .flat_map(|y| (0..config.grid_width).map(move |x| Position::new(x, y)))
            .find(|cell| is_free(ctx, *cell));
        if let Some(cell) = scan {
            ctx.food[index] = cell;
        }
    }
}

/// Moves the context to `GameOver` and records the survivor, if any
fn finish_round(ctx: &mut SessionContext) {
    let survivor = ctx
        .players
        .iter()
        .position(|slot| slot.joined && slot.alive);

    ctx.state = SessionState::GameOver;
    ctx.results = survivor.into_iter().collect();
    ctx.winner = survivor;

    match survivor {
        Some(index) => info!(
            "Game over, slot {} ({}) wins with {} points",
            index, ctx.players[index].name, ctx.players[index].score
        ),
        None => info!("Game over, no survivors"),
    }
}
