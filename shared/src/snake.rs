//! Grid primitives, the snake body and combo scoring.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::{BASE_POINTS, INITIAL_SNAKE_LENGTH};

/// A cell on the board. Origin is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, direction: Direction) -> Position {
        let (dx, dy) = direction.delta();
        Position {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn in_bounds(&self, width: i32, height: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.x < width && self.y < height
    }
}

/// Facing of a snake. The discriminant is the wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Up = 0,
    Down = 1,
    Left = 2,
    Right = 3,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    /// Unknown codes fall back to `Up`, the zero value.
    pub fn from_code(code: i64) -> Direction {
        match code {
            1 => Direction::Down,
            2 => Direction::Left,
            3 => Direction::Right,
            _ => Direction::Up,
        }
    }
}

/// A snake body, head first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snake {
    pub segments: VecDeque<Position>,
    pub length: usize,
    pub direction: Direction,
    /// Direction requested since the last move, applied on the next move.
    pub next_direction: Option<Direction>,
    pub alive: bool,
}

impl Snake {
    /// Lays out a fresh snake with its head at `head`, body trailing behind it.
    pub fn spawn(head: Position, direction: Direction) -> Self {
        Self::spawn_with_length(head, direction, INITIAL_SNAKE_LENGTH)
    }

    pub fn spawn_with_length(head: Position, direction: Direction, length: usize) -> Self {
        let behind = direction.opposite();
        let mut segments = VecDeque::with_capacity(length);
        let mut cell = head;
        for _ in 0..length {
            segments.push_back(cell);
            cell = cell.offset(behind);
        }

        Self {
            segments,
            length,
            direction,
            next_direction: None,
            alive: true,
        }
    }

    pub fn head(&self) -> Option<Position> {
        self.segments.front().copied()
    }

    /// Requests a turn. The exact reverse of the current facing is refused.
    pub fn queue_direction(&mut self, direction: Direction) -> bool {
        if direction == self.direction.opposite() {
            return false;
        }
        self.next_direction = Some(direction);
        true
    }

    pub fn heading(&self) -> Direction {
        self.next_direction.unwrap_or(self.direction)
    }

    pub fn next_head(&self) -> Option<Position> {
        self.head().map(|head| head.offset(self.heading()))
    }

    /// Moves one cell along the heading. When `grow` is set the tail stays.
    pub fn advance(&mut self, grow: bool) {
        let Some(new_head) = self.next_head() else {
            return;
        };
        self.direction = self.heading();
        self.next_direction = None;
        self.segments.push_front(new_head);
        if grow {
            self.length += 1;
        }
        while self.segments.len() > self.length {
            self.segments.pop_back();
        }
    }

    pub fn occupies(&self, position: Position) -> bool {
        self.segments.contains(&position)
    }
}

/// Combo count thresholds and the multiplier each one unlocks, highest first.
const COMBO_TIERS: [(u32, f32); 4] = [(12, 5.0), (8, 3.0), (5, 2.0), (3, 1.5)];

/// Count from which a combo is shown to players.
pub const COMBO_VISIBLE_FROM: u32 = 2;

pub fn combo_multiplier(count: u32) -> f32 {
    COMBO_TIERS
        .iter()
        .find(|(threshold, _)| count >= *threshold)
        .map(|(_, multiplier)| *multiplier)
        .unwrap_or(1.0)
}

/// Consecutive food pickups within the combo timeout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combo {
    pub count: u32,
    pub multiplier: f32,
    pub last_food_at_ms: Option<u64>,
}

impl Default for Combo {
    fn default() -> Self {
        Self {
            count: 0,
            multiplier: 1.0,
            last_food_at_ms: None,
        }
    }
}

impl Combo {
    /// Registers one food pickup and returns the points it is worth.
    pub fn register_food(&mut self, now_ms: u64, timeout_ms: u64) -> u32 {
        let chained = self
            .last_food_at_ms
            .is_some_and(|last| now_ms.saturating_sub(last) <= timeout_ms);
        self.count = if chained { self.count + 1 } else { 1 };
        self.multiplier = combo_multiplier(self.count);
        self.last_food_at_ms = Some(now_ms);
        (BASE_POINTS as f32 * self.multiplier).round() as u32
    }

    /// Drops the combo once the timeout has passed. Returns true if it reset.
    pub fn expire(&mut self, now_ms: u64, timeout_ms: u64) -> bool {
        match self.last_food_at_ms {
            Some(last) if now_ms.saturating_sub(last) > timeout_ms => {
                *self = Combo::default();
                true
            }
            _ => false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.count >= COMBO_VISIBLE_FROM
    }
}
