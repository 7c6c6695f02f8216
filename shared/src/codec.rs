//! Snapshot codec: the full Session Context as a structured document.
//!
//! Snapshots always carry complete snake bodies rather than deltas, so any
//! single snapshot that arrives is enough to rebuild the board.
//!
//! Document shape (the `game_state` payload):
//!
//! ```text
//! players: [{joined, alive, ready, score, clientId, name, comboCount,
//!            comboMultiplier, snake: {length, direction, segments: [{x,y}]}}]
//! food: [{x,y}, {x,y}]
//! mpState, current_speed, selected_background, turn_battle_mode, game_mode
//! ```

use serde_json::{json, Map, Value};

use crate::document::{array, boolean, field, float, int, string, uint};
use crate::model::{GameMode, PlayerSlot, SessionContext, SessionState, TurnBattleMode};
use crate::snake::{Combo, Direction, Position, Snake};
use crate::FOOD_COUNT;

pub fn position_to_document(position: Position) -> Value {
    json!({"x": position.x, "y": position.y})
}

pub fn position_from_document(doc: &Value) -> Position {
    Position::new(int(doc, "x") as i32, int(doc, "y") as i32)
}

fn snake_to_document(snake: &Snake) -> Value {
    let segments: Vec<Value> = snake
        .segments
        .iter()
        .map(|p| position_to_document(*p))
        .collect();
    json!({
        "length": snake.length,
        "direction": snake.direction.code(),
        "segments": segments,
    })
}

fn snake_from_document(doc: &Value, alive: bool) -> Snake {
    let segments = array(doc, "segments")
        .iter()
        .map(position_from_document)
        .collect::<std::collections::VecDeque<_>>();
    let length = match uint(doc, "length") as usize {
        0 => segments.len(),
        n => n,
    };
    Snake {
        segments,
        length,
        direction: Direction::from_code(int(doc, "direction")),
        next_direction: None,
        alive,
    }
}

fn player_to_document(slot: &PlayerSlot) -> Value {
    if !slot.joined {
        return json!({"joined": false});
    }
    json!({
        "joined": true,
        "alive": slot.alive,
        "ready": slot.ready,
        "score": slot.score,
        "clientId": slot.client_id,
        "name": slot.name,
        "comboCount": slot.combo.count,
        "comboMultiplier": slot.combo.multiplier,
        "snake": snake_to_document(&slot.snake),
    })
}

fn apply_player(slot: &mut PlayerSlot, doc: &Value) {
    if !boolean(doc, "joined") {
        slot.clear();
        return;
    }

    let client_id = string(doc, "clientId");
    if !slot.joined || slot.client_id != client_id {
        // A different participant now holds this slot.
        slot.clear();
        slot.joined = true;
        slot.client_id = client_id;
    }

    slot.name = string(doc, "name");
    slot.ready = boolean(doc, "ready");
    slot.alive = boolean(doc, "alive");
    slot.score = uint(doc, "score") as u32;
    slot.combo = Combo {
        count: uint(doc, "comboCount") as u32,
        multiplier: float(doc, "comboMultiplier") as f32,
        last_food_at_ms: None,
    };
    slot.snake = snake_from_document(field(doc, "snake"), slot.alive);
}

/// Serializes every slot, in slot order, plus board and session fields.
pub fn serialize(ctx: &SessionContext) -> Value {
    let players: Vec<Value> = ctx.players.iter().map(player_to_document).collect();
    let food: Vec<Value> = ctx.food.iter().map(|p| position_to_document(*p)).collect();

    let mut doc = Map::new();
    doc.insert("players".into(), Value::Array(players));
    doc.insert("food".into(), Value::Array(food));
    doc.insert("mpState".into(), json!(ctx.state.code()));
    doc.insert("current_speed".into(), json!(ctx.current_speed_ms));
    doc.insert("selected_background".into(), json!(ctx.selected_map));
    doc.insert(
        "turn_battle_mode".into(),
        json!(ctx.turn_battle_mode.code()),
    );
    doc.insert("game_mode".into(), json!(ctx.game_mode.code()));
    Value::Object(doc)
}

/// Overwrites the mirrored context with a snapshot and returns the sender's
/// session state.
///
/// The state itself is not written: lifecycle changes go through the state
/// machine so that only permitted transitions are adopted.
pub fn deserialize_into(ctx: &mut SessionContext, doc: &Value) -> SessionState {
    let players = array(doc, "players");
    for (index, slot) in ctx.players.iter_mut().enumerate() {
        match players.get(index) {
            Some(entry) => apply_player(slot, entry),
            None => slot.clear(),
        }
    }

    let food = array(doc, "food");
    for index in 0..FOOD_COUNT {
        ctx.food[index] = food
            .get(index)
            .map(position_from_document)
            .unwrap_or_default();
    }

    ctx.current_speed_ms = uint(doc, "current_speed");
    ctx.selected_map = uint(doc, "selected_background") as u32;
    ctx.turn_battle_mode = TurnBattleMode::from_code(int(doc, "turn_battle_mode"));
    ctx.game_mode = GameMode::from_code(int(doc, "game_mode"));
    ctx.recompute_local_index();

    SessionState::from_code(int(doc, "mpState"))
}
