//! Turn-battle aggregation on the host

use log::{info, warn};
use shared::{SessionContext, TieBreak, TurnReport, ATTEMPTS_PER_PLAYER};

/// True once every joined player has finished all attempts
///
/// Recomputed from the slots on every call, so a player leaving mid-wait is
/// accounted for. With nobody joined this is vacuously true.
pub fn all_finished(ctx: &SessionContext) -> bool {
    ctx.players
        .iter()
        .filter(|slot| slot.joined)
        .all(|slot| slot.turn_finished)
}

/// Joined slots ordered by best score, highest first
///
/// The sort is stable: equal scores keep slot order.
pub fn rank(ctx: &SessionContext) -> Vec<usize> {
    let mut ranking = ctx.joined_indices();
    ranking.sort_by(|a, b| ctx.players[*b].best_score.cmp(&ctx.players[*a].best_score));
    ranking
}

pub fn winner(ctx: &SessionContext, tie_break: TieBreak) -> Option<usize> {
    let ranking = rank(ctx);
    let first = *ranking.first()?;
    let tied = ranking
        .get(1)
        .is_some_and(|second| ctx.players[*second].best_score == ctx.players[first].best_score);

    match (tied, tie_break) {
        (true, TieBreak::Draw) => None,
        _ => Some(first),
    }
}

/// Stores a player's finished attempt record in its slot
///
/// The best score is recomputed from the attempts rather than taken from the
/// report. Returns false if the slot is not joined.
pub fn apply_report(ctx: &mut SessionContext, index: usize, report: &TurnReport) -> bool {
    let Some(slot) = ctx.players.get_mut(index).filter(|slot| slot.joined) else {
        warn!("Turn results for empty slot {}", index);
        return false;
    };

    slot.reset_turn_battle();
    for attempt in report.attempts.iter().take(ATTEMPTS_PER_PLAYER) {
        slot.record_attempt(*attempt);
    }
    slot.turn_finished = true;

    if slot.best_score != report.best_score {
        warn!(
            "Slot {} reported best score {} but attempts give {}",
            index, report.best_score, slot.best_score
        );
    }
    info!("Slot {} finished with best score {}", index, slot.best_score);
    true
}

/// Builds the reports broadcast with `show_results`, in ranking order
pub fn reports(ctx: &SessionContext, ranking: &[usize]) -> Vec<TurnReport> {
    ranking
        .iter()
        .map(|index| {
            let slot = &ctx.players[*index];
            TurnReport {
                player_index: *index,
                best_score: slot.best_score,
                attempts: slot.attempts,
            }
        })
        .collect()
}
