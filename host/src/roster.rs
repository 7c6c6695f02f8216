//! Player slot management for the hosting participant
//!
//! This module maps transport-level membership onto the Session Context:
//! - Slot assignment when a client joins, bounded by the player cap
//! - Slot release when a client leaves or announces its departure
//! - Roster entries for the `player_sync` broadcast
//! - Re-validation of remote direction requests
//!
//! The host never trusts a client's claim about which slot it owns. Every
//! lookup goes through the sender's transport client id.

use log::{info, warn};
use shared::{Direction, RosterEntry, SessionContext, SessionState};

/// Result of validating a remote direction request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputVerdict {
    /// The direction was queued on the sender's snake
    Applied,
    /// Reversal, or the sender's snake is already dead
    Rejected,
    /// No slot belongs to the sender
    UnknownSender,
    /// Inputs only count while a real-time round is running
    NotPlaying,
}

/// Places a client in the first free slot
///
/// Returns the slot index, or None if the session is full or the client
/// already holds a slot. New slots get a placeholder name until the client
/// announces its own through `nick_change`.
pub fn assign(ctx: &mut SessionContext, client_id: &str) -> Option<usize> {
    if ctx.slot_by_client(client_id).is_some() {
        warn!("Client {} already holds a slot", client_id);
        return None;
    }

    let Some(index) = ctx.first_free_slot() else {
        warn!(
            "Session full ({} players), ignoring {}",
            ctx.max_players, client_id
        );
        return None;
    };

    let is_host = ctx.joined_count() == 0 && ctx.is_host && client_id == ctx.local_client_id;
    ctx.players[index].occupy(client_id, &format!("Player {}", index + 1), is_host);
    ctx.recompute_local_index();

    info!("Client {} assigned to slot {}", client_id, index);
    Some(index)
}

/// Clears the slot held by a client
///
/// Returns the index that was freed. Other slots keep their positions so
/// that indices already broadcast stay valid.
pub fn release(ctx: &mut SessionContext, client_id: &str) -> Option<usize> {
    let index = ctx.slot_by_client(client_id)?;
    ctx.players[index].clear();
    ctx.recompute_local_index();

    info!("Client {} released slot {}", client_id, index);
    Some(index)
}

/// Builds the `player_sync` roster from every joined slot
pub fn entries(ctx: &SessionContext) -> Vec<RosterEntry> {
    ctx.players
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.joined)
        .map(|(index, slot)| RosterEntry {
            index,
            client_id: slot.client_id.clone(),
            name: slot.name.clone(),
            ready: slot.ready,
            is_host: slot.is_host,
        })
        .collect()
}

/// Applies a client's direction request to that client's own snake
///
/// The reversal rule is the one the local player is held to, so a remote
/// request can never do what a local key press could not.
pub fn validate_input(
    ctx: &mut SessionContext,
    sender: &str,
    direction: Direction,
) -> InputVerdict {
    if ctx.state != SessionState::Playing {
        return InputVerdict::NotPlaying;
    }

    let Some(index) = ctx.slot_by_client(sender) else {
        warn!("Input from unknown client {}", sender);
        return InputVerdict::UnknownSender;
    };

    let slot = &mut ctx.players[index];
    if !slot.alive {
        return InputVerdict::Rejected;
    }

    if slot.snake.queue_direction(direction) {
        InputVerdict::Applied
    } else {
        warn!(
            "Rejected reversal {:?} -> {:?} from slot {}",
            slot.snake.direction, direction, index
        );
        InputVerdict::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::SessionConfig;

    fn hosting() -> SessionContext {
        let mut ctx = SessionContext::new(&SessionConfig::default(), true);
        ctx.local_client_id = "me".to_string();
        ctx
    }

    #[test]
    fn test_assign_fills_slots_in_order() {
        let mut ctx = hosting();
        assert_eq!(assign(&mut ctx, "me"), Some(0));
        assert_eq!(assign(&mut ctx, "them"), Some(1));

        assert!(ctx.players[0].is_host);
        assert!(!ctx.players[1].is_host);
        assert_eq!(ctx.local_player_index, 0);
        assert_eq!(ctx.players[1].name, "Player 2");
    }

    #[test]
    fn test_assign_rejects_duplicates_and_overflow() {
        let mut config = SessionConfig::default();
        config.max_players = 2;
        let mut ctx = SessionContext::new(&config, true);
        ctx.local_client_id = "me".to_string();

        assign(&mut ctx, "me");
        assert_eq!(assign(&mut ctx, "me"), None);
        assert_eq!(assign(&mut ctx, "b"), Some(1));
        assert_eq!(assign(&mut ctx, "c"), None);
        assert_eq!(ctx.joined_count(), 2);
    }

    #[test]
    fn test_release_frees_slot_for_reuse() {
        let mut ctx = hosting();
        assign(&mut ctx, "me");
        assign(&mut ctx, "b");
        assign(&mut ctx, "c");

        assert_eq!(release(&mut ctx, "b"), Some(1));
        assert_eq!(release(&mut ctx, "b"), None);
        assert!(!ctx.players[1].joined);
        assert_eq!(ctx.players[2].client_id, "c");
        assert_eq!(assign(&mut ctx, "d"), Some(1));
    }

    #[test]
    fn test_entries_skip_empty_slots() {
        let mut ctx = hosting();
        assign(&mut ctx, "me");
        assign(&mut ctx, "b");
        assign(&mut ctx, "c");
        release(&mut ctx, "b");

        let roster = entries(&ctx);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[1].index, 2);
        assert!(roster[0].is_host);
    }

    #[test]
    fn test_validate_input_reversal_rule() {
        let config = SessionConfig::default();
        let mut ctx = hosting();
        assign(&mut ctx, "me");
        assign(&mut ctx, "b");
        ctx.prepare_round(&config);

        assert_eq!(
            validate_input(&mut ctx, "b", Direction::Up),
            InputVerdict::NotPlaying
        );

        ctx.state = SessionState::Playing;
        // Slot 1 spawns facing left.
        assert_eq!(
            validate_input(&mut ctx, "b", Direction::Right),
            InputVerdict::Rejected
        );
        assert_eq!(
            validate_input(&mut ctx, "b", Direction::Up),
            InputVerdict::Applied
        );
        assert_eq!(ctx.players[1].snake.next_direction, Some(Direction::Up));
        assert_eq!(
            validate_input(&mut ctx, "ghost", Direction::Up),
            InputVerdict::UnknownSender
        );
    }

    #[test]
    fn test_validate_input_ignores_dead_snakes() {
        let config = SessionConfig::default();
        let mut ctx = hosting();
        assign(&mut ctx, "me");
        assign(&mut ctx, "b");
        ctx.prepare_round(&config);
        ctx.state = SessionState::Playing;
        ctx.players[1].alive = false;

        assert_eq!(
            validate_input(&mut ctx, "b", Direction::Up),
            InputVerdict::Rejected
        );
        assert_eq!(ctx.players[1].snake.next_direction, None);
    }
}
