//! Client-side state application.
//!
//! Clients never simulate. They overwrite their mirror from whatever the host
//! sends and forward discrete direction requests.

use log::debug;
use serde_json::Value;
use shared::codec;
use shared::transport::Result;
use shared::{Direction, GameMessage, RosterEntry, SessionContext, SessionState, Transport};

use crate::machine::allowed;

/// Overwrites the mirrored context with a host snapshot.
///
/// Returns the sender's state if the receiver should follow it. The state is
/// only ever adopted through a permitted transition, never written directly.
pub fn apply_snapshot(ctx: &mut SessionContext, doc: &Value) -> Option<SessionState> {
    if ctx.is_host {
        debug!("Host ignoring foreign snapshot");
        return None;
    }

    let remote = codec::deserialize_into(ctx, doc);
    let current = match ctx.state {
        overlay if overlay.is_overlay() => ctx.previous_state.unwrap_or(overlay),
        state => state,
    };
    (remote != current && allowed(current, remote)).then_some(remote)
}

/// Mirrors the host's roster broadcast onto the local slots.
///
/// Slots whose occupant changed are rebuilt; slots missing from the roster
/// are cleared.
pub fn apply_roster(ctx: &mut SessionContext, roster: &[RosterEntry]) {
    for (index, slot) in ctx.players.iter_mut().enumerate() {
        match roster.iter().find(|entry| entry.index == index) {
            Some(entry) => {
                if !slot.joined || slot.client_id != entry.client_id {
                    slot.occupy(&entry.client_id, &entry.name, entry.is_host);
                }
                slot.name = entry.name.clone();
                slot.ready = entry.ready;
                slot.is_host = entry.is_host;
            }
            None => slot.clear(),
        }
    }
    ctx.recompute_local_index();
}

/// Forwards a direction request to the host.
pub fn send_direction<T: Transport + ?Sized>(transport: &mut T, direction: Direction) -> Result<()> {
    transport.send_game_message(&GameMessage::Input { direction }.to_document())
}
