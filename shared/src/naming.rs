//! Session display-name conventions and identity namespacing.
//!
//! The transport only carries a free-text label for each session, so the map
//! and game mode ride along as bracketed markers inside it:
//!
//! ```text
//! [SNK] Friday Night |m2| |gTB|
//! ```
//!
//! The leading `[TAG]` doubles as a tenancy filter when browsing.

use sha2::{Digest, Sha256};

use crate::model::GameMode;

const MAP_MARKER: &str = "|m";
const MODE_MARKER: &str = "|g";
const MODE_TURN_BATTLE: &str = "TB";
const MODE_ONE_VS_ONE: &str = "1V";

/// A display name with its markers decoded and stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName {
    pub room: String,
    pub map: u32,
    pub mode: GameMode,
}

pub fn tag_prefix(tag: &str) -> String {
    format!("[{}]", tag)
}

pub fn encode_display_name(tag: &str, room: &str, map: u32, mode: GameMode) -> String {
    let mode = match mode {
        GameMode::TurnBattle => MODE_TURN_BATTLE,
        GameMode::RealTime => MODE_ONE_VS_ONE,
    };
    format!("{} {} {}{}| {}{}|", tag_prefix(tag), room, MAP_MARKER, map, MODE_MARKER, mode)
}

/// Decodes a directory name. Returns `None` unless the name starts with the
/// exact `[tag]` prefix. Missing markers decode to map 0 and real-time mode.
pub fn decode_display_name(tag: &str, name: &str) -> Option<DecodedName> {
    let mut rest = name.strip_prefix(tag_prefix(tag).as_str())?.to_string();

    let map = take_marker(&mut rest, MAP_MARKER)
        .and_then(|raw| raw.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let mode = match take_marker(&mut rest, MODE_MARKER).as_deref() {
        Some(MODE_TURN_BATTLE) => GameMode::TurnBattle,
        _ => GameMode::RealTime,
    };

    Some(DecodedName {
        room: rest.split_whitespace().collect::<Vec<_>>().join(" "),
        map,
        mode,
    })
}

/// Removes the first `<opener>value|` marker from `text` and returns `value`.
fn take_marker(text: &mut String, opener: &str) -> Option<String> {
    let start = text.find(opener)?;
    let value_start = start + opener.len();
    let value_len = text[value_start..].find('|')?;
    let value = text[value_start..value_start + value_len].to_string();
    text.replace_range(start..value_start + value_len + 1, "");
    Some(value)
}

/// Deterministic pseudo-identifier for a team tag, shaped like a UUID.
///
/// Deployments sharing a tag derive the same namespace and so can see each
/// other's sessions.
pub fn namespace_id(tag: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"snakelink:");
    hasher.update(tag.as_bytes());
    let digest = hasher.finalize();

    let hex: String = digest[..16].iter().map(|b| format!("{:02x}", b)).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
