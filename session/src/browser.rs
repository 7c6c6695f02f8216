//! Game browser: the public session directory, filtered to this deployment.

use log::{debug, info};
use shared::naming::decode_display_name;
use shared::transport::Result;
use shared::{GameMode, SessionConfig, Transport};

/// A joinable session as shown to the player. Rebuilt on every browse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseableSession {
    pub id: String,
    /// Room name with the metadata markers stripped.
    pub name: String,
    pub players: usize,
    pub max_players: usize,
    pub map: u32,
    pub mode: GameMode,
}

impl BrowseableSession {
    pub fn is_full(&self) -> bool {
        self.players >= self.max_players
    }
}

/// Lists public sessions whose name carries this deployment's tag.
pub fn browse<T: Transport + ?Sized>(
    transport: &mut T,
    config: &SessionConfig,
) -> Result<Vec<BrowseableSession>> {
    let entries = transport.list_public_sessions()?;
    let total = entries.len();

    let sessions: Vec<BrowseableSession> = entries
        .into_iter()
        .filter_map(|entry| {
            let Some(decoded) = decode_display_name(&config.team_tag, &entry.name) else {
                debug!("Skipping foreign session {:?}", entry.name);
                return None;
            };
            Some(BrowseableSession {
                id: entry.id,
                name: decoded.room,
                players: entry.clients.len(),
                max_players: entry.max_clients,
                map: decoded.map,
                mode: decoded.mode,
            })
        })
        .collect();

    info!("Found {} of {} listed sessions", sessions.len(), total);
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::loopback::{FailOn, LoopbackHub};
    use shared::naming::encode_display_name;
    use shared::{SessionMetadata, TransportError};

    fn metadata(name: String) -> SessionMetadata {
        SessionMetadata {
            display_name: name,
            max_clients: 4,
            public: true,
            namespace: "ns".into(),
        }
    }

    #[test]
    fn test_browse_filters_and_decodes() {
        let hub = LoopbackHub::new();
        let config = SessionConfig::default();
        let mut ours = hub.connect("ns");
        let mut plain = hub.connect("ns");
        let mut foreign = hub.connect("ns");
        ours.host(&metadata(encode_display_name("SNK", "Pit", 3, GameMode::TurnBattle)))
            .unwrap();
        plain.host(&metadata("[SNK] Bare".into())).unwrap();
        foreign
            .host(&metadata(encode_display_name("XYZ", "Elsewhere", 1, GameMode::RealTime)))
            .unwrap();

        let mut browser = hub.connect("ns");
        let found = browse(&mut browser, &config).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "Pit");
        assert_eq!(found[0].map, 3);
        assert_eq!(found[0].mode, GameMode::TurnBattle);
        assert_eq!(found[0].players, 1);
        assert!(!found[0].is_full());
        assert_eq!(found[1].name, "Bare");
        assert_eq!(found[1].map, 0);
        assert_eq!(found[1].mode, GameMode::RealTime);
    }

    #[test]
    fn test_browse_surfaces_transport_errors() {
        let hub = LoopbackHub::new();
        let mut browser = hub.connect("ns");
        hub.fail_next(FailOn::List);

        let result = browse(&mut browser, &SessionConfig::default());
        assert!(matches!(result, Err(TransportError::List(_))));
    }
}
