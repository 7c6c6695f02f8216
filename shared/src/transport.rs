//! The publish/subscribe session transport consumed by the session layer.
//!
//! Connection management, retries and wire encryption belong to the
//! transport. The session only relies on the calls below, and on `poll`
//! delivering events synchronously on the calling thread.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to host session: {0}")]
    Host(String),

    #[error("failed to join session: {0}")]
    Join(String),

    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error("session {0} is full")]
    SessionFull(String),

    #[error("failed to list sessions: {0}")]
    List(String),

    #[error("failed to send message: {0}")]
    Send(String),

    #[error("not connected to a session")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// What a session advertises when hosted or joined.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionMetadata {
    /// Free-text label, carrying the name-embedded markers.
    pub display_name: String,
    pub max_clients: usize,
    pub public: bool,
    /// Identity namespace; only sessions in the same namespace are listed.
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedSession {
    pub session_id: String,
    pub client_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedSession {
    pub session_id: String,
    pub client_id: String,
    /// Clients already present, in arrival order.
    pub existing_clients: Vec<String>,
}

/// A public directory entry as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
    pub clients: Vec<String>,
    pub max_clients: usize,
}

/// Events delivered from within `Transport::poll`.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Joined { client_id: String },
    Leaved { client_id: String },
    Game { sender: String, document: Value },
}

impl TransportEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportEvent::Joined { .. } => "joined",
            TransportEvent::Leaved { .. } => "leaved",
            TransportEvent::Game { .. } => "game",
        }
    }
}

/// Host/join/listen/broadcast/list primitives. All calls block the caller
/// until the transport answers.
pub trait Transport {
    fn host(&mut self, metadata: &SessionMetadata) -> Result<HostedSession>;

    fn join(&mut self, session_id: &str, metadata: &SessionMetadata) -> Result<JoinedSession>;

    /// Registers interest in session events. Events are only delivered
    /// through `poll` once a listener exists.
    fn listen(&mut self) -> Result<ListenerId>;

    /// Broadcasts a document to every other member of the session.
    fn send_game_message(&mut self, document: &Value) -> Result<()>;

    fn list_public_sessions(&mut self) -> Result<Vec<DirectoryEntry>>;

    /// Delivers every pending event to `on_event`, synchronously.
    fn poll(&mut self, on_event: &mut dyn FnMut(TransportEvent));

    /// Leaves the current session, if any.
    fn leave(&mut self);
}
