use shared::{SessionState, TransportError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("cannot go from {from:?} to {to:?}")]
    InvalidTransition {
        from: SessionState,
        to: SessionState,
    },

    #[error("only the host can do that")]
    NotHost,

    #[error("no active session")]
    NoContext,

    #[error("need {needed} players to start, {joined} joined")]
    InvalidPlayerCount { needed: usize, joined: usize },

    #[error("name must not be empty")]
    InvalidName,
}

pub type Result<T> = std::result::Result<T, SessionError>;
