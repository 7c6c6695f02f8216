//! # Session Library
//!
//! The participant side of a snake session: everything a player's process
//! runs, whether it hosts the session or joined someone else's.
//!
//! ## Core Responsibilities
//!
//! ### Lifecycle
//! `SessionMachine` walks the player from the menu through hosting or
//! browsing and joining, the lobby, a real-time round or a turn battle,
//! and back. Every transition is checked against one table, and any
//! transport failure ends in `Disconnected`, which tears the session down.
//!
//! ### Message Routing
//! Transport events are validated into typed messages by the router and
//! handed to exactly one handler each. With buffered dispatch enabled they
//! pass through a bounded envelope queue first and are drained once per
//! frame.
//!
//! ### Authority Split
//! The host runs the real-time simulation (see the `host` crate) and
//! broadcasts snapshots. Clients only mirror those snapshots and forward
//! direction requests. In a turn battle every participant plays locally
//! and reports, and the host publishes the ranking.
//!
//! ## Module Organization
//!
//! - `machine`: the state machine, local actions and the frame loop
//! - `router`: per-message handlers
//! - `sync`: client-side snapshot and roster application
//! - `turn`: the turn-battle controller and the solo engine seam
//! - `browser`: the filtered public session directory
//! - `demo`: a loopback match between a host and scripted bots
//! - `error`: the session error type
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use session::{ScriptedEngine, SessionMachine};
//! use shared::loopback::LoopbackHub;
//! use shared::naming::namespace_id;
//! use shared::{get_timestamp, GameMode, SessionConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = LoopbackHub::new();
//!     let config = SessionConfig::default();
//!     let transport = hub.connect(&namespace_id(&config.team_tag));
//!
//!     let mut machine = SessionMachine::new(config, transport, ScriptedEngine::default());
//!     machine.enter_name("Slither")?;
//!     machine.host_game("Den", GameMode::RealTime, 0)?;
//!
//!     // Once per frame:
//!     machine.frame(get_timestamp());
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod demo;
pub mod error;
pub mod machine;
pub mod router;
pub mod sync;
pub mod turn;

pub use browser::BrowseableSession;
pub use error::{Result, SessionError};
pub use machine::{allowed, SessionMachine};
pub use turn::{RunSummary, ScriptedEngine, SoloEngine, SoloStatus, TurnBattle, TurnStep};
