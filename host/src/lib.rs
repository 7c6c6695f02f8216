//! # Session Host Library
//!
//! Authoritative side of a snake session. Exactly one participant hosts; it
//! owns slot allocation, the real-time simulation and turn-battle ranking.
//! Everyone else mirrors what the host broadcasts.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The host is the only participant that moves snakes other than its own.
//! Movement, collisions, food and scoring are decided here and shipped to
//! clients as full snapshots.
//!
//! ### Roster Management
//! Transport-level joins and leaves are mapped onto the fixed array of
//! player slots in the Session Context:
//! - First free slot below the configured player cap on join
//! - Slot cleared on leave, with the rest of the roster left in place
//! - Direction requests re-validated against the sender's own snake
//!
//! ### Result Aggregation
//! In turn-battle mode the host collects every participant's attempt record,
//! decides when everybody is done, and ranks the field.
//!
//! ## Module Organization
//!
//! ### Roster Module (`roster`)
//! Slot assignment and release, roster broadcast entries, input validation.
//!
//! ### Game Module (`game`)
//! The two-cadence simulation loop:
//! - Broadcast cadence: fixed wall-clock interval, independent of movement
//! - Movement cadence: the current snake speed, shortened per food eaten
//!
//! ### Results Module (`results`)
//! Completion check, stable ranking and winner selection with an explicit
//! tie-break policy.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use host::game::HostSimulation;
//! use shared::{SessionConfig, SessionContext, SessionState};
//!
//! let config = SessionConfig::default();
//! let mut ctx = SessionContext::new(&config, true);
//! host::roster::assign(&mut ctx, "host-client");
//! host::roster::assign(&mut ctx, "guest-client");
//! ctx.prepare_round(&config);
//! ctx.state = SessionState::Playing;
//!
//! let mut simulation = HostSimulation::new(7);
//! let outcome = simulation.tick(&mut ctx, shared::get_timestamp(), &config);
//! if outcome.broadcast {
//!     let _snapshot = shared::codec::serialize(&ctx);
//! }
//! ```
//!
//! All functions take the Session Context by reference. Nothing in this
//! crate performs I/O; the session layer sends whatever the host produces.

pub mod game;
pub mod results;
pub mod roster;

pub use game::{HostSimulation, TickOutcome};
pub use roster::InputVerdict;
