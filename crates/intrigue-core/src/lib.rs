//! Intrigue - round resolution engine for a social-deduction party game
//!
//! This crate provides the rules engine for Intrigue, including:
//! - The closed catalog of 22 roles and their night-action metadata
//! - Night action processing in a fixed role-priority order
//! - Weighted vote tallying and the elimination redirection chain
//! - Phased win-condition evaluation with victory stealing
//! - Deadlock detection over repeated day signatures
//! - A round state machine tying it all together
//!
//! # Architecture
//!
//! The engine does no I/O. Callers load a [`GameState`], feed it submissions
//! and resolution triggers, and persist the result. It can be compiled to:
//! - Native Rust for server-side room hosting
//! - WebAssembly for single-device local play
//!
//! # Modules
//!
//! - [`roles`]: Role catalog, night priority and win thresholds
//! - [`player`]: Player state split into transient, persistent and streak parts
//! - [`actions`]: Votes, night actions, predictions and log events
//! - [`night`]: Night action processor
//! - [`tally`]: Vote tally engine
//! - [`elimination`]: Elimination resolver
//! - [`victory`]: Win condition evaluator
//! - [`deadlock`]: Deadlock detector
//! - [`game`]: Round state machine

pub mod actions;
pub mod deadlock;
pub mod elimination;
pub mod game;
pub mod night;
pub mod player;
pub mod roles;
pub mod tally;
pub mod victory;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{
    LogEvent, LogMessage, LogTag, NightAction, SubmitNightAction, SubmitVote, Visibility, Vote,
    VotePrediction,
};
pub use deadlock::Signature;
pub use elimination::{Elimination, Verdict};
pub use game::{
    DayReport, ErrorKind, GameError, GameOutcome, GameState, RoleAssignment, RoundPhase,
    RulesConfig, TieBreakReport,
};
pub use night::NightOutcome;
pub use player::{DeathCause, Player, PlayerId};
pub use roles::{NightActionKind, Role, RoleCategory};
pub use tally::Tally;
pub use victory::{Victory, WinCondition};
