//! WebSocket protocol messages for Intrigue rooms.

use intrigue_core::{
    DayReport, LogEvent, PlayerId, RoleAssignment, RoundPhase, SubmitNightAction, SubmitVote,
    TieBreakReport,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::room::ErrorClass;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Seat players with their roles and start (or restart) the game
    StartGame {
        room_code: String,
        assignments: Vec<RoleAssignment>,
    },

    /// Submit or replace a night action
    SubmitNightAction {
        room_code: String,
        action: SubmitNightAction,
    },

    /// Submit or replace a day vote
    SubmitVote { room_code: String, vote: SubmitVote },

    /// Withhold today's vote and bank it
    BankVote { room_code: String, voter_id: PlayerId },

    /// Resolve the current night
    ProcessNight { room_code: String },

    /// Resolve the current day
    ProcessDay { room_code: String },

    /// Balance guard breaks a pending tie
    BreakTie {
        room_code: String,
        guardian_id: PlayerId,
        target_id: PlayerId,
    },

    /// Ask for the tied candidates of a pending tie
    TieInfo { room_code: String },

    /// Ask for the log entries a player may read
    Logs {
        room_code: String,
        viewer_id: PlayerId,
    },

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Welcome message with the connection's id
    Welcome { connection_id: Uuid },

    /// Game started
    GameStarted {
        room_code: String,
        phase: RoundPhase,
    },

    /// Submission stored
    Accepted { room_code: String },

    /// Vote banked
    VoteBanked { room_code: String, stored: u32 },

    /// Night resolved; private results are read through `Logs`
    NightResolved {
        room_code: String,
        silenced: usize,
        phase: RoundPhase,
    },

    /// Day resolved
    DayResolved { room_code: String, report: DayReport },

    /// Pending tie broken
    TieBroken {
        room_code: String,
        report: TieBreakReport,
    },

    /// Tied candidates, if a tie-break is pending
    TieInfo {
        room_code: String,
        candidates: Option<Vec<PlayerId>>,
    },

    /// Visible log entries, oldest first
    Logs {
        room_code: String,
        entries: Vec<LogEvent>,
    },

    /// Request rejected or failed
    Error { kind: ErrorClass, message: String },

    /// Pong response
    Pong,
}
