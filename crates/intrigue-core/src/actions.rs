//! Submitted actions and emitted log events.
//!
//! This module defines what players submit (votes, night actions), the
//! records the engine keeps for them, and the log events every resolution
//! pass emits. Log events carry a semantic message with parameters rather
//! than rendered text, so presentation stays language-independent.

use crate::player::PlayerId;
use crate::roles::{NightActionKind, Role};
use crate::victory::Victory;
use serde::{Deserialize, Serialize};

/// A live day vote. At most one per voter per round; later submissions replace it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub voter: PlayerId,
    /// None means abstain
    pub target: Option<PlayerId>,
    pub round: u32,
    /// Banked votes to spend on top of this vote (None spends the whole bank)
    pub stored_votes: Option<u32>,
}

/// A submitted night action. At most one per actor per round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NightAction {
    pub actor: PlayerId,
    pub target: Option<PlayerId>,
    pub kind: NightActionKind,
    pub round: u32,
    /// Only used by predict-vote
    pub predicted_voter: Option<PlayerId>,
}

/// A mind reader's prediction of one player's vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotePrediction {
    pub predictor: PlayerId,
    pub voter: PlayerId,
    /// None predicts an abstention
    pub target: Option<PlayerId>,
    pub round: u32,
    /// Unknown until the day is resolved; set exactly once
    pub correct: Option<bool>,
}

/// Client request: submit or replace a night action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitNightAction {
    pub actor_id: PlayerId,
    pub target_id: Option<PlayerId>,
    pub action_type: NightActionKind,
    #[serde(default)]
    pub predicted_voter_id: Option<PlayerId>,
}

/// Client request: submit or replace a day vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitVote {
    pub voter_id: PlayerId,
    pub target_id: Option<PlayerId>,
    #[serde(default)]
    pub use_stored_votes_count: Option<u32>,
}

/// Who may read a log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Viewers(Vec<PlayerId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogTag {
    Public,
    Private,
}

/// Semantic log message. The variant is the key, the fields are the params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", content = "params", rename_all = "camelCase")]
pub enum LogMessage {
    GameStarted {
        players: usize,
    },

    // ==================== Night ====================
    RoleRevealed {
        target: PlayerId,
        role: Option<Role>,
    },
    ProtectionGranted {
        target: PlayerId,
    },
    Silenced,
    VoteBlocked,
    PactFormed {
        partner: PlayerId,
    },
    ShadowLocked {
        target: PlayerId,
    },
    FateCopied {
        source: PlayerId,
        role: Role,
    },
    FateTransferred {
        partner: PlayerId,
    },
    VictoryStealLocked {
        target: PlayerId,
    },
    PredictionRecorded {
        voter: PlayerId,
    },
    /// Public night summary; zero silenced means a peaceful night
    NightEnded {
        silenced: usize,
    },

    // ==================== Day ====================
    VoteBanked {
        stored: u32,
    },
    NoVotes,
    Tie {
        candidates: Vec<PlayerId>,
        votes: u32,
    },
    TieBreakPending {
        candidates: Vec<PlayerId>,
    },
    TieBroken {
        target: PlayerId,
    },
    TieClosed,
    ReverseVote {
        reverser: PlayerId,
        substitute: PlayerId,
    },
    FateSwapped {
        voted: PlayerId,
        substitute: PlayerId,
    },
    Eliminated {
        player: PlayerId,
    },
    CascadeDeath {
        player: PlayerId,
        source: PlayerId,
    },
    PredictionResult {
        correct: bool,
        streak: u32,
        threshold: u32,
    },
    /// Result of a prediction made through a copied role
    PredictionChecked {
        correct: bool,
    },

    // ==================== Game over ====================
    Victory(Victory),
    Deadlock,
    NoWinner,
}

/// An immutable log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    pub message: LogMessage,
    pub visibility: Visibility,
    pub tag: LogTag,
}

impl LogEvent {
    /// An entry everyone can read
    pub fn public(message: LogMessage) -> Self {
        Self {
            message,
            visibility: Visibility::Public,
            tag: LogTag::Public,
        }
    }

    /// An entry only the given players can read
    pub fn private(viewers: Vec<PlayerId>, message: LogMessage) -> Self {
        Self {
            message,
            visibility: Visibility::Viewers(viewers),
            tag: LogTag::Private,
        }
    }

    /// Whether the given player may read this entry
    pub fn visible_to(&self, viewer: PlayerId) -> bool {
        match &self.visibility {
            Visibility::Public => true,
            Visibility::Viewers(ids) => ids.contains(&viewer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_log_visibility() {
        let log = LogEvent::private(vec![3], LogMessage::Silenced);
        assert!(log.visible_to(3));
        assert!(!log.visible_to(4));
        assert_eq!(log.tag, LogTag::Private);
    }

    #[test]
    fn test_log_message_serializes_as_key_and_params() {
        let log = LogMessage::NightEnded { silenced: 2 };
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["key"], "nightEnded");
        assert_eq!(json["params"]["silenced"], 2);
    }

    #[test]
    fn test_submit_vote_accepts_camel_case_without_optional_fields() {
        let vote: SubmitVote = serde_json::from_str(r#"{"voterId":1,"targetId":null}"#).unwrap();
        assert_eq!(vote.voter_id, 1);
        assert_eq!(vote.target_id, None);
        assert_eq!(vote.use_stored_votes_count, None);
    }
}
