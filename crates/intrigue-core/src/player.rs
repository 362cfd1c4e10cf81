//! Player state.
//!
//! This module contains:
//! - Player struct with role, life status and death record
//! - RoundFlags: transient effects that last exactly one day
//! - PersistentEffects: effects that last until the game ends
//! - Streaks: counters backing counter-type win conditions

use crate::roles::Role;
use serde::{Deserialize, Serialize};

/// Player identifier, stable for the lifetime of a room
pub type PlayerId = u32;

/// How a player died
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeathCause {
    /// Eliminated by the day vote
    Vote,
    /// Killed by an ability (copy-fate cascade, manual tie-break)
    Skill,
}

/// When and how a player died
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Death {
    pub round: u32,
    pub cause: DeathCause,
}

/// Effects applied at night that expire when the next night starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundFlags {
    /// Tally is forced to 0 for the coming day
    pub protected: bool,
    /// Muted for the coming day (display only)
    pub silenced: bool,
    /// Votes are rejected for the coming day
    pub cannot_vote: bool,
    /// Vote withheld and banked today
    pub vote_banked: bool,
}

/// A role acquired through copy-fate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopiedRole {
    pub role: Role,
    pub from: PlayerId,
}

/// A victory-steal lock, taken on a target and the role it held at the time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StealLock {
    pub target: PlayerId,
    pub role: Option<Role>,
}

/// Effects that persist until the end of the game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistentEffects {
    /// Pact partner, set on both members
    pub ally: Option<PlayerId>,
    /// Shadow-bind target
    pub shadow_target: Option<PlayerId>,
    /// Banked votes (vote recycler)
    pub stored_votes: u32,
    pub reverse_vote_used: bool,
    pub balance_guard_used: bool,
    /// Fate-transfer partner, re-settable every night
    pub fate_partner: Option<PlayerId>,
    pub copied: Option<CopiedRole>,
    pub victory_steal: Option<StealLock>,
}

/// Counters for streak-based win conditions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streaks {
    pub tie: u32,
    pub no_vote: u32,
    pub balance: u32,
    /// Tally seen by the vote balancer on the previous day
    pub last_tally: Option<u32>,
    pub mind_reader: u32,
    /// Vote targets that died the round they were voted for
    pub vote_history: Vec<PlayerId>,
}

/// A single player's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Assigned at game start, never reassigned
    pub role: Option<Role>,
    pub alive: bool,
    pub death: Option<Death>,
    pub flags: RoundFlags,
    pub effects: PersistentEffects,
    pub streaks: Streaks,
}

impl Player {
    /// Create a lobby player with no role yet
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            role: None,
            alive: true,
            death: None,
            flags: RoundFlags::default(),
            effects: PersistentEffects::default(),
            streaks: Streaks::default(),
        }
    }

    /// Create a player holding a role
    pub fn with_role(id: PlayerId, name: impl Into<String>, role: Role) -> Self {
        let mut player = Self::new(id, name.into());
        player.role = Some(role);
        player
    }

    /// Whether the player is alive and holds the given role
    pub fn is_living(&self, role: Role) -> bool {
        self.alive && self.role == Some(role)
    }

    /// Role whose night action this player uses in the given round.
    ///
    /// A fate copier switches to the copied role from round 2 onward.
    pub fn acting_role(&self, round: u32) -> Option<Role> {
        match (self.role, self.effects.copied) {
            (Some(Role::FateCopier), Some(copied)) if round > 1 => Some(copied.role),
            (role, _) => role,
        }
    }

    /// Mark the player dead
    pub fn kill(&mut self, round: u32, cause: DeathCause) {
        self.alive = false;
        self.death = Some(Death { round, cause });
    }

    /// Whether the player died during the given round
    pub fn died_in(&self, round: u32) -> bool {
        matches!(self.death, Some(d) if d.round == round)
    }

    /// Drop all transient flags. Called at the start of every night pass.
    pub fn clear_round_flags(&mut self) {
        self.flags = RoundFlags::default();
    }

    /// Reset everything except identity and role, for a game (re)start
    pub fn reset_for_start(&mut self) {
        self.alive = true;
        self.death = None;
        self.flags = RoundFlags::default();
        self.effects = PersistentEffects::default();
        self.streaks = Streaks::default();
    }
}
