//! Role catalog.
//!
//! This module contains:
//! - The closed set of 22 roles
//! - Per-role metadata (category, night action, first-night-only, single-use)
//! - The night priority table
//! - Win thresholds derived from player counts

use serde::{Deserialize, Serialize};

/// Broad grouping of roles, used for display and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleCategory {
    /// Acts at night against a target
    Active,
    /// Modifies vote weights without acting
    Passive,
    /// Wins when a board situation arises
    Situation,
    /// Wins after a streak or counter reaches its threshold
    Counter,
    /// One-off or out-of-band abilities
    Special,
}

/// The kind of night action a role submits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightActionKind {
    /// Privately reveal the target's role
    Check,
    /// Target's tally is forced to 0 next day
    Protect,
    /// Target is muted next day
    Silence,
    /// Target cannot vote next day
    BlockVote,
    /// Mutual pact with the target
    AllyBind,
    /// Lock a target whose elimination wins the game
    ShadowBind,
    /// Acquire the target's role as a derived role
    CopyFate,
    /// Swap fates with the target
    FateTransfer,
    /// Lock a target whose victory is stolen
    VictorySteal,
    /// Predict how another player will vote
    PredictVote,
}

/// Every role in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Observer,
    Guardian,
    VoteBlocker,
    Silencer,
    Ally,
    VoteReducer,
    DoubleVoter,
    TieBreaker,
    ShadowWinner,
    Collector,
    ThreeKing,
    NoVoteWinner,
    TieWinner,
    VoteBalancer,
    MultiTarget,
    ReverseVoter,
    BalanceGuard,
    FateCopier,
    MindReader,
    FateTransfer,
    VoteRecycler,
    VictoryStealer,
}

/// Static metadata for a role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleProfile {
    pub category: RoleCategory,
    pub night_action: Option<NightActionKind>,
    /// Night action is only honoured on round 1
    pub first_night_only: bool,
    /// Ability can be used at most once per game
    pub single_use: bool,
}

impl RoleProfile {
    const fn new(category: RoleCategory) -> Self {
        Self {
            category,
            night_action: None,
            first_night_only: false,
            single_use: false,
        }
    }

    const fn acting(category: RoleCategory, action: NightActionKind) -> Self {
        Self {
            category,
            night_action: Some(action),
            first_night_only: false,
            single_use: false,
        }
    }

    const fn first_night(self) -> Self {
        Self {
            first_night_only: true,
            ..self
        }
    }

    const fn once(self) -> Self {
        Self {
            single_use: true,
            ..self
        }
    }
}

/// Night processing order. Roles absent from this table never act at night.
pub const NIGHT_PRIORITY: [Role; 10] = [
    Role::FateCopier,
    Role::Observer,
    Role::FateTransfer,
    Role::Guardian,
    Role::VoteBlocker,
    Role::Silencer,
    Role::Ally,
    Role::ShadowWinner,
    Role::VictoryStealer,
    Role::MindReader,
];

impl Role {
    /// All roles
    pub const ALL: [Role; 22] = [
        Role::Observer,
        Role::Guardian,
        Role::VoteBlocker,
        Role::Silencer,
        Role::Ally,
        Role::VoteReducer,
        Role::DoubleVoter,
        Role::TieBreaker,
        Role::ShadowWinner,
        Role::Collector,
        Role::ThreeKing,
        Role::NoVoteWinner,
        Role::TieWinner,
        Role::VoteBalancer,
        Role::MultiTarget,
        Role::ReverseVoter,
        Role::BalanceGuard,
        Role::FateCopier,
        Role::MindReader,
        Role::FateTransfer,
        Role::VoteRecycler,
        Role::VictoryStealer,
    ];

    /// Catalog entry for this role
    pub const fn profile(self) -> RoleProfile {
        use NightActionKind as A;
        use RoleCategory as C;

        match self {
            Role::Observer => RoleProfile::acting(C::Active, A::Check),
            Role::Guardian => RoleProfile::acting(C::Active, A::Protect),
            Role::VoteBlocker => RoleProfile::acting(C::Active, A::BlockVote),
            Role::Silencer => RoleProfile::acting(C::Active, A::Silence),
            Role::Ally => RoleProfile::acting(C::Active, A::AllyBind).first_night(),
            Role::VoteReducer => RoleProfile::new(C::Passive),
            Role::DoubleVoter => RoleProfile::new(C::Passive),
            Role::TieBreaker => RoleProfile::new(C::Counter),
            Role::ShadowWinner => RoleProfile::acting(C::Situation, A::ShadowBind).first_night(),
            Role::Collector => RoleProfile::new(C::Situation),
            Role::ThreeKing => RoleProfile::new(C::Situation),
            Role::NoVoteWinner => RoleProfile::new(C::Counter),
            Role::TieWinner => RoleProfile::new(C::Situation),
            Role::VoteBalancer => RoleProfile::new(C::Counter),
            Role::MultiTarget => RoleProfile::new(C::Counter),
            Role::ReverseVoter => RoleProfile::new(C::Special).once(),
            Role::BalanceGuard => RoleProfile::new(C::Special).once(),
            Role::FateCopier => RoleProfile::acting(C::Special, A::CopyFate).first_night(),
            Role::MindReader => RoleProfile::acting(C::Counter, A::PredictVote),
            Role::FateTransfer => RoleProfile::acting(C::Active, A::FateTransfer),
            Role::VoteRecycler => RoleProfile::new(C::Special),
            Role::VictoryStealer => RoleProfile::acting(C::Special, A::VictorySteal),
        }
    }

    pub fn category(self) -> RoleCategory {
        self.profile().category
    }

    pub fn night_action(self) -> Option<NightActionKind> {
        self.profile().night_action
    }

    /// Position in the night priority table, if the role acts at night
    pub fn night_priority(self) -> Option<usize> {
        NIGHT_PRIORITY.iter().position(|r| *r == self)
    }

    /// Whether this role's votes count double
    pub fn doubles_votes(self) -> bool {
        matches!(self, Role::DoubleVoter)
    }

    /// Whether this role can bank unused votes
    pub fn banks_votes(self) -> bool {
        matches!(self, Role::VoteRecycler)
    }

    /// Whether this role shaves one vote off its own tally
    pub fn reduces_votes(self) -> bool {
        matches!(self, Role::VoteReducer)
    }
}

/// Ceiling division for the small player counts used by thresholds
fn ceil_div(numerator: usize, denominator: usize) -> u32 {
    numerator.div_ceil(denominator) as u32
}

/// Win thresholds, all rounded up
pub mod thresholds {
    use super::ceil_div;

    /// Votes the collector needs, out of the living players
    pub fn collector(alive: usize) -> u32 {
        ceil_div(alive * 2, 3)
    }

    /// Consecutive ties the tie breaker needs
    pub fn tie_breaker(total: usize) -> u32 {
        ceil_div(total, 3)
    }

    /// Consecutive zero-vote days the no-vote winner needs
    pub fn no_vote(total: usize) -> u32 {
        ceil_div(total, 3)
    }

    /// Consecutive equal tallies the vote balancer needs
    pub fn vote_balance(total: usize) -> u32 {
        ceil_div(total, 2)
    }

    /// Consecutive correct predictions the mind reader needs
    pub fn mind_reader(total: usize) -> u32 {
        ceil_div(total, 2)
    }

    /// Distinct eliminated vote targets the multi-target role needs
    pub fn multi_target(total: usize) -> u32 {
        ceil_div(total, 3)
    }
}
