//! Round state machine.
//!
//! This module contains the `GameState` aggregate and every entry point that
//! moves a room forward: game start, submissions, and the night, day and
//! tie-break resolution passes. Each pass works on a clone of the state and
//! replaces it in one step, so a failed pass leaves nothing half-applied.

use crate::actions::{
    LogEvent, LogMessage, NightAction, SubmitNightAction, SubmitVote, Vote, VotePrediction,
};
use crate::deadlock::{is_deadlock, Signature};
use crate::elimination::{cascade_deaths, classify, resolve_elimination, Elimination, Verdict};
use crate::night::{resolve_night, NightOutcome};
use crate::player::{DeathCause, Player, PlayerId};
use crate::roles::{NightActionKind, Role};
use crate::tally::{tally_votes, Tally};
use crate::victory::{
    check_collector, check_counters, check_elimination, check_multi_target, check_tie,
    reset_tie_streaks, CounterInput, Victory,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Round phase. Advances monotonically and never goes back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Waiting for the game to start
    Lobby,

    /// Night actions are being collected
    Night(u32),

    /// Votes are being collected
    Day(u32),

    /// A tied day waits for the balance guard's decision
    AwaitingTieBreak {
        round: u32,
        candidates: Vec<PlayerId>,
    },

    /// Terminal
    GameOver,
}

impl RoundPhase {
    /// Round number, if a round is in progress
    pub fn round(&self) -> Option<u32> {
        match self {
            RoundPhase::Night(n) | RoundPhase::Day(n) => Some(*n),
            RoundPhase::AwaitingTieBreak { round, .. } => Some(*round),
            RoundPhase::Lobby | RoundPhase::GameOver => None,
        }
    }
}

/// Errors that can occur when submitting or resolving
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("Game is over")]
    GameOver,

    #[error("Player {0} not found")]
    PlayerNotFound(PlayerId),

    #[error("Player {0} is dead")]
    PlayerDead(PlayerId),

    #[error("Player {0} cannot vote today")]
    CannotVote(PlayerId),

    #[error("Player {0} has already voted today")]
    AlreadyVoted(PlayerId),

    #[error("Role cannot perform this action")]
    WrongActionType,

    #[error("Invalid target")]
    InvalidTarget,

    #[error("A predicted voter is required")]
    MissingPredictedVoter,

    #[error("Not enough stored votes: have {available}, requested {requested}")]
    InsufficientStoredVotes { available: u32, requested: u32 },

    #[error("Vote bank is full")]
    BankFull,

    #[error("Ability already used")]
    AbilityUsed,

    #[error("Need {min}-{max} players, got {got}")]
    InvalidPlayerCount { min: usize, max: usize, got: usize },

    #[error("Player {0} assigned more than once")]
    DuplicatePlayer(PlayerId),
}

/// Coarse classification of a [`GameError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Bad parameters, wrong phase, or an actor not allowed to act
    Validation,
    /// A referenced player does not exist
    NotFound,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::PlayerNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Validation,
        }
    }
}

/// Tunable rule constants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RulesConfig {
    pub min_players: usize,
    pub max_players: usize,
    /// Identical signatures, current included, that end the game
    pub deadlock_repeats: usize,
    pub max_banked_votes: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            min_players: 4,
            max_players: 12,
            deadlock_repeats: 3,
            max_banked_votes: 3,
        }
    }
}

/// One player's seat and role for a game start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub player_id: PlayerId,
    pub name: String,
    pub role: Role,
}

/// How a finished game ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    Winner(Victory),
    Deadlock,
    /// One or no players left and no predicate fired
    NoWinner,
}

/// Result of a day pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayReport {
    pub round: u32,
    pub tally: Tally,
    pub verdict: Verdict,
    pub elimination: Option<Elimination>,
    pub outcome: Option<GameOutcome>,
    /// To be appended to the room's signature history; None when a pending
    /// tie was closed
    pub signature: Option<Signature>,
    pub next_phase: RoundPhase,
}

/// Result of a manual tie-break
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TieBreakReport {
    pub target: PlayerId,
    pub cascade: Vec<PlayerId>,
    pub outcome: Option<GameOutcome>,
    pub next_phase: RoundPhase,
}

/// The complete state of one room's game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub room_code: String,
    pub phase: RoundPhase,
    /// All players, sorted by id
    pub players: Vec<Player>,
    /// Votes for the current day
    pub votes: Vec<Vote>,
    /// Night actions for the current night
    pub night_actions: Vec<NightAction>,
    pub predictions: Vec<VotePrediction>,
    pub logs: Vec<LogEvent>,
    pub config: RulesConfig,
    pub outcome: Option<GameOutcome>,
}

impl GameState {
    /// Create an empty room in the lobby
    pub fn new(room_code: impl Into<String>, config: RulesConfig) -> Self {
        Self {
            room_code: room_code.into(),
            phase: RoundPhase::Lobby,
            players: Vec::new(),
            votes: Vec::new(),
            night_actions: Vec::new(),
            predictions: Vec::new(),
            logs: Vec::new(),
            config,
            outcome: None,
        }
    }

    /// Get a player by ID
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Get a player who must exist and be alive
    fn living_player(&self, id: PlayerId) -> Result<&Player, GameError> {
        let player = self.get_player(id).ok_or(GameError::PlayerNotFound(id))?;
        if !player.alive {
            return Err(GameError::PlayerDead(id));
        }
        Ok(player)
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RoundPhase::GameOver
    }

    /// Get the winner if the game has one
    pub fn winner(&self) -> Option<&Victory> {
        match &self.outcome {
            Some(GameOutcome::Winner(victory)) => Some(victory),
            _ => None,
        }
    }

    fn night_round(&self) -> Result<u32, GameError> {
        match self.phase {
            RoundPhase::Night(n) => Ok(n),
            RoundPhase::GameOver => Err(GameError::GameOver),
            _ => Err(GameError::InvalidPhase),
        }
    }

    fn day_round(&self) -> Result<u32, GameError> {
        match self.phase {
            RoundPhase::Day(n) => Ok(n),
            RoundPhase::GameOver => Err(GameError::GameOver),
            _ => Err(GameError::InvalidPhase),
        }
    }

    // ==================== Game Start ====================

    /// Seat the players with their roles and move to the first night.
    ///
    /// Allowed from the lobby or after a finished game. Every round record
    /// from a previous game is purged.
    pub fn start(&mut self, assignments: Vec<RoleAssignment>) -> Result<(), GameError> {
        if !matches!(self.phase, RoundPhase::Lobby | RoundPhase::GameOver) {
            return Err(GameError::InvalidPhase);
        }

        let got = assignments.len();
        if got < self.config.min_players || got > self.config.max_players {
            return Err(GameError::InvalidPlayerCount {
                min: self.config.min_players,
                max: self.config.max_players,
                got,
            });
        }

        let mut players: Vec<Player> = Vec::with_capacity(got);
        for assignment in assignments {
            if players.iter().any(|p| p.id == assignment.player_id) {
                return Err(GameError::DuplicatePlayer(assignment.player_id));
            }
            let mut player =
                Player::with_role(assignment.player_id, assignment.name, assignment.role);
            player.reset_for_start();
            players.push(player);
        }
        players.sort_by_key(|p| p.id);

        self.players = players;
        self.votes.clear();
        self.night_actions.clear();
        self.predictions.clear();
        self.logs.clear();
        self.outcome = None;
        self.phase = RoundPhase::Night(1);
        self.logs
            .push(LogEvent::public(LogMessage::GameStarted { players: got }));

        Ok(())
    }

    // ==================== Submissions ====================

    /// Submit or replace a night action for the current night
    pub fn submit_night_action(&mut self, request: SubmitNightAction) -> Result<(), GameError> {
        let round = self.night_round()?;
        let actor = self.living_player(request.actor_id)?;

        if actor.acting_role(round).and_then(Role::night_action) != Some(request.action_type) {
            return Err(GameError::WrongActionType);
        }

        if let Some(target) = request.target_id {
            if target == request.actor_id {
                return Err(GameError::InvalidTarget);
            }
            self.get_player(target)
                .ok_or(GameError::PlayerNotFound(target))?;
        }

        let predicted_voter = if request.action_type == NightActionKind::PredictVote {
            let voter = request
                .predicted_voter_id
                .ok_or(GameError::MissingPredictedVoter)?;
            self.get_player(voter)
                .ok_or(GameError::PlayerNotFound(voter))?;
            Some(voter)
        } else {
            if request.target_id.is_none() {
                return Err(GameError::InvalidTarget);
            }
            None
        };

        self.night_actions
            .retain(|a| !(a.actor == request.actor_id && a.round == round));
        self.night_actions.push(NightAction {
            actor: request.actor_id,
            target: request.target_id,
            kind: request.action_type,
            round,
            predicted_voter,
        });

        Ok(())
    }

    /// Submit or replace a vote for the current day
    pub fn submit_vote(&mut self, request: SubmitVote) -> Result<(), GameError> {
        let round = self.day_round()?;
        let voter = self.living_player(request.voter_id)?;

        if voter.flags.cannot_vote || voter.flags.vote_banked {
            return Err(GameError::CannotVote(request.voter_id));
        }

        if let Some(requested) = request.use_stored_votes_count {
            let available = voter.effects.stored_votes;
            if requested > available {
                return Err(GameError::InsufficientStoredVotes {
                    available,
                    requested,
                });
            }
        }

        if let Some(target) = request.target_id {
            let target = self
                .get_player(target)
                .ok_or(GameError::PlayerNotFound(target))?;
            if !target.alive {
                return Err(GameError::InvalidTarget);
            }
        }

        self.votes
            .retain(|v| !(v.voter == request.voter_id && v.round == round));
        self.votes.push(Vote {
            voter: request.voter_id,
            target: request.target_id,
            round,
            stored_votes: request.use_stored_votes_count,
        });

        Ok(())
    }

    /// Withhold today's vote and bank it. Returns the new bank size.
    pub fn bank_vote(&mut self, voter_id: PlayerId) -> Result<u32, GameError> {
        let round = self.day_round()?;
        let voter = self.living_player(voter_id)?;

        if !voter.role.is_some_and(Role::banks_votes) {
            return Err(GameError::WrongActionType);
        }
        if voter.flags.cannot_vote || voter.flags.vote_banked {
            return Err(GameError::CannotVote(voter_id));
        }
        if self.votes.iter().any(|v| v.voter == voter_id && v.round == round) {
            return Err(GameError::AlreadyVoted(voter_id));
        }
        if voter.effects.stored_votes >= self.config.max_banked_votes {
            return Err(GameError::BankFull);
        }

        let mut stored = 0;
        if let Some(voter) = self.get_player_mut(voter_id) {
            voter.effects.stored_votes += 1;
            voter.flags.vote_banked = true;
            stored = voter.effects.stored_votes;
        }
        self.logs.push(LogEvent::private(
            vec![voter_id],
            LogMessage::VoteBanked { stored },
        ));

        Ok(stored)
    }

    // ==================== Resolution ====================

    /// Resolve the current night and move to the day
    pub fn process_night(&mut self) -> Result<NightOutcome, GameError> {
        let round = self.night_round()?;

        let mut players = self.players.clone();
        let outcome = resolve_night(&mut players, &self.night_actions, round);

        self.players = players;
        self.predictions.extend(outcome.predictions.iter().cloned());
        self.logs.extend(outcome.logs.iter().cloned());
        self.night_actions.clear();
        self.phase = RoundPhase::Day(round);

        Ok(outcome)
    }

    /// Resolve the current day.
    ///
    /// `recent` holds the room's stored signatures, oldest first. In the
    /// tie-break sub-state this closes the tie with no elimination instead.
    pub fn process_day<R: Rng + ?Sized>(
        &mut self,
        recent: &[Signature],
        rng: &mut R,
    ) -> Result<DayReport, GameError> {
        if let RoundPhase::AwaitingTieBreak { round, candidates } = &self.phase {
            let (round, candidates) = (*round, candidates.clone());
            self.logs.push(LogEvent::public(LogMessage::TieClosed));
            let tally = tally_votes(&self.players, &self.votes).tally;
            let votes = tally.max();
            self.advance_to_night(round);
            return Ok(DayReport {
                round,
                tally,
                verdict: Verdict::Tie { candidates, votes },
                elimination: None,
                outcome: None,
                signature: None,
                next_phase: self.phase.clone(),
            });
        }

        let round = self.day_round()?;
        let mut next = self.clone();
        let report = next.resolve_day(round, recent, rng);
        *self = next;
        Ok(report)
    }

    fn resolve_day<R: Rng + ?Sized>(
        &mut self,
        round: u32,
        recent: &[Signature],
        rng: &mut R,
    ) -> DayReport {
        let living_before: Vec<PlayerId> =
            self.players.iter().filter(|p| p.alive).map(|p| p.id).collect();

        let counted = tally_votes(&self.players, &self.votes);
        for (voter, spent) in &counted.banked_spent {
            if let Some(player) = self.get_player_mut(*voter) {
                player.effects.stored_votes = player.effects.stored_votes.saturating_sub(*spent);
            }
        }
        let tally = counted.tally;
        let verdict = classify(&tally);

        let mut logs = Vec::new();
        let mut elimination = None;

        // Phase A wins skip elimination entirely
        let mut victory = check_collector(&self.players, &tally);
        if victory.is_none() {
            match &verdict {
                Verdict::NoVotes => {
                    logs.push(LogEvent::public(LogMessage::NoVotes));
                    reset_tie_streaks(&mut self.players);
                }
                Verdict::Tie { candidates, votes } => {
                    logs.push(LogEvent::public(LogMessage::Tie {
                        candidates: candidates.clone(),
                        votes: *votes,
                    }));
                    victory = check_tie(&mut self.players, candidates);
                }
                Verdict::Single { target, .. } => {
                    reset_tie_streaks(&mut self.players);
                    let result = resolve_elimination(
                        &mut self.players,
                        &self.votes,
                        *target,
                        round,
                        rng,
                        &mut logs,
                    );
                    victory = check_elimination(&self.players, result.eliminated);
                    elimination = Some(result);
                }
            }
        }

        if victory.is_none() {
            let input = CounterInput {
                tally: &tally,
                votes: &self.votes,
                round,
            };
            victory = check_counters(&mut self.players, &mut self.predictions, &input, &mut logs);
        }

        let signature = Signature::new(&living_before, &tally);
        let deadlock = is_deadlock(&signature, recent, self.config.deadlock_repeats);

        self.logs.append(&mut logs);

        let outcome = if deadlock {
            Some(GameOutcome::Deadlock)
        } else if let Some(victory) = victory {
            Some(GameOutcome::Winner(victory))
        } else if self.alive_count() <= 1 {
            Some(GameOutcome::NoWinner)
        } else {
            None
        };

        match &outcome {
            Some(outcome) => self.finish(outcome.clone()),
            None => match &verdict {
                Verdict::Tie { candidates, .. } if self.guard_available() => {
                    self.logs.push(LogEvent::public(LogMessage::TieBreakPending {
                        candidates: candidates.clone(),
                    }));
                    self.phase = RoundPhase::AwaitingTieBreak {
                        round,
                        candidates: candidates.clone(),
                    };
                }
                _ => self.advance_to_night(round),
            },
        }

        DayReport {
            round,
            tally,
            verdict,
            elimination,
            outcome,
            signature: Some(signature),
            next_phase: self.phase.clone(),
        }
    }

    /// Balance guard resolves a pending tie by killing one tied candidate
    pub fn break_tie(
        &mut self,
        guardian_id: PlayerId,
        target_id: PlayerId,
    ) -> Result<TieBreakReport, GameError> {
        let (round, candidates) = match &self.phase {
            RoundPhase::AwaitingTieBreak { round, candidates } => (*round, candidates.clone()),
            RoundPhase::GameOver => return Err(GameError::GameOver),
            _ => return Err(GameError::InvalidPhase),
        };

        let guardian = self.living_player(guardian_id)?;
        if guardian.role != Some(Role::BalanceGuard) {
            return Err(GameError::WrongActionType);
        }
        if guardian.effects.balance_guard_used {
            return Err(GameError::AbilityUsed);
        }
        if !candidates.contains(&target_id) {
            return Err(GameError::InvalidTarget);
        }
        self.living_player(target_id)?;

        let mut next = self.clone();
        let report = next.resolve_tie_break(round, guardian_id, target_id);
        *self = next;
        Ok(report)
    }

    fn resolve_tie_break(
        &mut self,
        round: u32,
        guardian_id: PlayerId,
        target_id: PlayerId,
    ) -> TieBreakReport {
        if let Some(guardian) = self.get_player_mut(guardian_id) {
            guardian.effects.balance_guard_used = true;
        }
        if let Some(target) = self.get_player_mut(target_id) {
            target.kill(round, DeathCause::Skill);
        }
        self.logs
            .push(LogEvent::public(LogMessage::TieBroken { target: target_id }));

        let cascade = cascade_deaths(&mut self.players, target_id, round, &mut self.logs);

        // The day's counters ran before this death, so the multi-target
        // history picks it up here
        let victory = check_elimination(&self.players, target_id)
            .or_else(|| check_multi_target(&mut self.players, &self.votes, round));

        let outcome = match victory {
            Some(victory) => Some(GameOutcome::Winner(victory)),
            None if self.alive_count() <= 1 => Some(GameOutcome::NoWinner),
            None => None,
        };

        match &outcome {
            Some(outcome) => self.finish(outcome.clone()),
            None => self.advance_to_night(round),
        }

        TieBreakReport {
            target: target_id,
            cascade,
            outcome,
            next_phase: self.phase.clone(),
        }
    }

    // ==================== Queries ====================

    /// Tied candidates while a manual tie-break is pending
    pub fn tie_candidates(&self) -> Option<&[PlayerId]> {
        match &self.phase {
            RoundPhase::AwaitingTieBreak { candidates, .. } => Some(candidates),
            _ => None,
        }
    }

    /// Log entries the given player may read, oldest first
    pub fn logs_for(&self, viewer: PlayerId) -> Vec<&LogEvent> {
        self.logs.iter().filter(|l| l.visible_to(viewer)).collect()
    }

    // ==================== Helper Methods ====================

    fn guard_available(&self) -> bool {
        self.players
            .iter()
            .any(|p| p.is_living(Role::BalanceGuard) && !p.effects.balance_guard_used)
    }

    fn advance_to_night(&mut self, round: u32) {
        self.votes.clear();
        self.phase = RoundPhase::Night(round + 1);
    }

    fn finish(&mut self, outcome: GameOutcome) {
        let message = match &outcome {
            GameOutcome::Winner(victory) => LogMessage::Victory(victory.clone()),
            GameOutcome::Deadlock => LogMessage::Deadlock,
            GameOutcome::NoWinner => LogMessage::NoWinner,
        };
        self.logs.push(LogEvent::public(message));
        self.outcome = Some(outcome);
        self.phase = RoundPhase::GameOver;
    }
}
