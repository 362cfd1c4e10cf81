//! Room service: runs engine operations against stored rooms.

use intrigue_core::deadlock::WINDOW;
use intrigue_core::{
    DayReport, ErrorKind, GameError, GameState, LogEvent, NightOutcome, PlayerId, RoleAssignment,
    RoundPhase, RulesConfig, SubmitNightAction, SubmitVote, TieBreakReport,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::store::{DeadlockSnapshot, RoomStore, StoreError};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error class reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Validation,
    NotFound,
    Conflict,
    Persistence,
}

impl RoomError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RoomError::RoomNotFound(_) => ErrorClass::NotFound,
            RoomError::Game(e) => match e.kind() {
                ErrorKind::Validation => ErrorClass::Validation,
                ErrorKind::NotFound => ErrorClass::NotFound,
            },
            RoomError::Store(StoreError::Missing(_)) => ErrorClass::NotFound,
            RoomError::Store(StoreError::Conflict { .. }) => ErrorClass::Conflict,
            RoomError::Store(StoreError::Unavailable(_)) => ErrorClass::Persistence,
        }
    }
}

/// Engine operations bound to a store.
///
/// Every mutating call loads the room, applies one engine operation to a
/// private copy and commits it against the loaded revision.
pub struct RoomService<S> {
    store: S,
    config: RulesConfig,
}

impl<S: RoomStore> RoomService<S> {
    pub fn new(store: S, config: RulesConfig) -> Self {
        Self { store, config }
    }

    fn load(&self, code: &str) -> Result<(u64, GameState), RoomError> {
        let stored = self
            .store
            .load(code)?
            .ok_or_else(|| RoomError::RoomNotFound(code.to_string()))?;
        Ok((stored.revision, stored.game))
    }

    fn mutate<T>(
        &self,
        code: &str,
        op: impl FnOnce(&mut GameState) -> Result<T, GameError>,
    ) -> Result<T, RoomError> {
        let (revision, mut game) = self.load(code)?;
        let out = op(&mut game)?;
        self.store.commit(code, revision, game)?;
        Ok(out)
    }

    /// Start (or restart) the game in a room, creating the room if needed
    pub fn start_game(
        &self,
        code: &str,
        assignments: Vec<RoleAssignment>,
    ) -> Result<RoundPhase, RoomError> {
        let (revision, mut game) = match self.store.load(code)? {
            Some(stored) => (Some(stored.revision), stored.game),
            None => (None, GameState::new(code, self.config.clone())),
        };

        game.start(assignments)?;
        let phase = game.phase.clone();
        let players = game.players.len();

        // Old signatures must never reach the new game
        self.store.purge_signatures(code)?;
        match revision {
            Some(revision) => {
                self.store.commit(code, revision, game)?;
            }
            None => {
                self.store.insert(game)?;
            }
        }

        info!("Room {} started with {} players", code, players);
        Ok(phase)
    }

    pub fn submit_night_action(
        &self,
        code: &str,
        request: SubmitNightAction,
    ) -> Result<(), RoomError> {
        self.mutate(code, |game| game.submit_night_action(request))
    }

    pub fn submit_vote(&self, code: &str, request: SubmitVote) -> Result<(), RoomError> {
        self.mutate(code, |game| game.submit_vote(request))
    }

    pub fn bank_vote(&self, code: &str, voter: PlayerId) -> Result<u32, RoomError> {
        self.mutate(code, |game| game.bank_vote(voter))
    }

    /// Resolve the night. Returns the outcome and the phase it led to.
    pub fn process_night(&self, code: &str) -> Result<(NightOutcome, RoundPhase), RoomError> {
        let (outcome, phase) = self.mutate(code, |game| {
            let outcome = game.process_night()?;
            Ok((outcome, game.phase.clone()))
        })?;
        info!("Room {} night resolved, {} silenced", code, outcome.silenced);
        Ok((outcome, phase))
    }

    /// Resolve the day, then record its signature.
    ///
    /// A failed signature write is logged and otherwise ignored.
    pub fn process_day(&self, code: &str) -> Result<DayReport, RoomError> {
        let recent = self.store.recent_signatures(code, WINDOW)?;
        let mut rng = rand::thread_rng();
        let report = self.mutate(code, |game| game.process_day(&recent, &mut rng))?;

        if let Some(signature) = &report.signature {
            let snapshot = DeadlockSnapshot {
                round: report.round,
                signature: signature.clone(),
            };
            if let Err(e) = self.store.append_signature(code, snapshot) {
                warn!("Room {}: failed to record day signature: {}", code, e);
            }
        }

        info!(
            "Room {} day {} resolved: {:?}, next phase {:?}",
            code, report.round, report.outcome, report.next_phase
        );
        Ok(report)
    }

    pub fn break_tie(
        &self,
        code: &str,
        guardian: PlayerId,
        target: PlayerId,
    ) -> Result<TieBreakReport, RoomError> {
        let report = self.mutate(code, |game| game.break_tie(guardian, target))?;
        info!("Room {} tie broken by {} on {}", code, guardian, target);
        Ok(report)
    }

    pub fn tie_candidates(&self, code: &str) -> Result<Option<Vec<PlayerId>>, RoomError> {
        let (_, game) = self.load(code)?;
        Ok(game.tie_candidates().map(<[PlayerId]>::to_vec))
    }

    pub fn logs_for(&self, code: &str, viewer: PlayerId) -> Result<Vec<LogEvent>, RoomError> {
        let (_, game) = self.load(code)?;
        Ok(game.logs_for(viewer).into_iter().cloned().collect())
    }
}
