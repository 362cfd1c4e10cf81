//! Elimination resolver.
//!
//! This module contains:
//! - Classification of a tally into no-votes, tie or a single candidate
//! - The redirection chain for a single candidate (reverse vote, fate transfer)
//! - The one-level copy-fate cascade

use crate::actions::{LogEvent, LogMessage, Vote};
use crate::player::{DeathCause, Player, PlayerId};
use crate::roles::Role;
use crate::tally::Tally;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// What a tally decides before any redirection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    NoVotes,
    Tie { candidates: Vec<PlayerId>, votes: u32 },
    Single { target: PlayerId, votes: u32 },
}

/// Classify a tally. Exactly one verdict applies to any tally.
pub fn classify(tally: &Tally) -> Verdict {
    let votes = tally.max();
    if votes == 0 {
        return Verdict::NoVotes;
    }
    match tally.leaders().as_slice() {
        [target] => Verdict::Single {
            target: *target,
            votes,
        },
        candidates => Verdict::Tie {
            candidates: candidates.to_vec(),
            votes,
        },
    }
}

/// A completed elimination chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Elimination {
    /// The sole candidate of the tally
    pub voted: PlayerId,
    /// The player who actually died by vote
    pub eliminated: PlayerId,
    /// Reverse voter whose ability redirected the elimination
    pub reversed_by: Option<PlayerId>,
    /// Players who died with the eliminated player
    pub cascade: Vec<PlayerId>,
}

fn index_of(players: &[Player], id: PlayerId) -> Option<usize> {
    players.iter().position(|p| p.id == id)
}

fn is_alive(players: &[Player], id: PlayerId) -> bool {
    index_of(players, id).is_some_and(|idx| players[idx].alive)
}

/// Living fate-transfer partner of a player.
///
/// The player's own pointer wins; otherwise the lowest-id living player
/// whose pointer names them.
pub fn fate_partner(players: &[Player], id: PlayerId) -> Option<PlayerId> {
    let own = index_of(players, id)
        .and_then(|idx| players[idx].effects.fate_partner)
        .filter(|&partner| partner != id && is_alive(players, partner));
    if own.is_some() {
        return own;
    }

    players
        .iter()
        .filter(|p| p.alive && p.id != id && p.effects.fate_partner == Some(id))
        .map(|p| p.id)
        .min()
}

/// Kill every living player whose copied-from pointer names `source`.
///
/// One level only: cascade victims do not cascade further.
pub fn cascade_deaths(
    players: &mut [Player],
    source: PlayerId,
    round: u32,
    logs: &mut Vec<LogEvent>,
) -> Vec<PlayerId> {
    let mut victims = Vec::new();
    for player in players.iter_mut() {
        if player.alive && player.effects.copied.is_some_and(|c| c.from == source) {
            player.kill(round, DeathCause::Skill);
            victims.push(player.id);
            logs.push(LogEvent::public(LogMessage::CascadeDeath {
                player: player.id,
                source,
            }));
        }
    }
    victims
}

fn reverse_vote<R: Rng + ?Sized>(
    players: &mut [Player],
    votes: &[Vote],
    candidate: PlayerId,
    rng: &mut R,
) -> Option<PlayerId> {
    let idx = index_of(players, candidate)?;
    let holder = &players[idx];
    if holder.role != Some(Role::ReverseVoter) || holder.effects.reverse_vote_used {
        return None;
    }

    let mut voters: Vec<PlayerId> = votes
        .iter()
        .filter(|v| v.target == Some(candidate) && v.voter != candidate)
        .map(|v| v.voter)
        .filter(|&voter| is_alive(players, voter))
        .collect();
    voters.sort_unstable();
    voters.dedup();

    let substitute = *voters.choose(rng)?;
    players[idx].effects.reverse_vote_used = true;
    Some(substitute)
}

/// Run the elimination chain for a single candidate.
pub fn resolve_elimination<R: Rng + ?Sized>(
    players: &mut [Player],
    votes: &[Vote],
    candidate: PlayerId,
    round: u32,
    rng: &mut R,
    logs: &mut Vec<LogEvent>,
) -> Elimination {
    let mut target = candidate;
    let mut reversed_by = None;

    if let Some(substitute) = reverse_vote(players, votes, candidate, rng) {
        logs.push(LogEvent::public(LogMessage::ReverseVote {
            reverser: candidate,
            substitute,
        }));
        reversed_by = Some(candidate);
        target = substitute;
    }

    if let Some(partner) = fate_partner(players, target) {
        logs.push(LogEvent::public(LogMessage::FateSwapped {
            voted: target,
            substitute: partner,
        }));
        target = partner;
    }

    if let Some(idx) = index_of(players, target) {
        players[idx].kill(round, DeathCause::Vote);
    }
    logs.push(LogEvent::public(LogMessage::Eliminated { player: target }));

    let cascade = cascade_deaths(players, target, round, logs);

    Elimination {
        voted: candidate,
        eliminated: target,
        reversed_by,
        cascade,
    }
}
