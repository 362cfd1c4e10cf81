//! Weighted vote tally.
//!
//! Aggregates one day's votes into per-target counts, applying role weights,
//! banked votes, pact invalidation and the pact co-vote bonus, then the
//! vote-reducer and protection adjustments.

use crate::actions::Vote;
use crate::player::{Player, PlayerId};
use crate::roles::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-target weighted counts for one day, covering every living player
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    counts: BTreeMap<PlayerId, u32>,
}

impl Tally {
    /// Count for a target; players missing from the tally count zero
    pub fn get(&self, id: PlayerId) -> u32 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// Highest count in the tally
    pub fn max(&self) -> u32 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    /// All targets reaching the highest count, ascending by id
    pub fn leaders(&self) -> Vec<PlayerId> {
        let max = self.max();
        self.counts
            .iter()
            .filter(|(_, &count)| count == max)
            .map(|(&id, _)| id)
            .collect()
    }

    /// (target, count) pairs with a positive count, ascending by id
    pub fn positive(&self) -> Vec<(PlayerId, u32)> {
        self.counts
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(&id, &count)| (id, count))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, u32)> + '_ {
        self.counts.iter().map(|(&id, &count)| (id, count))
    }

    fn add(&mut self, id: PlayerId, amount: u32) {
        if let Some(count) = self.counts.get_mut(&id) {
            *count += amount;
        }
    }
}

impl FromIterator<(PlayerId, u32)> for Tally {
    fn from_iter<I: IntoIterator<Item = (PlayerId, u32)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

/// A tally plus the banked votes it consumed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallyOutcome {
    pub tally: Tally,
    /// Banked votes spent per voter; the caller debits the banks
    pub banked_spent: Vec<(PlayerId, u32)>,
}

fn find(players: &[Player], id: PlayerId) -> Option<&Player> {
    players.iter().find(|p| p.id == id)
}

fn in_pact(a: &Player, b: &Player) -> bool {
    a.effects.ally == Some(b.id) || b.effects.ally == Some(a.id)
}

/// Aggregate `votes` into a tally over the living `players`.
pub fn tally_votes(players: &[Player], votes: &[Vote]) -> TallyOutcome {
    let mut tally: Tally = players
        .iter()
        .filter(|p| p.alive)
        .map(|p| (p.id, 0))
        .collect();
    let mut banked_spent = Vec::new();

    for vote in votes {
        let Some(target_id) = vote.target else {
            continue;
        };
        let Some(voter) = find(players, vote.voter).filter(|v| v.alive) else {
            continue;
        };
        let Some(target) = find(players, target_id).filter(|t| t.alive) else {
            continue;
        };
        if voter.flags.cannot_vote || voter.flags.vote_banked {
            continue;
        }
        if in_pact(voter, target) {
            continue;
        }

        let mut weight = if voter.role.is_some_and(Role::doubles_votes) {
            2
        } else {
            1
        };

        if voter.role.is_some_and(Role::banks_votes) {
            let bank = voter.effects.stored_votes;
            let spend = vote.stored_votes.unwrap_or(bank).min(bank);
            if spend > 0 {
                weight += spend;
                banked_spent.push((voter.id, spend));
            }
        }

        tally.add(target_id, weight);
    }

    // Pact co-vote bonus, once per living pact from its lower-id member
    for first in players.iter().filter(|p| p.alive) {
        let Some(second) = first
            .effects
            .ally
            .filter(|&partner| first.id < partner)
            .and_then(|partner| find(players, partner))
            .filter(|p| p.alive && p.effects.ally == Some(first.id))
        else {
            continue;
        };

        let target_of = |id: PlayerId| votes.iter().find(|v| v.voter == id).and_then(|v| v.target);
        if let (Some(a), Some(b)) = (target_of(first.id), target_of(second.id)) {
            if a == b {
                tally.add(a, 1);
            }
        }
    }

    for player in players.iter().filter(|p| p.alive) {
        let Some(count) = tally.counts.get_mut(&player.id) else {
            continue;
        };
        if player.role.is_some_and(Role::reduces_votes) && *count > 0 {
            *count -= 1;
        }
        if player.flags.protected {
            *count = 0;
        }
    }

    TallyOutcome {
        tally,
        banked_spent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vote(voter: PlayerId, target: Option<PlayerId>) -> Vote {
        Vote {
            voter,
            target,
            round: 1,
            stored_votes: None,
        }
    }

    fn plain(ids: &[PlayerId]) -> Vec<Player> {
        ids.iter()
            .map(|&id| Player::with_role(id, format!("P{}", id), Role::Observer))
            .collect()
    }

    #[test]
    fn test_every_living_player_is_covered() {
        let mut players = plain(&[1, 2, 3]);
        players[2].alive = false;

        let outcome = tally_votes(&players, &[]);

        assert_eq!(outcome.tally.iter().collect::<Vec<_>>(), vec![(1, 0), (2, 0)]);
    }

    #[test]
    fn test_double_voter_counts_twice() {
        let mut players = plain(&[1, 2, 3]);
        players[0].role = Some(Role::DoubleVoter);

        let outcome = tally_votes(&players, &[vote(1, Some(3))]);

        assert_eq!(outcome.tally.get(3), 2);
    }

    #[test]
    fn test_pact_votes_never_count_either_direction() {
        let mut players = plain(&[1, 2, 3]);
        players[0].effects.ally = Some(2);
        players[1].effects.ally = Some(1);

        let outcome = tally_votes(&players, &[vote(1, Some(2)), vote(2, Some(1)), vote(3, Some(1))]);

        assert_eq!(outcome.tally.get(1), 1);
        assert_eq!(outcome.tally.get(2), 0);
    }

    #[test]
    fn test_pact_co_vote_bonus_applies_once() {
        let mut players = plain(&[1, 2, 3, 4]);
        players[0].effects.ally = Some(2);
        players[1].effects.ally = Some(1);

        let outcome = tally_votes(&players, &[vote(1, Some(3)), vote(2, Some(3))]);

        assert_eq!(outcome.tally.get(3), 3);
    }

    #[test]
    fn test_dead_partner_voids_bonus() {
        let mut players = plain(&[1, 2, 3]);
        players[0].effects.ally = Some(2);
        players[1].effects.ally = Some(1);
        players[1].alive = false;

        let outcome = tally_votes(&players, &[vote(1, Some(3)), vote(2, Some(3))]);

        assert_eq!(outcome.tally.get(3), 1);
    }

    #[test]
    fn test_vote_reducer_and_protection() {
        let mut players = plain(&[1, 2, 3, 4]);
        players[2].role = Some(Role::VoteReducer);
        players[3].flags.protected = true;

        let outcome = tally_votes(
            &players,
            &[vote(1, Some(3)), vote(2, Some(3)), vote(3, Some(4)), vote(4, Some(1))],
        );

        assert_eq!(outcome.tally.get(3), 1);
        assert_eq!(outcome.tally.get(4), 0);
        assert_eq!(outcome.tally.get(1), 1);
    }

    #[test]
    fn test_vote_reducer_never_goes_negative() {
        let mut players = plain(&[1, 2]);
        players[1].role = Some(Role::VoteReducer);

        let outcome = tally_votes(&players, &[]);

        assert_eq!(outcome.tally.get(2), 0);
    }

    #[test]
    fn test_banked_votes_are_spent_on_top_of_vote() {
        let mut players = plain(&[1, 2]);
        players[0].role = Some(Role::VoteRecycler);
        players[0].effects.stored_votes = 3;

        let mut partial = vote(1, Some(2));
        partial.stored_votes = Some(2);
        let outcome = tally_votes(&players, &[partial]);
        assert_eq!(outcome.tally.get(2), 3);
        assert_eq!(outcome.banked_spent, vec![(1, 2)]);

        let outcome = tally_votes(&players, &[vote(1, Some(2))]);
        assert_eq!(outcome.tally.get(2), 4);
        assert_eq!(outcome.banked_spent, vec![(1, 3)]);
    }

    #[test]
    fn test_abstain_and_blocked_votes_are_ignored() {
        let mut players = plain(&[1, 2, 3]);
        players[1].flags.cannot_vote = true;

        let outcome = tally_votes(&players, &[vote(1, None), vote(2, Some(3))]);

        assert_eq!(outcome.tally.max(), 0);
    }

    #[test]
    fn test_leaders_and_positive_pairs() {
        let tally: Tally = vec![(1, 2), (2, 0), (3, 2)].into_iter().collect();
        assert_eq!(tally.leaders(), vec![1, 3]);
        assert_eq!(tally.positive(), vec![(1, 2), (3, 2)]);
    }
}
