//! Win condition evaluation.
//!
//! Checks run in a fixed phase order and the first predicate that fires
//! wins the round:
//! - Phase A: collector, from the raw tally before any elimination
//! - Phase B: tie winner and tie breaker, on tied days only
//! - Phase B': shadow winner and three survivors, after a single elimination
//! - Phase C: streak and counter roles, every day while no one has won
//!
//! Any winner can be taken over by a living victory stealer who locked them.

use crate::actions::{LogEvent, LogMessage, Vote, VotePrediction};
use crate::player::{Player, PlayerId};
use crate::roles::{thresholds, Role};
use crate::tally::Tally;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The predicate that produced a victory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WinCondition {
    Collector { votes: u32 },
    TieWinner,
    TieBreaker { streak: u32 },
    Shadow { target: PlayerId },
    ThreeSurvivors,
    NoVote { streak: u32 },
    VoteBalance { streak: u32 },
    MindReader { streak: u32 },
    MultiTarget { distinct: u32 },
}

/// A decided winner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Victory {
    pub winner: PlayerId,
    pub condition: WinCondition,
    /// The player whose win was stolen, if any
    pub stolen_from: Option<PlayerId>,
}

/// Build a victory, applying the victory-steal override.
///
/// The lowest-id living player whose steal lock names the winner takes the
/// win. Locks are only ever taken through the victory-steal night action, so
/// this covers a fate copier acting as a stealer as well.
pub fn claim(players: &[Player], winner: PlayerId, condition: WinCondition) -> Victory {
    let stealer = players
        .iter()
        .filter(|p| {
            p.alive
                && p.id != winner
                && p.effects.victory_steal.is_some_and(|lock| lock.target == winner)
        })
        .map(|p| p.id)
        .min();

    match stealer {
        Some(thief) => Victory {
            winner: thief,
            condition,
            stolen_from: Some(winner),
        },
        None => Victory {
            winner,
            condition,
            stolen_from: None,
        },
    }
}

fn holders(players: &[Player], role: Role) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..players.len())
        .filter(|&i| players[i].is_living(role))
        .collect();
    idx.sort_by_key(|&i| players[i].id);
    idx
}

// ==================== Phase A ====================

/// Collector wins before elimination on a large enough share of the vote
pub fn check_collector(players: &[Player], tally: &Tally) -> Option<Victory> {
    let alive = players.iter().filter(|p| p.alive).count();
    let needed = thresholds::collector(alive);

    holders(players, Role::Collector).into_iter().find_map(|i| {
        let votes = tally.get(players[i].id);
        (votes > 0 && votes >= needed)
            .then(|| claim(players, players[i].id, WinCondition::Collector { votes }))
    })
}

// ==================== Phase B ====================

/// Tie branch: a tied tie winner wins, otherwise tie breakers advance
pub fn check_tie(players: &mut [Player], candidates: &[PlayerId]) -> Option<Victory> {
    if let Some(i) = holders(players, Role::TieWinner)
        .into_iter()
        .find(|&i| candidates.contains(&players[i].id))
    {
        return Some(claim(players, players[i].id, WinCondition::TieWinner));
    }

    let needed = thresholds::tie_breaker(players.len());
    let mut victory = None;
    for i in holders(players, Role::TieBreaker) {
        players[i].streaks.tie += 1;
        let streak = players[i].streaks.tie;
        if victory.is_none() && streak >= needed {
            victory = Some(claim(players, players[i].id, WinCondition::TieBreaker { streak }));
        }
    }
    victory
}

/// Any day that is not a tie breaks the tie streak
pub fn reset_tie_streaks(players: &mut [Player]) {
    for player in players.iter_mut() {
        player.streaks.tie = 0;
    }
}

// ==================== Phase B' ====================

/// Situation wins after a death has been applied.
///
/// `eliminated` is the final victim; deaths from cascades must already be
/// applied so the survivor count is exact.
pub fn check_elimination(players: &[Player], eliminated: PlayerId) -> Option<Victory> {
    if let Some(i) = holders(players, Role::ShadowWinner)
        .into_iter()
        .find(|&i| players[i].effects.shadow_target == Some(eliminated))
    {
        return Some(claim(
            players,
            players[i].id,
            WinCondition::Shadow { target: eliminated },
        ));
    }

    let alive = players.iter().filter(|p| p.alive).count();
    if alive == 3 {
        if let Some(&i) = holders(players, Role::ThreeKing).first() {
            return Some(claim(players, players[i].id, WinCondition::ThreeSurvivors));
        }
    }

    None
}

// ==================== Phase C ====================

/// Everything Phase C reads for one day
pub struct CounterInput<'a> {
    pub tally: &'a Tally,
    pub votes: &'a [Vote],
    pub round: u32,
}

/// Streak and counter wins, in fixed order: no-vote, vote balance, mind
/// reader, multi-target. Stops at the first win.
pub fn check_counters(
    players: &mut [Player],
    predictions: &mut [VotePrediction],
    input: &CounterInput<'_>,
    logs: &mut Vec<LogEvent>,
) -> Option<Victory> {
    check_no_vote(players, input.tally)
        .or_else(|| check_vote_balance(players, input.tally))
        .or_else(|| check_mind_reader(players, predictions, input, logs))
        .or_else(|| check_multi_target(players, input.votes, input.round))
}

fn check_no_vote(players: &mut [Player], tally: &Tally) -> Option<Victory> {
    let needed = thresholds::no_vote(players.len());
    for i in holders(players, Role::NoVoteWinner) {
        let player = &mut players[i];
        player.streaks.no_vote = if tally.get(player.id) == 0 {
            player.streaks.no_vote + 1
        } else {
            0
        };
        let streak = player.streaks.no_vote;
        if streak >= needed {
            return Some(claim(players, players[i].id, WinCondition::NoVote { streak }));
        }
    }
    None
}

fn check_vote_balance(players: &mut [Player], tally: &Tally) -> Option<Victory> {
    let needed = thresholds::vote_balance(players.len());
    for i in holders(players, Role::VoteBalancer) {
        let player = &mut players[i];
        let current = tally.get(player.id);
        player.streaks.balance = match player.streaks.last_tally {
            Some(last) if last == current => player.streaks.balance + 1,
            _ => 1,
        };
        player.streaks.last_tally = Some(current);
        let streak = player.streaks.balance;
        if streak >= needed {
            return Some(claim(players, players[i].id, WinCondition::VoteBalance { streak }));
        }
    }
    None
}

/// Verify every open prediction of the round, in predictor order.
///
/// Only a living mind reader builds a streak. Predictions made through a
/// copied role are still settled and reported to their author.
fn check_mind_reader(
    players: &mut [Player],
    predictions: &mut [VotePrediction],
    input: &CounterInput<'_>,
    logs: &mut Vec<LogEvent>,
) -> Option<Victory> {
    let needed = thresholds::mind_reader(players.len());
    let mut open: Vec<usize> = (0..predictions.len())
        .filter(|&i| predictions[i].round == input.round && predictions[i].correct.is_none())
        .collect();
    open.sort_by_key(|&i| predictions[i].predictor);

    let mut victory = None;
    for i in open {
        let prediction = &mut predictions[i];
        let predictor = prediction.predictor;

        // No vote on record never matches, not even a predicted abstention
        let correct = input
            .votes
            .iter()
            .find(|v| v.voter == prediction.voter)
            .is_some_and(|v| v.target == prediction.target);
        prediction.correct = Some(correct);

        let Some(player) = players
            .iter_mut()
            .find(|p| p.id == predictor && p.is_living(Role::MindReader))
        else {
            logs.push(LogEvent::private(
                vec![predictor],
                LogMessage::PredictionChecked { correct },
            ));
            continue;
        };

        player.streaks.mind_reader = if correct {
            player.streaks.mind_reader + 1
        } else {
            0
        };
        let streak = player.streaks.mind_reader;
        logs.push(LogEvent::private(
            vec![predictor],
            LogMessage::PredictionResult {
                correct,
                streak,
                threshold: needed,
            },
        ));
        if victory.is_none() && streak >= needed {
            victory = Some(claim(players, predictor, WinCondition::MindReader { streak }));
        }
    }
    victory
}

/// Record each holder's vote target if it died this round, then check the
/// distinct count. Run once per death event of the round.
pub fn check_multi_target(players: &mut [Player], votes: &[Vote], round: u32) -> Option<Victory> {
    let needed = thresholds::multi_target(players.len());
    for i in holders(players, Role::MultiTarget) {
        let id = players[i].id;
        let Some(target) = votes
            .iter()
            .find(|v| v.voter == id)
            .and_then(|v| v.target)
        else {
            continue;
        };
        let died_today = players
            .iter()
            .any(|p| p.id == target && p.died_in(round));
        if !died_today {
            continue;
        }

        let history = &mut players[i].streaks.vote_history;
        history.push(target);
        let distinct = history.iter().collect::<BTreeSet<_>>().len() as u32;
        if distinct >= needed {
            return Some(claim(players, id, WinCondition::MultiTarget { distinct }));
        }
    }
    None
}
