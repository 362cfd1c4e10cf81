//! Integration tests for the Intrigue round engine.
//!
//! These tests drive complete rounds through the public API, from game start
//! through night and day resolution to game over.

use intrigue_core::*;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A started game plus the signature history a host would keep for it
struct Table {
    game: GameState,
    history: Vec<Signature>,
    rng: StdRng,
}

impl Table {
    fn new(roles: &[Role]) -> Self {
        let assignments = roles
            .iter()
            .enumerate()
            .map(|(i, &role)| RoleAssignment {
                player_id: i as PlayerId + 1,
                name: format!("Player {}", i + 1),
                role,
            })
            .collect();

        let mut game = GameState::new("TEST", RulesConfig::default());
        game.start(assignments).unwrap();

        Self {
            game,
            history: Vec::new(),
            rng: StdRng::seed_from_u64(2024),
        }
    }

    /// Submit night actions and resolve the night
    fn night(&mut self, actions: &[(PlayerId, PlayerId, NightActionKind)]) -> NightOutcome {
        for &(actor, target, kind) in actions {
            self.game
                .submit_night_action(SubmitNightAction {
                    actor_id: actor,
                    target_id: Some(target),
                    action_type: kind,
                    predicted_voter_id: None,
                })
                .unwrap();
        }
        self.game.process_night().unwrap()
    }

    /// Submit votes and resolve the day
    fn day(&mut self, votes: &[(PlayerId, PlayerId)]) -> DayReport {
        for &(voter, target) in votes {
            self.game
                .submit_vote(SubmitVote {
                    voter_id: voter,
                    target_id: Some(target),
                    use_stored_votes_count: None,
                })
                .unwrap();
        }
        let report = self.game.process_day(&self.history, &mut self.rng).unwrap();
        if let Some(signature) = &report.signature {
            self.history.push(signature.clone());
        }
        report
    }

    fn player(&self, id: PlayerId) -> &Player {
        self.game.get_player(id).unwrap()
    }
}

const FILLER: [Role; 6] = [
    Role::Observer,
    Role::Guardian,
    Role::Silencer,
    Role::VoteBlocker,
    Role::VoteReducer,
    Role::NoVoteWinner,
];

fn with_fillers(first: &[Role], total: usize) -> Vec<Role> {
    let mut roles = first.to_vec();
    roles.extend(FILLER.iter().copied().filter(|r| !first.contains(r)));
    roles.truncate(total);
    roles
}

#[test]
fn test_clear_majority_eliminates_by_vote() {
    let mut table = Table::new(&[
        Role::Observer,
        Role::Guardian,
        Role::Silencer,
        Role::VoteBlocker,
        Role::Ally,
    ]);
    table.night(&[]);

    let report = table.day(&[(2, 1), (3, 1), (4, 1), (1, 2), (5, 2)]);

    assert_eq!(report.tally.max(), 3);
    assert_eq!(report.verdict, Verdict::Single { target: 1, votes: 3 });
    let eliminated = report.elimination.unwrap();
    assert_eq!(eliminated.eliminated, 1);
    assert_eq!(table.player(1).death.map(|d| d.cause), Some(DeathCause::Vote));
    assert_eq!(table.game.phase, RoundPhase::Night(2));
}

#[test]
fn test_even_split_is_a_tie_and_advances_tie_breaker() {
    let mut table = Table::new(&[Role::TieBreaker, Role::Observer, Role::Guardian, Role::Silencer]);
    table.night(&[]);

    let report = table.day(&[(1, 3), (2, 3), (3, 2), (4, 2)]);

    assert_eq!(
        report.verdict,
        Verdict::Tie {
            candidates: vec![2, 3],
            votes: 2
        }
    );
    assert_eq!(report.elimination, None);
    assert_eq!(table.game.alive_count(), 4);
    assert_eq!(table.player(1).streaks.tie, 1);
    assert_eq!(table.game.phase, RoundPhase::Night(2));
}

#[test]
fn test_lone_double_voter_counts_two() {
    let mut table = Table::new(&[Role::DoubleVoter, Role::Observer, Role::Guardian, Role::Silencer]);
    table.night(&[]);

    let report = table.day(&[(1, 3)]);

    assert_eq!(report.tally.get(3), 2);
}

#[test]
fn test_collector_wins_before_elimination() {
    let roles = with_fillers(&[Role::Collector], 6);

    let mut short = Table::new(&roles);
    short.night(&[]);
    let report = short.day(&[(2, 1), (3, 1), (4, 1)]);
    assert_eq!(report.outcome, None);
    assert!(!short.player(1).alive);

    let mut table = Table::new(&roles);
    table.night(&[]);
    let report = table.day(&[(2, 1), (3, 1), (4, 1), (6, 1)]);

    assert_eq!(
        report.outcome,
        Some(GameOutcome::Winner(Victory {
            winner: 1,
            condition: WinCondition::Collector { votes: 4 },
            stolen_from: None,
        }))
    );
    assert_eq!(report.elimination, None);
    assert!(table.player(1).alive);
    assert!(table.game.is_finished());
}

#[test]
fn test_three_identical_days_deadlock() {
    let mut table = Table::new(&[Role::Observer, Role::Guardian, Role::Silencer, Role::VoteBlocker]);

    for round in 1..=2 {
        table.night(&[]);
        let report = table.day(&[(1, 2), (2, 1)]);
        assert_eq!(report.outcome, None, "round {} should not end the game", round);
    }

    table.night(&[]);
    let report = table.day(&[(1, 2), (2, 1)]);

    assert_eq!(report.outcome, Some(GameOutcome::Deadlock));
    assert_eq!(table.game.winner(), None);
    assert!(table.game.is_finished());
}

#[test]
fn test_pact_votes_and_co_vote_bonus() {
    let mut table = Table::new(&[
        Role::Ally,
        Role::Observer,
        Role::Guardian,
        Role::Silencer,
        Role::VoteBlocker,
    ]);
    table.night(&[(1, 2, NightActionKind::AllyBind)]);
    assert_eq!(table.player(2).effects.ally, Some(1));

    let report = table.day(&[(1, 2), (2, 1), (3, 4)]);
    assert_eq!(report.tally.get(1), 0);
    assert_eq!(report.tally.get(2), 0);
    assert_eq!(report.tally.get(4), 1);

    table.night(&[]);
    let report = table.day(&[(1, 3), (2, 3), (5, 1)]);
    assert_eq!(report.tally.get(3), 3);
}

#[test]
fn test_reverse_vote_fires_once_per_game() {
    let roles = with_fillers(&[Role::ReverseVoter], 6);
    let mut table = Table::new(&roles);
    table.night(&[]);

    let report = table.day(&[(2, 1), (3, 1), (1, 4)]);
    let first = report.elimination.unwrap();
    assert_eq!(first.reversed_by, Some(1));
    assert!([2, 3].contains(&first.eliminated));
    assert!(table.player(1).alive);
    assert!(table.player(1).effects.reverse_vote_used);

    table.night(&[]);
    let report = table.day(&[(4, 1), (5, 1)]);
    let second = report.elimination.unwrap();
    assert_eq!(second.reversed_by, None);
    assert_eq!(second.eliminated, 1);
}

#[test]
fn test_victory_steal_takes_tie_win() {
    let mut table = Table::new(&[
        Role::TieWinner,
        Role::VictoryStealer,
        Role::Observer,
        Role::Guardian,
    ]);
    table.night(&[(2, 1, NightActionKind::VictorySteal)]);

    let report = table.day(&[(3, 1), (4, 2)]);

    assert_eq!(
        report.outcome,
        Some(GameOutcome::Winner(Victory {
            winner: 2,
            condition: WinCondition::TieWinner,
            stolen_from: Some(1),
        }))
    );
}

#[test]
fn test_shadow_winner_wins_when_target_falls() {
    let roles = with_fillers(&[Role::ShadowWinner], 5);
    let mut table = Table::new(&roles);
    table.night(&[(1, 3, NightActionKind::ShadowBind)]);

    let report = table.day(&[(2, 3), (4, 3)]);

    assert_eq!(
        table.game.winner().map(|v| v.condition.clone()),
        Some(WinCondition::Shadow { target: 3 })
    );
    assert!(matches!(report.outcome, Some(GameOutcome::Winner(_))));
}

#[test]
fn test_three_survivors_win() {
    let mut table = Table::new(&[Role::ThreeKing, Role::Observer, Role::Guardian, Role::Silencer]);
    table.night(&[]);

    table.day(&[(1, 4), (2, 4)]);

    let victory = table.game.winner().unwrap();
    assert_eq!(victory.winner, 1);
    assert_eq!(victory.condition, WinCondition::ThreeSurvivors);
}

#[test]
fn test_fate_copier_dies_with_source() {
    let roles = with_fillers(&[Role::FateCopier], 6);
    let mut table = Table::new(&roles);
    table.night(&[(1, 2, NightActionKind::CopyFate)]);

    let report = table.day(&[(3, 2), (4, 2)]);

    assert_eq!(report.elimination.map(|e| e.cascade), Some(vec![1]));
    assert_eq!(table.player(1).death.map(|d| d.cause), Some(DeathCause::Skill));
    assert_eq!(table.game.alive_count(), 4);
}

#[test]
fn test_fate_copier_dies_with_tie_break_victim() {
    let roles = with_fillers(&[Role::FateCopier, Role::BalanceGuard], 5);
    let mut table = Table::new(&roles);
    table.night(&[(1, 3, NightActionKind::CopyFate)]);

    let report = table.day(&[(2, 3), (4, 5)]);
    assert_eq!(
        report.next_phase,
        RoundPhase::AwaitingTieBreak {
            round: 1,
            candidates: vec![3, 5]
        }
    );

    let report = table.game.break_tie(2, 3).unwrap();

    assert_eq!(report.cascade, vec![1]);
    assert_eq!(report.outcome, None);
    assert_eq!(table.player(1).death.map(|d| d.cause), Some(DeathCause::Skill));
    assert_eq!(table.game.alive_count(), 3);
    assert_eq!(table.game.phase, RoundPhase::Night(2));
}

#[test]
fn test_fate_transfer_partner_dies_instead() {
    let roles = with_fillers(&[Role::FateTransfer], 5);
    let mut table = Table::new(&roles);
    table.night(&[(1, 2, NightActionKind::FateTransfer)]);

    let report = table.day(&[(3, 1), (4, 1)]);

    let elimination = report.elimination.unwrap();
    assert_eq!(elimination.voted, 1);
    assert_eq!(elimination.eliminated, 2);
    assert!(table.player(1).alive);
    assert!(!table.player(2).alive);
    assert!(table.game.logs.contains(&LogEvent::public(LogMessage::FateSwapped {
        voted: 1,
        substitute: 2,
    })));
}

#[test]
fn test_vote_balancer_wins_on_steady_tally() {
    let mut table = Table::new(&[Role::VoteBalancer, Role::Observer, Role::Guardian, Role::Silencer]);
    table.night(&[]);
    let report = table.day(&[(1, 2), (3, 4)]);
    assert_eq!(report.outcome, None);
    assert_eq!(table.player(1).streaks.balance, 1);

    table.night(&[]);
    table.day(&[(1, 3), (2, 4)]);

    let victory = table.game.winner().unwrap();
    assert_eq!(victory.winner, 1);
    assert_eq!(victory.condition, WinCondition::VoteBalance { streak: 2 });
}

#[test]
fn test_multi_target_wins_on_distinct_fallen_targets() {
    let roles = with_fillers(&[Role::MultiTarget], 6);
    let mut table = Table::new(&roles);
    table.night(&[]);
    let report = table.day(&[(1, 3), (2, 3)]);
    assert_eq!(report.outcome, None);
    assert_eq!(table.player(1).streaks.vote_history, vec![3]);

    table.night(&[]);
    table.day(&[(1, 4), (2, 4)]);

    let victory = table.game.winner().unwrap();
    assert_eq!(victory.winner, 1);
    assert_eq!(victory.condition, WinCondition::MultiTarget { distinct: 2 });
}

#[test]
fn test_copied_victory_steal_takes_collector_win() {
    let mut table = Table::new(&[
        Role::FateCopier,
        Role::VictoryStealer,
        Role::Collector,
        Role::Observer,
        Role::Guardian,
        Role::Silencer,
    ]);
    table.night(&[(1, 2, NightActionKind::CopyFate)]);
    table.day(&[]);

    table.night(&[(1, 3, NightActionKind::VictorySteal)]);
    let report = table.day(&[(2, 3), (4, 3), (5, 3), (6, 3)]);

    assert_eq!(
        report.outcome,
        Some(GameOutcome::Winner(Victory {
            winner: 1,
            condition: WinCondition::Collector { votes: 4 },
            stolen_from: Some(3),
        }))
    );
}

#[test]
fn test_copied_prediction_is_settled() {
    let mut table = Table::new(&[Role::FateCopier, Role::MindReader, Role::Observer, Role::Guardian]);
    table.night(&[(1, 2, NightActionKind::CopyFate)]);
    table.day(&[]);

    table
        .game
        .submit_night_action(SubmitNightAction {
            actor_id: 1,
            target_id: Some(4),
            action_type: NightActionKind::PredictVote,
            predicted_voter_id: Some(3),
        })
        .unwrap();
    table.game.process_night().unwrap();
    let report = table.day(&[(3, 4)]);

    assert_eq!(report.outcome, None);
    assert_eq!(table.game.predictions.len(), 1);
    assert_eq!(table.game.predictions[0].correct, Some(true));
    assert_eq!(table.player(1).streaks.mind_reader, 0);
    assert!(table
        .game
        .logs_for(1)
        .contains(&&LogEvent::private(vec![1], LogMessage::PredictionChecked { correct: true })));
}

#[test]
fn test_copied_guardian_protects_from_round_two() {
    let roles = with_fillers(&[Role::FateCopier, Role::Guardian], 6);
    let mut table = Table::new(&roles);
    table.night(&[(1, 2, NightActionKind::CopyFate)]);
    table.day(&[]);

    table.night(&[(1, 4, NightActionKind::Protect)]);
    let report = table.day(&[(3, 4), (5, 4)]);

    assert_eq!(report.tally.get(4), 0);
    assert_eq!(report.verdict, Verdict::NoVotes);
}

#[test]
fn test_mind_reader_wins_on_streak() {
    let mut table = Table::new(&[Role::MindReader, Role::Observer, Role::Guardian, Role::Silencer]);

    for (round, target) in [(1, 3), (2, 4)] {
        table
            .game
            .submit_night_action(SubmitNightAction {
                actor_id: 1,
                target_id: Some(target),
                action_type: NightActionKind::PredictVote,
                predicted_voter_id: Some(2),
            })
            .unwrap();
        table.game.process_night().unwrap();
        let report = table.day(&[(2, target)]);
        assert_eq!(report.round, round);
    }

    assert_eq!(
        table.game.winner().map(|v| v.condition.clone()),
        Some(WinCondition::MindReader { streak: 2 })
    );
    assert!(table.game.predictions.iter().all(|p| p.correct == Some(true)));
}

#[test]
fn test_banked_votes_ride_on_a_later_vote() {
    let roles = with_fillers(&[Role::VoteRecycler], 6);
    let mut table = Table::new(&roles);
    table.night(&[]);
    assert_eq!(table.game.bank_vote(1), Ok(1));
    table.day(&[]);

    table.night(&[]);
    let report = table.day(&[(1, 3)]);

    assert_eq!(report.tally.get(3), 2);
    assert_eq!(table.player(1).effects.stored_votes, 0);
}

#[test]
fn test_day_resolution_is_deterministic() {
    let roles = with_fillers(&[Role::ReverseVoter, Role::VoteBalancer], 6);
    let mut table = Table::new(&roles);
    table.night(&[]);
    for (voter, target) in [(2, 1), (3, 1), (4, 1), (5, 2)] {
        table
            .game
            .submit_vote(SubmitVote {
                voter_id: voter,
                target_id: Some(target),
                use_stored_votes_count: None,
            })
            .unwrap();
    }

    let mut left = table.game.clone();
    let mut right = table.game.clone();
    let a = left.process_day(&[], &mut StdRng::seed_from_u64(11)).unwrap();
    let b = right.process_day(&[], &mut StdRng::seed_from_u64(11)).unwrap();

    assert_eq!(a, b);
    assert_eq!(left, right);
}

#[test]
fn test_rejected_submission_leaves_state_untouched() {
    let mut table = Table::new(&[Role::Observer, Role::Guardian, Role::Silencer, Role::VoteBlocker]);
    table.night(&[]);
    let before = table.game.clone();

    let err = table
        .game
        .submit_vote(SubmitVote {
            voter_id: 1,
            target_id: Some(42),
            use_stored_votes_count: None,
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(table.game, before);
}
