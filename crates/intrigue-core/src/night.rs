//! Night action processing.
//!
//! Actions are applied in the fixed order of [`NIGHT_PRIORITY`], never in
//! submission order. Holders of the same role act in ascending id order.
//! Transient flags from the previous night are cleared before anything is
//! applied, so every flag lasts exactly one day.

use crate::actions::{LogEvent, LogMessage, NightAction, VotePrediction};
use crate::player::{CopiedRole, Player, PlayerId, StealLock};
use crate::roles::{NightActionKind, Role, NIGHT_PRIORITY};
use serde::{Deserialize, Serialize};

/// Result of a night pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NightOutcome {
    pub logs: Vec<LogEvent>,
    /// Predictions written this night, one per predicting player at most
    pub predictions: Vec<VotePrediction>,
    /// Number of players silenced for the coming day
    pub silenced: usize,
}

fn index_of(players: &[Player], id: PlayerId) -> Option<usize> {
    players.iter().position(|p| p.id == id)
}

/// Resolve all night actions for `round` against `players`.
///
/// Missing or dead targets skip the effect rather than failing the pass.
pub fn resolve_night(players: &mut [Player], actions: &[NightAction], round: u32) -> NightOutcome {
    let mut outcome = NightOutcome::default();

    for player in players.iter_mut() {
        player.clear_round_flags();
    }

    for role in NIGHT_PRIORITY {
        let mut holders: Vec<PlayerId> = players
            .iter()
            .filter(|p| p.alive && p.acting_role(round) == Some(role))
            .map(|p| p.id)
            .collect();
        holders.sort_unstable();

        for actor in holders {
            let Some(action) = actions.iter().find(|a| a.actor == actor && a.round == round) else {
                continue;
            };
            apply_action(players, role, action, round, &mut outcome);
        }
    }

    outcome.silenced = players.iter().filter(|p| p.flags.silenced).count();
    outcome.logs.push(LogEvent::public(LogMessage::NightEnded {
        silenced: outcome.silenced,
    }));

    outcome
}

fn apply_action(
    players: &mut [Player],
    role: Role,
    action: &NightAction,
    round: u32,
    outcome: &mut NightOutcome,
) {
    let profile = role.profile();
    if profile.night_action != Some(action.kind) {
        return;
    }
    if profile.first_night_only && round != 1 {
        return;
    }

    let Some(actor_idx) = index_of(players, action.actor) else {
        return;
    };

    if action.kind == NightActionKind::PredictVote {
        record_prediction(players, action, round, outcome);
        return;
    }

    // Every other action needs a living target
    let Some(target_idx) = action
        .target
        .and_then(|t| index_of(players, t))
        .filter(|&idx| players[idx].alive)
    else {
        return;
    };
    let actor = action.actor;
    let target = players[target_idx].id;

    match action.kind {
        NightActionKind::Check => {
            outcome.logs.push(LogEvent::private(
                vec![actor],
                LogMessage::RoleRevealed {
                    target,
                    role: players[target_idx].role,
                },
            ));
        }

        NightActionKind::Protect => {
            players[target_idx].flags.protected = true;
            outcome.logs.push(LogEvent::private(
                vec![actor],
                LogMessage::ProtectionGranted { target },
            ));
        }

        NightActionKind::Silence => {
            players[target_idx].flags.silenced = true;
            outcome
                .logs
                .push(LogEvent::private(vec![target], LogMessage::Silenced));
        }

        NightActionKind::BlockVote => {
            players[target_idx].flags.cannot_vote = true;
            outcome
                .logs
                .push(LogEvent::private(vec![target], LogMessage::VoteBlocked));
        }

        NightActionKind::AllyBind => {
            // A pact is irreversible and each player can be in at most one
            if players[actor_idx].effects.ally.is_some() || players[target_idx].effects.ally.is_some()
            {
                return;
            }
            players[actor_idx].effects.ally = Some(target);
            players[target_idx].effects.ally = Some(actor);
            outcome.logs.push(LogEvent::private(
                vec![actor],
                LogMessage::PactFormed { partner: target },
            ));
            outcome.logs.push(LogEvent::private(
                vec![target],
                LogMessage::PactFormed { partner: actor },
            ));
        }

        NightActionKind::ShadowBind => {
            if players[actor_idx].effects.shadow_target.is_some() {
                return;
            }
            players[actor_idx].effects.shadow_target = Some(target);
            outcome.logs.push(LogEvent::private(
                vec![actor],
                LogMessage::ShadowLocked { target },
            ));
        }

        NightActionKind::CopyFate => {
            let Some(copied_role) = players[target_idx].role else {
                return;
            };
            if players[actor_idx].effects.copied.is_some() {
                return;
            }
            players[actor_idx].effects.copied = Some(CopiedRole {
                role: copied_role,
                from: target,
            });
            outcome.logs.push(LogEvent::private(
                vec![actor],
                LogMessage::FateCopied {
                    source: target,
                    role: copied_role,
                },
            ));
        }

        NightActionKind::FateTransfer => {
            players[actor_idx].effects.fate_partner = Some(target);
            outcome.logs.push(LogEvent::private(
                vec![actor],
                LogMessage::FateTransferred { partner: target },
            ));
        }

        NightActionKind::VictorySteal => {
            players[actor_idx].effects.victory_steal = Some(StealLock {
                target,
                role: players[target_idx].role,
            });
            outcome.logs.push(LogEvent::private(
                vec![actor],
                LogMessage::VictoryStealLocked { target },
            ));
        }

        // Recorded before the target lookup
        NightActionKind::PredictVote => {}
    }
}

fn record_prediction(
    players: &[Player],
    action: &NightAction,
    round: u32,
    outcome: &mut NightOutcome,
) {
    let Some(voter) = action
        .predicted_voter
        .filter(|&v| index_of(players, v).is_some_and(|idx| players[idx].alive))
    else {
        return;
    };
    if outcome
        .predictions
        .iter()
        .any(|p| p.predictor == action.actor && p.round == round)
    {
        return;
    }

    outcome.predictions.push(VotePrediction {
        predictor: action.actor,
        voter,
        target: action.target,
        round,
        correct: None,
    });
    outcome.logs.push(LogEvent::private(
        vec![action.actor],
        LogMessage::PredictionRecorded { voter },
    ));
}
