//! Deadlock detection.
//!
//! A day's signature is the sorted living-player ids plus the sorted positive
//! tally pairs, e.g. `1,2,3|1:2,3:1`. The game is deadlocked when the current
//! signature matches at least two of the three most recent stored ones.

use crate::player::PlayerId;
use crate::tally::Tally;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical signature of one day's situation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn new(living: &[PlayerId], tally: &Tally) -> Self {
        let mut ids = living.to_vec();
        ids.sort_unstable();
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let pairs: Vec<String> = tally
            .positive()
            .into_iter()
            .map(|(target, count)| format!("{}:{}", target, count))
            .collect();
        Self(format!("{}|{}", ids.join(","), pairs.join(",")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Signature {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How many stored signatures take part in the comparison
pub const WINDOW: usize = 3;

/// Whether `current` repeats often enough among the most recent signatures.
///
/// `recent` is ordered oldest first; only its last [`WINDOW`] entries count.
/// `repeats` is the total number of identical occurrences, current included.
pub fn is_deadlock(current: &Signature, recent: &[Signature], repeats: usize) -> bool {
    let start = recent.len().saturating_sub(WINDOW);
    let matches = recent[start..].iter().filter(|s| *s == current).count();
    matches + 1 >= repeats
}
