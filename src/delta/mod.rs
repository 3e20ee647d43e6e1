//! Reconstructs how much of a snapshot's activity happened since the previous snapshot.
//!
//! The upstream service only reports cumulative playtime and a trailing two week window, so the
//! result is an estimate. When a cumulative counter moves backwards (library reset, account
//! migration) the trailing window is used instead of a negative difference.

use crate::storage::entities::{GameActivity, Snapshot};

/// Activity of a game enriched with the time attributed to the current interval.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct DeltaRecord {
    pub activity: GameActivity,
    pub playtime_delta_minutes: u64,
    /// The game has playtime from before the current interval.
    pub is_returning: bool,
}

impl DeltaRecord {
    pub fn is_active(&self) -> bool {
        self.playtime_delta_minutes > 0
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct DeltaResult {
    records: Vec<DeltaRecord>,
    total_delta_minutes: u64,
}

impl DeltaResult {
    pub fn new(records: Vec<DeltaRecord>) -> Self {
        let total_delta_minutes = records.iter().map(|v| v.playtime_delta_minutes).sum();
        Self {
            records,
            total_delta_minutes,
        }
    }

    pub fn records(&self) -> &[DeltaRecord] {
        &self.records
    }

    /// Records that gained playtime during the interval.
    pub fn active_records(&self) -> impl Iterator<Item = &DeltaRecord> {
        self.records.iter().filter(|v| v.is_active())
    }

    pub fn total_delta_minutes(&self) -> u64 {
        self.total_delta_minutes
    }
}

/// Computes per game deltas of `current` against `previous`.
///
/// Without a previous snapshot every game is attributed its trailing window and none of them is
/// considered returning, as there is no baseline to compare against. A previous snapshot without
/// any games is no baseline either.
pub fn compute_delta(current: &Snapshot, previous: Option<&Snapshot>) -> DeltaResult {
    let previous = previous.filter(|v| !v.games().is_empty());
    let records = current
        .games()
        .iter()
        .map(|game| {
            let (playtime_delta_minutes, is_returning) = match previous {
                Some(previous) => match previous.get(game.app_id) {
                    Some(prior) => (known_game_delta(game, prior), true),
                    None => (
                        game.playtime_window_minutes,
                        game.playtime_forever_minutes > game.playtime_window_minutes,
                    ),
                },
                None => (game.playtime_window_minutes, false),
            };
            DeltaRecord {
                activity: game.clone(),
                playtime_delta_minutes,
                is_returning,
            }
        })
        .collect();

    DeltaResult::new(records)
}

fn known_game_delta(current: &GameActivity, prior: &GameActivity) -> u64 {
    current
        .playtime_forever_minutes
        .checked_sub(prior.playtime_forever_minutes)
        .unwrap_or(current.playtime_window_minutes)
}
