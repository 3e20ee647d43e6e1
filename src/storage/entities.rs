use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Local};
use tracing::warn;

/// Playtime reported per platform. Only carried through from the upstream service, it never
/// reaches an export.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct PlatformPlaytime {
    pub windows_minutes: Option<u64>,
    pub mac_minutes: Option<u64>,
    pub linux_minutes: Option<u64>,
    pub deck_minutes: Option<u64>,
}

#[cfg(test)]
impl PlatformPlaytime {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Activity of a single game at the moment a snapshot was taken.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct GameActivity {
    pub app_id: u64,
    pub name: Arc<str>,
    /// Cumulative time since the account started tracking the game.
    pub playtime_forever_minutes: u64,
    /// Time played during the upstream's own trailing window.
    pub playtime_window_minutes: u64,
    pub img_icon_url: Option<Arc<str>>,
    pub platform: PlatformPlaytime,
}

#[cfg(test)]
impl GameActivity {
    pub fn without_platform_playtime(self) -> Self {
        Self {
            platform: PlatformPlaytime::default(),
            ..self
        }
    }
}

/// Point in time record of cumulative playtime per game. `app_id` is unique inside a snapshot.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Snapshot {
    created_at: DateTime<Local>,
    games: Vec<GameActivity>,
}

impl Snapshot {
    /// Creates a snapshot keeping the first record of every `app_id`.
    pub fn new(created_at: DateTime<Local>, games: impl IntoIterator<Item = GameActivity>) -> Self {
        let mut seen = HashSet::new();
        let games = games
            .into_iter()
            .filter(|game| {
                let unique = seen.insert(game.app_id);
                if !unique {
                    warn!("Dropping duplicate record for app {} ({})", game.app_id, game.name);
                }
                unique
            })
            .collect();
        Self { created_at, games }
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    pub fn games(&self) -> &[GameActivity] {
        &self.games
    }

    pub fn get(&self, app_id: u64) -> Option<&GameActivity> {
        self.games.iter().find(|v| v.app_id == app_id)
    }
}
