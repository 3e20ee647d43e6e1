use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{
    delta::{DeltaRecord, DeltaResult},
    utils::time::parse_timestamp,
};

use super::entities::{GameActivity, PlatformPlaytime, Snapshot};

/// A game as it is written into an export. Platform specific playtime is intentionally absent.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct StoredGame {
    pub appid: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub playtime_2weeks: u64,
    #[serde(default)]
    pub playtime_forever: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_icon_url: Option<String>,
    #[serde(default)]
    pub playtime_delta: u64,
    #[serde(default)]
    pub is_returning_game: bool,
}

impl From<&DeltaRecord> for StoredGame {
    fn from(record: &DeltaRecord) -> Self {
        StoredGame {
            appid: record.activity.app_id,
            name: record.activity.name.to_string(),
            playtime_2weeks: record.activity.playtime_window_minutes,
            playtime_forever: record.activity.playtime_forever_minutes,
            img_icon_url: record.activity.img_icon_url.as_ref().map(|v| v.to_string()),
            playtime_delta: record.playtime_delta_minutes,
            is_returning_game: record.is_returning,
        }
    }
}

impl From<StoredGame> for GameActivity {
    fn from(game: StoredGame) -> Self {
        GameActivity {
            app_id: game.appid,
            name: game.name.into(),
            playtime_forever_minutes: game.playtime_forever,
            playtime_window_minutes: game.playtime_2weeks,
            img_icon_url: game.img_icon_url.map(Into::into),
            platform: PlatformPlaytime::default(),
        }
    }
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct ActivityBlock {
    #[serde(default)]
    pub games: Vec<StoredGame>,
    #[serde(default)]
    pub total_weekly_playtime: u64,
}

/// Shapes an export can be found in. Older versions stored the activity under `recent_activity`.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum StoredActivity {
    Current(ActivityBlock),
    Legacy(ActivityBlock),
}

impl StoredActivity {
    pub fn block(&self) -> &ActivityBlock {
        match self {
            StoredActivity::Current(block) | StoredActivity::Legacy(block) => block,
        }
    }

    pub fn into_block(self) -> ActivityBlock {
        match self {
            StoredActivity::Current(block) | StoredActivity::Legacy(block) => block,
        }
    }
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    timestamp: String,
    weekly_activity: Option<ActivityBlock>,
    recent_activity: Option<ActivityBlock>,
}

#[derive(Serialize)]
struct CurrentDocument<'a> {
    timestamp: &'a str,
    weekly_activity: &'a ActivityBlock,
}

/// A persisted snapshot. Always written in the current shape, read in any known one.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct SnapshotDocument {
    pub timestamp: String,
    pub activity: StoredActivity,
}

impl<'de> Deserialize<'de> for SnapshotDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawDocument::deserialize(deserializer)?;
        let activity = match (raw.recent_activity, raw.weekly_activity) {
            (Some(legacy), _) => StoredActivity::Legacy(legacy),
            (None, Some(current)) => StoredActivity::Current(current),
            (None, None) => {
                return Err(serde::de::Error::custom(
                    "document has neither weekly_activity nor recent_activity",
                ))
            }
        };
        Ok(SnapshotDocument {
            timestamp: raw.timestamp,
            activity,
        })
    }
}

impl Serialize for SnapshotDocument {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        CurrentDocument {
            timestamp: &self.timestamp,
            weekly_activity: self.activity.block(),
        }
        .serialize(serializer)
    }
}

impl SnapshotDocument {
    /// Builds an export out of a delta. Only games that gained playtime are kept and the total
    /// is recomputed over them.
    pub fn from_delta(result: &DeltaResult, timestamp: DateTime<Local>) -> Self {
        let games = result
            .active_records()
            .map(StoredGame::from)
            .collect::<Vec<_>>();
        let total_weekly_playtime = games.iter().map(|v| v.playtime_delta).sum();

        SnapshotDocument {
            timestamp: timestamp.to_rfc3339(),
            activity: StoredActivity::Current(ActivityBlock {
                games,
                total_weekly_playtime,
            }),
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Local>> {
        parse_timestamp(&self.timestamp)
    }

    pub fn into_snapshot(self, created_at: DateTime<Local>) -> Snapshot {
        Snapshot::new(
            created_at,
            self.activity
                .into_block()
                .games
                .into_iter()
                .map(GameActivity::from),
        )
    }
}
