//! Contains logic for talking to the Steam Web API.
//! [SteamApi] is the contract the rest of the application relies on, [client::WebApiClient] is
//! its realization over http.

pub mod client;
pub mod icons;

use std::fmt::Display;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

#[cfg(test)]
use mockall::automock;

use crate::storage::entities::{GameActivity, PlatformPlaytime};

/// Public profile of a player. Only used for display.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerSummary {
    pub steamid: String,
    #[serde(default)]
    pub personaname: String,
    #[serde(default)]
    pub personastate: u8,
    /// Unix timestamp in seconds.
    pub lastlogoff: Option<i64>,
    pub profileurl: Option<String>,
}

impl PlayerSummary {
    pub fn status(&self) -> PersonaState {
        PersonaState::from(self.personastate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonaState {
    Offline,
    Online,
    Busy,
    Away,
    Snooze,
    LookingToTrade,
    LookingToPlay,
    Unknown,
}

impl From<u8> for PersonaState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Offline,
            1 => Self::Online,
            2 => Self::Busy,
            3 => Self::Away,
            4 => Self::Snooze,
            5 => Self::LookingToTrade,
            6 => Self::LookingToPlay,
            _ => Self::Unknown,
        }
    }
}

impl Display for PersonaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            PersonaState::Offline => "Offline",
            PersonaState::Online => "Online",
            PersonaState::Busy => "Busy",
            PersonaState::Away => "Away",
            PersonaState::Snooze => "Snooze",
            PersonaState::LookingToTrade => "Looking to trade",
            PersonaState::LookingToPlay => "Looking to play",
            PersonaState::Unknown => "Unknown",
        };
        write!(f, "{value}")
    }
}

/// A game from `GetRecentlyPlayedGames`. All playtime values are in minutes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecentGame {
    pub appid: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub playtime_2weeks: u64,
    #[serde(default)]
    pub playtime_forever: u64,
    pub img_icon_url: Option<String>,
    pub playtime_windows_forever: Option<u64>,
    pub playtime_mac_forever: Option<u64>,
    pub playtime_linux_forever: Option<u64>,
    pub playtime_deck_forever: Option<u64>,
}

impl From<RecentGame> for GameActivity {
    fn from(game: RecentGame) -> Self {
        GameActivity {
            app_id: game.appid,
            name: game.name.into(),
            playtime_forever_minutes: game.playtime_forever,
            playtime_window_minutes: game.playtime_2weeks,
            img_icon_url: game.img_icon_url.filter(|v| !v.is_empty()).map(Into::into),
            platform: PlatformPlaytime {
                windows_minutes: game.playtime_windows_forever,
                mac_minutes: game.playtime_mac_forever,
                linux_minutes: game.playtime_linux_forever,
                deck_minutes: game.playtime_deck_forever,
            },
        }
    }
}

/// Intended to serve as the contract for the upstream service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SteamApi: Send + Sync {
    /// Profile of the player, absent when the id is unknown.
    async fn player_summary(&self, steam_id: &str) -> Result<Option<PlayerSummary>>;

    /// Games played during the last two weeks. Private profiles return nothing.
    async fn recently_played_games(&self, steam_id: &str) -> Result<Vec<RecentGame>>;
}
