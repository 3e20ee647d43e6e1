use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, instrument};

use super::{PlayerSummary, RecentGame, SteamApi};

pub const STEAM_API_BASE: &str = "http://api.steampowered.com";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerSummariesResponse {
    #[serde(default)]
    players: Vec<PlayerSummary>,
}

#[derive(Debug, Default, Deserialize)]
struct RecentlyPlayedResponse {
    #[serde(default)]
    games: Vec<RecentGame>,
}

/// [SteamApi] over the public Steam Web API.
pub struct WebApiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl WebApiClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, STEAM_API_BASE.into())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Every request carries the key and asks for json.
    async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/{endpoint}", self.base_url.trim_end_matches('/'));
        debug!("Requesting {url}");

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("format", "json")])
            .query(params)
            .send()
            .await
            .with_context(|| format!("Request to {endpoint} failed"))?
            .error_for_status()
            .with_context(|| format!("{endpoint} responded with an error"))?;

        let envelope = response
            .json::<Envelope<T>>()
            .await
            .with_context(|| format!("Couldn't decode response of {endpoint}"))?;
        Ok(envelope.response)
    }
}

#[async_trait]
impl SteamApi for WebApiClient {
    #[instrument(skip(self))]
    async fn player_summary(&self, steam_id: &str) -> Result<Option<PlayerSummary>> {
        let response: PlayerSummariesResponse = self
            .request("ISteamUser/GetPlayerSummaries/v0002/", &[("steamids", steam_id)])
            .await?;
        Ok(response.players.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn recently_played_games(&self, steam_id: &str) -> Result<Vec<RecentGame>> {
        let response: RecentlyPlayedResponse = self
            .request(
                "IPlayerService/GetRecentlyPlayedGames/v0001/",
                &[("steamid", steam_id)],
            )
            .await?;
        Ok(response.games)
    }
}
