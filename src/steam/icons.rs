use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{storage::entities::GameActivity, utils::clock::Clock};

const ICON_BASE: &str = "http://media.steampowered.com/steamcommunity/public/images/apps";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);
/// Pause between downloads so the media server isn't hammered.
const DOWNLOAD_PAUSE: Duration = Duration::from_millis(100);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IconReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub fn icon_url(app_id: u64, icon_hash: &str) -> String {
    format!("{ICON_BASE}/{app_id}/{icon_hash}.jpg")
}

pub fn icon_path(icon_dir: &Path, app_id: u64) -> PathBuf {
    icon_dir.join(format!("{app_id}.jpg"))
}

/// Stores icons of games into `icon_dir`. Icons that are already present are not downloaded
/// again, failures are only logged.
pub struct IconDownloader<'a> {
    client: reqwest::Client,
    icon_dir: PathBuf,
    clock: &'a dyn Clock,
}

impl<'a> IconDownloader<'a> {
    pub fn new(icon_dir: PathBuf, clock: &'a dyn Clock) -> Self {
        Self {
            client: reqwest::Client::new(),
            icon_dir,
            clock,
        }
    }

    pub async fn download_all<'g>(
        &self,
        games: impl IntoIterator<Item = &'g GameActivity>,
    ) -> Result<IconReport> {
        tokio::fs::create_dir_all(&self.icon_dir).await?;

        let mut report = IconReport::default();
        for game in games {
            let Some(icon_hash) = game.img_icon_url.as_deref() else {
                continue;
            };

            let path = icon_path(&self.icon_dir, game.app_id);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                report.skipped += 1;
                continue;
            }

            match self.download(game.app_id, icon_hash, &path).await {
                Ok(()) => {
                    debug!("Downloaded icon of {} into {path:?}", game.name);
                    report.downloaded += 1;
                    self.clock.sleep(DOWNLOAD_PAUSE).await;
                }
                Err(e) => {
                    warn!("Failed to download icon of {}: {e:?}", game.name);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Icons downloaded: {}, skipped: {}, failed: {}",
            report.downloaded, report.skipped, report.failed
        );
        Ok(report)
    }

    async fn download(&self, app_id: u64, icon_hash: &str, path: &Path) -> Result<()> {
        let url = icon_url(app_id, icon_hash);
        let bytes = self
            .client
            .get(&url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .and_then(|v| v.error_for_status())
            .with_context(|| format!("Request to {url} failed"))?
            .bytes()
            .await?;
        tokio::fs::write(path, &bytes).await?;
        Ok(())
    }
}
