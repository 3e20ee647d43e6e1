use std::{fmt::Display, io::Write, path::PathBuf};

use tracing::{error, info, info_span, warn, Instrument};

use crate::{
    delta::{compute_delta, DeltaResult},
    steam::{icons::IconDownloader, PlayerSummary, SteamApi},
    storage::{document::SnapshotDocument, entities::Snapshot, snapshot_storage::SnapshotStorage},
    utils::clock::Clock,
};

use super::output::{self, insights::summarize, DashboardView};

/// Upstream source a run failed to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedSource {
    Profile(String),
    RecentGames(String),
}

impl Display for DegradedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradedSource::Profile(e) => write!(f, "player profile: {e}"),
            DegradedSource::RecentGames(e) => write!(f, "recent games: {e}"),
        }
    }
}

/// Separates a run with no activity from a run that couldn't see the activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    Complete,
    Degraded(Vec<DegradedSource>),
}

impl SourceStatus {
    fn from_failures(failures: Vec<DegradedSource>) -> Self {
        if failures.is_empty() {
            SourceStatus::Complete
        } else {
            SourceStatus::Degraded(failures)
        }
    }

    /// The snapshot of recent games is trustworthy enough to become a baseline.
    pub fn games_complete(&self) -> bool {
        match self {
            SourceStatus::Complete => true,
            SourceStatus::Degraded(failures) => !failures
                .iter()
                .any(|v| matches!(v, DegradedSource::RecentGames(_))),
        }
    }
}

/// Data fetched from upstream for one run.
pub struct DashboardData {
    pub player: Option<PlayerSummary>,
    pub current: Snapshot,
    pub status: SourceStatus,
}

pub struct DashboardOptions {
    pub steam_id: String,
    pub export: bool,
    pub output: Option<PathBuf>,
    /// Directory for icons, nothing is downloaded when absent.
    pub icon_dir: Option<PathBuf>,
    pub styled: bool,
}

/// What a run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub delta: DeltaResult,
    pub status: SourceStatus,
    pub exported: Option<PathBuf>,
}

/// Fetches the player profile and recent games. Failures are logged and replaced with empty
/// values, the returned status records what went missing.
pub async fn fetch_dashboard_data(
    api: &dyn SteamApi,
    steam_id: &str,
    clock: &dyn Clock,
) -> DashboardData {
    let mut failures = vec![];

    info!("Fetching player profile");
    let player = match api.player_summary(steam_id).await {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to fetch player profile {e:?}");
            failures.push(DegradedSource::Profile(e.to_string()));
            None
        }
    };

    info!("Fetching recent activity");
    let games = match api.recently_played_games(steam_id).await {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to fetch recent activity {e:?}");
            failures.push(DegradedSource::RecentGames(e.to_string()));
            vec![]
        }
    };

    DashboardData {
        player,
        current: Snapshot::new(clock.time(), games.into_iter().map(Into::into)),
        status: SourceStatus::from_failures(failures),
    }
}

/// Console output is best effort, a closed stdout doesn't fail the run.
fn report(out: &mut impl Write, line: &str) {
    if let Err(e) = writeln!(out, "{line}") {
        warn!("Couldn't print {line:?}: {e}");
    }
}

/// Executes one dashboard run: fetch, compare against the latest stored snapshot, print and
/// optionally persist the result.
pub async fn run_dashboard(
    api: &dyn SteamApi,
    storage: &impl SnapshotStorage,
    clock: &dyn Clock,
    options: &DashboardOptions,
    out: &mut impl Write,
) -> RunSummary {
    let DashboardData {
        player,
        current,
        status,
    } = fetch_dashboard_data(api, &options.steam_id, clock)
        .instrument(info_span!("Fetching Steam data"))
        .await;

    let previous = storage.find_latest().await;
    if previous.is_none() {
        warn!("No previous snapshot found, using the two week window as weekly activity");
    }

    let delta = compute_delta(&current, previous.as_ref());
    let insights = summarize(&delta);

    let view = DashboardView {
        player: player.as_ref(),
        status: &status,
        delta: &delta,
        insights: &insights,
        styled: options.styled,
    };
    if let Err(e) = output::render_dashboard(out, &view) {
        error!("Failed to print the dashboard {e:?}");
    }

    if let Some(icon_dir) = &options.icon_dir {
        let downloader = IconDownloader::new(icon_dir.clone(), clock);
        if let Err(e) = downloader.download_all(current.games()).await {
            error!("Icon download failed {e:?}");
        }
    }

    let mut exported = None;
    if options.export {
        if status.games_complete() {
            let document = SnapshotDocument::from_delta(&delta, current.created_at());
            match output::export(storage, &document, options.output.as_deref()).await {
                Ok(path) => {
                    report(
                        out,
                        &format!("Weekly activity data exported to {}", path.display()),
                    );
                    exported = Some(path);
                }
                Err(e) => {
                    error!("Export failed {e:?}");
                    report(out, &format!("Export failed: {e}"));
                }
            }
        } else {
            warn!("Skipping export, recent games couldn't be fetched");
            report(out, "Export skipped: recent games couldn't be fetched");
        }
    }

    RunSummary {
        delta,
        status,
        exported,
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{self, Write},
        time::Duration,
    };

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::{DateTime, Local, TimeZone};
    use tempfile::tempdir;

    use crate::{
        steam::{MockSteamApi, PlayerSummary, RecentGame},
        storage::snapshot_storage::{SnapshotStorage, SnapshotStorageImpl},
        utils::{clock::Clock, logging::TEST_LOGGING},
    };

    use super::{run_dashboard, DashboardOptions, DegradedSource, SourceStatus};

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FixedClock(DateTime<Local>);

    #[async_trait]
    impl Clock for FixedClock {
        fn time(&self) -> DateTime<Local> {
            self.0
        }

        async fn sleep(&self, _duration: Duration) {}
    }

    fn recent(appid: u64, forever: u64, window: u64) -> RecentGame {
        RecentGame {
            appid,
            name: format!("game {appid}"),
            playtime_2weeks: window,
            playtime_forever: forever,
            img_icon_url: None,
            playtime_windows_forever: Some(forever),
            playtime_mac_forever: Some(0),
            playtime_linux_forever: Some(0),
            playtime_deck_forever: None,
        }
    }

    fn api_with(games: Vec<RecentGame>) -> MockSteamApi {
        let mut api = MockSteamApi::new();
        api.expect_player_summary().returning(|id| {
            Ok(Some(PlayerSummary {
                steamid: id.to_string(),
                personaname: "Robin".into(),
                personastate: 1,
                lastlogoff: Some(1_700_000_000),
                profileurl: Some("https://steamcommunity.com/id/robin/".into()),
            }))
        });
        api.expect_recently_played_games()
            .times(1)
            .returning(move |_| Ok(games.clone()));
        api
    }

    fn options(export: bool) -> DashboardOptions {
        DashboardOptions {
            steam_id: "76561197960435530".into(),
            export,
            output: None,
            icon_dir: None,
            styled: false,
        }
    }

    #[tokio::test]
    async fn test_first_run_then_weekly_delta() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let storage = SnapshotStorageImpl::new(dir.path().join("exports"));
        let first_week = Local.with_ymd_and_hms(2024, 6, 2, 20, 0, 0).unwrap();
        let second_week = Local.with_ymd_and_hms(2024, 6, 9, 20, 0, 0).unwrap();

        let api = api_with(vec![recent(1, 45, 45), recent(2, 500, 20)]);
        let mut out = Vec::new();
        let first = run_dashboard(
            &api,
            &storage,
            &FixedClock(first_week),
            &options(true),
            &mut out,
        )
        .await;

        assert_eq!(first.status, SourceStatus::Complete);
        assert!(first.delta.records().iter().all(|v| !v.is_returning));
        assert_eq!(first.delta.total_delta_minutes(), 65);
        assert!(first.exported.is_some());

        let api = api_with(vec![recent(1, 75, 75), recent(2, 500, 20), recent(3, 900, 30)]);
        let mut out = Vec::new();
        let second = run_dashboard(
            &api,
            &storage,
            &FixedClock(second_week),
            &options(true),
            &mut out,
        )
        .await;

        let records = second.delta.records();
        assert_eq!(records[0].playtime_delta_minutes, 30);
        assert!(records[0].is_returning);
        assert_eq!(records[1].playtime_delta_minutes, 0);
        assert!(records[1].is_returning);
        assert_eq!(records[2].playtime_delta_minutes, 30);
        assert!(records[2].is_returning);
        assert_eq!(second.delta.total_delta_minutes(), 60);

        let output = String::from_utf8(out)?;
        assert!(output.contains("Name: Robin"));
        assert!(output.contains("Weekly activity data exported to"));

        let latest = storage.find_latest().await.unwrap();
        assert_eq!(latest.created_at(), second_week);
        assert!(latest.get(2).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_upstream_failure_is_degraded_not_fatal() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let storage = SnapshotStorageImpl::new(dir.path().to_owned());

        let mut api = MockSteamApi::new();
        api.expect_player_summary()
            .returning(|_| Err(anyhow!("connection refused")));
        api.expect_recently_played_games()
            .returning(|_| Err(anyhow!("connection refused")));

        let mut out = Vec::new();
        let summary = run_dashboard(
            &api,
            &storage,
            &FixedClock(Local::now()),
            &options(true),
            &mut out,
        )
        .await;

        assert_eq!(
            summary.status,
            SourceStatus::Degraded(vec![
                DegradedSource::Profile("connection refused".into()),
                DegradedSource::RecentGames("connection refused".into()),
            ])
        );
        assert!(summary.delta.records().is_empty());
        assert!(summary.exported.is_none());
        assert!(storage.find_latest().await.is_none());

        let output = String::from_utf8(out)?;
        assert!(output.contains("Steam data is incomplete for this run:"));
        assert!(output.contains("No gaming activity this week"));
        assert!(output.contains("Export skipped"));
        Ok(())
    }

    #[tokio::test]
    async fn test_profile_failure_still_exports() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let storage = SnapshotStorageImpl::new(dir.path().to_owned());

        let mut api = MockSteamApi::new();
        api.expect_player_summary()
            .returning(|_| Err(anyhow!("503 Service Unavailable")));
        api.expect_recently_played_games()
            .returning(|_| Ok(vec![recent(4, 60, 60)]));

        let mut out = Vec::new();
        let summary = run_dashboard(
            &api,
            &storage,
            &FixedClock(Local::now()),
            &options(true),
            &mut out,
        )
        .await;

        assert!(summary.status.games_complete());
        assert!(summary.exported.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_no_export_without_flag() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let storage = SnapshotStorageImpl::new(dir.path().to_owned());
        let api = api_with(vec![recent(1, 10, 10)]);

        let mut out = Vec::new();
        let summary = run_dashboard(
            &api,
            &storage,
            &FixedClock(Local::now()),
            &options(false),
            &mut out,
        )
        .await;

        assert!(summary.exported.is_none());
        assert!(storage.find_latest().await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_closed_output_still_exports() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let storage = SnapshotStorageImpl::new(dir.path().to_owned());
        let api = api_with(vec![recent(1, 10, 10)]);

        let summary = run_dashboard(
            &api,
            &storage,
            &FixedClock(Local::now()),
            &options(true),
            &mut ClosedPipe,
        )
        .await;

        assert!(summary.exported.is_some());
        assert!(storage.find_latest().await.is_some());
        Ok(())
    }
}
