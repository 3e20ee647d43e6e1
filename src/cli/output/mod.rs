pub mod insights;

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::{DateTime, Local};
use insights::Insight;
use tracing::info;

use crate::{
    delta::{DeltaRecord, DeltaResult},
    steam::PlayerSummary,
    storage::{document::SnapshotDocument, snapshot_storage::SnapshotStorage},
};

use super::dashboard::SourceStatus;

const NAME_WIDTH: usize = 35;
const RULE_WIDTH: usize = 80;

/// Everything shown on the console for one run.
pub struct DashboardView<'a> {
    pub player: Option<&'a PlayerSummary>,
    pub status: &'a SourceStatus,
    pub delta: &'a DeltaResult,
    pub insights: &'a [Insight],
    /// Use terminal colors.
    pub styled: bool,
}

/// Convert minutes to human-readable format.
pub fn format_playtime(minutes: u64) -> String {
    let hours = minutes / 60;
    let remaining = minutes % 60;
    match (hours, remaining) {
        (0, 0) => "0 minutes".into(),
        (0, m) => format!("{m} minutes"),
        (h, 0) => format!("{h} hours"),
        (h, m) => format!("{h}h {m}m"),
    }
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() <= NAME_WIDTH {
        name.to_string()
    } else {
        let truncated: String = name.chars().take(NAME_WIDTH - 3).collect();
        format!("{truncated}...")
    }
}

fn heading(text: &str, styled: bool) -> String {
    if styled {
        Style::new().bold().paint(text).to_string()
    } else {
        text.to_string()
    }
}

fn format_last_online(timestamp: i64) -> Option<String> {
    DateTime::from_timestamp(timestamp, 0).map(|v| {
        v.with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    })
}

pub fn render_dashboard(out: &mut impl Write, view: &DashboardView) -> io::Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "{}", heading("STEAM GAMING DASHBOARD", view.styled))?;
    writeln!(out, "{rule}")?;

    if let Some(player) = view.player {
        writeln!(out)?;
        writeln!(out, "{}", heading("PLAYER PROFILE", view.styled))?;
        writeln!(out, "   Name: {}", player.personaname)?;
        writeln!(out, "   Status: {}", player.status())?;
        if let Some(last_online) = player.lastlogoff.and_then(format_last_online) {
            writeln!(out, "   Last Online: {last_online}")?;
        }
        writeln!(
            out,
            "   Profile: {}",
            player.profileurl.as_deref().unwrap_or("N/A")
        )?;
    }

    if let SourceStatus::Degraded(reasons) = view.status {
        writeln!(out)?;
        let warning = "Steam data is incomplete for this run:";
        if view.styled {
            writeln!(out, "{}", Colour::Yellow.paint(warning))?;
        } else {
            writeln!(out, "{warning}")?;
        }
        for reason in reasons {
            writeln!(out, "   - {reason}")?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", heading("GAMING INSIGHTS", view.styled))?;
    for insight in view.insights {
        writeln!(out, "   {insight}")?;
    }

    writeln!(out)?;
    writeln!(out, "{}", heading("THIS WEEK'S GAMING ACTIVITY", view.styled))?;
    let mut active = view.delta.active_records().collect::<Vec<_>>();
    if active.is_empty() {
        writeln!(out, "   No games played this week")?;
    } else {
        // Stable sort, equal deltas keep their upstream order.
        active.sort_by(|a, b| b.playtime_delta_minutes.cmp(&a.playtime_delta_minutes));
        writeln!(
            out,
            "   {:<35} {:<15} {:<15} {:<10}",
            "Game Name", "This Week", "Total Time", "Type"
        )?;
        writeln!(
            out,
            "   {} {} {} {}",
            "-".repeat(35),
            "-".repeat(15),
            "-".repeat(15),
            "-".repeat(10)
        )?;
        for record in active {
            write_activity_row(out, record)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{rule}")?;
    Ok(())
}

fn write_activity_row(out: &mut impl Write, record: &DeltaRecord) -> io::Result<()> {
    let kind = if record.is_returning { "Return" } else { "New" };
    writeln!(
        out,
        "   {:<35} {:<15} {:<15} {:<10}",
        truncate_name(&record.activity.name),
        format_playtime(record.playtime_delta_minutes),
        format_playtime(record.activity.playtime_forever_minutes),
        kind
    )
}

/// Persists an export. Without an explicit `output` the document lands in the snapshot storage
/// and becomes the baseline of the next run.
pub async fn export(
    storage: &impl SnapshotStorage,
    document: &SnapshotDocument,
    output: Option<&Path>,
) -> Result<PathBuf> {
    match output {
        Some(path) => {
            write_document(path, document).await?;
            Ok(path.to_owned())
        }
        None => storage.save(document).await,
    }
}

async fn write_document(path: &Path, document: &SnapshotDocument) -> Result<()> {
    if let Some(parent) = path.parent().filter(|v| !v.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut buffer = serde_json::to_vec_pretty(document)?;
    buffer.push(b'\n');
    tokio::fs::write(path, buffer).await?;
    info!("Exported weekly activity into {path:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::Local;
    use tempfile::tempdir;

    use crate::{
        cli::dashboard::{DegradedSource, SourceStatus},
        delta::{DeltaRecord, DeltaResult},
        steam::PlayerSummary,
        storage::{
            document::SnapshotDocument,
            entities::{GameActivity, PlatformPlaytime},
            snapshot_storage::{SnapshotStorage, SnapshotStorageImpl},
        },
    };

    use super::{
        export, format_playtime, insights::summarize, render_dashboard, truncate_name,
        DashboardView,
    };

    fn record(name: &str, delta: u64, forever: u64, is_returning: bool) -> DeltaRecord {
        DeltaRecord {
            activity: GameActivity {
                app_id: forever,
                name: name.into(),
                playtime_forever_minutes: forever,
                playtime_window_minutes: delta,
                img_icon_url: None,
                platform: PlatformPlaytime::default(),
            },
            playtime_delta_minutes: delta,
            is_returning,
        }
    }

    fn render(view: &DashboardView) -> String {
        let mut buffer = Vec::new();
        render_dashboard(&mut buffer, view).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_format_playtime() {
        assert_eq!(format_playtime(0), "0 minutes");
        assert_eq!(format_playtime(45), "45 minutes");
        assert_eq!(format_playtime(120), "2 hours");
        assert_eq!(format_playtime(61), "1h 1m");
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("Portal 2"), "Portal 2");
        let long = "The Elder Scrolls V: Skyrim Special Edition";
        let truncated = truncate_name(long);
        assert_eq!(truncated.chars().count(), 35);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated, "The Elder Scrolls V: Skyrim Spec...");
    }

    #[test]
    fn test_render_sorted_active_games() {
        let delta = DeltaResult::new(vec![
            record("Short", 30, 100, true),
            record("Idle", 0, 500, true),
            record("Long", 150, 150, false),
        ]);
        let insights = summarize(&delta);
        let player = PlayerSummary {
            steamid: "1".into(),
            personaname: "Robin".into(),
            personastate: 3,
            lastlogoff: None,
            profileurl: None,
        };

        let output = render(&DashboardView {
            player: Some(&player),
            status: &SourceStatus::Complete,
            delta: &delta,
            insights: &insights,
            styled: false,
        });

        assert!(output.contains("Name: Robin"));
        assert!(output.contains("Status: Away"));
        assert!(output.contains("Profile: N/A"));
        assert!(!output.contains("Idle"));
        assert!(!output.contains("incomplete"));
        let table = &output[output.find("THIS WEEK'S GAMING ACTIVITY").unwrap()..];
        let long = table.find("Long").unwrap();
        let short = table.find("Short").unwrap();
        assert!(long < short);
        assert!(output.contains("2h 30m"));
        assert!(output.contains("You've played 2 different games this week"));
    }

    #[test]
    fn test_render_degraded_without_activity() {
        let delta = DeltaResult::default();
        let insights = summarize(&delta);
        let output = render(&DashboardView {
            player: None,
            status: &SourceStatus::Degraded(vec![DegradedSource::RecentGames(
                "timed out".into(),
            )]),
            delta: &delta,
            insights: &insights,
            styled: false,
        });

        assert!(!output.contains("PLAYER PROFILE"));
        assert!(output.contains("Steam data is incomplete for this run:"));
        assert!(output.contains("- recent games: timed out"));
        assert!(output.contains("No gaming activity this week"));
        assert!(output.contains("No games played this week"));
    }

    #[tokio::test]
    async fn test_export_to_custom_path() -> Result<()> {
        let dir = tempdir()?;
        let storage = SnapshotStorageImpl::new(dir.path().join("exports"));
        let delta = DeltaResult::new(vec![record("Hades", 40, 400, true)]);
        let document = SnapshotDocument::from_delta(&delta, Local::now());
        let path = dir.path().join("custom").join("week.json");

        let written = export(&storage, &document, Some(&path)).await?;

        assert_eq!(written, path);
        let stored: SnapshotDocument = serde_json::from_slice(&std::fs::read(&path)?)?;
        assert_eq!(stored, document);
        assert!(storage.find_latest().await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_export_into_storage() -> Result<()> {
        let dir = tempdir()?;
        let storage = SnapshotStorageImpl::new(dir.path().to_owned());
        let delta = DeltaResult::new(vec![record("Hades", 40, 400, true)]);
        let document = SnapshotDocument::from_delta(&delta, Local::now());

        let written = export(&storage, &document, None).await?;

        assert!(written.starts_with(dir.path()));
        assert!(storage.find_latest().await.unwrap().get(400).is_some());
        Ok(())
    }
}
