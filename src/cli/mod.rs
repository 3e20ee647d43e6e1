pub mod dashboard;
pub mod output;

use std::{
    io::{stdout, IsTerminal},
    path::PathBuf,
};

use anyhow::Result;
use clap::Parser;
use dashboard::{run_dashboard, DashboardOptions};
use tracing::{info, level_filters::LevelFilter};

use crate::{
    steam::client::WebApiClient,
    storage::snapshot_storage::SnapshotStorageImpl,
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

const EXPORTS_DIR: &str = "exports";
const ICONS_DIR: &str = "icons";

#[derive(Parser, Debug)]
#[command(name = "Steamtally", version, long_about = None)]
#[command(about = "Weekly activity dashboard for a Steam account", long_about = None)]
struct Args {
    #[arg(long, env = "STEAM_API_KEY", hide_env_values = true, help = "Steam Web API key")]
    api_key: String,
    #[arg(long, env = "STEAM_ID", help = "64-bit id of the Steam account")]
    steam_id: String,
    #[arg(long, help = "Save this week's activity, it becomes the baseline of the next run")]
    export: bool,
    #[arg(
        long,
        requires = "export",
        help = "Write the export into this file instead of the exports directory"
    )]
    output: Option<PathBuf>,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, help = "Don't download game icons")]
    no_icons: bool,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;
    info!("Using application directory {dir:?}");

    let api = WebApiClient::new(args.api_key);
    let storage = SnapshotStorageImpl::new(dir.join(EXPORTS_DIR));
    let options = DashboardOptions {
        steam_id: args.steam_id,
        export: args.export,
        output: args.output,
        icon_dir: (!args.no_icons).then(|| dir.join(ICONS_DIR)),
        styled: stdout().is_terminal(),
    };

    let summary = run_dashboard(&api, &storage, &DefaultClock, &options, &mut stdout()).await;

    info!(
        "Run finished with {} minutes over {} games",
        summary.delta.total_delta_minutes(),
        summary.delta.records().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::{error::ErrorKind, Parser};

    use super::Args;

    #[test]
    fn test_output_requires_export() {
        let result = Args::try_parse_from([
            "steamtally",
            "--api-key",
            "key",
            "--steam-id",
            "1",
            "--output",
            "week.json",
        ]);
        assert_eq!(
            result.unwrap_err().kind(),
            ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_full_arguments() {
        let args = Args::try_parse_from([
            "steamtally",
            "--api-key",
            "key",
            "--steam-id",
            "76561197960435530",
            "--export",
            "--output",
            "week.json",
            "--no-icons",
        ])
        .unwrap();
        assert!(args.export);
        assert!(args.no_icons);
        assert_eq!(args.output.unwrap().to_str(), Some("week.json"));
    }
}
