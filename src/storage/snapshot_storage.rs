use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::{bail, Result};
use chrono::{DateTime, Local};
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, info, warn};

use crate::utils::time::date_to_snapshot_name;

use super::{document::SnapshotDocument, entities::Snapshot};

const FILE_PREFIX: &str = "steam_dashboard_";
const FILE_EXTENSION: &str = ".json";

/// Upper bound of exports created on a single day.
const MAX_SAVES_PER_DAY: u32 = 1000;

/// Interface for abstracting storage of snapshots.
pub trait SnapshotStorage {
    /// Returns the most recently created readable snapshot. Unreadable data is logged and
    /// skipped, it never fails the caller.
    fn find_latest(&self) -> impl Future<Output = Option<Snapshot>>;

    /// Writes a new snapshot file named after the document's creation date. Existing files are
    /// never overwritten.
    fn save(&self, document: &SnapshotDocument) -> impl Future<Output = Result<PathBuf>>;
}

impl<T: Deref> SnapshotStorage for T
where
    T::Target: SnapshotStorage,
{
    fn find_latest(&self) -> impl Future<Output = Option<Snapshot>> {
        self.deref().find_latest()
    }

    fn save(&self, document: &SnapshotDocument) -> impl Future<Output = Result<PathBuf>> {
        self.deref().save(document)
    }
}

/// The main realization of [SnapshotStorage]. Every snapshot is a json file inside
/// `snapshot_dir`.
pub struct SnapshotStorageImpl {
    snapshot_dir: PathBuf,
}

impl SnapshotStorageImpl {
    /// The directory is only created once something is saved.
    pub fn new(snapshot_dir: PathBuf) -> Self {
        Self { snapshot_dir }
    }

    async fn candidates(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.snapshot_dir).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e),
        };

        let mut paths = vec![];
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_EXTENSION) {
                paths.push(entry.path());
            }
        }
        Ok(paths)
    }

    async fn read_document(path: &Path) -> Result<(SnapshotDocument, DateTime<Local>)> {
        debug!("Reading {path:?}");
        let mut file = File::open(path).await?;
        file.lock_shared()?;
        let mut content = String::new();
        let read = file.read_to_string(&mut content).await;
        file.unlock_async().await?;
        read?;

        let document = serde_json::from_str::<SnapshotDocument>(&content)?;
        let created_at = match document.created_at() {
            Some(v) => v,
            None => {
                debug!("{path:?} has no usable timestamp, falling back to modification time");
                DateTime::<Local>::from(file.metadata().await?.modified()?)
            }
        };
        Ok((document, created_at))
    }
}

impl SnapshotStorage for SnapshotStorageImpl {
    async fn find_latest(&self) -> Option<Snapshot> {
        let paths = match self.candidates().await {
            Ok(v) => v,
            Err(e) => {
                warn!("Couldn't list snapshots in {:?}: {e}", self.snapshot_dir);
                return None;
            }
        };

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::read_document(&path).await {
                Ok(v) => documents.push((path, v)),
                // Corrupted exports are ignored, older ones can still serve as a baseline.
                Err(e) => warn!("Skipping unreadable snapshot {path:?}: {e}"),
            }
        }

        let (path, (document, created_at)) = documents
            .into_iter()
            .max_by_key(|(_, (_, created_at))| *created_at)?;
        info!("Loaded previous snapshot from {path:?}");
        Some(document.into_snapshot(created_at))
    }

    async fn save(&self, document: &SnapshotDocument) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.snapshot_dir).await?;

        let date = document
            .created_at()
            .unwrap_or_else(Local::now)
            .date_naive();
        let date = date_to_snapshot_name(date);

        let mut buffer = serde_json::to_vec_pretty(document)?;
        buffer.push(b'\n');

        for attempt in 1..=MAX_SAVES_PER_DAY {
            let path = self.snapshot_dir.join(snapshot_file_name(&date, attempt));
            let file = File::options()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            let mut file = match file {
                Ok(v) => v,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            file.lock_exclusive()?;
            let written = write_or_discard(&mut file, &path, &buffer).await;
            file.unlock_async().await?;
            written?;

            info!("Saved snapshot into {path:?}");
            return Ok(path);
        }

        bail!("Too many snapshots saved on {date}")
    }
}

async fn write_with_file(file: &mut File, buffer: &[u8]) -> Result<()> {
    file.write_all(buffer).await?;
    file.flush().await?;
    Ok(())
}

/// A partially written export would be skipped as unreadable forever while still holding its
/// name, so it is removed when writing fails.
async fn write_or_discard(file: &mut File, path: &Path, buffer: &[u8]) -> Result<()> {
    let written = write_with_file(file, buffer).await;
    if written.is_err() {
        warn!("Removing partially written snapshot {path:?}");
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("Couldn't remove {path:?}: {e}");
        }
    }
    written
}

fn snapshot_file_name(date: &str, attempt: u32) -> String {
    if attempt == 1 {
        format!("{FILE_PREFIX}{date}{FILE_EXTENSION}")
    } else {
        format!("{FILE_PREFIX}{date}_{attempt}{FILE_EXTENSION}")
    }
}
