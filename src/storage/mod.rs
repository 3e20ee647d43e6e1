//!  Storage is organized through [snapshot_storage::SnapshotStorageImpl].
//!  The basic idea is:
//!   - There is a directory with all the exported snapshots.
//!   - Every export is a separate json file named after the day it was created on.
//!   - Files are never rewritten. Reading normalizes every known document shape into a
//!     [entities::Snapshot].

pub mod document;
pub mod entities;
pub mod snapshot_storage;
