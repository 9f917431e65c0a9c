// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Daily calendar backups.
//!
//! Both sides of a sync target are snapshotted at most once per day under
//! `{work_dir}/backup/`. An existing snapshot for the same day is never
//! overwritten, and bodies carrying the error marker are never written at
//! all, so a day's first good copy survives later outages.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use tokio::fs;
use tracing::{debug, warn};

use crate::placeholder::has_error_marker;
use crate::request::CachedCalendar;
use crate::todo_store::url_hash;

/// How much of a body is scanned for the error marker.
const MARKER_SCAN_BYTES: usize = 1024;

/// How long the per-pass URL registry stays valid.
const VERIFY_INTERVAL_MILLIS: i64 = 3_600_000;

/// Backup writer with hour-bucket deduplication and retention purging.
#[derive(Debug)]
pub struct BackupManager {
    dir: PathBuf,
    retention_millis: i64,
    seen: HashSet<String>,
    last_verified: i64,
}

impl BackupManager {
    /// Creates a manager writing under `work_dir`. `retention_days == 0`
    /// disables backups.
    #[must_use]
    pub fn new(work_dir: &Path, retention_days: u64) -> Self {
        Self {
            dir: work_dir.join("backup"),
            retention_millis: i64::try_from(retention_days)
                .unwrap_or(i64::MAX / 86_400_000)
                .saturating_mul(86_400_000),
            seen: HashSet::new(),
            last_verified: 0,
        }
    }

    /// Whether backups are enabled at all.
    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.retention_millis != 0
    }

    /// With backups disabled, deletes every existing backup file. Called
    /// once at startup.
    pub async fn startup_cleanup(&self) {
        if self.enabled() {
            return;
        }
        let Ok(mut entries) = fs::read_dir(&self.dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Err(e) = fs::remove_file(entry.path()).await {
                warn!(path = %entry.path().display(), error = %e, "unable to delete stale backup");
            }
        }
    }

    /// Backs up a sync target's remote body and local file, at most once per
    /// URL per hour bucket. Backups are a side channel: any filesystem
    /// failure logs and leaves the sync pass untouched.
    pub async fn run(&mut self, calendar: &CachedCalendar, now: i64) {
        if !self.enabled() {
            return;
        }
        if now - self.last_verified > VERIFY_INTERVAL_MILLIS {
            self.last_verified = now;
            self.seen.clear();
        }
        if !self.seen.insert(calendar.url.clone()) {
            return;
        }

        if let Err(e) = fs::create_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), error = %e, "unable to create backup directory");
            return;
        }

        // The first backup of a pass purges expired snapshots
        if self.seen.len() == 1 {
            self.purge_expired(now).await;
        }

        let date = format_date(now);
        let hash = url_hash(&calendar.url);
        let remote_path = self.dir.join(format!("{date}-remote-{hash}.ics"));
        let local_path = self.dir.join(format!("{date}-local-{hash}.ics"));

        write_backup(&remote_path, &calendar.body).await;

        let Some(file_path) = &calendar.file_path else {
            return;
        };
        if fs::try_exists(&local_path).await.unwrap_or(false) {
            return;
        }
        match fs::read(file_path).await {
            Ok(bytes) => write_backup(&local_path, &bytes).await,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %file_path.display(), error = %e, "unable to read local file"),
        }
    }

    async fn purge_expired(&self, now: i64) {
        let Ok(mut entries) = fs::read_dir(&self.dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let modified = entry
                .metadata()
                .await
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .and_then(|d| i64::try_from(d.as_millis()).ok());
            let Some(modified) = modified else { continue };
            if now - modified > self.retention_millis {
                debug!(path = %entry.path().display(), "purging expired backup");
                let _ = fs::remove_file(entry.path()).await;
            }
        }
    }
}

/// Writes a snapshot unless one exists or the body carries the error marker.
async fn write_backup(path: &Path, bytes: &[u8]) {
    if fs::try_exists(path).await.unwrap_or(false) {
        return;
    }
    if has_error_marker(bytes, MARKER_SCAN_BYTES) {
        return;
    }
    if let Err(e) = fs::write(path, bytes).await {
        warn!(path = %path.display(), error = %e, "unable to write backup");
    }
}

fn format_date(now: i64) -> String {
    Timestamp::from_millisecond(now)
        .unwrap_or(Timestamp::UNIX_EPOCH)
        .strftime("%Y-%m-%d")
        .to_string()
}
