// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! To-do side channel.
//!
//! The remote store's event API has no notion of VTODO, so to-do components
//! would vanish on every round trip. They are split off uploaded bodies
//! here, mirrored to disk, and spliced back into downloaded bodies before
//! serving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use icalsync_ical::{formatter, parse};
use tokio::fs;
use tracing::{debug, warn};

use crate::request::CalendarRequest;

/// Cap on the in-memory block cache; cleared wholesale beyond it.
const MAX_CACHE_SIZE: usize = 100;

/// URL-keyed store of VTODO blocks, mirrored under `{work_dir}/todo/`.
#[derive(Debug)]
pub struct TodoStore {
    dir: PathBuf,
    cache: HashMap<String, String>,
}

impl TodoStore {
    /// Creates a store rooted under `work_dir`.
    #[must_use]
    pub fn new(work_dir: &Path) -> Self {
        Self {
            dir: work_dir.join("todo"),
            cache: HashMap::new(),
        }
    }

    /// Extracts and persists the VTODO block of an uploaded body.
    ///
    /// Returns the block, or `None` when the body has no to-dos (any stored
    /// block for the URL is removed in that case). A block identical to the
    /// cached one skips the disk write. The mirror is a side channel: a
    /// failed write logs and the block is still returned.
    pub async fn save(&mut self, request: &CalendarRequest, content: &str) -> Option<String> {
        let (Some(s), Some(e)) = (content.find("VTODO"), content.rfind("VTODO")) else {
            let _ = fs::remove_file(self.file_for(&request.url)).await;
            self.cache.remove(&request.url);
            return None;
        };
        let inner = content.get(s..e).unwrap_or_default();

        let block = if inner.contains("VEVENT") {
            // The naive crop caught event text, reserialize just the to-dos
            let calendar = match parse(content.as_bytes()) {
                Ok(calendar) => calendar,
                Err(e) => {
                    warn!(url = request.url, error = %e, "uploaded body does not parse, keeping stored to-dos");
                    return self.cache.get(&request.url).cloned();
                }
            };
            let mut out = String::new();
            for todo in &calendar.todos {
                out.push_str(&formatter::format_todo(todo));
            }
            out
        } else {
            format!("BEGIN:{inner}VTODO\r\n")
        };

        if self.cache.get(&request.url) == Some(&block) {
            return Some(block);
        }

        if self.cache.len() >= MAX_CACHE_SIZE {
            self.cache.clear();
        }
        self.cache.insert(request.url.clone(), block.clone());

        let path = self.file_for(&request.url);
        match self.write_mirror(&path, &block).await {
            Ok(()) => debug!(url = request.url, path = %path.display(), "to-do block saved"),
            Err(e) => warn!(path = %path.display(), error = %e, "unable to write to-do mirror"),
        }
        Some(block)
    }

    async fn write_mirror(&self, path: &Path, block: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, block.as_bytes()).await?;
        fs::rename(&tmp, path).await
    }

    /// The stored block for a request: memory first, then the disk mirror.
    /// A file that cannot be read is deleted.
    pub async fn load(&mut self, request: &CalendarRequest) -> Option<String> {
        if let Some(block) = self.cache.get(&request.url) {
            return Some(block.clone());
        }
        let path = self.file_for(&request.url);
        match fs::read_to_string(&path).await {
            Ok(block) => {
                if self.cache.len() >= MAX_CACHE_SIZE {
                    self.cache.clear();
                }
                self.cache.insert(request.url.clone(), block.clone());
                Some(block)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "removing unreadable to-do mirror");
                let _ = fs::remove_file(&path).await;
                None
            }
        }
    }

    fn file_for(&self, url: &str) -> PathBuf {
        self.dir
            .join(format!("{}-{}.ics", url_prefix(url), url_hash(url)))
    }
}

/// A short human-readable file prefix derived from the URL.
fn url_prefix(url: &str) -> String {
    if url.ends_with(".ics") {
        // Private exports carry an escaped calendar id in the path
        if let Some(e) = url.find('%') {
            if let Some(s) = url.get(..e).and_then(|head| head.rfind('/')) {
                let segment = url.get(s + 1..e).unwrap_or_default();
                if !segment.is_empty() {
                    return segment.replace(['.', '_'], "-");
                }
            }
        }
        return "remote".to_string();
    }

    let spaced = url.replace(['/', ':', '.'], " ");
    let mut rest = spaced.as_str();
    rest = rest.strip_prefix("http").unwrap_or(rest);
    rest = rest.strip_prefix("s ").unwrap_or(rest).trim_start();
    rest = rest.strip_prefix("www ").unwrap_or(rest).trim_start();
    let host = rest.split(' ').next().unwrap_or_default();
    if host.is_empty() {
        "remote".to_string()
    } else {
        host.to_string()
    }
}

/// Stable hex hash of a URL (FNV-1a), used in mirror and backup file names.
pub(crate) fn url_hash(url: &str) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in url.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    format!("{hash:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_from_sync_target() {
        assert_eq!(
            url_prefix("https://cal.example.org/feeds/my.cal_id%40example/basic.ics"),
            "my-cal-id"
        );
        assert_eq!(
            url_prefix("https://cal.example.org/feeds/basic.ics"),
            "remote"
        );
    }

    #[test]
    fn prefix_from_plain_feed() {
        assert_eq!(
            url_prefix("https://www.example.org/feeds/cal-1/events"),
            "example"
        );
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(url_hash("abc"), url_hash("abc"));
        assert_ne!(url_hash("abc"), url_hash("abd"));
    }

    #[tokio::test]
    async fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TodoStore::new(dir.path());
        let request = CalendarRequest {
            url: "https://cal.example.org/feeds/basic.ics".to_string(),
            ..Default::default()
        };

        let content = "BEGIN:VCALENDAR\r\nBEGIN:VTODO\r\nUID:t1\r\n\
            SUMMARY:Buy milk\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";
        let block = store.save(&request, content).await.unwrap();
        assert!(block.starts_with("BEGIN:VTODO"));
        assert!(block.ends_with("END:VTODO\r\n"));
        assert!(block.contains("Buy milk"));

        // A fresh store must read it back from disk
        let mut fresh = TodoStore::new(dir.path());
        assert_eq!(fresh.load(&request).await, Some(block));
    }

    #[tokio::test]
    async fn body_without_todos_clears_the_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TodoStore::new(dir.path());
        let request = CalendarRequest {
            url: "https://cal.example.org/feeds/basic.ics".to_string(),
            ..Default::default()
        };

        let with = "BEGIN:VCALENDAR\r\nBEGIN:VTODO\r\nUID:t1\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";
        assert!(store.save(&request, with).await.is_some());

        let without = "BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n";
        assert!(store.save(&request, without).await.is_none());

        let mut fresh = TodoStore::new(dir.path());
        assert_eq!(fresh.load(&request).await, None);
    }

    #[tokio::test]
    async fn event_inside_crop_uses_full_parse() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TodoStore::new(dir.path());
        let request = CalendarRequest {
            url: "https://cal.example.org/feeds/basic.ics".to_string(),
            ..Default::default()
        };

        // An event sits between the two to-dos, so the naive crop would
        // capture it
        let content = "BEGIN:VCALENDAR\r\n\
            BEGIN:VTODO\r\nUID:t1\r\nEND:VTODO\r\n\
            BEGIN:VEVENT\r\nUID:e1\r\nSUMMARY:Standup\r\nEND:VEVENT\r\n\
            BEGIN:VTODO\r\nUID:t2\r\nEND:VTODO\r\n\
            END:VCALENDAR\r\n";
        let block = store.save(&request, content).await.unwrap();
        assert!(block.contains("UID:t1"));
        assert!(block.contains("UID:t2"));
        assert!(!block.contains("VEVENT"));
    }

    #[tokio::test]
    async fn failed_mirror_write_still_returns_the_block() {
        let dir = tempfile::tempdir().unwrap();
        // A file squats on the mirror directory path
        fs::write(dir.path().join("todo"), b"x").await.unwrap();

        let mut store = TodoStore::new(dir.path());
        let request = CalendarRequest {
            url: "https://cal.example.org/feeds/basic.ics".to_string(),
            ..Default::default()
        };
        let content = "BEGIN:VCALENDAR\r\nBEGIN:VTODO\r\nUID:t1\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";
        let block = store.save(&request, content).await.unwrap();
        assert!(block.contains("UID:t1"));
    }
}
