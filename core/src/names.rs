// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Calendar display-name cache.
//!
//! Feed listings carry display names; ICS export URLs do not. Names seen in
//! listings are persisted so a sync target can still be labelled in logs and
//! listings between feed reads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use icalsync_remote::CalendarEntry;
use tokio::fs;
use tracing::warn;

/// Name cache file under the work directory.
const FILE_NAME: &str = "calendar-names.txt";

/// URL-keyed display names, persisted as `url<TAB>name` lines.
#[derive(Debug)]
pub struct NameCache {
    path: PathBuf,
    names: Option<HashMap<String, String>>,
}

impl NameCache {
    /// Creates a cache persisted under `work_dir`.
    #[must_use]
    pub fn new(work_dir: &Path) -> Self {
        Self {
            path: work_dir.join(FILE_NAME),
            names: None,
        }
    }

    /// Records the display names of a feed listing and persists the cache.
    pub async fn store(&mut self, entries: &[CalendarEntry]) {
        self.load_if_needed().await;
        let Some(names) = self.names.as_mut() else {
            return;
        };
        let mut changed = false;
        for entry in entries {
            let Some(title) = &entry.title else { continue };
            if names.get(&entry.self_link) != Some(title) {
                names.insert(entry.self_link.clone(), title.clone());
                changed = true;
            }
        }
        if !changed {
            return;
        }

        let mut out = String::new();
        let mut lines: Vec<_> = names.iter().collect();
        lines.sort();
        for (url, name) in lines {
            out.push_str(url);
            out.push('\t');
            out.push_str(name);
            out.push('\n');
        }
        let tmp = self.path.with_extension("tmp");
        let write = async {
            fs::write(&tmp, out.as_bytes()).await?;
            fs::rename(&tmp, &self.path).await
        };
        if let Err(e) = write.await {
            warn!(path = %self.path.display(), error = %e, "unable to save calendar names");
        }
    }

    /// The display name of a calendar URL.
    ///
    /// Exact match first; for ICS exports, any stored URL sharing the prefix
    /// before `/private` also matches.
    pub async fn calendar_name(&mut self, url: &str) -> Option<String> {
        self.load_if_needed().await;
        let names = self.names.as_ref()?;
        if let Some(name) = names.get(url) {
            return Some(name.clone());
        }
        let prefix = url.split("/private").next()?;
        if prefix == url {
            return None;
        }
        names
            .iter()
            .find(|(key, _)| key.starts_with(prefix))
            .map(|(_, name)| name.clone())
    }

    async fn load_if_needed(&mut self) {
        if self.names.is_some() {
            return;
        }
        let mut names = HashMap::new();
        match fs::read_to_string(&self.path).await {
            Ok(text) => {
                for line in text.lines() {
                    if let Some((url, name)) = line.split_once('\t') {
                        names.insert(url.to_string(), name.to_string());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "unable to load calendar names"),
        }
        self.names = Some(names);
    }
}
