// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

/// One calendar access, described immutably per call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarRequest {
    /// The calendar's remote URL.
    pub url: String,
    /// Account username, when the calendar is private.
    pub username: Option<String>,
    /// Account password, when the calendar is private.
    pub password: Option<String>,
    /// Path of the local ICS file mirroring this calendar, when one exists.
    pub file_path: Option<PathBuf>,
    /// The access method (GET for reads, PUT for writes).
    pub method: String,
    /// The uploaded calendar body for writes.
    pub body: Option<Vec<u8>>,
}

impl CalendarRequest {
    /// Whether this URL names a two-way synchronization target (an ICS
    /// export) rather than a plain one-way feed.
    #[must_use]
    pub fn is_sync_target(&self) -> bool {
        self.url.ends_with(".ics")
    }

    /// Borrowed credentials, when both parts are present.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }
}

/// A calendar body held in the cache.
#[derive(Debug, Clone, Default)]
pub struct CachedCalendar {
    /// The calendar's remote URL.
    pub url: String,
    /// Account username.
    pub username: Option<String>,
    /// Account password.
    pub password: Option<String>,
    /// Path of the mirroring local file.
    pub file_path: Option<PathBuf>,
    /// The current calendar body.
    pub body: Vec<u8>,
    /// The body as of the previous pass, the diff baseline for pushes.
    pub previous_body: Option<Vec<u8>>,
    /// The preserved VTODO block, spliced back on serving.
    pub todo_block: Option<String>,
    /// Insertion time, epoch milliseconds.
    pub last_modified: i64,
}

impl CachedCalendar {
    /// Builds a cache entry from a request and a body.
    #[must_use]
    pub fn new(request: &CalendarRequest, body: Vec<u8>, now: i64) -> Self {
        Self {
            url: request.url.clone(),
            username: request.username.clone(),
            password: request.password.clone(),
            file_path: request.file_path.clone(),
            body,
            previous_body: None,
            todo_block: None,
            last_modified: now,
        }
    }
}
