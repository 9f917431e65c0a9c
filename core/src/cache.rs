// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory calendar cache with lazy TTL eviction.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::request::CachedCalendar;

/// Hard cap on cached calendars; the whole cache is cleared beyond it.
const MAX_CACHE_SIZE: usize = 100;

/// URL-keyed calendar cache.
///
/// Expiry is checked on lookup only; there is no background sweep.
#[derive(Debug)]
pub struct CalendarCache {
    entries: HashMap<String, CachedCalendar>,
    ttl_millis: i64,
}

impl CalendarCache {
    /// Creates a cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// The cached calendar for `url`, unless absent or expired. An expired
    /// entry is removed and reported as a miss.
    pub fn get(&mut self, url: &str, now: i64) -> Option<&CachedCalendar> {
        let expired = self
            .entries
            .get(url)
            .is_some_and(|c| now - c.last_modified >= self.ttl_millis);
        if expired {
            debug!(url, "cache entry expired");
            self.entries.remove(url);
            return None;
        }
        self.entries.get(url)
    }

    /// Inserts a calendar, clearing everything first on overflow.
    pub fn insert(&mut self, calendar: CachedCalendar) {
        if self.entries.len() >= MAX_CACHE_SIZE {
            warn!(size = self.entries.len(), "calendar cache overflow, clearing");
            self.entries.clear();
        }
        self.entries.insert(calendar.url.clone(), calendar);
    }

    /// Removes one entry.
    pub fn remove(&mut self, url: &str) -> Option<CachedCalendar> {
        self.entries.remove(url)
    }
}
