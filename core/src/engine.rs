// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Calendar loading.
//!
//! A load never fails: any unrecoverable download error is answered with a
//! marked placeholder body instead, so polling clients keep their last good
//! copy on screen. Successful downloads feed the time-zone registry and,
//! when extensions are enabled, get the feed's recovered properties spliced
//! back in.

use icalsync_ical::parse;
use icalsync_remote::{EventEntry, RemoteStore};
use jiff::Timestamp;
use tracing::{info, warn};

use crate::extensions::{build_extension_map, insert_extensions};
use crate::matcher::{DateCache, EditMaps};
use crate::placeholder::placeholder_calendar;
use crate::request::CalendarRequest;
use crate::tz_registry::TzRegistry;

/// Download-side sync state shared with the push pass.
#[derive(Debug)]
pub struct CalendarEngine {
    pub(crate) store: RemoteStore,
    pub(crate) tz: TzRegistry,
    pub(crate) edit_maps: EditMaps,
    pub(crate) date_cache: DateCache,
    pub(crate) extensions_enabled: bool,
}

impl CalendarEngine {
    /// Creates an engine around a store client.
    #[must_use]
    pub fn new(store: RemoteStore, extensions_enabled: bool) -> Self {
        Self {
            store,
            tz: TzRegistry::new(),
            edit_maps: EditMaps::new(),
            date_cache: DateCache::new(),
            extensions_enabled,
        }
    }

    /// Downloads a calendar body, or a placeholder when the store is out of
    /// reach.
    pub async fn load_calendar(&mut self, request: &CalendarRequest, now: Timestamp) -> Vec<u8> {
        let body = match self
            .store
            .download_ics(
                &request.url,
                request.username.as_deref(),
                request.password.as_deref(),
            )
            .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!(url = request.url, error = %e, "serving placeholder calendar");
                return placeholder_calendar(&e, now);
            }
        };

        // A fresh download resets everything derived from the old one
        self.edit_maps.invalidate(&request.url);

        let calendar = match parse(&body) {
            Ok(calendar) => calendar,
            Err(e) => {
                warn!(url = request.url, error = %e, "downloaded body does not parse, serving raw");
                return body;
            }
        };
        self.tz.register_calendar(&calendar);
        info!(
            url = request.url,
            events = calendar.events.len(),
            "calendar loaded"
        );

        if !self.extensions_enabled || request.credentials().is_none() {
            return body;
        }
        let entries = match self.feed_entries(request).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(url = request.url, error = %e, "event feed unavailable, serving body as-is");
                return body;
            }
        };
        let map = build_extension_map(
            &calendar.events,
            entries,
            &request.url,
            &mut self.edit_maps,
            &mut self.date_cache,
            &self.tz,
        );
        insert_extensions(&body, &map, now.as_millisecond())
    }

    /// The event feed entries behind a request's calendar.
    pub(crate) async fn feed_entries(
        &self,
        request: &CalendarRequest,
    ) -> Result<Vec<EventEntry>, icalsync_remote::RemoteError> {
        let (username, password) = request
            .credentials()
            .ok_or_else(|| icalsync_remote::RemoteError::InvalidCredentials(String::new()))?;
        let feed = feed_url(&request.url);
        let token = self.store.session(&feed, username, password).await?;
        self.store.query_events(&feed, &token).await
    }
}

/// The event feed URL behind a calendar URL. ICS export URLs map onto their
/// calendar's feed; anything else already is one.
pub(crate) fn feed_url(url: &str) -> String {
    if !url.ends_with(".ics") {
        return url.to_string();
    }
    let prefix = url
        .split_once("/private")
        .map_or_else(|| url.rsplit_once('/').map_or(url, |(head, _)| head), |(head, _)| head);
    format!("{prefix}/events")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_url_from_ics_export() {
        assert_eq!(
            feed_url("https://cal.example.org/feeds/cal-1/private/basic.ics"),
            "https://cal.example.org/feeds/cal-1/events"
        );
        assert_eq!(
            feed_url("https://cal.example.org/feeds/cal-1/basic.ics"),
            "https://cal.example.org/feeds/cal-1/events"
        );
        assert_eq!(
            feed_url("https://cal.example.org/feeds/cal-1/events"),
            "https://cal.example.org/feeds/cal-1/events"
        );
    }
}
