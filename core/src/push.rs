// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Pushing local edits to the remote store.
//!
//! The uploaded body is diffed against the previous pass's body. Events
//! present in both but unequal are updated, events gone from the new body
//! are deleted, and events with an unknown id are inserted unless an old
//! event matches them under the looser comparison (clients rewrite UIDs on
//! edit, and a rewritten UID must not become a delete-and-recreate pair).
//!
//! Per-event rejections are logged and skipped; only transport-level
//! failures abort the pass.

use std::collections::{HashMap, HashSet};

use icalsync_ical::{Event, Property, parse};
use icalsync_remote::{EventEntry, Reminder, RemoteError, When};
use tracing::{debug, info, warn};

use crate::compare::EventComparator;
use crate::config::AlarmChannels;
use crate::engine::{CalendarEngine, feed_url};
use crate::error::SyncError;
use crate::extensions::{CATEGORIES_EXTENSION, PRIORITY_EXTENSION, UID_EXTENSION, URL_EXTENSION};
use crate::matcher::find_entry;
use crate::placeholder::ERROR_MARKER;
use crate::quantize::closest_allowed;
use crate::request::CachedCalendar;
use crate::tz_registry::TzRegistry;

/// Diffs a calendar's bodies and applies the changes remotely.
///
/// # Errors
///
/// Session and feed transport errors. Individual event operations never
/// fail the pass.
pub async fn push_changes(
    engine: &mut CalendarEngine,
    comparator: &mut EventComparator,
    channels: AlarmChannels,
    cached: &CachedCalendar,
) -> Result<(), SyncError> {
    let Some(previous_body) = &cached.previous_body else {
        return Ok(());
    };
    let Some(username) = cached.username.as_deref() else {
        return Ok(());
    };
    let Some(password) = cached.password.as_deref() else {
        return Ok(());
    };

    let old_events = match parse(previous_body) {
        Ok(calendar) => calendar.events,
        Err(e) => {
            warn!(url = cached.url, error = %e, "previous body does not parse, skipping push");
            return Ok(());
        }
    };
    let mut new_events = match parse(&cached.body) {
        Ok(calendar) => calendar.events,
        Err(e) => {
            warn!(url = cached.url, error = %e, "uploaded body does not parse, skipping push");
            return Ok(());
        }
    };

    let feed = feed_url(&cached.url);
    let token = engine.store.session(&feed, username, password).await?;
    let mut entries = engine.store.query_events(&feed, &token).await?;

    let old_by_id: HashMap<String, &Event> = old_events
        .iter()
        .filter_map(|e| e.sync_uid().map(|id| (id, e)))
        .collect();
    let new_ids: HashSet<String> = new_events.iter().filter_map(Event::sync_uid).collect();

    // Old ids claimed by a new event under a rewritten UID
    let mut claimed: HashSet<String> = HashSet::new();

    for new_event in &mut new_events {
        let Some(id) = new_event.sync_uid() else {
            continue;
        };
        if id.starts_with(ERROR_MARKER) {
            continue;
        }

        if let Some(old_event) = old_by_id.get(&id) {
            if comparator.events_equal(old_event, new_event, false, &cached.url, &engine.tz) {
                continue;
            }
            debug!(title = new_event.display_title(), "event changed locally");
            update_event(engine, &token, cached, &id, new_event, channels, &mut entries).await;
            continue;
        }

        let matched_old = old_events.iter().find_map(|old_event| {
            let old_id = old_event.sync_uid()?;
            if new_ids.contains(&old_id) || claimed.contains(&old_id) {
                return None;
            }
            comparator
                .events_equal(old_event, new_event, true, &cached.url, &engine.tz)
                .then_some(old_id)
        });
        if let Some(old_id) = matched_old {
            debug!(
                title = new_event.display_title(),
                "id rewritten locally, keeping remote entry"
            );
            claimed.insert(old_id);
            continue;
        }

        debug!(title = new_event.display_title(), "new local event");
        insert_event(engine, &token, cached, &feed, &id, new_event, channels).await;
    }

    for old_event in &old_events {
        let Some(id) = old_event.sync_uid() else {
            continue;
        };
        if id.starts_with(ERROR_MARKER) || new_ids.contains(&id) || claimed.contains(&id) {
            continue;
        }
        debug!(title = old_event.display_title(), "event removed locally");
        delete_event(engine, &token, cached, &id, old_event, &mut entries).await;
    }

    info!(url = cached.url, "push pass finished");
    Ok(())
}

async fn update_event(
    engine: &mut CalendarEngine,
    token: &str,
    cached: &CachedCalendar,
    id: &str,
    event: &Event,
    channels: AlarmChannels,
    entries: &mut Vec<EventEntry>,
) {
    let edit_url = match engine.edit_maps.edit_url(&cached.url, id) {
        Some(url) => Some(url.to_string()),
        None => find_entry(entries, event, &mut engine.date_cache, &engine.tz)
            .and_then(|entry| entry.edit_link),
    };
    let Some(edit_url) = edit_url else {
        warn!(
            title = event.display_title(),
            "no edit link known for changed event, skipping"
        );
        return;
    };
    let entry = event_to_entry(event, id, channels, engine.extensions_enabled, &engine.tz);
    let result = engine.store.update_entry(&edit_url, token, &entry).await;
    apply_or_log(engine, token, &edit_url, entry, result, "update").await;
}

async fn insert_event(
    engine: &mut CalendarEngine,
    token: &str,
    cached: &CachedCalendar,
    feed: &str,
    id: &str,
    event: &Event,
    channels: AlarmChannels,
) {
    let entry = event_to_entry(event, id, channels, engine.extensions_enabled, &engine.tz);
    match engine.store.insert_entry(feed, token, &entry).await {
        Ok(stored) => {
            if let Some(edit_link) = &stored.edit_link {
                engine.edit_maps.insert_edit_url(&cached.url, id, edit_link);
            }
            if let Some(remote_id) = &stored.id {
                engine.edit_maps.insert_remote_uid(&cached.url, id, remote_id);
            }
        }
        Err(e) => log_rejection(&e, "insert"),
    }
}

async fn delete_event(
    engine: &mut CalendarEngine,
    token: &str,
    cached: &CachedCalendar,
    id: &str,
    event: &Event,
    entries: &mut Vec<EventEntry>,
) {
    let edit_url = match engine.edit_maps.edit_url(&cached.url, id) {
        Some(url) => Some(url.to_string()),
        None => find_entry(entries, event, &mut engine.date_cache, &engine.tz)
            .and_then(|entry| entry.edit_link),
    };
    let Some(edit_url) = edit_url else {
        warn!(
            title = event.display_title(),
            "no remote entry found for removed event, skipping"
        );
        return;
    };
    if let Err(e) = engine.store.delete_entry(&edit_url, token).await {
        log_rejection(&e, "delete");
    }
    engine.edit_maps.invalidate_event(&cached.url, id);
}

/// Retries an update once without reminders when the store refuses them;
/// everything else just logs.
async fn apply_or_log(
    engine: &CalendarEngine,
    token: &str,
    edit_url: &str,
    mut entry: EventEntry,
    result: Result<EventEntry, RemoteError>,
    what: &str,
) {
    let Err(e) = result else { return };
    if e.is_too_many_reminders() && !entry.reminders.is_empty() {
        warn!(edit_url, "store refused the reminders, retrying without them");
        entry.reminders.clear();
        if let Err(e) = engine.store.update_entry(edit_url, token, &entry).await {
            log_rejection(&e, what);
        }
        return;
    }
    log_rejection(&e, what);
}

fn log_rejection(error: &RemoteError, what: &str) {
    if error.is_read_only() {
        warn!("calendar is read-only, {what} skipped");
    } else if error.is_no_instances() {
        warn!("recurrence has no instances, {what} skipped");
    } else {
        warn!(error = %error, "event {what} failed");
    }
}

/// Converts a local event into a feed entry.
fn event_to_entry(
    event: &Event,
    id: &str,
    channels: AlarmChannels,
    extensions_enabled: bool,
    tz: &TzRegistry,
) -> EventEntry {
    let mut entry = EventEntry {
        title: event.summary().map(str::to_string),
        content: event.description().map(str::to_string),
        location: event.location().map(str::to_string),
        status: event.status().map(str::to_lowercase),
        visibility: event.classification().map(str::to_lowercase),
        transparency: event.transparency().map(str::to_lowercase),
        attendees: event.attendees().unwrap_or_default(),
        ..EventEntry::default()
    };

    if event.rrule().is_some() {
        entry.recurrence = Some(recurrence_block(event));
    } else if let Some(start) = event.dtstart().map(|d| tz.timestamp_millis(event, &d)) {
        let end = event
            .dtend()
            .map_or(start, |d| tz.timestamp_millis(event, &d));
        // Some clients write inverted ranges
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        entry.when = Some(When { start, end });
    }

    if let Some(minutes) = event.alarm_minutes() {
        if minutes > 0 {
            let minutes = closest_allowed(minutes);
            entry.reminders.extend(channel_methods(channels).into_iter().map(|method| Reminder {
                method: Some(method.to_string()),
                minutes: Some(minutes),
                ..Reminder::default()
            }));
        }
        // Zero minutes is the "clear reminders" mark, the list stays empty
    }

    entry.set_extended_property(UID_EXTENSION, id);
    if extensions_enabled {
        if let Some(categories) = event.categories().filter(|c| !c.starts_with("http")) {
            entry.set_extended_property(CATEGORIES_EXTENSION, categories);
        }
        if let Some(priority) = event.priority() {
            entry.set_extended_property(PRIORITY_EXTENSION, priority);
        }
        if let Some(url) = event.url() {
            entry.set_extended_property(URL_EXTENSION, url);
        }
    }
    entry
}

fn channel_methods(channels: AlarmChannels) -> Vec<&'static str> {
    let mut methods = Vec::new();
    if channels.popup {
        methods.push("popup");
    }
    if channels.email {
        methods.push("email");
    }
    if channels.sms {
        methods.push("sms");
    }
    methods
}

/// The recurrence text block of a recurring event: its date and rule lines
/// verbatim.
fn recurrence_block(event: &Event) -> String {
    let mut out = String::new();
    for property in &event.properties {
        if matches!(
            property.name.as_str(),
            "DTSTART" | "DTEND" | "RRULE" | "EXDATE" | "RDATE"
        ) {
            out.push_str(&format_property(property));
            out.push_str("\r\n");
        }
    }
    out
}

fn format_property(property: &Property) -> String {
    let mut out = property.name.clone();
    for (name, value) in &property.params {
        out.push(';');
        out.push_str(name);
        out.push('=');
        out.push_str(value);
    }
    out.push(':');
    out.push_str(&property.value);
    out
}
