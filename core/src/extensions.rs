// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Private extension properties.
//!
//! The remote store strips reminders, categories, priorities and URLs from
//! its ICS exports. Those values survive as extended properties on the feed
//! entries instead, so after every download the feed is matched against the
//! body and the lost lines are spliced back in. The local UID travels the
//! other way as its own extended property, giving the matcher an exact key.

use std::collections::HashMap;

use icalsync_ical::Event;
use icalsync_remote::{EventEntry, Reminder};
use jiff::Timestamp;
use tracing::{debug, warn};

use crate::matcher::{DateCache, EditMaps, find_entry};
use crate::quantize::encode_trigger;
use crate::tz_registry::TzRegistry;

/// Extended property carrying the local event UID on a remote entry.
pub const UID_EXTENSION: &str = "icalsync-uid";

/// Extended property carrying the event's categories.
pub const CATEGORIES_EXTENSION: &str = "icalsync-categories";

/// Extended property carrying the event's priority.
pub const PRIORITY_EXTENSION: &str = "icalsync-priority";

/// Extended property carrying the event's URL.
pub const URL_EXTENSION: &str = "icalsync-url";

/// Inserted alarms are stamped as acknowledged this far in the past, so
/// clients treat past occurrences as already fired.
const LAST_ACK_TIMEOUT_MILLIS: i64 = 86_400_000;

/// Values recovered from the feed, keyed `{event-id}\t{kind}` where kind is
/// `a`larm minutes, `c`ategories, `p`riority or `u`rl.
pub type ExtensionMap = HashMap<String, String>;

/// Matches a downloaded body's events against the feed and collects the
/// values to splice back in, recording edit URLs and id bindings as a side
/// effect.
pub fn build_extension_map(
    events: &[Event],
    mut entries: Vec<EventEntry>,
    calendar_url: &str,
    edit_maps: &mut EditMaps,
    date_cache: &mut DateCache,
    tz: &TzRegistry,
) -> ExtensionMap {
    let mut extensions = ExtensionMap::new();
    for event in events {
        let Some(id) = event.sync_uid() else { continue };
        let Some(entry) = find_entry(&mut entries, event, date_cache, tz) else {
            continue;
        };

        if let Some(edit_link) = &entry.edit_link {
            edit_maps.insert_edit_url(calendar_url, &id, edit_link);
        }
        if let Some(remote_id) = &entry.id {
            edit_maps.insert_remote_uid(calendar_url, &id, remote_id);
        }

        if let Some(minutes) = entry.reminders.iter().find_map(|r| r.minutes) {
            extensions.insert(format!("{id}\ta"), minutes.to_string());
        }
        if let Some(categories) = entry.extended_property(CATEGORIES_EXTENSION) {
            extensions.insert(format!("{id}\tc"), categories.to_string());
        }
        if let Some(priority) = entry.extended_property(PRIORITY_EXTENSION) {
            extensions.insert(format!("{id}\tp"), priority.to_string());
        }
        if let Some(url) = entry.extended_property(URL_EXTENSION) {
            extensions.insert(format!("{id}\tu"), url.to_string());
        }
    }
    debug!(
        url = calendar_url,
        values = extensions.len(),
        "extension map rebuilt"
    );
    extensions
}

/// Splices recovered values back into a downloaded body.
///
/// A single pass over the lines drops any `CATEGORIES`, `PRIORITY` and `URL`
/// the body does carry, then re-emits the feed's values before each
/// `END:VEVENT` whose id appears in the map. Alarms are only inserted when
/// the body has none of its own. Any failure returns the body unchanged.
#[must_use]
pub fn insert_extensions(body: &[u8], extensions: &ExtensionMap, now: i64) -> Vec<u8> {
    if extensions.is_empty() {
        return body.to_vec();
    }
    let Ok(text) = std::str::from_utf8(body) else {
        warn!("downloaded body is not valid UTF-8, leaving it untouched");
        return body.to_vec();
    };
    let insert_alarms = !text.contains("BEGIN:VALARM");
    let ack = last_ack(now);

    let mut out = String::with_capacity(text.len());
    let mut uid: Option<String> = None;
    let mut recurrence_millis: Option<i64> = None;
    let mut dropping = false;
    for line in text.lines() {
        // Continuations belong to the previous line's fate
        if line.starts_with([' ', '\t']) {
            if !dropping {
                push_line(&mut out, line);
            }
            continue;
        }
        dropping = false;

        let (name, value) = split_line(line);
        match name {
            "CATEGORIES" | "PRIORITY" | "URL" => {
                dropping = true;
                continue;
            }
            "BEGIN" if value == "VEVENT" => {
                uid = None;
                recurrence_millis = None;
            }
            "UID" => uid = Some(value.to_string()),
            "RECURRENCE-ID" => {
                recurrence_millis = icalsync_ical::IcalDateTime::parse(value)
                    .ok()
                    .map(|d| d.timestamp_millis(None));
            }
            "END" if value == "VEVENT" => {
                if let Some(uid) = uid.take() {
                    let id = match recurrence_millis.take() {
                        Some(millis) => format!("{uid}!{millis}"),
                        None => uid,
                    };
                    emit_extensions(&mut out, &id, extensions, insert_alarms, &ack);
                }
            }
            _ => {}
        }
        push_line(&mut out, line);
    }
    out.into_bytes()
}

fn emit_extensions(
    out: &mut String,
    id: &str,
    extensions: &ExtensionMap,
    insert_alarms: bool,
    ack: &str,
) {
    if insert_alarms {
        if let Some(minutes) = extensions
            .get(&format!("{id}\ta"))
            .and_then(|m| m.parse::<i64>().ok())
        {
            let reminder = Reminder {
                minutes: Some(minutes),
                ..Default::default()
            };
            push_line(out, &format!("X-RAINLENDAR-LASTALARMACK:{ack}"));
            push_line(out, "BEGIN:VALARM");
            push_line(
                out,
                &format!("TRIGGER;VALUE=DURATION:-P{}", encode_trigger(&reminder)),
            );
            push_line(out, &format!("X-MOZ-LASTACK:{ack}"));
            push_line(out, "ACTION:AUDIO");
            push_line(out, "END:VALARM");
        }
    }
    if let Some(categories) = extensions.get(&format!("{id}\tc")) {
        push_line(out, &format!("CATEGORIES:{categories}"));
    }
    if let Some(priority) = extensions.get(&format!("{id}\tp")) {
        push_line(out, &format!("PRIORITY:{priority}"));
    }
    if let Some(url) = extensions.get(&format!("{id}\tu")) {
        push_line(out, &format!("URL:{url}"));
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str("\r\n");
}

/// Splits a content line into its upper-cased name (before any parameter)
/// and value.
fn split_line(line: &str) -> (&str, &str) {
    let Some(colon) = line.find(':') else {
        return (line, "");
    };
    let head = line.get(..colon).unwrap_or_default();
    let value = line.get(colon + 1..).unwrap_or_default();
    let name = head.split(';').next().unwrap_or(head);
    (name, value)
}

fn last_ack(now: i64) -> String {
    Timestamp::from_millisecond(now - LAST_ACK_TIMEOUT_MILLIS)
        .unwrap_or(Timestamp::UNIX_EPOCH)
        .strftime("%Y%m%dT%H%M%SZ")
        .to_string()
}
