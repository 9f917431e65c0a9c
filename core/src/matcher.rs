// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Pairing local events with remote feed entries.
//!
//! The authoritative link is the local UID carried as an extended property.
//! Entries created outside this tool lack it, so a scored fallback compares
//! creation time, title, content and times; two agreeing fields are enough.
//! A matched entry leaves the candidate pool either way, so one entry never
//! pairs with two events.

use std::collections::HashMap;

use icalsync_ical::{Event, IcalDateTime};
use icalsync_remote::EventEntry;
use tracing::debug;

use crate::extensions::UID_EXTENSION;
use crate::tz_registry::TzRegistry;

/// Minimum fallback score for a pairing.
const MIN_MATCH_SCORE: u32 = 2;

/// Memoized entry start/end times, keyed `s\t{id}` / `e\t{id}`.
pub type DateCache = HashMap<String, i64>;

/// Per-calendar maps from local event ids to remote edit URLs and ids.
///
/// Rebuilt from fresh downloads; [`EditMaps::invalidate`] drops a calendar's
/// maps whenever its feed can no longer be trusted.
#[derive(Debug, Default)]
pub struct EditMaps {
    edit_urls: HashMap<String, HashMap<String, String>>,
    remote_uids: HashMap<String, HashMap<String, String>>,
}

impl EditMaps {
    /// Creates empty maps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops everything known about one calendar URL.
    pub fn invalidate(&mut self, url: &str) {
        self.edit_urls.remove(url);
        self.remote_uids.remove(url);
    }

    /// Drops everything known about one event of a calendar.
    pub fn invalidate_event(&mut self, url: &str, local_id: &str) {
        if let Some(map) = self.edit_urls.get_mut(url) {
            map.remove(local_id);
        }
        if let Some(map) = self.remote_uids.get_mut(url) {
            map.remove(local_id);
        }
    }

    /// Records the edit URL of a local event id.
    pub fn insert_edit_url(&mut self, url: &str, local_id: &str, edit_url: &str) {
        self.edit_urls
            .entry(url.to_string())
            .or_default()
            .insert(local_id.to_string(), edit_url.to_string());
    }

    /// The recorded edit URL of a local event id.
    #[must_use]
    pub fn edit_url(&self, url: &str, local_id: &str) -> Option<&str> {
        self.edit_urls.get(url)?.get(local_id).map(String::as_str)
    }

    /// Records the remote id of a local event id.
    pub fn insert_remote_uid(&mut self, url: &str, local_id: &str, remote_uid: &str) {
        self.remote_uids
            .entry(url.to_string())
            .or_default()
            .insert(local_id.to_string(), remote_uid.to_string());
    }

    /// The recorded remote id of a local event id.
    #[must_use]
    pub fn remote_uid(&self, url: &str, local_id: &str) -> Option<&str> {
        self.remote_uids.get(url)?.get(local_id).map(String::as_str)
    }
}

/// Finds and removes the feed entry belonging to a local event.
pub fn find_entry(
    entries: &mut Vec<EventEntry>,
    event: &Event,
    date_cache: &mut DateCache,
    tz: &TzRegistry,
) -> Option<EventEntry> {
    let uid = event.sync_uid();
    let created = event.created().map(|c| c.timestamp_millis(None));
    let title = event.summary().map(normalize_line_breaks);
    let content = event.description().map(normalize_line_breaks);
    let start = event.dtstart().map(|d| tz.timestamp_millis(event, &d));
    let end = event.dtend().map(|d| tz.timestamp_millis(event, &d));

    // The extended local id is authoritative
    if let Some(uid) = &uid {
        if let Some(i) = entries
            .iter()
            .position(|e| e.extended_property(UID_EXTENSION) == Some(uid))
        {
            debug!(title = event.display_title(), "matched entry by local id");
            return Some(entries.remove(i));
        }
    }

    let mut best: Option<usize> = None;
    let mut best_score = 0;
    for (i, entry) in entries.iter().enumerate() {
        let mut score = 0;

        // Creation times: equality scores, a remote entry older than the
        // local event cannot be its counterpart
        if let (Some(created), Some(published)) = (created, entry.published) {
            if created == published {
                score += 1;
            } else if published != 0 && created > published {
                continue;
            }
        }

        if let (Some(title), Some(entry_title)) = (&title, &entry.title) {
            if *title == normalize_line_breaks(entry_title) {
                score += 1;
            }
        }

        if let (Some(content), Some(entry_content)) = (&content, &entry.content) {
            let entry_content = normalize_line_breaks(entry_content);
            if !content.is_empty() && !entry_content.is_empty() && *content == entry_content {
                score += 1;
            }
        }

        let (entry_start, entry_end) = entry_times(entry, date_cache);
        if start.is_some() && start == entry_start {
            score += 1;
        }
        if end.is_some() && end == entry_end {
            score += 1;
        }

        if score > best_score {
            best_score = score;
            best = Some(i);
        }
    }

    if best_score < MIN_MATCH_SCORE {
        return None;
    }
    best.map(|i| entries.remove(i))
}

/// The start/end millis of a feed entry, from its `when` times or, for
/// recurring entries, from the recurrence text block. Memoized per entry id.
fn entry_times(entry: &EventEntry, date_cache: &mut DateCache) -> (Option<i64>, Option<i64>) {
    let id = entry.id.as_deref().unwrap_or_default();
    let start_key = format!("s\t{id}");
    let end_key = format!("e\t{id}");
    if let (Some(&s), Some(&e)) = (date_cache.get(&start_key), date_cache.get(&end_key)) {
        return (Some(s), Some(e));
    }

    let (start, end) = match &entry.when {
        Some(when) => (Some(when.start), Some(when.end)),
        None => match &entry.recurrence {
            Some(block) => (
                recurrence_time(block, "DTSTART"),
                recurrence_time(block, "DTEND"),
            ),
            None => (None, None),
        },
    };
    if let Some(s) = start {
        date_cache.insert(start_key, s);
    }
    if let Some(e) = end {
        date_cache.insert(end_key, e);
    }
    (start, end)
}

fn recurrence_time(block: &str, name: &str) -> Option<i64> {
    block
        .lines()
        .find(|line| line.starts_with(name))
        .and_then(|line| line.rsplit_once(':'))
        .and_then(|(_, value)| IcalDateTime::parse(value.trim()).ok())
        .map(|d| d.timestamp_millis(None))
}

/// Trims and rewrites any line-break style to bare `\n`.
pub fn normalize_line_breaks(text: &str) -> String {
    let text = text.trim();
    if !text.contains(['\r', '\n']) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use icalsync_ical::Property;
    use icalsync_remote::When;

    use super::*;

    fn event(props: &[(&str, &str)]) -> Event {
        Event {
            properties: props.iter().map(|(n, v)| Property::new(n, v)).collect(),
            alarms: Vec::new(),
        }
    }

    fn entry(title: &str, start: i64, end: i64) -> EventEntry {
        EventEntry {
            id: Some(format!("id-{title}-{start}")),
            title: Some(title.to_string()),
            when: Some(When { start, end }),
            ..Default::default()
        }
    }

    #[test]
    fn extended_uid_wins_over_scores() {
        let mut entries = vec![entry("Standup", 0, 1), {
            let mut e = entry("Other", 10, 20);
            e.set_extended_property(UID_EXTENSION, "abc");
            e
        }];
        let event = event(&[("UID", "abc"), ("SUMMARY", "Standup")]);
        let mut cache = DateCache::new();

        let matched = find_entry(&mut entries, &event, &mut cache, &TzRegistry::new()).unwrap();
        assert_eq!(matched.title.as_deref(), Some("Other"));
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn one_agreeing_field_is_not_enough() {
        let mut entries = vec![entry("Standup", 999, 1999)];
        let event = event(&[
            ("UID", "abc"),
            ("SUMMARY", "Standup"),
            ("DTSTART", "20260102T100000Z"),
        ]);
        let mut cache = DateCache::new();
        assert!(find_entry(&mut entries, &event, &mut cache, &TzRegistry::new()).is_none());
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn title_and_start_match() {
        let event = event(&[
            ("UID", "abc"),
            ("SUMMARY", "Standup"),
            ("DTSTART", "20260102T100000Z"),
        ]);
        let start = IcalDateTime::parse("20260102T100000Z")
            .unwrap()
            .timestamp_millis(None);
        let mut entries = vec![entry("Lunch", start, start), entry("Standup", start, start)];
        let mut cache = DateCache::new();

        let matched = find_entry(&mut entries, &event, &mut cache, &TzRegistry::new()).unwrap();
        assert_eq!(matched.title.as_deref(), Some("Standup"));
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn equal_scores_keep_the_first_candidate() {
        let event = event(&[
            ("UID", "abc"),
            ("SUMMARY", "Standup"),
            ("DTSTART", "20260102T100000Z"),
        ]);
        let start = IcalDateTime::parse("20260102T100000Z")
            .unwrap()
            .timestamp_millis(None);
        // Both candidates score 2 (title + start)
        let mut first = entry("Standup", start, 1);
        first.id = Some("first".to_string());
        let mut second = entry("Standup", start, 2);
        second.id = Some("second".to_string());
        let mut entries = vec![first, second];
        let mut cache = DateCache::new();

        let matched = find_entry(&mut entries, &event, &mut cache, &TzRegistry::new()).unwrap();
        assert_eq!(matched.id.as_deref(), Some("first"));
    }

    #[test]
    fn newer_local_event_skips_older_entry() {
        let mut e = entry("Standup", 0, 0);
        e.published = Some(1_000);
        e.when = None;
        let mut entries = vec![e];
        // Local created after the remote entry was published, same title
        let event = event(&[
            ("UID", "abc"),
            ("SUMMARY", "Standup"),
            ("CREATED", "20260102T100000Z"),
        ]);
        let mut cache = DateCache::new();
        assert!(find_entry(&mut entries, &event, &mut cache, &TzRegistry::new()).is_none());
    }

    #[test]
    fn recurring_entry_times_come_from_the_block() {
        let mut e = entry("Standup", 0, 0);
        e.when = None;
        e.recurrence = Some(
            "DTSTART:20260102T100000Z\nDTEND:20260102T103000Z\nRRULE:FREQ=DAILY".to_string(),
        );
        let mut entries = vec![e];
        let event = event(&[
            ("UID", "abc"),
            ("SUMMARY", "Standup"),
            ("DTSTART", "20260102T100000Z"),
            ("DTEND", "20260102T103000Z"),
        ]);
        let mut cache = DateCache::new();
        assert!(find_entry(&mut entries, &event, &mut cache, &TzRegistry::new()).is_some());
        // Times were memoized
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn normalizes_line_break_styles() {
        assert_eq!(normalize_line_breaks("  plain  "), "plain");
        assert_eq!(normalize_line_breaks("a\r\nb"), "a\nb\n");
        assert_eq!(normalize_line_breaks("a\n\nb"), "a\n\nb\n");
    }
}
