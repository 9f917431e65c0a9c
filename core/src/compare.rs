// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Event equality for change detection.
//!
//! Fields are checked in decreasing order of trust so the common case (an
//! untouched event) bails out on the first cheap comparison. Recurring
//! events compare by canonical instant list, not rule text, so cosmetic
//! rule rewrites do not count as changes.

use std::collections::HashMap;

use icalsync_ical::{Alarm, Event, IcalDateTime, Property, RecurrenceExpander, canonical_exceptions};
use tracing::debug;

use crate::quantize::closest_allowed;
use crate::tz_registry::TzRegistry;

/// Cap on the alarm carry registry; cleared wholesale beyond it.
const MAX_REGISTRY_SIZE: usize = 100;

/// Stateful comparator shared across a synchronizer's passes.
#[derive(Debug)]
pub struct EventComparator {
    expander: RecurrenceExpander,
    alarm_registry: HashMap<String, i64>,
    extensions_enabled: bool,
}

impl EventComparator {
    /// Creates a comparator.
    #[must_use]
    pub fn new(extensions_enabled: bool) -> Self {
        Self {
            expander: RecurrenceExpander::new(),
            alarm_registry: HashMap::new(),
            extensions_enabled,
        }
    }

    /// Whether two versions of an event are the same for sync purposes.
    ///
    /// `find_new` enables the weaker-trust fields used when classifying an
    /// event as brand new rather than edited. `new` is mutable because a
    /// cleared reminder leaves a zero-length alarm behind as a marker for
    /// the push conversion.
    pub fn events_equal(
        &mut self,
        old: &Event,
        new: &mut Event,
        find_new: bool,
        calendar_url: &str,
        tz: &TzRegistry,
    ) -> bool {
        if !text_equal(old.summary(), new.summary()) {
            return false;
        }
        if !text_equal(old.description(), new.description()) {
            return false;
        }
        if !date_equal(old, new, tz, Event::dtstart) {
            return false;
        }
        if !date_equal(old, new, tz, Event::dtend) {
            return false;
        }
        if !text_equal(old.location(), new.location()) {
            return false;
        }
        if !self.recurrence_equal(old, new) {
            return false;
        }
        if canonical_exceptions(old) != canonical_exceptions(new) {
            return false;
        }

        if !find_new {
            return true;
        }

        if old.attendees() != new.attendees() {
            return false;
        }
        // Status, classification and transparency only count when the new
        // side asserts one
        if new.status().is_some() && !text_equal(old.status(), new.status()) {
            return false;
        }
        if new.classification().is_some()
            && !text_equal(old.classification(), new.classification())
        {
            return false;
        }
        if new.transparency().is_some() && !text_equal(old.transparency(), new.transparency()) {
            return false;
        }

        if !self.alarms_equal(old, new, calendar_url) {
            return false;
        }

        if self.extensions_enabled {
            if !text_equal(non_http(old.categories()), non_http(new.categories())) {
                return false;
            }
            if !text_equal(old.priority(), new.priority()) {
                return false;
            }
            if !text_equal(old.url(), new.url()) {
                return false;
            }
        }
        true
    }

    fn recurrence_equal(&mut self, old: &Event, new: &Event) -> bool {
        let old_dates = self.canonical_rule(old);
        let new_dates = self.canonical_rule(new);
        old_dates == new_dates
    }

    fn canonical_rule(&mut self, event: &Event) -> Option<String> {
        let rule = event.rrule()?;
        let start = event.dtstart()?;
        self.expander.canonical_instants(&start, rule).ok()
    }

    /// Compares quantized reminder lead times.
    ///
    /// With extensions disabled, downloaded bodies carry no alarms at all,
    /// so the last seen lead time is carried in a registry; a locally
    /// removed alarm then marks `new` with a zero-length alarm so the push
    /// conversion clears the remote reminders.
    fn alarms_equal(&mut self, old: &Event, new: &mut Event, calendar_url: &str) -> bool {
        let mut old_minutes = old.alarm_minutes().map(quantized);
        let new_minutes = new.alarm_minutes().map(quantized);

        let Some(uid) = old.uid() else {
            return true;
        };
        let key = format!("{calendar_url}\t{uid}");

        if old_minutes.is_none() && !self.extensions_enabled {
            old_minutes = self.alarm_registry.get(&key).copied();
        }
        match new_minutes {
            None => {
                if !self.extensions_enabled {
                    self.alarm_registry.remove(&key);
                }
                if old_minutes.is_some() {
                    if !self.extensions_enabled {
                        debug!(uid, "reminder removed locally, marking for clear");
                        new.alarms.push(Alarm {
                            properties: vec![Property::new("TRIGGER", "PT0M")],
                        });
                    }
                    return false;
                }
                true
            }
            Some(minutes) => {
                if old_minutes == Some(minutes) {
                    return true;
                }
                if !self.extensions_enabled {
                    if self.alarm_registry.len() > MAX_REGISTRY_SIZE {
                        self.alarm_registry.clear();
                    }
                    self.alarm_registry.insert(key, minutes);
                }
                false
            }
        }
    }
}

fn quantized(minutes: i64) -> i64 {
    if minutes > 0 {
        closest_allowed(minutes)
    } else {
        minutes
    }
}

fn text_equal(a: Option<&str>, b: Option<&str>) -> bool {
    let a = a.map(str::trim).filter(|v| !v.is_empty());
    let b = b.map(str::trim).filter(|v| !v.is_empty());
    match (a, b) {
        (Some(a), Some(b)) => {
            crate::matcher::normalize_line_breaks(a) == crate::matcher::normalize_line_breaks(b)
        }
        (None, None) => true,
        _ => false,
    }
}

fn date_equal(
    old: &Event,
    new: &Event,
    tz: &TzRegistry,
    get: impl Fn(&Event) -> Option<IcalDateTime>,
) -> bool {
    let millis = |event: &Event| get(event).map(|d| tz.timestamp_millis(event, &d));
    millis(old) == millis(new)
}

/// Category values that are HTTP links are artifacts, treated as absent.
fn non_http(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.starts_with("http"))
}
