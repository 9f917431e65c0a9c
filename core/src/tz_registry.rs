// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Time-zone registry patched from downloaded VTIMEZONE definitions.
//!
//! Calendar publishers ship custom `TZID`s the system database has never
//! heard of. Their VTIMEZONE blocks carry enough to compare timestamps: the
//! standard observance's `TZOFFSETTO`. The first observed definition of an
//! id wins for the registry's lifetime.

use std::collections::{HashMap, HashSet};

use icalsync_ical::{Calendar, Event, IcalDateTime};
use jiff::Timestamp;
use jiff::tz::{self, Offset};
use tracing::debug;

/// Monotonically growing map of observed time-zone offsets.
#[derive(Debug, Default)]
pub struct TzRegistry {
    offsets: HashMap<String, Offset>,
    seen: HashSet<String>,
}

impl TzRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every VTIMEZONE in `calendar` not seen before.
    pub fn register_calendar(&mut self, calendar: &Calendar) {
        for zone in &calendar.time_zones {
            let Some(id) = zone.id() else { continue };
            if id.is_empty() || !self.seen.insert(id.to_string()) {
                continue;
            }
            let offset = zone
                .seasonal()
                .and_then(|observance| observance.offset_to())
                .and_then(parse_offset);
            if let Some(offset) = offset {
                debug!(id, ?offset, "registered time zone");
                self.offsets.insert(id.to_string(), offset);
            }
        }
    }

    /// The offset for `tzid`: observed definitions first, then the system
    /// time-zone database.
    #[must_use]
    pub fn resolve(&self, tzid: &str, at: Timestamp) -> Option<Offset> {
        if let Some(offset) = self.offsets.get(tzid) {
            return Some(*offset);
        }
        tz::TimeZone::get(tzid).ok().map(|tz| tz.to_offset(at))
    }

    /// Epoch milliseconds of one of `event`'s date values.
    ///
    /// Zone-naive values resolve through the event's declared `TZID`;
    /// UTC-marked and date-only values pass through unchanged, and an
    /// unknown `TZID` falls back to UTC.
    #[must_use]
    pub fn timestamp_millis(&self, event: &Event, value: &IcalDateTime) -> i64 {
        if value.utc || value.date_only {
            return value.timestamp_millis(None);
        }
        let offset = event.start_tzid().and_then(|tzid| {
            let approx = Timestamp::from_millisecond(value.timestamp_millis(None))
                .unwrap_or(Timestamp::UNIX_EPOCH);
            self.resolve(tzid, approx)
        });
        value.timestamp_millis(offset)
    }
}

/// Parses `±HHMM` (optionally `±HHMMSS`) offset notation.
fn parse_offset(value: &str) -> Option<Offset> {
    let value = value.trim();
    let (sign, digits) = match value.split_at_checked(1)? {
        ("+", rest) => (1, rest),
        ("-", rest) => (-1, rest),
        _ => (1, value),
    };
    if digits.len() != 4 && digits.len() != 6 {
        return None;
    }
    let hours: i32 = digits.get(..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..4)?.parse().ok()?;
    let seconds: i32 = match digits.get(4..6) {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    Offset::from_seconds(sign * (hours * 3600 + minutes * 60 + seconds)).ok()
}
