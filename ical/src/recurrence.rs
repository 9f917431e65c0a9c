// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Bounded recurrence expansion for change detection.
//!
//! Recurring events are compared by expanding their rule over a fixed
//! horizon into a canonical instant list. The list answers exactly one
//! question, "did this recurring event change", and is never used to drive
//! scheduling.

use std::collections::HashMap;

use jiff::ToSpan;
use jiff::civil::Weekday;

use crate::datetime::IcalDateTime;
use crate::error::ParseError;
use crate::model::Event;

/// Cleared wholesale once this many expansions are cached.
const MAX_CACHE_SIZE: usize = 100;

/// Hard ceiling on emitted instants, guards against pathological rules.
const MAX_INSTANTS: usize = 5000;

/// Recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum RecurrenceFrequency {
    /// Every `interval` days.
    Daily,
    /// Every `interval` weeks, optionally on listed weekdays.
    Weekly,
    /// Every `interval` months.
    Monthly,
    /// Every `interval` years.
    Yearly,
}

/// A parsed `RRULE` subset sufficient for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    /// Repeat frequency.
    pub freq: RecurrenceFrequency,
    /// Step between occurrences, default 1.
    pub interval: i64,
    /// Occurrence count cap, including the start.
    pub count: Option<usize>,
    /// Inclusive end bound.
    pub until: Option<IcalDateTime>,
    /// Weekdays for weekly rules.
    pub by_day: Vec<Weekday>,
}

impl RecurrenceRule {
    /// Parses `FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE`-style rule text.
    /// Unsupported parts are ignored; an unsupported or missing `FREQ` is an
    /// error.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let invalid = |msg: String| ParseError::InvalidRule(msg);

        let mut freq = None;
        let mut interval = 1;
        let mut count = None;
        let mut until = None;
        let mut by_day = Vec::new();

        for part in text.split(';') {
            let Some((name, value)) = part.split_once('=') else {
                continue;
            };
            match name.trim().to_uppercase().as_str() {
                "FREQ" => {
                    freq = Some(
                        value
                            .trim()
                            .to_uppercase()
                            .parse::<RecurrenceFrequency>()
                            .map_err(|_| invalid(format!("unsupported FREQ: {value}")))?,
                    );
                }
                "INTERVAL" => {
                    interval = value
                        .trim()
                        .parse::<i64>()
                        .ok()
                        .filter(|&n| n >= 1)
                        .ok_or_else(|| invalid(format!("bad INTERVAL: {value}")))?;
                }
                "COUNT" => {
                    count = Some(
                        value
                            .trim()
                            .parse::<usize>()
                            .map_err(|_| invalid(format!("bad COUNT: {value}")))?,
                    );
                }
                "UNTIL" => until = Some(IcalDateTime::parse(value.trim())?),
                "BYDAY" => {
                    for day in value.split(',') {
                        let day = day.trim();
                        // Strip a possible ordinal prefix (e.g. 2MO, -1FR)
                        let code = &day[day.len().saturating_sub(2)..];
                        if let Some(weekday) = parse_weekday(code) {
                            by_day.push(weekday);
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            freq: freq.ok_or_else(|| invalid("missing FREQ".to_string()))?,
            interval,
            count,
            until,
            by_day,
        })
    }
}

fn parse_weekday(code: &str) -> Option<Weekday> {
    match code.to_uppercase().as_str() {
        "MO" => Some(Weekday::Monday),
        "TU" => Some(Weekday::Tuesday),
        "WE" => Some(Weekday::Wednesday),
        "TH" => Some(Weekday::Thursday),
        "FR" => Some(Weekday::Friday),
        "SA" => Some(Weekday::Saturday),
        "SU" => Some(Weekday::Sunday),
        _ => None,
    }
}

/// Expands recurrence rules into canonical instant lists, caching results by
/// (start, rule text).
#[derive(Debug, Default)]
pub struct RecurrenceExpander {
    cache: HashMap<String, String>,
}

impl RecurrenceExpander {
    /// Creates an empty expander.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical instant list of `rule_text` anchored at `start`:
    /// epoch-millisecond strings, sorted, tab-separated.
    ///
    /// The horizon is two years from the start, ten for yearly rules.
    pub fn canonical_instants(
        &mut self,
        start: &IcalDateTime,
        rule_text: &str,
    ) -> Result<String, ParseError> {
        let key = format!("{}\t{rule_text}", start.timestamp_millis(None));
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let rule = RecurrenceRule::parse(rule_text)?;
        let mut dates: Vec<String> = expand(start, &rule)
            .iter()
            .map(ToString::to_string)
            .collect();
        dates.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()));
        let mut canonical = String::new();
        for date in dates {
            canonical.push_str(&date);
            canonical.push('\t');
        }

        if self.cache.len() >= MAX_CACHE_SIZE {
            self.cache.clear();
        }
        self.cache.insert(key, canonical.clone());
        Ok(canonical)
    }
}

/// The canonical exception-date list of an event: `EXDATE` values as epoch
/// millis, numerically sorted, tab-separated. `None` when there are none.
#[must_use]
pub fn canonical_exceptions(event: &Event) -> Option<String> {
    let exdates = event.exdates();
    if exdates.is_empty() {
        return None;
    }
    let mut times: Vec<i64> = exdates
        .iter()
        .map(|d| d.timestamp_millis(None))
        .collect();
    times.sort_unstable();
    let mut out = String::new();
    for time in times {
        out.push_str(&time.to_string());
        out.push('\t');
    }
    Some(out)
}

fn expand(start: &IcalDateTime, rule: &RecurrenceRule) -> Vec<i64> {
    let years: i64 = match rule.freq {
        RecurrenceFrequency::Yearly => 10,
        _ => 2,
    };
    let horizon = start
        .civil
        .checked_add(years.years())
        .unwrap_or(start.civil);
    let until = rule.until.map(|u| u.civil);
    let past_end = |occurrence: jiff::civil::DateTime| {
        occurrence > horizon || until.is_some_and(|u| occurrence > u)
    };
    let to_millis = |occurrence: jiff::civil::DateTime| {
        IcalDateTime {
            civil: occurrence,
            ..*start
        }
        .timestamp_millis(None)
    };

    let mut instants = Vec::new();
    match rule.freq {
        RecurrenceFrequency::Weekly if !rule.by_day.is_empty() => {
            // Walk week blocks, emitting each listed weekday at the start's
            // time of day
            let shift = i64::from(start.civil.date().weekday().to_monday_zero_offset());
            let mut week = start
                .civil
                .date()
                .checked_sub(shift.days())
                .unwrap_or(start.civil.date());
            'outer: loop {
                for day in 0..7i64 {
                    let Ok(date) = week.checked_add(day.days()) else {
                        break 'outer;
                    };
                    if !rule.by_day.contains(&date.weekday()) {
                        continue;
                    }
                    let occurrence = date.to_datetime(start.civil.time());
                    if occurrence < start.civil {
                        continue;
                    }
                    if past_end(occurrence) {
                        break 'outer;
                    }
                    instants.push(to_millis(occurrence));
                    if done(instants.len(), rule.count) {
                        break 'outer;
                    }
                }
                match week.checked_add((rule.interval * 7).days()) {
                    Ok(next) => week = next,
                    Err(_) => break,
                }
            }
        }
        freq => {
            let mut n = 0i64;
            loop {
                let span = match freq {
                    RecurrenceFrequency::Daily => (n * rule.interval).days(),
                    RecurrenceFrequency::Weekly => (n * rule.interval).weeks(),
                    RecurrenceFrequency::Monthly => {
                        let Ok(months) = i32::try_from(n * rule.interval) else {
                            break;
                        };
                        months.months()
                    }
                    RecurrenceFrequency::Yearly => {
                        let Ok(years) = i16::try_from(n * rule.interval) else {
                            break;
                        };
                        years.years()
                    }
                };
                let Ok(occurrence) = start.civil.checked_add(span) else {
                    break;
                };
                if past_end(occurrence) {
                    break;
                }
                instants.push(to_millis(occurrence));
                if done(instants.len(), rule.count) {
                    break;
                }
                n += 1;
            }
        }
    }
    instants
}

fn done(emitted: usize, count: Option<usize>) -> bool {
    emitted >= MAX_INSTANTS || count.is_some_and(|c| emitted >= c)
}
