// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use jiff::civil;
use jiff::tz::{Offset, TimeZone};

use crate::error::ParseError;

/// An iCalendar DATE or DATE-TIME value.
///
/// Carries the civil wall-clock fields plus whether the source was UTC-marked
/// or date-only. Zone resolution is the caller's concern: comparison code
/// supplies an offset from its time-zone registry when one is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcalDateTime {
    /// Wall-clock date and time. Date-only values are midnight.
    pub civil: civil::DateTime,
    /// The value carried a trailing `Z`.
    pub utc: bool,
    /// The value was a bare date (`20260102`).
    pub date_only: bool,
}

impl IcalDateTime {
    /// Parses `20260102`, `20260102T100000` or `20260102T100000Z`.
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidValue(format!("bad date-time: {value}"));

        let (text, utc) = match value.strip_suffix('Z') {
            Some(rest) => (rest, true),
            None => (value, false),
        };

        let (date_part, time_part) = match text.split_once('T') {
            Some((d, t)) => (d, Some(t)),
            None => (text, None),
        };
        if date_part.len() != 8 || !date_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        fn hrtb<F: for<'a> Fn(&'a str, std::ops::Range<usize>) -> Result<&'a str, ParseError>>(
            f: F,
        ) -> F {
            f
        }
        let piece = hrtb(|text, range| text.get(range).ok_or_else(|| invalid()));
        let year: i16 = piece(date_part, 0..4)?.parse().map_err(|_| invalid())?;
        let month: i8 = piece(date_part, 4..6)?.parse().map_err(|_| invalid())?;
        let day: i8 = piece(date_part, 6..8)?.parse().map_err(|_| invalid())?;

        let (hour, minute, second) = match time_part {
            Some(t) if t.len() == 6 && t.bytes().all(|b| b.is_ascii_digit()) => (
                piece(t, 0..2)?.parse::<i8>().map_err(|_| invalid())?,
                piece(t, 2..4)?.parse::<i8>().map_err(|_| invalid())?,
                piece(t, 4..6)?.parse::<i8>().map_err(|_| invalid())?,
            ),
            Some(_) => return Err(invalid()),
            None => (0, 0, 0),
        };

        let civil = civil::DateTime::new(year, month, day, hour, minute, second.min(59), 0)
            .map_err(|_| invalid())?;
        Ok(Self {
            civil,
            utc,
            date_only: time_part.is_none(),
        })
    }

    /// Epoch milliseconds of this value.
    ///
    /// UTC-marked and date-only values ignore `offset`; naive values use it
    /// when given, falling back to UTC. Date-only values resolve to UTC
    /// midnight, so all-day events compare equal regardless of zone.
    #[must_use]
    pub fn timestamp_millis(&self, offset: Option<Offset>) -> i64 {
        let tz = if self.utc || self.date_only {
            TimeZone::UTC
        } else {
            offset.map_or(TimeZone::UTC, TimeZone::fixed)
        };
        match self.civil.to_zoned(tz) {
            Ok(zoned) => zoned.timestamp().as_millisecond(),
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_datetime() {
        let dt = IcalDateTime::parse("20260102T100000Z").unwrap();
        assert!(dt.utc);
        assert!(!dt.date_only);
        assert_eq!(dt.civil, civil::date(2026, 1, 2).at(10, 0, 0, 0));
    }

    #[test]
    fn parses_date_only_as_utc_midnight() {
        let dt = IcalDateTime::parse("20260102").unwrap();
        assert!(dt.date_only);
        assert_eq!(
            dt.timestamp_millis(None),
            IcalDateTime::parse("20260102T000000Z")
                .unwrap()
                .timestamp_millis(None)
        );
    }

    #[test]
    fn naive_value_uses_supplied_offset() {
        let dt = IcalDateTime::parse("20260102T100000").unwrap();
        let utc = dt.timestamp_millis(None);
        let shifted = dt.timestamp_millis(Some(Offset::constant(2)));
        assert_eq!(utc - shifted, 2 * 3600 * 1000);
    }

    #[test]
    fn rejects_garbage() {
        assert!(IcalDateTime::parse("not-a-date").is_err());
        assert!(IcalDateTime::parse("2026010").is_err());
        assert!(IcalDateTime::parse("20261341").is_err());
    }
}
