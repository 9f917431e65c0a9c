// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use crate::error::ParseError;

/// An iCalendar duration value (RFC 5545 §3.3.6 subset, as used by alarm
/// triggers): `-PT15M`, `P1DT2H`, `-P2W`, ...
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IcalDuration {
    /// Leading minus sign.
    pub negative: bool,
    /// Weeks component.
    pub weeks: i64,
    /// Days component.
    pub days: i64,
    /// Hours component.
    pub hours: i64,
    /// Minutes component.
    pub minutes: i64,
    /// Seconds component.
    pub seconds: i64,
}

impl IcalDuration {
    /// Parses a duration value.
    pub fn parse(value: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidValue(format!("bad duration: {value}"));

        let mut rest = value.trim();
        let mut out = Self::default();
        if let Some(r) = rest.strip_prefix('-') {
            out.negative = true;
            rest = r;
        } else if let Some(r) = rest.strip_prefix('+') {
            rest = r;
        }
        rest = rest.strip_prefix('P').ok_or_else(invalid)?;

        let mut in_time = false;
        let mut digits = String::new();
        let mut seen_part = false;
        for c in rest.chars() {
            match c {
                'T' | 't' => in_time = true,
                d if d.is_ascii_digit() => digits.push(d),
                unit => {
                    let n: i64 = digits.parse().map_err(|_| invalid())?;
                    digits.clear();
                    seen_part = true;
                    match (unit.to_ascii_uppercase(), in_time) {
                        ('W', false) => out.weeks = n,
                        ('D', false) => out.days = n,
                        ('H', true) => out.hours = n,
                        ('M', true) => out.minutes = n,
                        ('S', true) => out.seconds = n,
                        _ => return Err(invalid()),
                    }
                }
            }
        }
        if !digits.is_empty() || !seen_part {
            return Err(invalid());
        }
        Ok(out)
    }

    /// Total length in whole minutes, ignoring the sign. Sub-minute seconds
    /// count as one minute.
    #[must_use]
    pub fn to_minutes(&self) -> i64 {
        let mut mins = 0;
        if self.seconds > 0 {
            mins = if self.seconds < 60 {
                1
            } else {
                self.seconds / 60
            };
        }
        mins + self.minutes + self.hours * 60 + self.days * 1440 + self.weeks * 10080
    }
}
