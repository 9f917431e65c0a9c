// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Reminder lead-time quantization.
//!
//! The remote store only accepts a fixed set of reminder offsets. Local
//! alarms are snapped onto that set before comparison and upload, so a
//! round-tripped reminder stays stable instead of oscillating.

use icalsync_remote::Reminder;

/// Reminder offsets the remote store accepts, in minutes.
pub const ALLOWED_MINUTES: [i64; 13] = [
    5, 10, 15, 20, 25, 30, 45, 60, 120, 180, 1440, 2880, 10080,
];

/// The nearest allowed offset; ties resolve to the smaller value.
#[must_use]
pub fn closest_allowed(minutes: i64) -> i64 {
    ALLOWED_MINUTES
        .into_iter()
        .min_by_key(|&candidate| ((minutes - candidate).abs(), candidate))
        .unwrap_or(minutes)
}

/// Encodes a reminder as the tail of a negative duration trigger
/// (`TRIGGER;VALUE=DURATION:-P` + tail): `T30M`, `T2H` or `2D`.
///
/// Minutes up to 45 floor to the nearest five (35 and 40 round up to 45,
/// zero becomes five); beyond that, whole hours up to three; beyond that,
/// days 1, 2 or 7. A reminder without a minute count becomes `T1H`.
#[must_use]
pub fn encode_trigger(reminder: &Reminder) -> String {
    let Some(minutes) = reminder.minutes else {
        return "T1H".to_string();
    };

    if minutes <= 45 {
        let floored = minutes / 5 * 5;
        let m = match floored {
            35 | 40 => 45,
            0 => 5,
            other => other,
        };
        return format!("T{m}M");
    }

    let hours = (minutes / 60).max(1);
    if hours <= 3 {
        return format!("T{hours}H");
    }

    let days = (hours / 24).max(1);
    let d = if (days > 2 && days < 7) || days > 7 {
        7
    } else {
        days
    };
    format!("{d}D")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_snaps_to_allowed_set() {
        assert_eq!(closest_allowed(0), 5);
        assert_eq!(closest_allowed(12), 10);
        assert_eq!(closest_allowed(37), 30);
        assert_eq!(closest_allowed(200), 180);
    }

    #[test]
    fn closest_ties_go_to_smaller() {
        // 7.5 midway between 5 and 10
        assert_eq!(closest_allowed(7), 5);
        assert_eq!(closest_allowed(8), 10);
        // 52.5 midway between 45 and 60
        assert_eq!(closest_allowed(52), 45);
        assert_eq!(closest_allowed(53), 60);
    }

    #[test]
    fn quantization_is_idempotent() {
        for &allowed in &ALLOWED_MINUTES {
            assert_eq!(closest_allowed(allowed), allowed);
        }
    }

    fn minutes(m: i64) -> Reminder {
        Reminder {
            minutes: Some(m),
            ..Default::default()
        }
    }

    #[test]
    fn encodes_minute_range() {
        assert_eq!(encode_trigger(&minutes(0)), "T5M");
        assert_eq!(encode_trigger(&minutes(17)), "T15M");
        assert_eq!(encode_trigger(&minutes(30)), "T30M");
        // Dead zone between half an hour and three quarters
        assert_eq!(encode_trigger(&minutes(36)), "T45M");
        assert_eq!(encode_trigger(&minutes(44)), "T45M");
        assert_eq!(encode_trigger(&minutes(45)), "T45M");
    }

    #[test]
    fn encodes_hours_and_days() {
        assert_eq!(encode_trigger(&minutes(46)), "T1H");
        assert_eq!(encode_trigger(&minutes(120)), "T2H");
        assert_eq!(encode_trigger(&minutes(180)), "T3H");
        assert_eq!(encode_trigger(&minutes(240)), "1D");
        assert_eq!(encode_trigger(&minutes(2880)), "2D");
        assert_eq!(encode_trigger(&minutes(3 * 1440)), "7D");
        assert_eq!(encode_trigger(&minutes(10 * 1440)), "7D");
        assert_eq!(encode_trigger(&Reminder::default()), "T1H");
    }
}
