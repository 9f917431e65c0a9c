// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Placeholder calendar served while the remote store is unavailable.
//!
//! Calendar clients poll on a timer and treat a failed refresh as an empty
//! calendar, silently wiping events. Serving a marked placeholder instead
//! keeps the client's copy intact and makes the outage visible as a single
//! event. The marker string also guards the caches: bodies carrying it are
//! never persisted, backed up or pushed.

use icalsync_ical::{Alarm, Calendar, Event, Property, formatter};
use icalsync_remote::RemoteError;
use jiff::{Timestamp, ToSpan};

/// Reserved product/UID marker identifying generated placeholder bodies.
pub const ERROR_MARKER: &str = "icalsync-error";

/// Placeholder event length, minutes.
const EVENT_MINUTES: i64 = 45;

/// Builds a syntactically valid one-event calendar describing the outage.
#[must_use]
pub fn placeholder_calendar(error: &RemoteError, now: Timestamp) -> Vec<u8> {
    let title = match error {
        RemoteError::HostUnreachable(_) => "NETWORK DOWN",
        _ => "UNAVAILABLE",
    };
    let message = error.to_string();
    let mut description =
        "The remote calendar could not be loaded. Do not modify this event; it \
         disappears once the calendar is reachable again."
            .to_string();
    if !message.is_empty() {
        description.push_str(" [cause: ");
        description.push_str(&message);
        description.push(']');
    }

    let start = now;
    let end = now
        .checked_add(EVENT_MINUTES.minutes())
        .unwrap_or(now);

    let calendar = Calendar {
        properties: vec![
            Property::new("PRODID", ERROR_MARKER),
            Property::new("VERSION", "2.0"),
        ],
        events: vec![Event {
            properties: vec![
                Property::new("UID", ERROR_MARKER),
                Property::new("SUMMARY", title),
                Property::new("DESCRIPTION", &description),
                Property::new("DTSTART", &format_utc(start)),
                Property::new("DTEND", &format_utc(end)),
            ],
            alarms: Vec::<Alarm>::new(),
        }],
        ..Calendar::default()
    };
    formatter::format(&calendar).into_bytes()
}

/// Whether the first `limit` bytes contain the error marker.
#[must_use]
pub fn has_error_marker(bytes: &[u8], limit: usize) -> bool {
    let head = bytes.get(..limit.min(bytes.len())).unwrap_or(bytes);
    String::from_utf8_lossy(head).contains(ERROR_MARKER)
}

fn format_utc(ts: Timestamp) -> String {
    ts.strftime("%Y%m%dT%H%M%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use icalsync_ical::parse;

    use super::*;

    #[test]
    fn placeholder_is_parseable_and_marked() {
        let err = RemoteError::HostUnreachable("dns failure".to_string());
        let body = placeholder_calendar(&err, Timestamp::UNIX_EPOCH);

        let calendar = parse(&body).unwrap();
        assert_eq!(calendar.product_id(), Some(ERROR_MARKER));
        assert_eq!(calendar.events.len(), 1);
        let event = &calendar.events[0];
        assert_eq!(event.uid(), Some(ERROR_MARKER));
        assert_eq!(event.summary(), Some("NETWORK DOWN"));
        assert!(event.description().unwrap().contains("[cause:"));

        let start = event.dtstart().unwrap();
        let end = event.dtend().unwrap();
        assert_eq!(
            end.timestamp_millis(None) - start.timestamp_millis(None),
            EVENT_MINUTES * 60_000
        );
    }

    #[test]
    fn other_errors_title_unavailable() {
        let err = RemoteError::Http("boom".to_string());
        let body = placeholder_calendar(&err, Timestamp::UNIX_EPOCH);
        let calendar = parse(&body).unwrap();
        assert_eq!(calendar.events[0].summary(), Some("UNAVAILABLE"));
    }

    #[test]
    fn marker_detection_respects_limit() {
        let body = format!("{}{ERROR_MARKER}", " ".repeat(1100));
        assert!(!has_error_marker(body.as_bytes(), 1024));
        assert!(has_error_marker(body.as_bytes(), 2048));
    }
}
