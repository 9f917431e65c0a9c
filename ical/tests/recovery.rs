// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use icalsync_ical::{ParseError, parse};

#[test]
fn recovers_from_one_faulty_line() {
    // Line 4 has no colon and is not a valid content line
    let text = "BEGIN:VCALENDAR\r\n\
        VERSION:2.0\r\n\
        BEGIN:VEVENT\r\n\
        THIS LINE IS GARBAGE\r\n\
        UID:e1\r\n\
        SUMMARY:Standup\r\n\
        DTSTART:20260102T100000Z\r\n\
        DTEND:20260102T103000Z\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";
    let calendar = parse(text.as_bytes()).unwrap();
    assert_eq!(calendar.events.len(), 1);
    assert_eq!(calendar.events[0].uid(), Some("e1"));
    assert_eq!(calendar.events[0].summary(), Some("Standup"));
}

#[test]
fn recovers_from_stray_blank_lines() {
    let text = "BEGIN:VCALENDAR\r\n\
        VERSION:2.0\r\n\
        BEGIN:VEVENT\r\n\
        UID:e1\r\n\
        \r\n\
        SUMMARY:Standup\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";
    let calendar = parse(text.as_bytes()).unwrap();
    assert_eq!(calendar.events[0].summary(), Some("Standup"));
}

#[test]
fn rewrites_related_trigger_keeping_its_duration() {
    let text = "BEGIN:VCALENDAR\r\n\
        BEGIN:VEVENT\r\n\
        UID:e1\r\n\
        \r\n\
        BEGIN:VALARM\r\n\
        TRIGGER;RELATED=START:-PT25M\r\n\
        END:VALARM\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";
    let calendar = parse(text.as_bytes()).unwrap();
    assert_eq!(calendar.events[0].alarm_minutes(), Some(25));
}

#[test]
fn related_trigger_without_duration_becomes_one_hour() {
    let text = "BEGIN:VCALENDAR\r\n\
        BEGIN:VEVENT\r\n\
        UID:e1\r\n\
        \r\n\
        BEGIN:VALARM\r\n\
        TRIGGER;RELATED=START:19760401T005545Z\r\n\
        END:VALARM\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";
    let calendar = parse(text.as_bytes()).unwrap();
    assert_eq!(calendar.events[0].alarm_minutes(), Some(60));
}

#[test]
fn two_faults_report_the_first() {
    // Repairing line 3 still leaves the garbage on line 6, so the original
    // fault comes back
    let text = "BEGIN:VCALENDAR\r\n\
        BEGIN:VEVENT\r\n\
        FIRST GARBAGE LINE\r\n\
        UID:e1\r\n\
        SUMMARY:Standup\r\n\
        SECOND GARBAGE LINE\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";
    match parse(text.as_bytes()) {
        Err(ParseError::MalformedLine { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected a malformed-line error, got {other:?}"),
    }
}

#[test]
fn folded_lines_unfold_across_recovery() {
    let text = "BEGIN:VCALENDAR\r\n\
        BEGIN:VEVENT\r\n\
        UID:e1\r\n\
        SUMMARY:a rather long su\r\n mmary split across lines\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";
    let calendar = parse(text.as_bytes()).unwrap();
    assert_eq!(
        calendar.events[0].summary(),
        Some("a rather long summary split across lines")
    );
}
