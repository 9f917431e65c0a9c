// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Serializes the calendar model back to CRLF-terminated ICS text.

use crate::model::{Alarm, Calendar, Event, Observance, ObservanceKind, Property, TimeZone, Todo};

const FOLD_AT: usize = 75;

/// Formats a whole calendar document.
#[must_use]
pub fn format(calendar: &Calendar) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VCALENDAR");
    for property in &calendar.properties {
        push_property(&mut out, property);
    }
    for zone in &calendar.time_zones {
        push_time_zone(&mut out, zone);
    }
    for event in &calendar.events {
        out.push_str(&format_event(event));
    }
    for todo in &calendar.todos {
        out.push_str(&format_todo(todo));
    }
    push_line(&mut out, "END:VCALENDAR");
    out
}

/// Formats a single event component.
#[must_use]
pub fn format_event(event: &Event) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VEVENT");
    for property in &event.properties {
        push_property(&mut out, property);
    }
    for alarm in &event.alarms {
        push_alarm(&mut out, alarm);
    }
    push_line(&mut out, "END:VEVENT");
    out
}

/// Formats a single to-do component.
#[must_use]
pub fn format_todo(todo: &Todo) -> String {
    let mut out = String::new();
    push_line(&mut out, "BEGIN:VTODO");
    for property in &todo.properties {
        push_property(&mut out, property);
    }
    for alarm in &todo.alarms {
        push_alarm(&mut out, alarm);
    }
    push_line(&mut out, "END:VTODO");
    out
}

fn push_time_zone(out: &mut String, zone: &TimeZone) {
    push_line(out, "BEGIN:VTIMEZONE");
    for property in &zone.properties {
        push_property(out, property);
    }
    for observance in &zone.observances {
        push_observance(out, observance);
    }
    push_line(out, "END:VTIMEZONE");
}

fn push_observance(out: &mut String, observance: &Observance) {
    let name = match observance.kind {
        ObservanceKind::Standard => "STANDARD",
        ObservanceKind::Daylight => "DAYLIGHT",
    };
    push_line(out, &format!("BEGIN:{name}"));
    for property in &observance.properties {
        push_property(out, property);
    }
    push_line(out, &format!("END:{name}"));
}

fn push_alarm(out: &mut String, alarm: &Alarm) {
    push_line(out, "BEGIN:VALARM");
    for property in &alarm.properties {
        push_property(out, property);
    }
    push_line(out, "END:VALARM");
}

fn push_property(out: &mut String, property: &Property) {
    let mut line = property.name.clone();
    for (name, value) in &property.params {
        line.push(';');
        line.push_str(name);
        line.push('=');
        if value.contains([':', ';', ',']) {
            line.push('"');
            line.push_str(value);
            line.push('"');
        } else {
            line.push_str(value);
        }
    }
    line.push(':');
    line.push_str(&property.value);
    push_line(out, &line);
}

/// Appends one logical line, folded at 75 octets (RFC 5545 §3.1).
fn push_line(out: &mut String, line: &str) {
    let mut budget = FOLD_AT;
    let mut width = 0;
    for c in line.chars() {
        let octets = c.len_utf8();
        if width + octets > budget {
            out.push_str("\r\n ");
            // Continuation lines lose one octet to the leading space
            budget = FOLD_AT - 1;
            width = 0;
        }
        out.push(c);
        width += octets;
    }
    out.push_str("\r\n");
}
