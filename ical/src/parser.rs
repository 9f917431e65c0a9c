// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Tolerant iCalendar parser.
//!
//! Mobile and desktop calendar clients routinely emit a single malformed
//! line; failing a whole synchronization pass on one bad line is not
//! acceptable. On the first line-scoped fault the document is repaired once
//! (drop the faulty line, drop blank lines, rewrite broken `TRIGGER;RELATED`
//! alarms) and reparsed. A second failure propagates the original fault.

use crate::codec::{self, Charset};
use crate::duration::IcalDuration;
use crate::error::ParseError;
use crate::line::{ContentLine, unfold};
use crate::model::{
    Alarm, Calendar, Event, Observance, ObservanceKind, Property, TimeZone, Todo,
};

/// Parses calendar bytes into a [`Calendar`], recovering at most once.
pub fn parse(bytes: &[u8]) -> Result<Calendar, ParseError> {
    let text = codec::decode(bytes, Charset::Utf8);
    match parse_text(&text) {
        Ok(calendar) => Ok(calendar),
        Err(original) => {
            let repaired = repair(&text, original.line_number());
            parse_text(&repaired).map_err(|_| original)
        }
    }
}

/// Rewrites the document for the recovery pass.
fn repair(text: &str, faulty_line: Option<usize>) -> String {
    let mut out = String::with_capacity(text.len());
    for (number, raw) in text.split('\n').enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);

        // Mac OS X and some phones emit TRIGGER;RELATED without a usable
        // duration value. Rewrite these even when the fault points here.
        if raw.starts_with("TRIGGER;RELATED") {
            match raw.split_once(':') {
                Some((_, value)) if IcalDuration::parse(value).is_ok() => {
                    out.push_str("TRIGGER;VALUE=DURATION:");
                    out.push_str(value);
                }
                _ => out.push_str("TRIGGER;VALUE=DURATION:-PT1H"),
            }
            out.push_str("\r\n");
            continue;
        }

        // Drop the exact offender
        if Some(number + 1) == faulty_line {
            continue;
        }

        // MS Outlook and KOrganizer emit stray blank lines
        if raw.trim().is_empty() {
            continue;
        }

        out.push_str(raw);
        out.push_str("\r\n");
    }
    out
}

fn parse_text(text: &str) -> Result<Calendar, ParseError> {
    let mut builder = Builder::default();
    for (number, logical) in unfold(text) {
        if logical.trim().is_empty() {
            if builder.depth() == 0 {
                continue;
            }
            return Err(ParseError::MalformedLine {
                line: number,
                message: "blank line inside component".to_string(),
            });
        }
        let line = ContentLine::parse(&logical, number)?;
        builder.push(line)?;
    }
    builder.finish()
}

/// Component frames the builder can be inside of.
#[derive(Debug)]
enum Frame {
    Calendar,
    Event(Event),
    Todo(Todo),
    TimeZone(TimeZone),
    Observance(Observance),
    Alarm(Alarm),
    /// Unknown component, contents ignored but balance still enforced.
    Opaque(String),
}

impl Frame {
    fn name(&self) -> &str {
        match self {
            Self::Calendar => "VCALENDAR",
            Self::Event(_) => "VEVENT",
            Self::Todo(_) => "VTODO",
            Self::TimeZone(_) => "VTIMEZONE",
            Self::Observance(o) => match o.kind {
                ObservanceKind::Standard => "STANDARD",
                ObservanceKind::Daylight => "DAYLIGHT",
            },
            Self::Alarm(_) => "VALARM",
            Self::Opaque(name) => name,
        }
    }
}

#[derive(Debug, Default)]
struct Builder {
    calendar: Option<Calendar>,
    stack: Vec<Frame>,
    closed: bool,
}

impl Builder {
    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn push(&mut self, line: ContentLine) -> Result<(), ParseError> {
        match line.name.as_str() {
            "BEGIN" => self.begin(&line),
            "END" => self.end(&line),
            _ => self.property(line),
        }
    }

    fn begin(&mut self, line: &ContentLine) -> Result<(), ParseError> {
        let name = line.value.trim().to_uppercase();
        if self.calendar.is_none() {
            if name != "VCALENDAR" {
                return Err(ParseError::NotACalendar);
            }
            self.calendar = Some(Calendar::default());
            self.stack.push(Frame::Calendar);
            return Ok(());
        }
        let frame = match name.as_str() {
            "VEVENT" => Frame::Event(Event::default()),
            "VTODO" => Frame::Todo(Todo::default()),
            "VTIMEZONE" => Frame::TimeZone(TimeZone::default()),
            "STANDARD" => Frame::Observance(Observance {
                kind: ObservanceKind::Standard,
                properties: Vec::new(),
            }),
            "DAYLIGHT" => Frame::Observance(Observance {
                kind: ObservanceKind::Daylight,
                properties: Vec::new(),
            }),
            "VALARM" => Frame::Alarm(Alarm::default()),
            _ => Frame::Opaque(name),
        };
        self.stack.push(frame);
        Ok(())
    }

    fn end(&mut self, line: &ContentLine) -> Result<(), ParseError> {
        let name = line.value.trim().to_uppercase();
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| ParseError::UnbalancedComponent(name.clone()))?;
        if frame.name() != name {
            return Err(ParseError::UnbalancedComponent(name));
        }

        let calendar = self
            .calendar
            .as_mut()
            .ok_or(ParseError::NotACalendar)?;
        match (frame, self.stack.last_mut()) {
            (Frame::Calendar, _) => self.closed = true,
            (Frame::Event(event), _) => calendar.events.push(event),
            (Frame::Todo(todo), _) => calendar.todos.push(todo),
            (Frame::TimeZone(zone), _) => calendar.time_zones.push(zone),
            (Frame::Observance(obs), Some(Frame::TimeZone(zone))) => zone.observances.push(obs),
            (Frame::Alarm(alarm), Some(Frame::Event(event))) => event.alarms.push(alarm),
            (Frame::Alarm(alarm), Some(Frame::Todo(todo))) => todo.alarms.push(alarm),
            // Misplaced but balanced sub-components are dropped
            (Frame::Observance(_) | Frame::Alarm(_) | Frame::Opaque(_), _) => {}
        }
        Ok(())
    }

    fn property(&mut self, line: ContentLine) -> Result<(), ParseError> {
        // Broken alarm triggers are a line-scoped fault so the recovery pass
        // can rewrite them
        if line.name == "TRIGGER"
            && line.param("RELATED").is_some()
            && IcalDuration::parse(&line.value).is_err()
        {
            return Err(ParseError::MalformedLine {
                line: line.number,
                message: "TRIGGER;RELATED without a valid duration".to_string(),
            });
        }

        let number = line.number;
        let property = Property::from(line);
        let calendar = self.calendar.as_mut().ok_or(ParseError::NotACalendar)?;
        match self.stack.last_mut() {
            Some(Frame::Calendar) => calendar.properties.push(property),
            Some(Frame::Event(event)) => event.properties.push(property),
            Some(Frame::Todo(todo)) => todo.properties.push(property),
            Some(Frame::TimeZone(zone)) => zone.properties.push(property),
            Some(Frame::Observance(obs)) => obs.properties.push(property),
            Some(Frame::Alarm(alarm)) => alarm.properties.push(property),
            Some(Frame::Opaque(_)) => {}
            None => {
                return Err(ParseError::MalformedLine {
                    line: number,
                    message: "property outside any component".to_string(),
                });
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Calendar, ParseError> {
        if let Some(frame) = self.stack.last() {
            return Err(ParseError::UnbalancedComponent(frame.name().to_string()));
        }
        match self.calendar {
            Some(calendar) if self.closed => Ok(calendar),
            _ => Err(ParseError::NotACalendar),
        }
    }
}
