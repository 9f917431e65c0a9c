// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use crate::datetime::IcalDateTime;
use crate::duration::IcalDuration;
use crate::line::ContentLine;

/// A property attached to a calendar or component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Upper-cased property name.
    pub name: String,
    /// Parameters in source order.
    pub params: Vec<(String, String)>,
    /// Raw value text.
    pub value: String,
}

impl Property {
    /// Creates a property without parameters.
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_uppercase(),
            params: Vec::new(),
            value: value.to_string(),
        }
    }

    /// Looks up a parameter value by upper-cased name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl From<ContentLine> for Property {
    fn from(line: ContentLine) -> Self {
        Self {
            name: line.name,
            params: line.params,
            value: line.value,
        }
    }
}

/// An alarm (`VALARM`) component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alarm {
    /// The alarm's properties.
    pub properties: Vec<Property>,
}

impl Alarm {
    /// The alarm's trigger duration, when it is duration-valued.
    #[must_use]
    pub fn trigger_duration(&self) -> Option<IcalDuration> {
        let trigger = find(&self.properties, "TRIGGER")?;
        IcalDuration::parse(&trigger.value).ok()
    }
}

/// A calendar event (`VEVENT`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// The event's properties.
    pub properties: Vec<Property>,
    /// Nested alarms.
    pub alarms: Vec<Alarm>,
}

/// A to-do item (`VTODO`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Todo {
    /// The to-do's properties.
    pub properties: Vec<Property>,
    /// Nested alarms.
    pub alarms: Vec<Alarm>,
}

/// Observance flavor inside a `VTIMEZONE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservanceKind {
    /// `STANDARD` observance.
    Standard,
    /// `DAYLIGHT` observance.
    Daylight,
}

/// A `STANDARD` or `DAYLIGHT` observance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observance {
    /// Which observance this is.
    pub kind: ObservanceKind,
    /// The observance's properties.
    pub properties: Vec<Property>,
}

impl Observance {
    /// The `TZOFFSETTO` value, e.g. `+0100`.
    #[must_use]
    pub fn offset_to(&self) -> Option<&str> {
        find(&self.properties, "TZOFFSETTO").map(|p| p.value.as_str())
    }
}

/// A `VTIMEZONE` component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeZone {
    /// The time zone's properties.
    pub properties: Vec<Property>,
    /// Standard/daylight observances in source order.
    pub observances: Vec<Observance>,
}

impl TimeZone {
    /// The `TZID` value.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        find(&self.properties, "TZID").map(|p| p.value.as_str())
    }

    /// The standard observance, falling back to daylight.
    #[must_use]
    pub fn seasonal(&self) -> Option<&Observance> {
        self.observances
            .iter()
            .find(|o| o.kind == ObservanceKind::Standard)
            .or_else(|| {
                self.observances
                    .iter()
                    .find(|o| o.kind == ObservanceKind::Daylight)
            })
    }
}

/// A parsed iCalendar document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calendar {
    /// Top-level calendar properties (`PRODID`, `VERSION`, ...).
    pub properties: Vec<Property>,
    /// All events in source order.
    pub events: Vec<Event>,
    /// All to-do items in source order.
    pub todos: Vec<Todo>,
    /// All time zone definitions in source order.
    pub time_zones: Vec<TimeZone>,
}

impl Calendar {
    /// The `PRODID` value.
    #[must_use]
    pub fn product_id(&self) -> Option<&str> {
        find(&self.properties, "PRODID").map(|p| p.value.as_str())
    }
}

fn find<'a>(properties: &'a [Property], name: &str) -> Option<&'a Property> {
    properties.iter().find(|p| p.name == name)
}

fn find_all<'a>(properties: &'a [Property], name: &'a str) -> impl Iterator<Item = &'a Property> {
    properties.iter().filter(move |p| p.name == name)
}

impl Event {
    /// Looks up a property by upper-cased name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        find(&self.properties, name)
    }

    /// A property's value by upper-cased name.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.property(name).map(|p| p.value.as_str())
    }

    /// The event's `UID`, when present and non-empty.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.value_of("UID").filter(|v| !v.is_empty())
    }

    /// The event's summary.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.value_of("SUMMARY")
    }

    /// The event's description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.value_of("DESCRIPTION")
    }

    /// The event's location.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.value_of("LOCATION")
    }

    /// Parsed `DTSTART`.
    #[must_use]
    pub fn dtstart(&self) -> Option<IcalDateTime> {
        self.parse_date("DTSTART")
    }

    /// Parsed `DTEND`.
    #[must_use]
    pub fn dtend(&self) -> Option<IcalDateTime> {
        self.parse_date("DTEND")
    }

    /// Parsed `RECURRENCE-ID`.
    #[must_use]
    pub fn recurrence_id(&self) -> Option<IcalDateTime> {
        self.parse_date("RECURRENCE-ID")
    }

    fn parse_date(&self, name: &str) -> Option<IcalDateTime> {
        let prop = self.property(name)?;
        IcalDateTime::parse(&prop.value).ok()
    }

    /// The `TZID` parameter on `DTSTART`, when present.
    #[must_use]
    pub fn start_tzid(&self) -> Option<&str> {
        self.property("DTSTART")?.param("TZID")
    }

    /// The raw `RRULE` value.
    #[must_use]
    pub fn rrule(&self) -> Option<&str> {
        self.value_of("RRULE")
    }

    /// All `EXDATE` values, flattened across properties and commas.
    #[must_use]
    pub fn exdates(&self) -> Vec<IcalDateTime> {
        find_all(&self.properties, "EXDATE")
            .flat_map(|p| p.value.split(','))
            .filter_map(|v| IcalDateTime::parse(v.trim()).ok())
            .collect()
    }

    /// The event's status value (`TENTATIVE`, `CONFIRMED`, `CANCELLED`).
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.value_of("STATUS")
    }

    /// The event's classification (`PUBLIC`, `PRIVATE`, ...).
    #[must_use]
    pub fn classification(&self) -> Option<&str> {
        self.value_of("CLASS")
    }

    /// The event's transparency (`TRANSPARENT` / `OPAQUE`).
    #[must_use]
    pub fn transparency(&self) -> Option<&str> {
        self.value_of("TRANSP")
    }

    /// The event's categories text.
    #[must_use]
    pub fn categories(&self) -> Option<&str> {
        self.value_of("CATEGORIES")
    }

    /// The event's priority text.
    #[must_use]
    pub fn priority(&self) -> Option<&str> {
        self.value_of("PRIORITY")
    }

    /// The event's URL.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.value_of("URL")
    }

    /// Parsed `CREATED` timestamp.
    #[must_use]
    pub fn created(&self) -> Option<IcalDateTime> {
        self.parse_date("CREATED")
    }

    /// Attendee email addresses: `mailto:` stripped, addresses without `@`
    /// dropped, sorted case-insensitively. `None` when no address survives.
    #[must_use]
    pub fn attendees(&self) -> Option<Vec<String>> {
        let mut emails: Vec<String> = find_all(&self.properties, "ATTENDEE")
            .filter_map(|p| {
                let mut value = p.value.trim();
                if let Some((scheme, rest)) = value.split_at_checked(7)
                    && scheme.eq_ignore_ascii_case("mailto:")
                {
                    value = rest.trim();
                }
                value.contains('@').then(|| value.to_string())
            })
            .collect();
        if emails.is_empty() {
            return None;
        }
        emails.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()));
        Some(emails)
    }

    /// Lead time of the first duration-triggered alarm, in whole minutes.
    ///
    /// Only negative (before-start) triggers count; a sub-minute duration
    /// counts as one minute. `None` when the event has no usable alarm.
    #[must_use]
    pub fn alarm_minutes(&self) -> Option<i64> {
        let duration = self.alarms.iter().find_map(Alarm::trigger_duration)?;
        if !duration.negative {
            return Some(0);
        }
        Some(duration.to_minutes())
    }

    /// The event's synchronization identity: the `UID`, suffixed with
    /// `!{epoch-millis}` when a `RECURRENCE-ID` marks this as an override
    /// instance of a recurring event.
    #[must_use]
    pub fn sync_uid(&self) -> Option<String> {
        let uid = self.uid()?;
        match self.recurrence_id() {
            Some(rid) => Some(format!("{uid}!{}", rid.timestamp_millis(None))),
            None => Some(uid.to_string()),
        }
    }

    /// A short printable title for log messages.
    #[must_use]
    pub fn display_title(&self) -> String {
        let title = self
            .summary()
            .map(|s| s.replace(['\r', '\n'], " "))
            .unwrap_or_default();
        if title.is_empty() {
            return "No Subject".to_string();
        }
        match title.char_indices().nth(20) {
            Some((i, _)) => format!("{}...", title.get(..i).unwrap_or(&title)),
            None => title,
        }
    }
}

impl Todo {
    /// Looks up a property by upper-cased name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        find(&self.properties, name)
    }
}
