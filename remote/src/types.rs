// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! JSON wire types of the remote store's feed API.

/// An event entry in a calendar feed.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventEntry {
    /// Server-assigned entry id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Link to this entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    /// Link used for updates and deletes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edit_link: Option<String>,
    /// Event title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Event body text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Creation time, epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<i64>,
    /// Start/end times for single events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub when: Option<When>,
    /// Recurrence text block for recurring events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    /// Link to the recurring event this entry overrides.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_origin: Option<String>,
    /// Attached reminders.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reminders: Vec<Reminder>,
    /// Client-defined key/value pairs round-tripped by the server.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extended_properties: Vec<ExtendedProperty>,
    /// Event status (`confirmed`, `tentative`, `canceled`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Event visibility (`public`, `private`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    /// Event transparency (`opaque` / `transparent`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparency: Option<String>,
    /// Attendee email addresses.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,
    /// Event location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl EventEntry {
    /// Looks up an extended property value by name.
    #[must_use]
    pub fn extended_property(&self, name: &str) -> Option<&str> {
        self.extended_properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Sets an extended property, replacing an existing one of the same name.
    pub fn set_extended_property(&mut self, name: &str, value: &str) {
        match self.extended_properties.iter_mut().find(|p| p.name == name) {
            Some(prop) => value.clone_into(&mut prop.value),
            None => self.extended_properties.push(ExtendedProperty {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Start and end of a single (non-recurring) event, epoch milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct When {
    /// Start time.
    pub start: i64,
    /// End time.
    pub end: i64,
}

/// A reminder attached to an event.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Reminder {
    /// Delivery channel (`popup`, `email`, `sms`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Lead time in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minutes: Option<i64>,
    /// Lead time in hours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<i64>,
    /// Lead time in days.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
    /// Absolute trigger time, mutually exclusive with the lead-time fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_time: Option<String>,
}

/// A client-defined property the server stores verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExtendedProperty {
    /// Property name.
    pub name: String,
    /// Property value.
    pub value: String,
}

/// A calendar in the account's feed listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalendarEntry {
    /// Server-assigned calendar id.
    pub id: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Link to the calendar's event feed.
    pub self_link: String,
}

/// Envelope of a feed response.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct Feed<T> {
    /// The feed's entries.
    pub entries: Vec<T>,
}
