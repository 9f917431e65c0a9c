// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Tolerant iCalendar parsing, formatting and recurrence comparison.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool,
    clippy::missing_errors_doc
)]

pub mod codec;
mod datetime;
mod duration;
mod error;
pub mod formatter;
mod line;
mod model;
mod parser;
mod recurrence;

pub use crate::datetime::IcalDateTime;
pub use crate::duration::IcalDuration;
pub use crate::error::ParseError;
pub use crate::line::ContentLine;
pub use crate::model::{
    Alarm, Calendar, Event, Observance, ObservanceKind, Property, TimeZone, Todo,
};
pub use crate::parser::parse;
pub use crate::recurrence::{
    RecurrenceExpander, RecurrenceFrequency, RecurrenceRule, canonical_exceptions,
};
