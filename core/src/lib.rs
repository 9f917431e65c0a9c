// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Two-way synchronization between local iCalendar bodies and a remote
//! calendar store, with caching, daily backups and a to-do side channel.

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

mod backup;
mod cache;
mod compare;
mod config;
mod engine;
mod error;
mod extensions;
mod matcher;
mod names;
mod placeholder;
mod push;
mod quantize;
mod request;
mod synchronizer;
mod todo_store;
mod tz_registry;

pub use crate::compare::EventComparator;
pub use crate::config::{AlarmChannels, Config};
pub use crate::error::SyncError;
pub use crate::extensions::{
    CATEGORIES_EXTENSION, PRIORITY_EXTENSION, UID_EXTENSION, URL_EXTENSION,
};
pub use crate::placeholder::{ERROR_MARKER, has_error_marker, placeholder_calendar};
pub use crate::quantize::{ALLOWED_MINUTES, closest_allowed};
pub use crate::request::{CachedCalendar, CalendarRequest};
pub use crate::synchronizer::{SyncListener, Synchronizer};
pub use crate::tz_registry::TzRegistry;
