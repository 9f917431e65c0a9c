// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Client for a remote calendar store: ICS downloads, session pooling and
//! the JSON event feed API.

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
    clippy::match_bool
)]

mod config;
mod error;
mod http;
mod retry;
mod session;
mod store;
mod types;

pub use crate::config::RemoteConfig;
pub use crate::error::RemoteError;
pub use crate::http::TOKEN_HEADER;
pub use crate::retry::RetryPolicy;
pub use crate::session::SessionPool;
pub use crate::store::RemoteStore;
pub use crate::types::{CalendarEntry, EventEntry, ExtendedProperty, Feed, Reminder, When};
