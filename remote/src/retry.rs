// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Bounded retry with a fixed delay between attempts.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::RemoteError;

/// A bounded retry policy shared by downloads, auth exchanges and feed reads.
///
/// Transient errors are retried with a fixed sleep in between; anything else
/// surfaces immediately. There is no backoff growth and no cancellation: the
/// loop runs to exhaustion.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Sleep between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy for calendar downloads.
    #[must_use]
    pub const fn download() -> Self {
        Self {
            max_attempts: 6,
            delay: Duration::from_secs(1),
        }
    }

    /// Policy for auth exchanges.
    #[must_use]
    pub const fn auth() -> Self {
        Self {
            max_attempts: 6,
            delay: Duration::from_secs(1),
        }
    }

    /// Policy for feed listings.
    #[must_use]
    pub const fn feed() -> Self {
        Self {
            max_attempts: 4,
            delay: Duration::from_secs(1),
        }
    }

    /// Runs `op` until it succeeds, fails non-transiently, or attempts run
    /// out. The attempt index (0-based) is passed to `op` so callers can vary
    /// the request, e.g. a protocol downgrade on later attempts.
    ///
    /// # Errors
    ///
    /// The last error once attempts are exhausted, or the first non-transient
    /// one.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, RemoteError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.max_attempts => {
                    warn!(attempt, error = %e, "retrying after transient error");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
