// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// Remote store errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server-side error status.
    #[error("server error {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body text.
        body: String,
    },

    /// The host could not be resolved or reached at all.
    #[error("host unreachable: {0}")]
    HostUnreachable(String),

    /// The server rejected the credentials.
    #[error("invalid credentials for {0}")]
    InvalidCredentials(String),

    /// The credentials were already rejected earlier; no exchange attempted.
    #[error("credentials previously rejected for {0}")]
    CredentialsRevoked(String),

    /// The response body is not what the operation expects.
    #[error("invalid response body: {0}")]
    InvalidBody(String),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server refused the operation for a semantic reason.
    #[error("operation rejected: {0}")]
    Rejected(String),
}

impl RemoteError {
    /// Whether retrying the same request can plausibly succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Status { .. } | Self::InvalidBody(_)
        )
    }

    /// The server refused because the calendar is read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.rejection_contains(&["read-only", "read only"])
    }

    /// The server refused because a recurring event has no instances left.
    #[must_use]
    pub fn is_no_instances(&self) -> bool {
        self.rejection_contains(&["no instances"])
    }

    /// The server refused because the event carries too many reminders.
    #[must_use]
    pub fn is_too_many_reminders(&self) -> bool {
        self.rejection_contains(&["too many reminders"])
    }

    fn rejection_contains(&self, needles: &[&str]) -> bool {
        match self {
            Self::Rejected(body) => {
                let body = body.to_lowercase();
                needles.iter().any(|n| body.contains(n))
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        // Only a failed name lookup means the host is gone for good; refused
        // or dropped connections are routinely momentary and stay retryable.
        if e.is_connect() && is_dns_failure(&e) {
            Self::HostUnreachable(e.to_string())
        } else {
            Self::Http(e.to_string())
        }
    }
}

/// Whether the error chain bottoms out in a name-resolution failure.
fn is_dns_failure(e: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = e.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return true;
        }
        source = inner.source();
    }
    false
}
