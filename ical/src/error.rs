// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// iCalendar parsing errors.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    /// A content line could not be interpreted. Carries the 1-based line
    /// number so the recovery pass can drop the exact offender.
    #[error("malformed content line {line}: {message}")]
    MalformedLine {
        /// 1-based line number within the unfolded document.
        line: usize,
        /// Human-readable description of the fault.
        message: String,
    },

    /// The document has no `BEGIN:VCALENDAR` envelope.
    #[error("not an iCalendar document")]
    NotACalendar,

    /// A component was opened but never closed, or closed out of order.
    #[error("unbalanced component: {0}")]
    UnbalancedComponent(String),

    /// A date, time or duration value could not be parsed.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A recurrence rule part could not be parsed.
    #[error("invalid recurrence rule: {0}")]
    InvalidRule(String),
}

impl ParseError {
    /// The faulty line number, when the error is line-scoped.
    #[must_use]
    pub fn line_number(&self) -> Option<usize> {
        match self {
            Self::MalformedLine { line, .. } => Some(*line),
            _ => None,
        }
    }
}
