// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use icalsync_remote::RemoteError;

/// Synchronization errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Remote store error.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
