// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// Remote store configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote store's API (feed listing, auth).
    pub base_url: String,
    /// Optional HTTP proxy host.
    #[serde(default)]
    pub proxy_host: Option<String>,
    /// Optional HTTP proxy port.
    #[serde(default)]
    pub proxy_port: Option<u16>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

const fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("icalsync-remote/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            proxy_host: None,
            proxy_port: None,
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}
