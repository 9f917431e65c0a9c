// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Session pool keyed by calendar URL.
//!
//! Auth exchanges are expensive and rate-limited server-side, so tokens are
//! pooled and reused until idle. Credentials the server has rejected are
//! remembered and fail without a network round trip until an exchange with
//! them succeeds again.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use reqwest::Method;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::http::HttpClient;
use crate::retry::RetryPolicy;

/// Sessions idle this long are discarded and re-created.
const MAX_IDLE: Duration = Duration::from_secs(300);

/// Pool overflow threshold; the whole pool is cleared beyond it.
const MAX_POOL_SIZE: usize = 100;

#[derive(Debug)]
struct PooledSession {
    token: String,
    last_used: Instant,
}

#[derive(serde::Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    token: String,
}

/// URL-keyed pool of session tokens.
#[derive(Debug, Default)]
pub struct SessionPool {
    sessions: HashMap<String, PooledSession>,
    invalid: HashSet<(String, String, String)>,
}

impl SessionPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A usable session token for `url`, reusing a pooled one when fresh.
    ///
    /// # Errors
    ///
    /// [`RemoteError::CredentialsRevoked`] when this credential triple was
    /// rejected earlier and has not succeeded since;
    /// [`RemoteError::InvalidCredentials`] when the exchange itself is
    /// rejected; transport errors after the auth retry budget runs out.
    pub async fn acquire(
        &mut self,
        http: &HttpClient,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, RemoteError> {
        let username = normalize_username(username);
        let key = (url.to_string(), username.clone(), password.to_string());
        if self.invalid.contains(&key) {
            return Err(RemoteError::CredentialsRevoked(username));
        }

        if let Some(session) = self.sessions.get_mut(url) {
            if session.last_used.elapsed() < MAX_IDLE {
                session.last_used = Instant::now();
                return Ok(session.token.clone());
            }
            debug!(url, "discarding idle session");
            self.sessions.remove(url);
        }

        let token = match exchange(http, url, &username, password).await {
            Ok(token) => token,
            Err(e) => {
                if matches!(e, RemoteError::InvalidCredentials(_)) {
                    self.invalid.insert(key);
                }
                return Err(e);
            }
        };
        self.invalid.remove(&key);

        if self.sessions.len() >= MAX_POOL_SIZE {
            warn!(size = self.sessions.len(), "session pool overflow, clearing");
            self.sessions.clear();
        }
        self.sessions.insert(
            url.to_string(),
            PooledSession {
                token: token.clone(),
                last_used: Instant::now(),
            },
        );
        Ok(token)
    }
}

async fn exchange(
    http: &HttpClient,
    url: &str,
    username: &str,
    password: &str,
) -> Result<String, RemoteError> {
    let auth_url = format!("{}/auth/token", origin(url));
    RetryPolicy::auth()
        .run(|_| async {
            let req = http
                .build_request(Method::POST, &auth_url, None)
                .json(&TokenRequest { username, password });
            let resp = http.execute(req).await?;
            let body: TokenResponse = resp
                .json()
                .await
                .map_err(|e| RemoteError::InvalidBody(e.to_string()))?;
            Ok(body.token)
        })
        .await
}

/// Folds known provider-alias domains to their canonical form and warns
/// about usernames that are not full addresses.
fn normalize_username(username: &str) -> String {
    let username = username.trim();
    if let Some(local) = username.strip_suffix("@googlemail.com") {
        return format!("{local}@gmail.com");
    }
    if !username.contains('@') {
        warn!(username, "username is not a full email address");
    }
    username.to_string()
}

/// The scheme-and-host prefix of a URL.
fn origin(url: &str) -> &str {
    let Some(scheme_end) = url.find("://") else {
        return url;
    };
    url.get(scheme_end + 3..)
        .and_then(|rest| rest.find('/'))
        .and_then(|path| url.get(..scheme_end + 3 + path))
        .unwrap_or(url)
}
