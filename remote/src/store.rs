// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Remote calendar store client.

use reqwest::Method;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::http::HttpClient;
use crate::retry::RetryPolicy;
use crate::session::SessionPool;
use crate::types::{CalendarEntry, EventEntry, Feed};

/// Maximum entries requested from an event feed.
const MAX_FEED_RESULTS: u32 = 1000;

/// Client for a remote calendar store: ICS downloads plus the JSON feed API.
#[derive(Debug)]
pub struct RemoteStore {
    http: HttpClient,
    sessions: Mutex<SessionPool>,
    base_url: String,
}

impl RemoteStore {
    /// Creates a new store client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client initialization fails.
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            http: HttpClient::new(config)?,
            sessions: Mutex::new(SessionPool::new()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// A session token for `url`, pooled per [`SessionPool`] rules.
    ///
    /// # Errors
    ///
    /// See [`SessionPool::acquire`].
    pub async fn session(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, RemoteError> {
        let mut pool = self.sessions.lock().await;
        pool.acquire(&self.http, url, username, password).await
    }

    /// Downloads a calendar's ICS export.
    ///
    /// Private URLs are fetched with a session token when credentials exist.
    /// HTTPS is tried first; from the third attempt on, an `https://` URL is
    /// downgraded to `http://` (some gateways break TLS but pass plain HTTP).
    ///
    /// # Errors
    ///
    /// [`RemoteError::HostUnreachable`] (a failed name lookup) surfaces
    /// immediately;
    /// [`RemoteError::InvalidBody`] when no attempt yields a body containing
    /// `BEGIN:VCALENDAR`; other transport errors after the retry budget.
    pub async fn download_ics(
        &self,
        url: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Vec<u8>, RemoteError> {
        let token = match (username, password) {
            (Some(u), Some(p)) if url.contains("/private") => {
                Some(self.session(url, u, p).await?)
            }
            _ => None,
        };

        RetryPolicy::download()
            .run(|attempt| {
                let target = if attempt >= 2 && url.starts_with("https://") {
                    url.replacen("https://", "http://", 1)
                } else {
                    url.to_string()
                };
                if attempt == 2 {
                    warn!(url, "downgrading to plain HTTP");
                }
                let token = token.clone();
                async move {
                    let req = self
                        .http
                        .build_request(Method::GET, &target, token.as_deref());
                    let resp = self.http.execute(req).await?;
                    let bytes = resp.bytes().await.map_err(RemoteError::from)?;
                    if !String::from_utf8_lossy(&bytes).contains("BEGIN:VCALENDAR") {
                        return Err(RemoteError::InvalidBody(
                            "response is not an iCalendar document".to_string(),
                        ));
                    }
                    debug!(url = target, len = bytes.len(), "downloaded calendar");
                    Ok(bytes.to_vec())
                }
            })
            .await
    }

    /// Lists the account's calendars with display names and feed links.
    ///
    /// # Errors
    ///
    /// Auth errors from the session pool; transport errors after the feed
    /// retry budget.
    pub async fn list_calendars(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Vec<CalendarEntry>, RemoteError> {
        let url = format!("{}/feeds/calendars", self.base_url);
        let token = self.session(&url, username, password).await?;
        let feed: Feed<CalendarEntry> = self.fetch_feed(&url, &token).await?;
        Ok(feed.entries)
    }

    /// The events of one calendar feed.
    ///
    /// # Errors
    ///
    /// Transport errors after the feed retry budget.
    pub async fn query_events(
        &self,
        feed_url: &str,
        token: &str,
    ) -> Result<Vec<EventEntry>, RemoteError> {
        let url = format!("{feed_url}?max-results={MAX_FEED_RESULTS}");
        let feed: Feed<EventEntry> = self.fetch_feed(&url, token).await?;
        Ok(feed.entries)
    }

    /// Fetches one entry by its edit link.
    ///
    /// # Errors
    ///
    /// Transport and decode errors.
    pub async fn get_entry(&self, edit_url: &str, token: &str) -> Result<EventEntry, RemoteError> {
        let req = self.http.build_request(Method::GET, edit_url, Some(token));
        let resp = self.http.execute(req).await?;
        resp.json()
            .await
            .map_err(|e| RemoteError::InvalidBody(e.to_string()))
    }

    /// Creates an entry in a calendar feed, returning the stored entry with
    /// its server-assigned links.
    ///
    /// # Errors
    ///
    /// [`RemoteError::Rejected`] carries server-side refusals; transport and
    /// decode errors otherwise.
    pub async fn insert_entry(
        &self,
        feed_url: &str,
        token: &str,
        entry: &EventEntry,
    ) -> Result<EventEntry, RemoteError> {
        let req = self
            .http
            .build_request(Method::POST, feed_url, Some(token))
            .json(entry);
        let resp = self.http.execute(req).await?;
        resp.json()
            .await
            .map_err(|e| RemoteError::InvalidBody(e.to_string()))
    }

    /// Replaces an entry via its edit link.
    ///
    /// # Errors
    ///
    /// [`RemoteError::Rejected`] carries server-side refusals; transport and
    /// decode errors otherwise.
    pub async fn update_entry(
        &self,
        edit_url: &str,
        token: &str,
        entry: &EventEntry,
    ) -> Result<EventEntry, RemoteError> {
        let req = self
            .http
            .build_request(Method::PUT, edit_url, Some(token))
            .json(entry);
        let resp = self.http.execute(req).await?;
        resp.json()
            .await
            .map_err(|e| RemoteError::InvalidBody(e.to_string()))
    }

    /// Deletes an entry via its edit link.
    ///
    /// # Errors
    ///
    /// [`RemoteError::Rejected`] carries server-side refusals; transport
    /// errors otherwise.
    pub async fn delete_entry(&self, edit_url: &str, token: &str) -> Result<(), RemoteError> {
        let req = self
            .http
            .build_request(Method::DELETE, edit_url, Some(token));
        self.http.execute(req).await?;
        Ok(())
    }

    async fn fetch_feed<T>(&self, url: &str, token: &str) -> Result<Feed<T>, RemoteError>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        RetryPolicy::feed()
            .run(|_| async {
                let req = self.http.build_request(Method::GET, url, Some(token));
                let resp = self.http.execute(req).await?;
                resp.json()
                    .await
                    .map_err(|e| RemoteError::InvalidBody(e.to_string()))
            })
            .await
    }
}
