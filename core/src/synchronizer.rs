// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The synchronizer facade.
//!
//! One mutex guards all mutable sync state, so calendar reads, pushes and
//! listings serialize. That is deliberate: the remote store rate-limits
//! aggressively, and overlapping passes against the same calendar would
//! race each other's edit links.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use icalsync_remote::{CalendarEntry, RemoteConfig, RemoteStore};
use jiff::Timestamp;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::backup::BackupManager;
use crate::cache::CalendarCache;
use crate::compare::EventComparator;
use crate::config::{AlarmChannels, Config};
use crate::engine::CalendarEngine;
use crate::error::SyncError;
use crate::names::NameCache;
use crate::placeholder::has_error_marker;
use crate::push::push_changes;
use crate::request::{CachedCalendar, CalendarRequest};
use crate::todo_store::TodoStore;

/// How much of an uploaded or downloaded body is scanned for the error
/// marker before acting on it.
const MARKER_SCAN_BYTES: usize = 100;

/// Callback invoked after a calendar's push pass finishes.
#[async_trait]
pub trait SyncListener: Send + Sync {
    /// Called with the synchronized calendar's URL.
    async fn calendar_synced(&self, url: &str);
}

/// Two-way synchronizer between local ICS bodies and the remote store.
pub struct Synchronizer {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer").finish_non_exhaustive()
    }
}

struct Inner {
    engine: CalendarEngine,
    comparator: EventComparator,
    cache: CalendarCache,
    todos: TodoStore,
    backups: BackupManager,
    names: NameCache,
    channels: AlarmChannels,
    listeners: Vec<Arc<dyn SyncListener>>,
}

impl Synchronizer {
    /// Creates a synchronizer from configuration.
    ///
    /// # Errors
    ///
    /// Configuration errors (no resolvable work directory) and HTTP client
    /// initialization failures.
    pub async fn new(mut config: Config, mut remote: RemoteConfig) -> Result<Self, SyncError> {
        config.normalize()?;
        if remote.proxy_host.is_none() {
            remote.proxy_host.clone_from(&config.proxy_host);
            remote.proxy_port = config.proxy_port;
        }
        let store = RemoteStore::new(&remote)?;
        let work_dir = config.work_dir()?.clone();

        let backups = BackupManager::new(&work_dir, config.backup_retention_days);
        backups.startup_cleanup().await;

        Ok(Self {
            inner: Mutex::new(Inner {
                engine: CalendarEngine::new(store, config.extensions_enabled),
                comparator: EventComparator::new(config.extensions_enabled),
                cache: CalendarCache::new(Duration::from_secs(config.cache_ttl_secs)),
                todos: TodoStore::new(&work_dir),
                backups,
                names: NameCache::new(&work_dir),
                channels: config.alarm_channels,
                listeners: Vec::new(),
            }),
        })
    }

    /// Registers a listener notified after every push pass.
    pub async fn add_listener(&self, listener: Arc<dyn SyncListener>) {
        self.inner.lock().await.listeners.push(listener);
    }

    /// Serves a calendar body: the cached copy while fresh, otherwise a new
    /// download with the preserved to-do block spliced back in.
    ///
    /// Reads never fail: download failures are answered with a placeholder
    /// body, and backup or mirror trouble only logs.
    pub async fn get_calendar(&self, request: &CalendarRequest) -> Vec<u8> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let now = Timestamp::now();
        let millis = now.as_millisecond();

        if let Some(cached) = inner.cache.get(&request.url, millis) {
            debug!(url = request.url, "serving cached calendar");
            return cached.body.clone();
        }

        let body = inner.engine.load_calendar(request, now).await;
        let mut cached = CachedCalendar::new(request, body, millis);
        cached.todo_block = inner.todos.load(request).await;
        if let Some(block) = &cached.todo_block {
            cached.body = merge_todo_block(&cached.body, block);
        }

        if request.is_sync_target() {
            inner.backups.run(&cached, millis).await;
        }

        let body = cached.body.clone();
        inner.cache.insert(cached);
        body
    }

    /// Takes an uploaded calendar body and pushes its changes to the remote
    /// store.
    ///
    /// Bodies carrying the error marker are dropped silently: they are this
    /// synchronizer's own placeholders echoed back by a client. When the
    /// remote store is unreachable the push is postponed, never failed.
    ///
    /// # Errors
    ///
    /// Session and feed transport errors during the push pass.
    pub async fn synchronize(&self, request: &CalendarRequest) -> Result<(), SyncError> {
        let Some(body) = &request.body else {
            return Ok(());
        };
        if has_error_marker(body, MARKER_SCAN_BYTES) {
            debug!(url = request.url, "uploaded body is a placeholder, ignoring");
            return Ok(());
        }

        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let now = Timestamp::now();
        let millis = now.as_millisecond();

        let content = String::from_utf8_lossy(body);
        let todo_block = inner.todos.save(request, &content).await;

        if !request.is_sync_target() {
            return Ok(());
        }

        // The diff baseline is what the client last saw; without a cached
        // copy the remote side is re-downloaded as the authority. A marked
        // baseline (a cached outage placeholder included) would classify
        // every surviving event as new, so it postpones the push outright.
        let previous = match inner.cache.get(&request.url, millis) {
            Some(cached) => cached.body.clone(),
            None => inner.engine.load_calendar(request, now).await,
        };
        if has_error_marker(&previous, MARKER_SCAN_BYTES) {
            warn!(url = request.url, "remote store unreachable, postponing push");
            return Ok(());
        }

        let mut cached = CachedCalendar::new(request, body.clone(), millis);
        cached.previous_body = Some(previous);
        cached.todo_block = todo_block;

        push_changes(
            &mut inner.engine,
            &mut inner.comparator,
            inner.channels,
            &cached,
        )
        .await?;
        info!(url = request.url, "calendar synchronized");

        inner.backups.run(&cached, millis).await;
        // The next read re-downloads, picking up the store's normalized form
        inner.cache.remove(&request.url);

        let listeners = inner.listeners.clone();
        drop(guard);
        for listener in listeners {
            listener.calendar_synced(&request.url).await;
        }
        Ok(())
    }

    /// Lists the account's calendars, remembering their display names.
    ///
    /// # Errors
    ///
    /// Auth and transport errors from the store.
    pub async fn list_calendars(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Vec<CalendarEntry>, SyncError> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        let entries = inner.engine.store.list_calendars(username, password).await?;
        inner.names.store(&entries).await;
        Ok(entries)
    }

    /// The remembered display name of a calendar URL.
    pub async fn calendar_name(&self, url: &str) -> Option<String> {
        self.inner.lock().await.names.calendar_name(url).await
    }
}

/// Splices a VTODO block back in before the closing `END:VCALENDAR`.
fn merge_todo_block(body: &[u8], block: &str) -> Vec<u8> {
    let marker = b"END:VCALENDAR";
    let Some(at) = body
        .windows(marker.len())
        .rposition(|window| window == marker)
    else {
        return body.to_vec();
    };
    let (head, tail) = body.split_at(at);
    let mut out = Vec::with_capacity(body.len() + block.len());
    out.extend_from_slice(head);
    out.extend_from_slice(block.as_bytes());
    out.extend_from_slice(tail);
    out
}
