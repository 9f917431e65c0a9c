// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use icalsync_core::{
    CalendarRequest, Config, ERROR_MARKER, SyncListener, Synchronizer, has_error_marker,
};
use icalsync_remote::RemoteConfig;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REMOTE_ICS: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//store//EN\r\n\
    BEGIN:VEVENT\r\nUID:e1\r\nSUMMARY:Standup\r\n\
    DTSTART:20260102T100000Z\r\nDTEND:20260102T103000Z\r\nEND:VEVENT\r\n\
    END:VCALENDAR\r\n";

async fn synchronizer(server: &MockServer, work_dir: &Path) -> Synchronizer {
    let config = Config {
        work_dir: Some(work_dir.to_path_buf()),
        ..Config::default()
    };
    let remote = RemoteConfig {
        base_url: server.uri(),
        ..RemoteConfig::default()
    };
    Synchronizer::new(config, remote).await.unwrap()
}

fn request(server: &MockServer, body: Option<&str>) -> CalendarRequest {
    CalendarRequest {
        url: format!("{}/feeds/cal-1/private/basic.ics", server.uri()),
        username: Some("user@example.org".to_string()),
        password: Some("secret".to_string()),
        method: if body.is_some() { "PUT" } else { "GET" }.to_string(),
        body: body.map(|b| b.as_bytes().to_vec()),
        ..CalendarRequest::default()
    }
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "t1" })))
        .mount(server)
        .await;
}

async fn mount_download(server: &MockServer, expect: u64) {
    Mock::given(method("GET"))
        .and(path("/feeds/cal-1/private/basic.ics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(REMOTE_ICS))
        .expect(expect)
        .mount(server)
        .await;
}

async fn mount_feed(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/feeds/cal-1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [{
                "id": "r1",
                "editLink": format!("{}/edit/r1", server.uri()),
                "when": { "start": 1_767_348_000_000_i64, "end": 1_767_349_800_000_i64 },
                "extendedProperties": [
                    { "name": "icalsync-uid", "value": "e1" }
                ]
            }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn cached_calendar_is_served_within_ttl() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_download(&server, 1).await;

    let sync = synchronizer(&server, dir.path()).await;
    // No credentials: the feed is never consulted
    let mut req = request(&server, None);
    req.username = None;
    req.password = None;

    let first = sync.get_calendar(&req).await;
    let second = sync.get_calendar(&req).await;
    assert_eq!(first, second);
    assert!(String::from_utf8_lossy(&first).contains("SUMMARY:Standup"));
}

#[tokio::test]
async fn unresolvable_host_yields_placeholder_and_no_backup() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let sync = synchronizer(&server, dir.path()).await;

    let req = CalendarRequest {
        // RFC 2606 reserves .invalid, so resolution always fails
        url: "http://icalsync-no-such-host.invalid/feeds/cal-1/basic.ics".to_string(),
        method: "GET".to_string(),
        ..CalendarRequest::default()
    };
    let body = sync.get_calendar(&req).await;
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains(ERROR_MARKER));
    assert!(text.contains("SUMMARY:NETWORK DOWN"));

    // A marked body never reaches the backup directory
    assert!(!dir.path().join("backup").exists()
        || std::fs::read_dir(dir.path().join("backup")).unwrap().next().is_none());
}

#[tokio::test]
async fn persistent_server_errors_end_in_a_placeholder() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/feeds/cal-1/private/basic.ics"))
        .respond_with(ResponseTemplate::new(503))
        .expect(6)
        .mount(&server)
        .await;

    let sync = synchronizer(&server, dir.path()).await;
    let mut req = request(&server, None);
    req.username = None;
    req.password = None;

    let body = sync.get_calendar(&req).await;
    let text = String::from_utf8_lossy(&body);
    assert!(has_error_marker(&body, 100));
    assert!(text.contains("SUMMARY:UNAVAILABLE"));
}

#[tokio::test]
async fn stale_placeholder_baseline_postpones_the_push() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/feeds/cal-1/private/basic.ics"))
        .respond_with(ResponseTemplate::new(503))
        .expect(6)
        .mount(&server)
        .await;
    mount_auth(&server).await;
    // Once a placeholder sits in the cache as the diff baseline, no push
    // traffic may happen, or every surviving event would be re-inserted
    Mock::given(method("GET"))
        .and(path("/feeds/cal-1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "entries": [] })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/feeds/cal-1/events"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let sync = synchronizer(&server, dir.path()).await;
    let body = sync.get_calendar(&request(&server, None)).await;
    assert!(has_error_marker(&body, 100));

    // The store has recovered, the client echoes its pre-outage copy
    sync.synchronize(&request(&server, Some(REMOTE_ICS)))
        .await
        .unwrap();
}

#[tokio::test]
async fn new_local_event_is_inserted() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_auth(&server).await;
    mount_download(&server, 1).await;
    mount_feed(&server).await;
    Mock::given(method("POST"))
        .and(path("/feeds/cal-1/events"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "r2",
            "editLink": format!("{}/edit/r2", server.uri())
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uploaded = REMOTE_ICS.replace(
        "END:VCALENDAR\r\n",
        "BEGIN:VEVENT\r\nUID:e2\r\nSUMMARY:Review\r\n\
         DTSTART:20260103T140000Z\r\nDTEND:20260103T150000Z\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
    );
    let sync = synchronizer(&server, dir.path()).await;
    sync.synchronize(&request(&server, Some(&uploaded)))
        .await
        .unwrap();
}

#[tokio::test]
async fn changed_event_is_updated_via_its_edit_link() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_auth(&server).await;
    mount_download(&server, 1).await;
    mount_feed(&server).await;
    Mock::given(method("PUT"))
        .and(path("/edit/r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "r1" })))
        .expect(1)
        .mount(&server)
        .await;

    let uploaded = REMOTE_ICS.replace("SUMMARY:Standup", "SUMMARY:Standup (moved)");
    let sync = synchronizer(&server, dir.path()).await;
    sync.synchronize(&request(&server, Some(&uploaded)))
        .await
        .unwrap();
}

#[tokio::test]
async fn removed_event_is_deleted_remotely() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_auth(&server).await;
    mount_download(&server, 1).await;
    mount_feed(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/edit/r1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let uploaded = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";
    let sync = synchronizer(&server, dir.path()).await;
    sync.synchronize(&request(&server, Some(uploaded)))
        .await
        .unwrap();
}

#[tokio::test]
async fn uploaded_placeholder_is_dropped_silently() {
    // No mocks mounted: any request would fail the test via wiremock
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let sync = synchronizer(&server, dir.path()).await;

    let body = format!("BEGIN:VCALENDAR\r\nPRODID:{ERROR_MARKER}\r\nEND:VCALENDAR\r\n");
    sync.synchronize(&request(&server, Some(&body)))
        .await
        .unwrap();
    server.verify().await;
}

#[tokio::test]
async fn todo_block_survives_the_round_trip() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    // A one-way feed URL: uploads park the to-dos, no push happens
    let url_path = "/feeds/cal-1/full";
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(REMOTE_ICS))
        .mount(&server)
        .await;

    let req = CalendarRequest {
        url: format!("{}{url_path}", server.uri()),
        method: "GET".to_string(),
        ..CalendarRequest::default()
    };
    let uploaded = "BEGIN:VCALENDAR\r\nBEGIN:VTODO\r\nUID:t1\r\n\
        SUMMARY:Buy milk\r\nEND:VTODO\r\nEND:VCALENDAR\r\n";
    let mut put = req.clone();
    put.method = "PUT".to_string();
    put.body = Some(uploaded.as_bytes().to_vec());

    let sync = synchronizer(&server, dir.path()).await;
    sync.synchronize(&put).await.unwrap();

    // The remote body has no to-dos; the served one has them spliced back
    let body = sync.get_calendar(&req).await;
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("SUMMARY:Buy milk"));
    assert!(text.contains("END:VTODO\r\nEND:VCALENDAR"));
    assert!(!has_error_marker(&body, 100));
}

#[tokio::test]
async fn sync_targets_get_backed_up_once() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_download(&server, 1).await;

    let sync = synchronizer(&server, dir.path()).await;
    let mut req = request(&server, None);
    req.username = None;
    req.password = None;
    sync.get_calendar(&req).await;

    let backups: Vec<_> = std::fs::read_dir(dir.path().join("backup"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(backups.len(), 1);
    assert!(backups[0].contains("-remote-"));
    assert!(backups[0].ends_with(".ics"));
}

#[tokio::test]
async fn listeners_hear_about_finished_pushes() {
    struct Counter(AtomicUsize);

    #[async_trait::async_trait]
    impl SyncListener for Counter {
        async fn calendar_synced(&self, _url: &str) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_auth(&server).await;
    mount_download(&server, 1).await;
    mount_feed(&server).await;

    let sync = synchronizer(&server, dir.path()).await;
    let counter = Arc::new(Counter(AtomicUsize::new(0)));
    sync.add_listener(counter.clone()).await;

    // An unchanged body still runs (and finishes) a push pass
    sync.synchronize(&request(&server, Some(REMOTE_ICS)))
        .await
        .unwrap();
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}
