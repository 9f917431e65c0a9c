// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Store integration tests with wiremock.

use icalsync_remote::{RemoteConfig, RemoteError, RemoteStore, TOKEN_HEADER};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ICS: &str = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";

fn store_for(server: &MockServer) -> RemoteStore {
    let config = RemoteConfig {
        base_url: server.uri(),
        ..Default::default()
    };
    RemoteStore::new(&config).expect("Failed to create store")
}

async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "t1" })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn downloads_public_calendar() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calendars/work.ics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ICS))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let body = store
        .download_ics(&format!("{}/calendars/work.ics", server.uri()), None, None)
        .await
        .expect("Failed to download");
    assert_eq!(body, ICS.as_bytes());
}

#[tokio::test]
async fn private_url_attaches_session_token() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/feeds/private/basic.ics"))
        .and(header(TOKEN_HEADER, "t1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ICS))
        .expect(2)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let url = format!("{}/feeds/private/basic.ics", server.uri());

    // Two downloads, one auth exchange: the session is pooled
    for _ in 0..2 {
        store
            .download_ics(&url, Some("me@example.org"), Some("secret"))
            .await
            .expect("Failed to download");
    }
}

#[tokio::test]
async fn rejected_credentials_short_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let url = format!("{}/feeds/private/basic.ics", server.uri());

    let first = store
        .download_ics(&url, Some("me@example.org"), Some("wrong"))
        .await;
    assert!(matches!(first, Err(RemoteError::InvalidCredentials(_))));

    // No second exchange: the triple is remembered as invalid
    let second = store
        .download_ics(&url, Some("me@example.org"), Some("wrong"))
        .await;
    assert!(matches!(second, Err(RemoteError::CredentialsRevoked(_))));
}

#[tokio::test]
async fn retries_transient_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calendars/flaky.ics"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/calendars/flaky.ics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ICS))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let body = store
        .download_ics(&format!("{}/calendars/flaky.ics", server.uri()), None, None)
        .await
        .expect("Failed to download after retries");
    assert_eq!(body, ICS.as_bytes());
}

#[tokio::test]
async fn lists_calendars_from_feed() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    Mock::given(method("GET"))
        .and(path("/feeds/calendars"))
        .and(header(TOKEN_HEADER, "t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [
                { "id": "cal-1", "title": "Work", "selfLink": "/feeds/cal-1/events" },
                { "id": "cal-2", "selfLink": "/feeds/cal-2/events" }
            ]
        })))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let calendars = store
        .list_calendars("me@example.org", "secret")
        .await
        .expect("Failed to list calendars");

    assert_eq!(calendars.len(), 2);
    assert_eq!(calendars[0].title.as_deref(), Some("Work"));
    assert_eq!(calendars[1].id, "cal-2");
}

#[tokio::test]
async fn query_events_decodes_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feeds/cal-1/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [{
                "id": "e1",
                "editLink": "/feeds/cal-1/events/e1",
                "title": "Standup",
                "published": 1_767_258_000_000_i64,
                "when": { "start": 1_767_344_400_000_i64, "end": 1_767_346_200_000_i64 },
                "reminders": [{ "method": "popup", "minutes": 15 }],
                "extendedProperties": [{ "name": "local-uid", "value": "abc" }]
            }]
        })))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let events = store
        .query_events(&format!("{}/feeds/cal-1/events", server.uri()), "t1")
        .await
        .expect("Failed to query events");

    assert_eq!(events.len(), 1);
    let entry = &events[0];
    assert_eq!(entry.title.as_deref(), Some("Standup"));
    assert_eq!(entry.reminders[0].minutes, Some(15));
    assert_eq!(entry.extended_property("local-uid"), Some("abc"));
}

#[tokio::test]
async fn update_rejection_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/feeds/cal-1/events/e1"))
        .respond_with(
            ResponseTemplate::new(409).set_body_string("Read-only calendar cannot be modified"),
        )
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store
        .update_entry(
            &format!("{}/feeds/cal-1/events/e1", server.uri()),
            "t1",
            &icalsync_remote::EventEntry::default(),
        )
        .await
        .expect_err("update should be rejected");
    assert!(err.is_read_only());
}
