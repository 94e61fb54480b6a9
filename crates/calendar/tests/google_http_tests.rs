use concierge_calendar::{
    AuthFlow, CalendarClient, CalendarError, Credential, CredentialManager, CredentialStore,
    EventScheduler, GoogleOAuth, NewEvent, CALENDAR_SCOPE,
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn credential(token_uri: &str) -> Credential {
    Credential {
        token: "ya29.valid".to_string(),
        refresh_token: Some("1//refresh".to_string()),
        token_uri: token_uri.to_string(),
        client_id: "client".to_string(),
        client_secret: "secret".to_string(),
        scopes: vec![CALENDAR_SCOPE.to_string()],
        expiry: None,
    }
}

fn oauth(dir: &TempDir) -> GoogleOAuth {
    GoogleOAuth::new(dir.path().join("credentials.json"), Duration::from_secs(5)).unwrap()
}

fn trip_event() -> NewEvent {
    NewEvent {
        title: "Flight FL123 to Paris".to_string(),
        description: "Booked via concierge".to_string(),
        start_time: "2025-12-10T08:00:00".to_string(),
        end_time: "2025-12-10T10:30:00".to_string(),
    }
}

async fn client_for(server: &Server, dir: &TempDir) -> CalendarClient {
    let store = CredentialStore::new(dir.path().join("token.json"));
    store.save(&credential("https://unused.test/token")).await.unwrap();
    let manager = CredentialManager::new(store, Arc::new(oauth(dir)));

    CalendarClient::new(
        server.url(),
        "primary",
        "America/New_York",
        Duration::from_secs(5),
        Arc::new(manager),
    )
    .unwrap()
}

#[tokio::test]
async fn test_refresh_posts_refresh_grant() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "1//refresh".into()),
            Matcher::UrlEncoded("client_id".into(), "client".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"ya29.fresh","expires_in":3599,"token_type":"Bearer"}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let token_uri = format!("{}/token", server.url());
    let refreshed = oauth(&dir).refresh(&credential(&token_uri)).await.unwrap();

    mock.assert_async().await;
    assert_eq!(refreshed.token, "ya29.fresh");
    assert_eq!(refreshed.refresh_token.as_deref(), Some("1//refresh"));
    assert!(refreshed.is_valid());
}

#[tokio::test]
async fn test_refresh_rejection_is_auth_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/token")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#,
        )
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let token_uri = format!("{}/token", server.url());
    let result = oauth(&dir).refresh(&credential(&token_uri)).await;

    match result {
        Err(CalendarError::Auth(reason)) => assert!(reason.contains("invalid_grant")),
        other => panic!("expected auth error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_consent_without_client_secrets_fails() {
    let dir = TempDir::new().unwrap();
    let result = oauth(&dir).consent().await;
    assert!(matches!(result, Err(CalendarError::MissingClientSecrets(_))));
}

#[tokio::test]
async fn test_create_event_inserts_into_calendar() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/calendars/primary/events")
        .match_header("authorization", "Bearer ya29.valid")
        .match_body(Matcher::PartialJson(json!({
            "summary": "Flight FL123 to Paris",
            "start": {"dateTime": "2025-12-10T08:00:00", "timeZone": "America/New_York"},
            "end": {"dateTime": "2025-12-10T10:30:00", "timeZone": "America/New_York"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"evt_42","htmlLink":"https://calendar.google.com/event?eid=evt_42"}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, &dir).await;
    let created = client.create_event(trip_event()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(created.id, "evt_42");
    assert!(created.html_link.unwrap().contains("evt_42"));
}

#[tokio::test]
async fn test_create_event_api_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/calendars/primary/events")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":401,"message":"Invalid Credentials"}}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let client = client_for(&server, &dir).await;
    let err = client.create_event(trip_event()).await.unwrap_err();

    match err {
        CalendarError::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid Credentials");
        }
        other => panic!("expected api error, got {:?}", other),
    }
}
