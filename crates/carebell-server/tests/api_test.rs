//! Integration tests for the REST API.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use carebell_core::{
    CareConfig, LogNotifier, ManualClock, ReminderRuntime, ScriptedVoiceInput, SqliteCareStore,
    SqliteReminderStore, VoiceError, VoiceInput,
};
use carebell_server::{create_server, AppState};
use chrono::NaiveDateTime;
use serde_json::{json, Value};
use tower::ServiceExt;

fn at(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

struct TestApp {
    app: Router,
    clock: ManualClock,
}

fn test_app_with_voice(now: &str, voice: Arc<dyn VoiceInput>) -> TestApp {
    let clock = ManualClock::new(at(now));
    let config = CareConfig::builder().in_memory().build();

    let reminders = SqliteReminderStore::in_memory()
        .unwrap()
        .with_clock(Arc::new(clock.clone()));
    let records = SqliteCareStore::in_memory()
        .unwrap()
        .with_clock(Arc::new(clock.clone()));
    records.seed_default_contacts().unwrap();

    let runtime = ReminderRuntime::new(
        config,
        Arc::new(reminders),
        Arc::new(LogNotifier),
        Arc::new(clock.clone()),
    )
    .without_poller();

    let state = AppState::new(
        Arc::new(runtime),
        Arc::new(records),
        voice,
        Arc::new(clock.clone()),
    );
    TestApp {
        app: create_server(state),
        clock,
    }
}

fn test_app(now: &str) -> TestApp {
    test_app_with_voice(now, Arc::new(ScriptedVoiceInput::new()))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_with_headers(app, method, uri, body, &[]).await
}

async fn send_with_headers(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let t = test_app("2024-03-04 09:00");
    let (status, body) = send(&t.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["alertActive"], false);
}

#[tokio::test]
async fn test_reminder_crud() {
    let t = test_app("2024-03-04 09:00");

    let (status, created) = send(
        &t.app,
        Method::POST,
        "/api/reminders",
        Some(json!({"title": "Take pills", "time": "08:00", "frequency": "daily"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["time"], "08:00");
    assert_eq!(created["isActive"], true);
    assert_eq!(created["isCompleted"], false);
    let id = created["id"].as_i64().unwrap();

    let (_, today) = send(&t.app, Method::GET, "/api/reminders/today", None).await;
    assert_eq!(today.as_array().unwrap().len(), 1);

    let (status, updated) = send(
        &t.app,
        Method::PATCH,
        &format!("/api/reminders/{id}"),
        Some(json!({"isActive": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["isActive"], false);

    let (_, today) = send(&t.app, Method::GET, "/api/reminders/today", None).await;
    assert!(today.as_array().unwrap().is_empty());

    let uri = format!("/api/reminders/{id}");
    let (status, body) = send(&t.app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    let (status, _) = send(&t.app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, all) = send(&t.app, Method::GET, "/api/reminders", None).await;
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_reminder_rejected() {
    let t = test_app("2024-03-04 09:00");

    let (status, body) = send(
        &t.app,
        Method::POST,
        "/api/reminders",
        Some(json!({"title": "Dentist", "time": "25:00", "frequency": "daily"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/api/reminders",
        Some(json!({"title": "Dentist", "time": "10:00", "frequency": "once"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_update_missing_reminder_is_404() {
    let t = test_app("2024-03-04 09:00");
    let (status, body) = send(
        &t.app,
        Method::PATCH,
        "/api/reminders/42",
        Some(json!({"title": "Walk"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_poll_complete_and_snooze() {
    let t = test_app("2024-03-04 07:00");
    let (_, walk) = send(
        &t.app,
        Method::POST,
        "/api/reminders",
        Some(json!({"title": "Walk", "time": "08:00", "frequency": "daily"})),
    )
    .await;
    let (_, water) = send(
        &t.app,
        Method::POST,
        "/api/reminders",
        Some(json!({"title": "Water", "time": "08:00", "frequency": "daily"})),
    )
    .await;

    let (_, alert) = send(&t.app, Method::POST, "/api/reminders/poll", None).await;
    assert!(alert.is_null());

    t.clock.set(at("2024-03-04 08:00"));
    let (_, alert) = send(&t.app, Method::POST, "/api/reminders/poll", None).await;
    assert_eq!(alert["reminderId"], walk["id"]);
    assert_eq!(alert["body"], "Time to: Walk");

    let (_, active) = send(&t.app, Method::GET, "/api/alerts/active", None).await;
    assert_eq!(active["reminderId"], walk["id"]);

    let (status, snoozed) = send(
        &t.app,
        Method::POST,
        &format!("/api/reminders/{}/snooze", walk["id"]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snoozed["until"], "2024-03-04T08:10:00");

    let (_, alert) = send(&t.app, Method::POST, "/api/reminders/poll", None).await;
    assert_eq!(alert["reminderId"], water["id"]);

    let (status, done) = send(
        &t.app,
        Method::POST,
        &format!("/api/reminders/{}/complete", water["id"]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["isCompleted"], true);

    let (_, active) = send(&t.app, Method::GET, "/api/alerts/active", None).await;
    assert!(active.is_null());
}

#[tokio::test]
async fn test_snooze_missing_reminder() {
    let t = test_app("2024-03-04 07:00");
    let (status, _) = send(&t.app, Method::POST, "/api/reminders/9/snooze", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dismiss_alert() {
    let t = test_app("2024-03-04 08:00");
    send(
        &t.app,
        Method::POST,
        "/api/reminders",
        Some(json!({"title": "Walk", "time": "08:00", "frequency": "daily"})),
    )
    .await;
    send(&t.app, Method::POST, "/api/reminders/poll", None).await;

    let (_, dismissed) = send(&t.app, Method::POST, "/api/alerts/dismiss", None).await;
    assert_eq!(dismissed["title"], "Reminder");
    let (_, dismissed) = send(&t.app, Method::POST, "/api/alerts/dismiss", None).await;
    assert!(dismissed.is_null());
}

#[tokio::test]
async fn test_profile_flow() {
    let t = test_app("2024-03-04 09:00");

    let (_, profile) = send(&t.app, Method::GET, "/api/profile", None).await;
    assert!(profile.is_null());

    let (status, created) = send(
        &t.app,
        Method::POST,
        "/api/profile",
        Some(json!({"name": "Margaret", "age": 82})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["caregiverCode"], "1234");

    let (_, updated) = send(
        &t.app,
        Method::PATCH,
        &format!("/api/profile/{}", created["id"]),
        Some(json!({"preferences": "Morning walks"})),
    )
    .await;
    assert_eq!(updated["name"], "Margaret");
    assert_eq!(updated["preferences"], "Morning walks");
}

#[tokio::test]
async fn test_memories() {
    let t = test_app("2024-03-04 09:00");
    let (_, first) = send(
        &t.app,
        Method::POST,
        "/api/memories",
        Some(json!({"content": "Wedding in 1962"})),
    )
    .await;
    t.clock.advance(chrono::Duration::minutes(1));
    send(
        &t.app,
        Method::POST,
        "/api/memories",
        Some(json!({"content": "Trip to the lake"})),
    )
    .await;

    let (_, list) = send(&t.app, Method::GET, "/api/memories", None).await;
    assert_eq!(list[0]["content"], "Trip to the lake");

    let (_, body) = send(
        &t.app,
        Method::DELETE,
        &format!("/api/memories/{}", first["id"]),
        None,
    )
    .await;
    assert_eq!(body["success"], true);
    let (_, list) = send(&t.app, Method::GET, "/api/memories", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_chat() {
    let t = test_app("2024-03-04 09:00");

    let (_, posted) = send(
        &t.app,
        Method::POST,
        "/api/chat",
        Some(json!({"content": "I slept well", "isFromUser": true})),
    )
    .await;
    assert_eq!(posted.as_array().unwrap().len(), 2);
    assert_eq!(posted[1]["isFromUser"], false);

    let (_, posted) = send(
        &t.app,
        Method::POST,
        "/api/chat",
        Some(json!({"content": "Good morning!", "isFromUser": false})),
    )
    .await;
    assert_eq!(posted.as_array().unwrap().len(), 1);

    let (status, quick) = send(&t.app, Method::POST, "/api/chat/quick/feeling", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quick[0]["content"], "I want to talk about how I'm feeling today.");

    let (status, _) = send(&t.app, Method::POST, "/api/chat/quick/sing", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, history) = send(&t.app, Method::GET, "/api/chat", None).await;
    assert_eq!(history.as_array().unwrap().len(), 5);

    let (_, cleared) = send(&t.app, Method::DELETE, "/api/chat", None).await;
    assert_eq!(cleared["success"], true);
    let (_, history) = send(&t.app, Method::GET, "/api/chat", None).await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_voice_chat() {
    let voice = ScriptedVoiceInput::new()
        .say("I had lunch with Sarah")
        .fail(VoiceError::AudioCapture);
    let t = test_app_with_voice("2024-03-04 09:00", Arc::new(voice));

    let (status, posted) = send(&t.app, Method::POST, "/api/chat/voice", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(posted[0]["content"], "I had lunch with Sarah");

    let (status, body) = send(&t.app, Method::POST, "/api/chat/voice", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["message"], "No microphone was found.");

    let (status, _) = send(&t.app, Method::POST, "/api/chat/voice", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_emergency_contacts() {
    let t = test_app("2024-03-04 09:00");

    let (_, contacts) = send(&t.app, Method::GET, "/api/emergency-contacts", None).await;
    assert_eq!(contacts.as_array().unwrap().len(), 3);
    assert_eq!(contacts[1]["relationship"], "Granddaughter");

    let (_, created) = send(
        &t.app,
        Method::POST,
        "/api/emergency-contacts",
        Some(json!({"name": "Tom", "phone": "(555) 222-3333", "relationship": "Son"})),
    )
    .await;
    let (_, updated) = send(
        &t.app,
        Method::PATCH,
        &format!("/api/emergency-contacts/{}", created["id"]),
        Some(json!({"phone": "(555) 999-0000"})),
    )
    .await;
    assert_eq!(updated["phone"], "(555) 999-0000");

    let (status, _) = send(
        &t.app,
        Method::PATCH,
        "/api/emergency-contacts/99",
        Some(json!({"phone": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(
        &t.app,
        Method::DELETE,
        &format!("/api/emergency-contacts/{}", created["id"]),
        None,
    )
    .await;
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_medications() {
    let t = test_app("2024-03-04 09:00");

    let (status, med) = send(
        &t.app,
        Method::POST,
        "/api/medications",
        Some(json!({
            "name": "Lisinopril",
            "dosage": "10mg",
            "frequency": "daily",
            "timeSlots": ["08:00"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(med["timeSlots"], json!(["08:00"]));
    assert_eq!(med["isActive"], true);

    let (_, updated) = send(
        &t.app,
        Method::PATCH,
        &format!("/api/medications/{}", med["id"]),
        Some(json!({"isActive": false})),
    )
    .await;
    assert_eq!(updated["isActive"], false);

    let (status, _) = send(
        &t.app,
        Method::POST,
        "/api/medications",
        Some(json!({
            "name": "Aspirin",
            "dosage": "81mg",
            "frequency": "daily",
            "timeSlots": ["noon"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, list) = send(&t.app, Method::GET, "/api/medications", None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_caregiver_summary_requires_code() {
    let t = test_app("2024-03-04 09:00");
    send(
        &t.app,
        Method::POST,
        "/api/reminders",
        Some(json!({"title": "Walk", "time": "10:00", "frequency": "daily"})),
    )
    .await;

    let (status, body) = send(&t.app, Method::GET, "/api/caregiver/summary", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send_with_headers(
        &t.app,
        Method::GET,
        "/api/caregiver/summary",
        None,
        &[("X-Caregiver-Code", "0000")],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, summary) = send_with_headers(
        &t.app,
        Method::GET,
        "/api/caregiver/summary",
        None,
        &[("X-Caregiver-Code", "1234")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["totalToday"], 1);
    assert_eq!(summary["completedToday"], 0);
    assert_eq!(summary["contacts"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_caregiver_code_follows_profile() {
    let t = test_app("2024-03-04 09:00");
    send(
        &t.app,
        Method::POST,
        "/api/profile",
        Some(json!({"name": "Margaret", "caregiverCode": "8080"})),
    )
    .await;

    let (status, _) = send_with_headers(
        &t.app,
        Method::GET,
        "/api/caregiver/summary",
        None,
        &[("X-Caregiver-Code", "1234")],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_with_headers(
        &t.app,
        Method::GET,
        "/api/caregiver/summary",
        None,
        &[("X-Caregiver-Code", "8080")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
