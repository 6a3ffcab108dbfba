//! Client tests against a live in-process server.

use std::sync::Arc;

use carebell_client::CareClient;
use carebell_core::{
    CareConfig, ContactDraft, Frequency, LogNotifier, ManualClock, MedicationDraft,
    ReminderDraft, ReminderPatch, ReminderRuntime, ReminderStore, ScriptedVoiceInput,
    SqliteCareStore, SqliteReminderStore,
};
use carebell_server::{create_server, AppState};
use chrono::{NaiveDate, NaiveDateTime};

async fn spawn_server(now: &str) -> (CareClient, ManualClock) {
    let clock = ManualClock::new(NaiveDateTime::parse_from_str(now, "%Y-%m-%d %H:%M").unwrap());
    let reminders = SqliteReminderStore::in_memory()
        .unwrap()
        .with_clock(Arc::new(clock.clone()));
    let records = SqliteCareStore::in_memory()
        .unwrap()
        .with_clock(Arc::new(clock.clone()));
    records.seed_default_contacts().unwrap();

    let runtime = ReminderRuntime::new(
        CareConfig::builder().in_memory().build(),
        Arc::new(reminders),
        Arc::new(LogNotifier),
        Arc::new(clock.clone()),
    )
    .without_poller();
    let state = AppState::new(
        Arc::new(runtime),
        Arc::new(records),
        Arc::new(ScriptedVoiceInput::new().say("Feeling good today")),
        Arc::new(clock.clone()),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_server(state)).await.unwrap();
    });

    let client = CareClient::new(&format!("http://{}", addr)).unwrap();
    (client, clock)
}

#[tokio::test]
async fn test_health() {
    let (client, _) = spawn_server("2024-03-04 09:00").await;
    let health = client.health().await.unwrap();
    assert_eq!(health.status, "healthy");
}

#[tokio::test]
async fn test_client_as_reminder_store() {
    let (client, _) = spawn_server("2024-03-04 09:00").await;
    let store: &dyn ReminderStore = &client;

    let draft = ReminderDraft::new("Dentist", "14:30", "once")
        .on_date("2024-03-05")
        .validate()
        .unwrap();
    let created = store.create(draft).await.unwrap();
    assert_eq!(created.frequency, Frequency::Once);
    assert_eq!(created.time_label(), "14:30");

    assert_eq!(store.get(created.id).await.unwrap(), Some(created.clone()));
    assert_eq!(store.get(created.id + 100).await.unwrap(), None);

    let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let tomorrow = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    assert!(store.list_today(today).await.unwrap().is_empty());
    assert_eq!(store.list_today(tomorrow).await.unwrap().len(), 1);

    let updated = store
        .update(
            created.id,
            &ReminderPatch {
                title: Some("Dentist appointment".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Dentist appointment");

    store.delete(created.id).await.unwrap();
    store.delete(created.id).await.unwrap();
    assert!(store.list().await.unwrap().is_empty());

    let err = store
        .update(created.id, &ReminderPatch::completed())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_validation_error_surfaces() {
    let (client, _) = spawn_server("2024-03-04 09:00").await;
    let err = client
        .create_reminder(&ReminderDraft::new("", "08:00", "daily"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("title"));
}

#[tokio::test]
async fn test_alert_flow() {
    let (client, clock) = spawn_server("2024-03-04 07:59").await;
    let reminder = client
        .create_reminder(&ReminderDraft::new("Walk", "08:00", "daily"))
        .await
        .unwrap();

    assert!(client.poll().await.unwrap().is_none());
    clock.set(NaiveDateTime::parse_from_str("2024-03-04 08:00", "%Y-%m-%d %H:%M").unwrap());

    let alert = client.poll().await.unwrap().unwrap();
    assert_eq!(alert.reminder_id, reminder.id);
    assert_eq!(client.active_alert().await.unwrap(), Some(alert));

    let snoozed = client.snooze_reminder(reminder.id).await.unwrap();
    assert_eq!(snoozed.until.format("%H:%M").to_string(), "08:10");
    assert!(client.active_alert().await.unwrap().is_none());

    let done = client.complete_reminder(reminder.id).await.unwrap();
    assert!(done.is_completed);
}

#[tokio::test]
async fn test_care_records() {
    let (client, _) = spawn_server("2024-03-04 09:00").await;

    let memory = client.create_memory("Our first house").await.unwrap();
    assert_eq!(client.list_memories().await.unwrap(), vec![memory.clone()]);
    client.delete_memory(memory.id).await.unwrap();

    let chat = client.send_message("Hello").await.unwrap();
    assert_eq!(chat.len(), 2);
    let voice = client.voice_message().await.unwrap();
    assert_eq!(voice[0].content, "Feeling good today");
    client.clear_chat().await.unwrap();
    assert!(client.chat_history().await.unwrap().is_empty());

    let contact = client
        .create_contact(&ContactDraft::new("Tom", "(555) 222-3333", "Son"))
        .await
        .unwrap();
    assert_eq!(client.list_contacts().await.unwrap().len(), 4);
    client.delete_contact(contact.id).await.unwrap();

    let med = client
        .create_medication(&MedicationDraft {
            name: "Vitamin D".to_string(),
            dosage: "1000 IU".to_string(),
            frequency: "daily".to_string(),
            time_slots: vec!["09:00".to_string()],
            instructions: None,
        })
        .await
        .unwrap();
    assert_eq!(client.list_medications().await.unwrap(), vec![med]);
}

#[tokio::test]
async fn test_caregiver_summary_uses_code() {
    let (client, _) = spawn_server("2024-03-04 09:00").await;
    assert!(client.caregiver_summary().await.is_err());

    let client = client.with_caregiver_code("1234");
    let summary = client.caregiver_summary().await.unwrap();
    assert_eq!(summary.contacts.len(), 3);
}
