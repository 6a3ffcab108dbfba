//! Background runtime for reminder delivery.
//!
//! Wires the reminder store, notification scheduler, due poller and presenter
//! together, providing unified startup and graceful shutdown. All reminder
//! mutations that affect timing go through the runtime so timers stay in step
//! with the store.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::clock::{SharedClock, SystemClock};
use crate::config::CareConfig;
use crate::error::CareResult;
use crate::events::{Alert, AlertBus, AlertSubscriber};
use crate::reminders::{
    DueCheck, DueEvaluator, DuePoller, FireCallback, FiredReminder, LogNotifier,
    NotificationPresenter, NotificationScheduler, Notifier, PollerConfig, PresenterConfig,
    ReminderStore, SharedReminderStore, SqliteReminderStore,
};
use crate::types::{Frequency, Reminder, ReminderDraft, ReminderPatch, WeeklyPolicy};

/// Channel capacity for timer fires awaiting dispatch.
const FIRE_CHANNEL_CAPACITY: usize = 100;

/// Whether a stored reminder should hold a live timer.
fn wants_timer(reminder: &Reminder) -> bool {
    reminder.is_active && !(reminder.frequency == Frequency::Once && reminder.is_completed)
}

/// Background runtime managing reminder delivery.
///
/// # Example
///
/// ```ignore
/// use carebell_core::{CareConfig, ReminderRuntime};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let runtime = ReminderRuntime::from_config(CareConfig::from_env())?;
///     runtime.start().await?;
///
///     // ... application runs ...
///
///     runtime.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct ReminderRuntime {
    config: CareConfig,
    store: SharedReminderStore,
    scheduler: Arc<NotificationScheduler>,
    presenter: Arc<NotificationPresenter>,
    check: Arc<DueCheck>,
    enable_poller: bool,
    poller: Mutex<Option<DuePoller>>,
    fire_tx: StdMutex<Option<mpsc::Sender<FiredReminder>>>,
    dispatcher: StdMutex<Option<JoinHandle<()>>>,
}

impl ReminderRuntime {
    /// Create a runtime over the given collaborators.
    ///
    /// Nothing runs until `start()`.
    pub fn new(
        config: CareConfig,
        store: SharedReminderStore,
        notifier: Arc<dyn Notifier>,
        clock: SharedClock,
    ) -> Self {
        debug!(
            poll_interval_secs = config.poll_interval_secs,
            snooze_minutes = config.snooze_minutes,
            "Creating ReminderRuntime"
        );

        let evaluator = DueEvaluator::new(config.weekly_policy);
        let scheduler = Arc::new(
            NotificationScheduler::new(clock.clone()).with_weekly_policy(config.weekly_policy),
        );
        let presenter = NotificationPresenter::new(
            store.clone(),
            notifier,
            clock.clone(),
            AlertBus::new(),
            PresenterConfig::from(&config),
        );
        let check = Arc::new(DueCheck::new(
            store.clone(),
            evaluator,
            presenter.clone(),
            clock,
        ));

        Self {
            config,
            store,
            scheduler,
            presenter,
            check,
            enable_poller: true,
            poller: Mutex::new(None),
            fire_tx: StdMutex::new(None),
            dispatcher: StdMutex::new(None),
        }
    }

    /// Create a runtime with a SQLite store at the configured path, the system
    /// clock and log-based alerts.
    pub fn from_config(config: CareConfig) -> CareResult<Self> {
        config.validate()?;
        let clock: SharedClock = Arc::new(SystemClock);
        let store = SqliteReminderStore::new(&config.database_path)?
            .with_clock(clock.clone())
            .with_weekly_policy(config.weekly_policy);
        Ok(Self::new(config, Arc::new(store), Arc::new(LogNotifier), clock))
    }

    /// Disable the periodic due poller; only timers surface reminders.
    pub fn without_poller(mut self) -> Self {
        self.enable_poller = false;
        self
    }

    /// Start delivery: arm timers for stored reminders, start the poller and
    /// the fire dispatcher. Starting a running runtime is a no-op.
    pub async fn start(&self) -> CareResult<()> {
        let mut poller_slot = self.poller.lock().await;
        if self.is_running() {
            return Ok(());
        }
        debug!("Starting reminder runtime");

        let (tx, mut rx) = mpsc::channel::<FiredReminder>(FIRE_CHANNEL_CAPACITY);
        let store = self.store.clone();
        let presenter = self.presenter.clone();
        let policy = self.config.weekly_policy;
        let handle = tokio::spawn(async move {
            while let Some(fired) = rx.recv().await {
                dispatch_fire(store.as_ref(), &presenter, policy, fired).await;
            }
            debug!("Fire dispatcher stopped");
        });
        *lock(&self.fire_tx) = Some(tx);
        *lock(&self.dispatcher) = Some(handle);

        let mut armed = 0usize;
        for reminder in self.store.list().await? {
            if wants_timer(&reminder) && self.arm(&reminder).is_some() {
                armed += 1;
            }
        }

        if self.enable_poller {
            let mut config = PollerConfig::with_interval(self.config.poll_interval());
            if self.config.poll_on_start {
                config = config.with_run_on_start();
            }
            let poller = DuePoller::new(self.check.clone(), config).await?;
            poller.start().await?;
            *poller_slot = Some(poller);
        }

        info!(armed, poller = self.enable_poller, "Reminder runtime started");
        Ok(())
    }

    /// Stop delivery: disarm all timers, stop the poller and the dispatcher.
    pub async fn shutdown(&self) -> CareResult<()> {
        debug!("Shutting down reminder runtime");
        self.scheduler.cancel_all();
        self.presenter.shutdown();

        if let Some(mut poller) = self.poller.lock().await.take() {
            poller.shutdown().await?;
        }

        lock(&self.fire_tx).take();
        if let Some(handle) = lock(&self.dispatcher).take() {
            handle.abort();
        }

        info!("Reminder runtime stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        lock(&self.dispatcher).is_some()
    }

    fn fire_callback(&self) -> Option<FireCallback> {
        let tx = lock(&self.fire_tx).clone()?;
        Some(Arc::new(move |fired: FiredReminder| {
            let reminder_id = fired.reminder_id;
            if let Err(e) = tx.try_send(fired) {
                warn!(reminder_id, error = %e, "Dropping reminder fire");
            }
        }))
    }

    /// Arm or re-arm the timer for `reminder`. Does nothing while stopped.
    fn arm(&self, reminder: &Reminder) -> Option<chrono::NaiveDateTime> {
        let callback = self.fire_callback()?;
        match self.scheduler.schedule_reminder(reminder, callback) {
            Ok(next) => next,
            Err(e) => {
                error!(reminder_id = reminder.id, error = %e, "Failed to arm reminder timer");
                None
            }
        }
    }

    async fn sync_timer(&self, reminder: &Reminder) {
        if wants_timer(reminder) {
            self.arm(reminder);
        } else {
            self.scheduler.cancel(reminder.id);
        }
        if !reminder.is_active {
            self.presenter.forget(reminder.id).await;
        }
    }

    /// Validate and store a new reminder, arming its timer.
    pub async fn create_reminder(&self, draft: ReminderDraft) -> CareResult<Reminder> {
        let reminder = self.store.create(draft.validate()?).await?;
        self.arm(&reminder);
        info!(reminder_id = reminder.id, title = %reminder.title, "Reminder created");
        Ok(reminder)
    }

    /// Apply a patch, re-arming or cancelling the timer as needed.
    pub async fn update_reminder(&self, id: i64, patch: &ReminderPatch) -> CareResult<Reminder> {
        let updated = self.store.update(id, patch).await?;
        if patch.touches_schedule() {
            self.sync_timer(&updated).await;
        }
        Ok(updated)
    }

    /// Cancel the reminder's timer and any pending alert, then delete it.
    pub async fn delete_reminder(&self, id: i64) -> CareResult<()> {
        self.scheduler.cancel(id);
        self.presenter.forget(id).await;
        self.store.delete(id).await?;
        info!(reminder_id = id, "Reminder deleted");
        Ok(())
    }

    /// Mark the reminder complete and clear its alert.
    pub async fn acknowledge(&self, id: i64) -> CareResult<Reminder> {
        let reminder = self.presenter.acknowledge(id).await?;
        if !wants_timer(&reminder) {
            self.scheduler.cancel(id);
        }
        Ok(reminder)
    }

    /// Snooze the reminder; returns when it comes back.
    pub async fn snooze(&self, id: i64) -> CareResult<chrono::NaiveDateTime> {
        self.presenter.snooze(id).await
    }

    /// Clear the active alert without changing the store.
    pub async fn dismiss(&self) -> Option<Alert> {
        self.presenter.dismiss().await
    }

    /// Run one due check now.
    pub async fn poll_once(&self) -> CareResult<Option<Alert>> {
        self.check.run().await
    }

    /// Handle a timer fire as the dispatcher would.
    pub async fn handle_fire(&self, fired: FiredReminder) {
        dispatch_fire(
            self.store.as_ref(),
            &self.presenter,
            self.config.weekly_policy,
            fired,
        )
        .await;
    }

    pub fn current_alert(&self) -> Option<Alert> {
        self.presenter.current()
    }

    /// Subscribe to alert events.
    pub fn subscribe(&self) -> AlertSubscriber {
        self.presenter.bus().subscribe()
    }

    pub fn store(&self) -> SharedReminderStore {
        self.store.clone()
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    pub fn presenter(&self) -> &Arc<NotificationPresenter> {
        &self.presenter
    }

    pub fn config(&self) -> &CareConfig {
        &self.config
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Present a fired reminder if the store still wants it presented.
///
/// Completion is not tracked per occurrence, so a completed repeating
/// reminder is still presented on its next occurrence. Fires for a day the
/// reminder does not occur on are dropped.
async fn dispatch_fire(
    store: &dyn ReminderStore,
    presenter: &NotificationPresenter,
    policy: WeeklyPolicy,
    fired: FiredReminder,
) {
    let id = fired.reminder_id;
    let reminder = match store.get(id).await {
        Ok(Some(r)) => r,
        Ok(None) => {
            debug!(reminder_id = id, "Fire for deleted reminder ignored");
            return;
        }
        Err(e) => {
            error!(reminder_id = id, error = %e, "Failed to load fired reminder");
            return;
        }
    };
    if !wants_timer(&reminder) {
        debug!(reminder_id = id, "Fire for inactive or completed reminder ignored");
        return;
    }
    if !reminder.occurs_on(fired.scheduled_for.date(), policy) {
        debug!(
            reminder_id = id,
            scheduled_for = %fired.scheduled_for,
            "Fire on a day the reminder does not occur ignored"
        );
        return;
    }
    presenter.surface(&reminder).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::NaiveDateTime;
    use std::time::Duration;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn runtime_at(now: &str) -> (ReminderRuntime, ManualClock) {
        let clock = ManualClock::new(at(now));
        let store = SqliteReminderStore::in_memory()
            .unwrap()
            .with_clock(Arc::new(clock.clone()));
        let runtime = ReminderRuntime::new(
            CareConfig::builder().in_memory().build(),
            Arc::new(store),
            Arc::new(LogNotifier),
            Arc::new(clock.clone()),
        )
        .without_poller();
        (runtime, clock)
    }

    fn fired(id: i64) -> FiredReminder {
        FiredReminder {
            reminder_id: id,
            scheduled_for: at("2024-03-04 08:00"),
            occurrence: 0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_arms_existing_reminders() {
        let (runtime, _clock) = runtime_at("2024-03-04 07:00");
        runtime
            .create_reminder(ReminderDraft::new("Pills", "08:00", "daily"))
            .await
            .unwrap();
        let paused = runtime
            .create_reminder(ReminderDraft::new("Walk", "09:00", "daily"))
            .await
            .unwrap();
        runtime
            .update_reminder(paused.id, &ReminderPatch::active(false))
            .await
            .unwrap();
        assert_eq!(runtime.scheduler().timer_count(), 0);

        runtime.start().await.unwrap();
        assert!(runtime.is_running());
        assert_eq!(runtime.scheduler().timer_count(), 1);

        runtime.shutdown().await.unwrap();
        assert!(!runtime.is_running());
        assert_eq!(runtime.scheduler().timer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fire_surfaces_alert() {
        let (runtime, clock) = runtime_at("2024-03-04 07:59");
        runtime.start().await.unwrap();
        let r = runtime
            .create_reminder(ReminderDraft::new("Take pills", "08:00", "daily"))
            .await
            .unwrap();
        assert_eq!(runtime.scheduler().next_fire(r.id), Some(at("2024-03-04 08:00")));

        clock.set(at("2024-03-04 08:00"));
        tokio::time::sleep(Duration::from_secs(61)).await;

        let alert = runtime.current_alert().unwrap();
        assert_eq!(alert.reminder_id, r.id);
        assert_eq!(runtime.scheduler().next_fire(r.id), Some(at("2024-03-05 08:00")));
        runtime.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_cancels_timer() {
        let (runtime, _clock) = runtime_at("2024-03-04 07:59");
        runtime.start().await.unwrap();
        let r = runtime
            .create_reminder(ReminderDraft::new("Take pills", "08:00", "daily"))
            .await
            .unwrap();

        runtime.delete_reminder(r.id).await.unwrap();
        runtime.delete_reminder(r.id).await.unwrap();
        assert!(!runtime.scheduler().is_scheduled(r.id));

        tokio::time::sleep(Duration::from_secs(2 * 24 * 3600)).await;
        assert!(runtime.current_alert().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_rearms_timer() {
        let (runtime, _clock) = runtime_at("2024-03-04 07:00");
        runtime.start().await.unwrap();
        let r = runtime
            .create_reminder(ReminderDraft::new("Take pills", "08:00", "daily"))
            .await
            .unwrap();

        let patch = ReminderPatch {
            time: Some("06:30".to_string()),
            ..Default::default()
        };
        runtime.update_reminder(r.id, &patch).await.unwrap();
        assert_eq!(runtime.scheduler().next_fire(r.id), Some(at("2024-03-05 06:30")));

        runtime
            .update_reminder(r.id, &ReminderPatch::active(false))
            .await
            .unwrap();
        assert!(!runtime.scheduler().is_scheduled(r.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_for_deleted_reminder_is_noop() {
        let (runtime, _clock) = runtime_at("2024-03-04 08:00");
        runtime.handle_fire(fired(404)).await;
        assert!(runtime.current_alert().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_once_not_presented_on_fire() {
        let (runtime, _clock) = runtime_at("2024-03-04 07:00");
        let once = runtime
            .create_reminder(ReminderDraft::new("Dentist", "08:00", "once").on_date("2024-03-04"))
            .await
            .unwrap();
        runtime
            .update_reminder(once.id, &ReminderPatch::completed())
            .await
            .unwrap();

        runtime.handle_fire(fired(once.id)).await;
        assert!(runtime.current_alert().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_daily_still_presented_on_fire() {
        let (runtime, _clock) = runtime_at("2024-03-04 08:00");
        let daily = runtime
            .create_reminder(ReminderDraft::new("Pills", "08:00", "daily"))
            .await
            .unwrap();
        runtime
            .update_reminder(daily.id, &ReminderPatch::completed())
            .await
            .unwrap();

        runtime.handle_fire(fired(daily.id)).await;
        assert_eq!(runtime.current_alert().map(|a| a.reminder_id), Some(daily.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_once_cancels_timer() {
        let (runtime, _clock) = runtime_at("2024-03-04 07:00");
        runtime.start().await.unwrap();
        let once = runtime
            .create_reminder(ReminderDraft::new("Dentist", "08:00", "once").on_date("2024-03-04"))
            .await
            .unwrap();
        assert!(runtime.scheduler().is_scheduled(once.id));

        let done = runtime.acknowledge(once.id).await.unwrap();
        assert!(done.is_completed);
        assert!(!runtime.scheduler().is_scheduled(once.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_once_and_dismiss() {
        let (runtime, _clock) = runtime_at("2024-03-04 08:00");
        runtime
            .create_reminder(ReminderDraft::new("Pills", "08:00", "daily"))
            .await
            .unwrap();

        assert!(runtime.poll_once().await.unwrap().is_some());
        assert!(runtime.dismiss().await.is_some());
        assert!(runtime.current_alert().is_none());
    }

    #[tokio::test]
    async fn test_runtime_with_poller_start_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let config = CareConfig::builder()
            .database_path(dir.path().join("care.db"))
            .build();
        let runtime = ReminderRuntime::from_config(config).unwrap();

        runtime.start().await.unwrap();
        runtime.start().await.unwrap();
        runtime.shutdown().await.unwrap();
    }
    #[tokio::test(start_paused = true)]
    async fn test_weekly_timer_lands_on_listed_day() {
        // Wednesday; weekly reminders default to Monday.
        let (runtime, clock) = runtime_at("2024-03-06 09:00");
        runtime.start().await.unwrap();
        let bins = runtime
            .create_reminder(ReminderDraft::new("Bins", "10:00", "weekly"))
            .await
            .unwrap();
        assert_eq!(runtime.scheduler().next_fire(bins.id), Some(at("2024-03-11 10:00")));

        let wednesday = chrono::NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        assert!(runtime.store().list_today(wednesday).await.unwrap().is_empty());

        clock.set(at("2024-03-06 10:00"));
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert!(runtime.current_alert().is_none());
        runtime.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_off_policy_day_is_dropped() {
        let (runtime, _clock) = runtime_at("2024-03-06 10:00");
        let bins = runtime
            .create_reminder(ReminderDraft::new("Bins", "10:00", "weekly"))
            .await
            .unwrap();

        runtime
            .handle_fire(FiredReminder {
                reminder_id: bins.id,
                scheduled_for: at("2024-03-06 10:00"),
                occurrence: 0,
            })
            .await;
        assert!(runtime.current_alert().is_none());

        runtime
            .handle_fire(FiredReminder {
                reminder_id: bins.id,
                scheduled_for: at("2024-03-11 10:00"),
                occurrence: 0,
            })
            .await;
        assert_eq!(runtime.current_alert().map(|a| a.reminder_id), Some(bins.id));
    }
}
