//! Presentation of due reminders.
//!
//! At most one alert is active at a time. The user resolves it by
//! acknowledging (the reminder is marked complete), snoozing (it comes back
//! after the snooze delay) or dismissing it. The displayed notification closes
//! itself after the alert timeout, but the alert stays active until resolved.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::clock::{truncate_to_minute, SharedClock};
use crate::config::CareConfig;
use crate::error::{CareError, CareResult};
use crate::events::{Alert, AlertBus, AlertEvent};
use crate::reminders::notifier::Notifier;
use crate::reminders::store::SharedReminderStore;
use crate::types::{Reminder, ReminderPatch};

/// Presenter timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenterConfig {
    /// How long a snoozed reminder stays hidden.
    pub snooze_delay: Duration,
    /// How long a displayed notification stays up untouched.
    pub alert_timeout: Duration,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            snooze_delay: Duration::from_secs(10 * 60),
            alert_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&CareConfig> for PresenterConfig {
    fn from(config: &CareConfig) -> Self {
        Self {
            snooze_delay: config.snooze_delay(),
            alert_timeout: config.alert_timeout(),
        }
    }
}

struct ActiveAlert {
    alert: Alert,
    auto_close: Option<JoinHandle<()>>,
}

struct PendingSnooze {
    generation: u64,
    handle: JoinHandle<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Presents due reminders to the user.
pub struct NotificationPresenter {
    me: Weak<NotificationPresenter>,
    store: SharedReminderStore,
    notifier: Arc<dyn Notifier>,
    clock: SharedClock,
    bus: AlertBus,
    config: PresenterConfig,
    permission: OnceCell<bool>,
    active: Mutex<Option<ActiveAlert>>,
    snoozes: Mutex<HashMap<i64, PendingSnooze>>,
    snooze_generation: AtomicU64,
    /// Minute each reminder was last presented as due.
    presented_at: Mutex<HashMap<i64, NaiveDateTime>>,
}

impl NotificationPresenter {
    pub fn new(
        store: SharedReminderStore,
        notifier: Arc<dyn Notifier>,
        clock: SharedClock,
        bus: AlertBus,
        config: PresenterConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            store,
            notifier,
            clock,
            bus,
            config,
            permission: OnceCell::new(),
            active: Mutex::new(None),
            snoozes: Mutex::new(HashMap::new()),
            snooze_generation: AtomicU64::new(0),
            presented_at: Mutex::new(HashMap::new()),
        })
    }

    pub fn bus(&self) -> &AlertBus {
        &self.bus
    }

    /// Request display permission, at most once per presenter.
    ///
    /// Returns whether alerts may be displayed. A notifier that cannot display
    /// anything counts as denied.
    pub async fn ensure_permission(&self) -> bool {
        *self
            .permission
            .get_or_init(|| async {
                match self.notifier.request_permission().await {
                    Ok(granted) => {
                        tracing::info!(granted, "Notification permission resolved");
                        granted
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Notifications unavailable");
                        false
                    }
                }
            })
            .await
    }

    /// Permission outcome, if already requested.
    pub fn permission(&self) -> Option<bool> {
        self.permission.get().copied()
    }

    /// The currently active alert.
    pub fn current(&self) -> Option<Alert> {
        lock(&self.active).as_ref().map(|a| a.alert.clone())
    }

    pub fn is_presenting(&self, reminder_id: i64) -> bool {
        lock(&self.active)
            .as_ref()
            .is_some_and(|a| a.alert.reminder_id == reminder_id)
    }

    /// Present `reminder` unless another alert is already active.
    ///
    /// A reminder is presented as due at most once per wall-clock minute, so
    /// a timer and a poll tick landing in the same minute show one alert.
    /// Returns the new alert, or None if presentation was suppressed.
    pub async fn surface(&self, reminder: &Reminder) -> Option<Alert> {
        let minute = truncate_to_minute(self.clock.now());
        if lock(&self.presented_at).get(&reminder.id) == Some(&minute) {
            tracing::debug!(reminder_id = reminder.id, "Already presented this minute");
            return None;
        }
        let alert = self.present(reminder, false).await?;
        lock(&self.presented_at).insert(reminder.id, minute);
        Some(alert)
    }

    async fn present(&self, reminder: &Reminder, snoozed: bool) -> Option<Alert> {
        let alert = {
            let mut active = lock(&self.active);
            if let Some(current) = active.as_ref() {
                tracing::debug!(
                    reminder_id = reminder.id,
                    active_reminder_id = current.alert.reminder_id,
                    "Alert already active, not presenting"
                );
                return None;
            }
            let alert = Alert::for_reminder(reminder, snoozed, self.clock.now());
            *active = Some(ActiveAlert {
                alert: alert.clone(),
                auto_close: None,
            });
            alert
        };

        tracing::info!(
            reminder_id = reminder.id,
            alert_id = %alert.id,
            snoozed,
            "Presenting reminder"
        );
        self.bus.emit(AlertEvent::Surfaced {
            alert: alert.clone(),
        });

        if self.ensure_permission().await {
            match self.notifier.show(&alert).await {
                Ok(()) => self.arm_auto_close(alert.id),
                Err(e) => {
                    tracing::warn!(alert_id = %alert.id, error = %e, "Failed to display alert")
                }
            }
        }
        Some(alert)
    }

    fn arm_auto_close(&self, alert_id: Uuid) {
        let me = self.me.clone();
        let timeout = self.config.alert_timeout;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(presenter) = me.upgrade() {
                presenter.auto_close(alert_id).await;
            }
        });

        let mut active = lock(&self.active);
        match active.as_mut() {
            Some(current) if current.alert.id == alert_id => current.auto_close = Some(handle),
            _ => handle.abort(),
        }
    }

    async fn auto_close(&self, alert_id: Uuid) {
        let reminder_id = {
            let mut active = lock(&self.active);
            match active.as_mut() {
                Some(current) if current.alert.id == alert_id => {
                    current.auto_close = None;
                    current.alert.reminder_id
                }
                _ => return,
            }
        };
        self.close_display(alert_id).await;
        self.bus.emit(AlertEvent::Closed {
            alert_id,
            reminder_id,
        });
    }

    async fn close_display(&self, alert_id: Uuid) {
        if let Err(e) = self.notifier.close(alert_id).await {
            tracing::warn!(%alert_id, error = %e, "Failed to close alert");
        }
    }

    /// Clear the active alert if it belongs to `reminder_id` (any if None).
    fn take_active(&self, reminder_id: Option<i64>) -> Option<Alert> {
        let taken = {
            let mut active = lock(&self.active);
            let matches = active
                .as_ref()
                .is_some_and(|current| {
                    reminder_id.map_or(true, |id| current.alert.reminder_id == id)
                });
            if matches {
                active.take()
            } else {
                None
            }
        }?;
        if let Some(handle) = taken.auto_close {
            handle.abort();
        }
        Some(taken.alert)
    }

    async fn resolve(&self, reminder_id: Option<i64>) -> Option<Alert> {
        let alert = self.take_active(reminder_id)?;
        self.close_display(alert.id).await;
        Some(alert)
    }

    /// Mark the reminder complete and clear its alert.
    pub async fn acknowledge(&self, reminder_id: i64) -> CareResult<Reminder> {
        let updated = self
            .store
            .update(reminder_id, &ReminderPatch::completed())
            .await?;
        self.cancel_snooze(reminder_id);
        self.resolve(Some(reminder_id)).await;

        tracing::info!(reminder_id, "Reminder acknowledged");
        self.bus.emit(AlertEvent::Acknowledged { reminder_id });
        Ok(updated)
    }

    /// Hide the reminder and bring it back after the snooze delay.
    ///
    /// Nothing is persisted. When the delay elapses the reminder is fetched
    /// again and only presented if it still exists, is active and is not
    /// completed.
    pub async fn snooze(&self, reminder_id: i64) -> CareResult<NaiveDateTime> {
        if self.store.get(reminder_id).await?.is_none() {
            return Err(CareError::not_found("reminder", reminder_id));
        }
        self.resolve(Some(reminder_id)).await;
        self.arm_snooze(reminder_id);

        let until = self.clock.now()
            + chrono::Duration::from_std(self.config.snooze_delay)
                .unwrap_or_else(|_| chrono::Duration::minutes(10));
        tracing::info!(reminder_id, %until, "Reminder snoozed");
        self.bus.emit(AlertEvent::Snoozed { reminder_id, until });
        Ok(until)
    }

    fn arm_snooze(&self, reminder_id: i64) {
        let generation = self.snooze_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let me = self.me.clone();
        let delay = self.config.snooze_delay;

        let mut snoozes = lock(&self.snoozes);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(presenter) = me.upgrade() {
                presenter.snooze_elapsed(reminder_id, generation).await;
            }
        });
        if let Some(previous) = snoozes.insert(reminder_id, PendingSnooze { generation, handle }) {
            previous.handle.abort();
        }
    }

    async fn snooze_elapsed(&self, reminder_id: i64, generation: u64) {
        {
            let mut snoozes = lock(&self.snoozes);
            if snoozes.get(&reminder_id).map(|s| s.generation) != Some(generation) {
                return;
            }
            snoozes.remove(&reminder_id);
        }

        let reminder = match self.store.get(reminder_id).await {
            Ok(Some(r)) if r.is_active && !r.is_completed => r,
            Ok(_) => {
                tracing::debug!(reminder_id, "Snoozed reminder gone or resolved, dropping");
                return;
            }
            Err(e) => {
                tracing::error!(reminder_id, error = %e, "Failed to reload snoozed reminder");
                return;
            }
        };

        if self.present(&reminder, true).await.is_none() {
            tracing::debug!(reminder_id, "Another alert active, snoozing again");
            self.arm_snooze(reminder_id);
        }
    }

    /// Cancel a pending snooze. Returns whether one was pending.
    pub fn cancel_snooze(&self, reminder_id: i64) -> bool {
        match lock(&self.snoozes).remove(&reminder_id) {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_snoozed(&self, reminder_id: i64) -> bool {
        lock(&self.snoozes).contains_key(&reminder_id)
    }

    /// Clear the active alert with no store change.
    pub async fn dismiss(&self) -> Option<Alert> {
        let alert = self.resolve(None).await?;
        tracing::info!(reminder_id = alert.reminder_id, "Alert dismissed");
        self.bus.emit(AlertEvent::Dismissed {
            reminder_id: alert.reminder_id,
        });
        Some(alert)
    }

    /// Drop any alert or snooze belonging to a removed reminder.
    pub async fn forget(&self, reminder_id: i64) {
        self.cancel_snooze(reminder_id);
        lock(&self.presented_at).remove(&reminder_id);
        if self.resolve(Some(reminder_id)).await.is_some() {
            tracing::debug!(reminder_id, "Cleared alert for removed reminder");
        }
    }

    /// Abort all pending snoozes and auto-close timers.
    pub fn shutdown(&self) {
        for (_, pending) in lock(&self.snoozes).drain() {
            pending.handle.abort();
        }
        if let Some(active) = lock(&self.active).as_mut() {
            if let Some(handle) = active.auto_close.take() {
                handle.abort();
            }
        }
    }
}
