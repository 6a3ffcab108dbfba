//! Timer-based notification scheduling.
//!
//! Every scheduled reminder owns exactly one tokio task that sleeps until the
//! next occurrence, invokes the fire callback and, for repeating reminders,
//! re-arms itself on a fixed cadence. The task handle is the cancellation
//! handle: cancelling aborts the task at its next await, so a callback that
//! is already running on another worker still completes. Fires are re-checked
//! against the store before anything is presented.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::clock::SharedClock;
use crate::error::{CareError, CareResult};
use crate::types::{Frequency, Reminder, WeeklyPolicy};

/// One timer expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiredReminder {
    pub reminder_id: i64,
    /// Wall-clock occurrence this expiry stands for.
    pub scheduled_for: NaiveDateTime,
    /// Zero-based occurrence counter for this arming.
    pub occurrence: u32,
}

/// Callback invoked from the timer task on every expiry.
pub type FireCallback = Arc<dyn Fn(FiredReminder) + Send + Sync>;

struct ArmedTimer {
    handle: JoinHandle<()>,
    generation: u64,
    first_fire: NaiveDateTime,
    period: Option<chrono::Duration>,
    fired: Arc<AtomicU32>,
}

impl ArmedTimer {
    fn next_fire(&self) -> NaiveDateTime {
        let fired = self.fired.load(Ordering::SeqCst);
        match self.period {
            Some(period) => self.first_fire + period * fired as i32,
            None => self.first_fire,
        }
    }
}

type TimerMap = Arc<Mutex<HashMap<i64, ArmedTimer>>>;

fn lock_timers(timers: &TimerMap) -> MutexGuard<'_, HashMap<i64, ArmedTimer>> {
    timers.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owns the per-reminder timers.
pub struct NotificationScheduler {
    clock: SharedClock,
    timers: TimerMap,
    generation: AtomicU64,
    weekly_policy: WeeklyPolicy,
}

impl NotificationScheduler {
    /// Create a scheduler that reads wall-clock time from `clock`.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            timers: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            weekly_policy: WeeklyPolicy::default(),
        }
    }

    /// Set the weekday selection for weekly reminders.
    pub fn with_weekly_policy(mut self, policy: WeeklyPolicy) -> Self {
        self.weekly_policy = policy;
        self
    }

    /// Arm a timer for `id` at today's `time`.
    ///
    /// Any existing timer for `id` is cancelled first. A repeating reminder
    /// whose time has already passed today starts one period later; a `once`
    /// reminder in the past arms nothing. Returns the first fire time, if armed.
    pub fn schedule<F>(
        &self,
        id: i64,
        time: NaiveTime,
        frequency: Frequency,
        callback: F,
    ) -> CareResult<Option<NaiveDateTime>>
    where
        F: Fn(FiredReminder) + Send + Sync + 'static,
    {
        let today = self.clock.today();
        self.arm(id, today, time, frequency, Arc::new(callback))
    }

    /// Arm a timer for a stored reminder.
    ///
    /// `once` reminders use their own date. Weekly reminders start on the
    /// next day matching the weekly policy.
    pub fn schedule_reminder(
        &self,
        reminder: &Reminder,
        callback: FireCallback,
    ) -> CareResult<Option<NaiveDateTime>> {
        let today = self.clock.today();
        let day = match reminder.frequency {
            Frequency::Once => reminder
                .date
                .ok_or_else(|| CareError::missing_field("date"))?,
            Frequency::Daily => today,
            Frequency::Weekly => {
                let weekday = self.weekly_policy.weekday_for(reminder.created_at);
                let ahead = (7 + weekday.num_days_from_monday()
                    - today.weekday().num_days_from_monday())
                    % 7;
                today + chrono::Duration::days(i64::from(ahead))
            }
        };
        self.arm(reminder.id, day, reminder.time, reminder.frequency, callback)
    }

    fn arm(
        &self,
        id: i64,
        day: NaiveDate,
        time: NaiveTime,
        frequency: Frequency,
        callback: FireCallback,
    ) -> CareResult<Option<NaiveDateTime>> {
        // Held until the new timer is inserted. A finished task removes its
        // own entry under this same lock.
        let mut timers = lock_timers(&self.timers);
        if let Some(previous) = timers.remove(&id) {
            previous.handle.abort();
            tracing::debug!(reminder_id = id, "Replaced reminder timer");
        }

        let now = self.clock.now();
        let period = frequency.period();
        let mut first_fire = day.and_time(time);
        if first_fire <= now {
            let Some(step) = period else {
                tracing::debug!(
                    reminder_id = id,
                    target = %first_fire,
                    "One-time reminder already passed, not arming"
                );
                return Ok(None);
            };
            first_fire += step;
        }

        let delay = (first_fire - now)
            .to_std()
            .map_err(|e| CareError::scheduler(format!("Invalid delay: {}", e)))?;
        let cadence = period
            .map(|p| p.to_std())
            .transpose()
            .map_err(|e| CareError::scheduler(format!("Invalid period: {}", e)))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CareError::scheduler(format!("No async runtime: {}", e)))?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let fired = Arc::new(AtomicU32::new(0));

        let handle = {
            let timers = Arc::clone(&self.timers);
            let fired = Arc::clone(&fired);
            runtime.spawn(async move {
                let mut deadline = Instant::now() + delay;
                loop {
                    tokio::time::sleep_until(deadline).await;
                    let occurrence = fired.fetch_add(1, Ordering::SeqCst);
                    let scheduled_for = match period {
                        Some(p) => first_fire + p * occurrence as i32,
                        None => first_fire,
                    };
                    tracing::debug!(
                        reminder_id = id,
                        %scheduled_for,
                        occurrence,
                        "Reminder timer fired"
                    );
                    callback(FiredReminder {
                        reminder_id: id,
                        scheduled_for,
                        occurrence,
                    });
                    match cadence {
                        Some(step) => deadline += step,
                        None => break,
                    }
                }

                let mut timers = lock_timers(&timers);
                if timers.get(&id).map(|t| t.generation) == Some(generation) {
                    timers.remove(&id);
                }
            })
        };
        let replaced = timers.insert(
            id,
            ArmedTimer {
                handle,
                generation,
                first_fire,
                period,
                fired,
            },
        );
        if let Some(stale) = replaced {
            stale.handle.abort();
        }

        tracing::info!(
            reminder_id = id,
            %frequency,
            next_fire = %first_fire,
            "Armed reminder timer"
        );
        Ok(Some(first_fire))
    }

    /// Disarm the timer for `id`. Returns whether one was armed.
    pub fn cancel(&self, id: i64) -> bool {
        match lock_timers(&self.timers).remove(&id) {
            Some(timer) => {
                timer.handle.abort();
                tracing::debug!(reminder_id = id, "Cancelled reminder timer");
                true
            }
            None => false,
        }
    }

    /// Disarm every timer.
    pub fn cancel_all(&self) {
        let drained: Vec<_> = lock_timers(&self.timers).drain().collect();
        for (_, timer) in &drained {
            timer.handle.abort();
        }
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "Cancelled all reminder timers");
        }
    }

    /// Next wall-clock fire time for `id`.
    pub fn next_fire(&self, id: i64) -> Option<NaiveDateTime> {
        lock_timers(&self.timers).get(&id).map(ArmedTimer::next_fire)
    }

    pub fn is_scheduled(&self, id: i64) -> bool {
        lock_timers(&self.timers).contains_key(&id)
    }

    /// Number of armed timers.
    pub fn timer_count(&self) -> usize {
        lock_timers(&self.timers).len()
    }
}

impl Drop for NotificationScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
