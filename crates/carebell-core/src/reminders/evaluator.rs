//! Due-reminder evaluation.

use chrono::{NaiveDateTime, Timelike};

use crate::types::{Reminder, WeeklyPolicy};

/// Decides which reminders are due at a wall-clock instant.
#[derive(Debug, Clone, Copy, Default)]
pub struct DueEvaluator {
    weekly_policy: WeeklyPolicy,
}

impl DueEvaluator {
    pub fn new(weekly_policy: WeeklyPolicy) -> Self {
        Self { weekly_policy }
    }

    pub fn weekly_policy(&self) -> WeeklyPolicy {
        self.weekly_policy
    }

    /// Whether `reminder` is due during the minute containing `now`.
    pub fn is_due(&self, reminder: &Reminder, now: NaiveDateTime) -> bool {
        reminder.is_active
            && !reminder.is_completed
            && reminder.time.hour() == now.hour()
            && reminder.time.minute() == now.minute()
            && reminder.occurs_on(now.date(), self.weekly_policy)
    }

    /// All reminders due at `now`, in input order.
    pub fn due<'a>(
        &self,
        reminders: &'a [Reminder],
        now: NaiveDateTime,
    ) -> impl Iterator<Item = &'a Reminder> + 'a {
        let evaluator = *self;
        reminders.iter().filter(move |r| evaluator.is_due(r, now))
    }

    /// The first due reminder, if any.
    pub fn first_due<'a>(
        &self,
        reminders: &'a [Reminder],
        now: NaiveDateTime,
    ) -> Option<&'a Reminder> {
        self.due(reminders, now).next()
    }
}
