//! Reminder scheduling and due-notification logic.
//!
//! - `store`: persistence and the "today" query
//! - `evaluator`: whether a reminder is due at an instant
//! - `scheduler`: per-reminder timers
//! - `presenter`: the active alert, acknowledge / snooze / dismiss
//! - `poller`: periodic due check

mod evaluator;
mod notifier;
mod poller;
mod presenter;
mod scheduler;
mod store;

pub use evaluator::DueEvaluator;
pub use notifier::{LogNotifier, Notifier, UnsupportedNotifier};
pub use poller::{DueCheck, DuePoller, PollerConfig};
pub use presenter::{NotificationPresenter, PresenterConfig};
pub use scheduler::{FireCallback, FiredReminder, NotificationScheduler};
pub use store::{ReminderStore, SharedReminderStore, SqliteReminderStore};
