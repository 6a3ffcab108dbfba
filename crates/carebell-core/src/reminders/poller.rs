//! Periodic due-reminder check.
//!
//! Uses tokio-cron-scheduler to evaluate today's reminders at a fixed
//! interval and hand the first due one to the presenter. A reminder whose
//! timer never ran is still caught on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info};

use crate::clock::SharedClock;
use crate::error::CareResult;
use crate::events::Alert;
use crate::reminders::evaluator::DueEvaluator;
use crate::reminders::presenter::NotificationPresenter;
use crate::reminders::store::SharedReminderStore;

/// Configuration for the due poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Interval between checks (default: 60s)
    pub interval: Duration,
    /// Whether to run a check immediately on start (default: false)
    pub run_on_start: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            run_on_start: false,
        }
    }
}

impl PollerConfig {
    /// Create config with a custom interval (minimum one second).
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_secs(1)),
            ..Default::default()
        }
    }

    /// Enable running a check immediately on start.
    pub fn with_run_on_start(mut self) -> Self {
        self.run_on_start = true;
        self
    }
}

/// One evaluation of today's reminders.
pub struct DueCheck {
    store: SharedReminderStore,
    evaluator: DueEvaluator,
    presenter: Arc<NotificationPresenter>,
    clock: SharedClock,
}

impl DueCheck {
    pub fn new(
        store: SharedReminderStore,
        evaluator: DueEvaluator,
        presenter: Arc<NotificationPresenter>,
        clock: SharedClock,
    ) -> Self {
        Self {
            store,
            evaluator,
            presenter,
            clock,
        }
    }

    /// Surface the first due reminder, if any and if nothing is presented.
    ///
    /// Snoozed reminders are left to their snooze timer.
    pub async fn run(&self) -> CareResult<Option<Alert>> {
        if self.presenter.current().is_some() {
            debug!("Alert active, skipping due check");
            return Ok(None);
        }

        let now = self.clock.now();
        let today = self.store.list_today(now.date()).await?;
        let due = self
            .evaluator
            .due(&today, now)
            .find(|r| !self.presenter.is_snoozed(r.id));

        match due {
            Some(reminder) => Ok(self.presenter.surface(reminder).await),
            None => Ok(None),
        }
    }
}

/// Runs [`DueCheck`] on a fixed interval.
pub struct DuePoller {
    scheduler: JobScheduler,
    check: Arc<DueCheck>,
    config: PollerConfig,
}

impl DuePoller {
    /// Create a new poller. Call `start()` to begin checking.
    pub async fn new(check: Arc<DueCheck>, config: PollerConfig) -> CareResult<Self> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler,
            check,
            config,
        })
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Start periodic checks.
    pub async fn start(&self) -> CareResult<()> {
        let check = self.check.clone();
        let job = Job::new_repeated_async(self.config.interval, move |_uuid, _lock| {
            let check = check.clone();
            Box::pin(async move {
                if let Err(e) = check.run().await {
                    error!(error = %e, "Due check failed");
                }
            })
        })?;
        self.scheduler.add(job).await?;

        if self.config.run_on_start {
            debug!("Running initial due check on start");
            if let Err(e) = self.check.run().await {
                error!(error = %e, "Initial due check failed");
            }
        }

        self.scheduler.start().await?;
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Due poller started"
        );
        Ok(())
    }

    /// Stop the poller.
    pub async fn shutdown(&mut self) -> CareResult<()> {
        info!("Shutting down due poller");
        self.scheduler.shutdown().await?;
        Ok(())
    }

    /// Run a check outside the schedule.
    pub async fn run_now(&self) -> CareResult<Option<Alert>> {
        self.check.run().await
    }
}
