//! Server state management.

use std::sync::Arc;

use carebell_core::clock::{SharedClock, SystemClock};
use carebell_core::error::CareResult;
use carebell_core::{
    CareConfig, ChatCompanion, LogNotifier, ReminderRuntime, SqliteCareStore,
    SqliteReminderStore, UnsupportedVoiceInput, VoiceInput,
};
use tracing::info;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub runtime: Arc<ReminderRuntime>,
    pub records: Arc<SqliteCareStore>,
    pub companion: ChatCompanion,
    pub voice: Arc<dyn VoiceInput>,
    pub clock: SharedClock,
    pub config: CareConfig,
}

impl AppState {
    /// Create state from already built collaborators.
    pub fn new(
        runtime: Arc<ReminderRuntime>,
        records: Arc<SqliteCareStore>,
        voice: Arc<dyn VoiceInput>,
        clock: SharedClock,
    ) -> Self {
        let config = runtime.config().clone();
        Self {
            inner: Arc::new(AppStateInner {
                runtime,
                records,
                companion: ChatCompanion::new(),
                voice,
                clock,
                config,
            }),
        }
    }

    /// Open both stores at the configured database path.
    ///
    /// The runtime is created but not started.
    pub fn from_config(config: CareConfig) -> CareResult<Self> {
        config.validate()?;
        let clock: SharedClock = Arc::new(SystemClock);

        let reminders = SqliteReminderStore::new(&config.database_path)?
            .with_clock(clock.clone())
            .with_weekly_policy(config.weekly_policy);
        let records = SqliteCareStore::new(&config.database_path)?.with_clock(clock.clone());
        if config.seed_default_contacts {
            records.seed_default_contacts()?;
        }

        info!(database = %config.database_path.display(), "Opened carebell stores");

        let runtime = ReminderRuntime::new(
            config,
            Arc::new(reminders),
            Arc::new(LogNotifier),
            clock.clone(),
        );
        Ok(Self::new(
            Arc::new(runtime),
            Arc::new(records),
            Arc::new(UnsupportedVoiceInput),
            clock,
        ))
    }

    pub fn runtime(&self) -> &ReminderRuntime {
        &self.inner.runtime
    }

    pub fn records(&self) -> &SqliteCareStore {
        &self.inner.records
    }

    pub fn companion(&self) -> &ChatCompanion {
        &self.inner.companion
    }

    pub fn voice(&self) -> &dyn VoiceInput {
        self.inner.voice.as_ref()
    }

    pub fn clock(&self) -> &SharedClock {
        &self.inner.clock
    }

    pub fn config(&self) -> &CareConfig {
        &self.inner.config
    }

    /// The caregiver code currently in force.
    pub fn caregiver_code(&self) -> CareResult<String> {
        self.records().caregiver_code(&self.config().caregiver_code)
    }
}
