//! Configuration system for carebell.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CareError, CareResult};
use crate::types::{WeeklyPolicy, DEFAULT_CAREGIVER_CODE};

/// Longest accepted snooze, one day.
pub const MAX_SNOOZE_MINUTES: u64 = 24 * 60;

/// Main service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CareConfig {
    /// Path to the SQLite database (`:memory:` for a throwaway store).
    pub database_path: PathBuf,
    /// Seconds between due-reminder checks.
    pub poll_interval_secs: u64,
    /// Run a due check as soon as the poller starts.
    pub poll_on_start: bool,
    /// Minutes a snoozed alert stays hidden.
    pub snooze_minutes: u64,
    /// Seconds before an untouched alert closes itself.
    pub alert_timeout_secs: u64,
    /// Weekday rule for weekly reminders.
    pub weekly_policy: WeeklyPolicy,
    /// Caregiver code used when no profile sets one.
    pub caregiver_code: String,
    /// Insert the default emergency contacts into an empty store.
    pub seed_default_contacts: bool,
}

impl Default for CareConfig {
    fn default() -> Self {
        let carebell_dir = dirs::home_dir()
            .map(|h| h.join(".carebell"))
            .unwrap_or_else(|| PathBuf::from(".carebell"));

        Self {
            database_path: carebell_dir.join("carebell.db"),
            poll_interval_secs: 60,
            poll_on_start: false,
            snooze_minutes: 10,
            alert_timeout_secs: 30,
            weekly_policy: WeeklyPolicy::default(),
            caregiver_code: DEFAULT_CAREGIVER_CODE.to_string(),
            seed_default_contacts: true,
        }
    }
}

impl CareConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> CareResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| CareError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| CareError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| CareError::Configuration(e.to_string()))?,
            _ => {
                return Err(CareError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `CAREBELL_*` environment variables.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("CAREBELL_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(secs) = env_parse("CAREBELL_POLL_INTERVAL_SECS") {
            config.poll_interval_secs = secs;
        }
        if let Some(flag) = env_parse("CAREBELL_POLL_ON_START") {
            config.poll_on_start = flag;
        }
        if let Some(minutes) = env_parse("CAREBELL_SNOOZE_MINUTES") {
            config.snooze_minutes = minutes;
        }
        if let Some(secs) = env_parse("CAREBELL_ALERT_TIMEOUT_SECS") {
            config.alert_timeout_secs = secs;
        }
        if let Ok(policy) = std::env::var("CAREBELL_WEEKLY_POLICY") {
            match parse_weekly_policy(&policy) {
                Some(p) => config.weekly_policy = p,
                None => tracing::warn!(value = %policy, "Ignoring invalid CAREBELL_WEEKLY_POLICY"),
            }
        }
        if let Ok(code) = std::env::var("CAREBELL_CAREGIVER_CODE") {
            config.caregiver_code = code;
        }
        if let Some(flag) = env_parse("CAREBELL_SEED_CONTACTS") {
            config.seed_default_contacts = flag;
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> CareConfigBuilder {
        CareConfigBuilder::default()
    }

    /// Check value ranges.
    pub fn validate(&self) -> CareResult<()> {
        if self.poll_interval_secs == 0 {
            return Err(CareError::Configuration(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.snooze_minutes == 0 || self.snooze_minutes > MAX_SNOOZE_MINUTES {
            return Err(CareError::Configuration(format!(
                "snooze_minutes must be between 1 and {}",
                MAX_SNOOZE_MINUTES
            )));
        }
        if self.caregiver_code.trim().is_empty() {
            return Err(CareError::Configuration(
                "caregiver_code must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn snooze_delay(&self) -> Duration {
        Duration::from_secs(self.snooze_minutes.saturating_mul(60))
    }

    pub fn alert_timeout(&self) -> Duration {
        Duration::from_secs(self.alert_timeout_secs)
    }

    /// Whether the database lives only in memory.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == ":memory:"
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment variable");
            None
        }
    }
}

/// Parse `creation_day` or a weekday name (`monday`, `fri`, ...).
pub fn parse_weekly_policy(raw: &str) -> Option<WeeklyPolicy> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("creation_day") || raw.eq_ignore_ascii_case("creation-day") {
        return Some(WeeklyPolicy::CreationDay);
    }
    raw.parse::<chrono::Weekday>()
        .ok()
        .map(|weekday| WeeklyPolicy::Fixed { weekday })
}

/// Builder for CareConfig.
#[derive(Default)]
pub struct CareConfigBuilder {
    config: CareConfig,
}

impl CareConfigBuilder {
    /// Set the database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    /// Use an in-memory database.
    pub fn in_memory(mut self) -> Self {
        self.config.database_path = PathBuf::from(":memory:");
        self
    }

    /// Set the due-check interval.
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval_secs = secs;
        self
    }

    /// Run a due check when the poller starts.
    pub fn poll_on_start(mut self, enabled: bool) -> Self {
        self.config.poll_on_start = enabled;
        self
    }

    /// Set the snooze delay.
    pub fn snooze_minutes(mut self, minutes: u64) -> Self {
        self.config.snooze_minutes = minutes;
        self
    }

    /// Set the alert auto-close timeout.
    pub fn alert_timeout_secs(mut self, secs: u64) -> Self {
        self.config.alert_timeout_secs = secs;
        self
    }

    /// Set the weekly reminder policy.
    pub fn weekly_policy(mut self, policy: WeeklyPolicy) -> Self {
        self.config.weekly_policy = policy;
        self
    }

    /// Set the fallback caregiver code.
    pub fn caregiver_code(mut self, code: impl Into<String>) -> Self {
        self.config.caregiver_code = code.into();
        self
    }

    /// Enable or disable default contact seeding.
    pub fn seed_default_contacts(mut self, enabled: bool) -> Self {
        self.config.seed_default_contacts = enabled;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> CareConfig {
        self.config
    }
}
