//! Alert display collaborators.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{CareError, CareResult, ErrorCode};
use crate::events::Alert;

/// Something that can put an alert in front of the user.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask the user for permission to display alerts.
    ///
    /// `Ok(false)` means the user declined; an error means alerts cannot be
    /// displayed at all.
    async fn request_permission(&self) -> CareResult<bool>;

    /// Display an alert.
    async fn show(&self, alert: &Alert) -> CareResult<()>;

    /// Remove a displayed alert. Closing an unknown alert is not an error.
    async fn close(&self, alert_id: Uuid) -> CareResult<()>;
}

/// Notifier that writes alerts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn request_permission(&self) -> CareResult<bool> {
        Ok(true)
    }

    async fn show(&self, alert: &Alert) -> CareResult<()> {
        tracing::info!(
            alert_id = %alert.id,
            reminder_id = alert.reminder_id,
            title = %alert.title,
            body = %alert.body,
            "Alert"
        );
        Ok(())
    }

    async fn close(&self, alert_id: Uuid) -> CareResult<()> {
        tracing::debug!(%alert_id, "Alert closed");
        Ok(())
    }
}

/// Notifier for hosts without any alert display.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedNotifier;

#[async_trait]
impl Notifier for UnsupportedNotifier {
    async fn request_permission(&self) -> CareResult<bool> {
        Err(CareError::notification(
            "This host does not support notifications",
            ErrorCode::NtfUnsupported,
        ))
    }

    async fn show(&self, _alert: &Alert) -> CareResult<()> {
        Err(CareError::notification(
            "This host does not support notifications",
            ErrorCode::NtfUnsupported,
        ))
    }

    async fn close(&self, _alert_id: Uuid) -> CareResult<()> {
        Ok(())
    }
}
