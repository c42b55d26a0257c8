use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::services::maintenance_service;
use crate::services::FleetContext;

/// Background task scanning maintenance due dates every `period`
///
/// Ticks missed while a scan is still running are skipped, so scans never
/// overlap and never burst to catch up.
pub fn start_maintenance_alert_scheduler(ctx: FleetContext, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(period_secs = period.as_secs(), "Starting maintenance alert scheduler");

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let today = Utc::now().date_naive();
            match maintenance_service::notify_due_date_alerts(&ctx, today).await {
                Ok(sent) if sent > 0 => {
                    tracing::info!(sent, %today, "Maintenance date alerts sent");
                }
                Ok(_) => {
                    tracing::debug!(%today, "No maintenance due");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Maintenance due-date scan failed");
                }
            }
        }
    })
}
