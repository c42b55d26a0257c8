//! Outbound notifications
//!
//! Three channels: refuel/maintenance "created" events, station credit events
//! and maintenance due alerts. Dispatch is fire-and-forget and always happens
//! after the triggering transaction committed.

pub mod messages;
mod telegram;

pub use telegram::TelegramSink;

use std::sync::{Arc, Mutex};

use crate::config::{Config, TelegramChannel};
use crate::models::{Maintenance, Movement, Station, Supplier, Vehicle};
use crate::services::ledger::BalanceChange;
use crate::services::threshold::{CreditEvent, ThresholdPolicy};

/// Destination for rendered messages; never reports failure to the caller
pub trait NotificationSink: Send + Sync {
    fn send(&self, message: String);
}

/// Sink for an unconfigured channel
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn send(&self, _message: String) {}
}

/// Keeps every message in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.messages().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationSink for RecordingSink {
    fn send(&self, message: String) {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message);
    }
}

#[derive(Clone)]
pub struct Notifier {
    refuels: Arc<dyn NotificationSink>,
    credit: Arc<dyn NotificationSink>,
    maintenance: Arc<dyn NotificationSink>,
    policy: ThresholdPolicy,
}

impl Notifier {
    pub fn new(
        refuels: Arc<dyn NotificationSink>,
        credit: Arc<dyn NotificationSink>,
        maintenance: Arc<dyn NotificationSink>,
        policy: ThresholdPolicy,
    ) -> Self {
        Self {
            refuels,
            credit,
            maintenance,
            policy,
        }
    }

    pub fn silent(policy: ThresholdPolicy) -> Self {
        Self::new(Arc::new(NoopSink), Arc::new(NoopSink), Arc::new(NoopSink), policy)
    }

    pub fn from_config(config: &Config) -> Self {
        let sink = |name: &str, channel: &Option<TelegramChannel>| -> Arc<dyn NotificationSink> {
            let Some(channel) = channel else {
                tracing::info!(channel = name, "Telegram channel not configured");
                return Arc::new(NoopSink);
            };
            match TelegramSink::new(&config.telegram_api_base, channel) {
                Ok(sink) => Arc::new(sink),
                Err(e) => {
                    tracing::warn!(channel = name, error = %e, "Telegram client unavailable");
                    Arc::new(NoopSink)
                }
            }
        };

        Self::new(
            sink("refuels", &config.refuel_channel),
            sink("credit", &config.credit_channel),
            sink("maintenance", &config.maintenance_channel),
            ThresholdPolicy {
                low_credit_threshold_minor: config.credit_threshold_minor,
            },
        )
    }

    pub fn policy(&self) -> ThresholdPolicy {
        self.policy
    }

    /// Evaluate the threshold policy for a committed change and send its events
    pub fn balance_changed(&self, change: &BalanceChange) -> Vec<CreditEvent> {
        let Some(new_balance) = change.new_balance else {
            return Vec::new();
        };

        let events = self.policy.evaluate(change.old_balance, new_balance);
        for event in &events {
            let message = match *event {
                CreditEvent::CreditAdded { balance_minor } => messages::credit_added(
                    &change.station_name,
                    balance_minor,
                    self.policy.low_credit_threshold_minor,
                ),
                CreditEvent::LowCredit {
                    balance_minor,
                    threshold_minor,
                } => messages::credit_low(&change.station_name, balance_minor, threshold_minor),
            };
            tracing::info!(station_id = change.station_id, event = ?event, "Credit event");
            self.credit.send(message);
        }
        events
    }

    pub fn refuel_recorded(&self, movement: &Movement, vehicle: &Vehicle, station: Option<&Station>) {
        self.refuels
            .send(messages::refuel_created(movement, vehicle, station));
    }

    pub fn maintenance_recorded(&self, maintenance: &Maintenance, vehicle: &Vehicle, supplier: &Supplier) {
        self.refuels
            .send(messages::maintenance_created(maintenance, vehicle, supplier));
    }

    pub fn maintenance_km_due(&self, maintenance: &Maintenance, vehicle: &Vehicle, tolerance_km: i64) {
        self.maintenance.send(messages::maintenance_km_due(
            vehicle,
            vehicle.current_km,
            maintenance.km_after,
            tolerance_km,
        ));
    }

    pub fn maintenance_date_due(&self, maintenance: &Maintenance, vehicle: &Vehicle) {
        self.maintenance.send(messages::maintenance_date_due(
            vehicle,
            maintenance.next_maintenance_date,
            vehicle.current_km,
            maintenance.km_after,
        ));
    }
}
