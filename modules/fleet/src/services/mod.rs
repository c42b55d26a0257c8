pub mod charge_deltas;
pub mod efficiency;
pub mod fleet_service;
pub mod ledger;
pub mod maintenance_service;
pub mod movement_service;
pub mod report_service;
pub mod station_service;
pub mod threshold;

use std::sync::Arc;

use crate::config::Config;
use crate::metrics::Metrics;
use crate::notify::Notifier;
use crate::services::ledger::BalanceChange;
use crate::services::threshold::ThresholdPolicy;
use crate::store::FleetStore;

/// Business rules injected from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    pub threshold: ThresholdPolicy,
    pub require_price_above_liters: bool,
    pub maintenance_km_tolerance: i64,
}

impl LedgerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            threshold: ThresholdPolicy {
                low_credit_threshold_minor: config.credit_threshold_minor,
            },
            require_price_above_liters: config.require_price_above_liters,
            maintenance_km_tolerance: config.maintenance_km_tolerance,
        }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            threshold: ThresholdPolicy {
                low_credit_threshold_minor: 500_000,
            },
            require_price_above_liters: true,
            maintenance_km_tolerance: 500,
        }
    }
}

/// Everything a service call needs, shared by handlers and background tasks
#[derive(Clone)]
pub struct FleetContext {
    pub store: Arc<dyn FleetStore>,
    pub notifier: Arc<Notifier>,
    pub settings: LedgerSettings,
    pub metrics: Arc<Metrics>,
}

impl FleetContext {
    /// Post-commit handling of ledger changes: metrics, then threshold events
    pub(crate) fn publish_balance_changes(&self, changes: &[BalanceChange]) {
        for change in changes {
            self.metrics
                .ledger_adjustments_total
                .with_label_values(&[change.reason.as_str()])
                .inc();
            self.notifier.balance_changed(change);
        }
    }
}
