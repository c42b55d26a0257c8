use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metric registration failed: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("metrics output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    pub movement_operations_total: IntCounterVec,
    pub credit_rejections_total: IntCounter,
    pub ledger_adjustments_total: IntCounterVec,
    pub due_alerts_sent_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let movement_operations_total = IntCounterVec::new(
            Opts::new("fleet_movement_operations_total", "Movement lifecycle operations"),
            &["operation", "result"], // create|update|delete|bulk_delete, ok|rejected|not_found|error
        )?;

        let credit_rejections_total = IntCounter::new(
            "fleet_credit_rejections_total",
            "Refuels rejected for insufficient station credit",
        )?;

        let ledger_adjustments_total = IntCounterVec::new(
            Opts::new("fleet_ledger_adjustments_total", "Committed station balance adjustments"),
            &["reason"],
        )?;

        let due_alerts_sent_total = IntCounterVec::new(
            Opts::new("fleet_due_alerts_sent_total", "Maintenance due alerts sent"),
            &["kind"], // date|km
        )?;

        registry.register(Box::new(movement_operations_total.clone()))?;
        registry.register(Box::new(credit_rejections_total.clone()))?;
        registry.register(Box::new(ledger_adjustments_total.clone()))?;
        registry.register(Box::new(due_alerts_sent_total.clone()))?;

        Ok(Self {
            registry,
            movement_operations_total,
            credit_rejections_total,
            ledger_adjustments_total,
            due_alerts_sent_total,
        })
    }

    pub fn record_movement(&self, operation: &str, result: &str) {
        self.movement_operations_total
            .with_label_values(&[operation, result])
            .inc();
    }

    pub fn render(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&mf, &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_counters() {
        let metrics = Metrics::new().unwrap();
        metrics.record_movement("create", "ok");
        metrics.credit_rejections_total.inc();
        metrics
            .ledger_adjustments_total
            .with_label_values(&["movement_charge"])
            .inc();

        let text = metrics.render().unwrap();
        assert!(text.contains("fleet_movement_operations_total{operation=\"create\",result=\"ok\"} 1"));
        assert!(text.contains("fleet_credit_rejections_total 1"));
        assert!(text.contains("fleet_ledger_adjustments_total{reason=\"movement_charge\"} 1"));
    }
}
