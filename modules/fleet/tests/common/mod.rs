//! Shared fixtures for the fleet integration tests
//!
//! Every test gets its own in-memory store and recording sinks, so tests run
//! in parallel without a database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use fleet_rs::metrics::Metrics;
use fleet_rs::models::{NewStation, NewSupplier, Station, Supplier, Vehicle, VehicleRow};
use fleet_rs::notify::{Notifier, RecordingSink};
use fleet_rs::services::{FleetContext, LedgerSettings};
use fleet_rs::store::{FleetStore, InMemoryStore};
use fleet_rs::validation::MovementDraft;
use http_body_util::BodyExt;
use serde_json::Value;

/// Threshold used by the ledger scenarios: 5000.00
pub const THRESHOLD_MINOR: i64 = 500_000;

pub struct TestApp {
    pub ctx: FleetContext,
    pub refuels: Arc<RecordingSink>,
    pub credit: Arc<RecordingSink>,
    pub maintenance: Arc<RecordingSink>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(LedgerSettings::default())
    }

    pub fn with_settings(settings: LedgerSettings) -> Self {
        let refuels = Arc::new(RecordingSink::new());
        let credit = Arc::new(RecordingSink::new());
        let maintenance = Arc::new(RecordingSink::new());

        let notifier = Notifier::new(
            refuels.clone(),
            credit.clone(),
            maintenance.clone(),
            settings.threshold,
        );

        let ctx = FleetContext {
            store: Arc::new(InMemoryStore::new()),
            notifier: Arc::new(notifier),
            settings,
            metrics: Arc::new(Metrics::new().expect("metrics registry")),
        };

        Self {
            ctx,
            refuels,
            credit,
            maintenance,
        }
    }

    pub fn store(&self) -> &dyn FleetStore {
        self.ctx.store.as_ref()
    }

    /// Insert a station without going through the ledger (no opening event)
    pub async fn seed_station(&self, name: &str, balance_minor: Option<i64>) -> Station {
        let mut tx = self.ctx.store.begin().await.expect("begin");
        let station = tx
            .insert_station(&NewStation {
                name: name.to_string(),
                address: None,
                credit_balance_minor: balance_minor,
            })
            .await
            .expect("insert station");
        tx.commit().await.expect("commit");
        station
    }

    pub async fn seed_vehicle(&self, name: &str, current_km: i64) -> Vehicle {
        let mut tx = self.ctx.store.begin().await.expect("begin");
        let vehicle = tx
            .insert_vehicle(&VehicleRow {
                name: name.to_string(),
                plate: Some(format!("{}-PLATE", name.to_uppercase())),
                color: None,
                current_km,
                maintenance_km: current_km,
            })
            .await
            .expect("insert vehicle");
        tx.commit().await.expect("commit");
        vehicle
    }

    pub async fn seed_supplier(&self, name: &str) -> Supplier {
        let mut tx = self.ctx.store.begin().await.expect("begin");
        let supplier = tx
            .insert_supplier(&NewSupplier {
                name: name.to_string(),
                address: None,
            })
            .await
            .expect("insert supplier");
        tx.commit().await.expect("commit");
        supplier
    }

    pub async fn balance(&self, station_id: i64) -> Option<i64> {
        self.store()
            .find_station(station_id)
            .await
            .expect("find station")
            .expect("station exists")
            .credit_balance_minor
    }

    pub async fn current_km(&self, vehicle_id: i64) -> i64 {
        self.store()
            .find_vehicle(vehicle_id)
            .await
            .expect("find vehicle")
            .expect("vehicle exists")
            .current_km
    }
}

pub fn day(year: i32, month: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, d, 10, 0, 0)
        .single()
        .expect("valid date")
}

/// Refuel of 40 liters on 2026-03-02 between the given odometer readings
pub fn refuel(vehicle_id: i64, station_id: Option<i64>, price_minor: i64, km: (i64, i64)) -> MovementDraft {
    MovementDraft {
        station_id,
        vehicle_id,
        date: day(2026, 3, 2),
        km_start: km.0,
        km_end: km.1,
        liters_centi: 4_000,
        price_minor,
        adblue_centi: None,
        notes: None,
        photo_path: None,
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

pub fn json_body(value: &Value) -> Body {
    Body::from(value.to_string())
}
