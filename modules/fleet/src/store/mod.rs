//! # FleetStore Abstraction
//!
//! Persistence seam for the fleet back office. Services only talk to
//! [`FleetStore`] and [`StoreTx`], so the same lifecycle code runs against
//! PostgreSQL in production and an in-process store in development and tests.
//!
//! ## Implementations
//!
//! - **PgStore**: PostgreSQL through `sqlx`, delegating to `repos::*`
//! - **InMemoryStore**: mutex-serialised copy-on-begin state
//!
//! Selected at startup by `STORE_TYPE`.
//!
//! A transaction returned by [`FleetStore::begin`] is rolled back when dropped
//! without [`StoreTx::commit`]. Pool-level reads on the in-memory store wait
//! for open transactions, so services never mix the two while a transaction
//! is in flight.

mod inmemory;
mod postgres;

pub use inmemory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    BalanceAdjustment, Maintenance, MaintenanceFilter, MaintenanceRow, Movement, MovementFilter,
    MovementRow, NewBalanceAdjustment, NewStation, NewSupplier, Station, Supplier, Vehicle,
    VehicleRow,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0} out of range")]
    OutOfRange(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a guarded additive balance update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// Delta written; carries the balance before and after
    Applied { old: i64, new: i64 },
    /// Station has no tracked balance; nothing written
    Untracked,
    /// Guard rejected the debit; nothing written
    Insufficient { balance: i64 },
    /// Station row does not exist
    Missing,
}

/// Offset pagination for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Row offset; pages past the representable range saturate
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.per_page.max(0))
    }
}

/// Distance and volume of the refuels that qualify for a vehicle average
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct VehicleRefuelTotals {
    pub vehicle_id: i64,
    pub distance_km: i64,
    pub liters_centi: i64,
}

/// Pool-level reads plus the entry point for transactional work
#[async_trait]
pub trait FleetStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    async fn list_stations(&self) -> StoreResult<Vec<Station>>;

    async fn find_station(&self, id: i64) -> StoreResult<Option<Station>>;

    /// Audit journal of one station, oldest first
    async fn list_adjustments(&self, station_id: i64) -> StoreResult<Vec<BalanceAdjustment>>;

    async fn list_vehicles(&self) -> StoreResult<Vec<Vehicle>>;

    async fn find_vehicle(&self, id: i64) -> StoreResult<Option<Vehicle>>;

    /// Per-vehicle sums over movements with `km_end >= km_start` and positive liters
    async fn vehicle_refuel_totals(&self) -> StoreResult<Vec<VehicleRefuelTotals>>;

    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>>;

    /// Movements ordered by `(date desc, id desc)`
    async fn list_movements(
        &self,
        filter: &MovementFilter,
        page: Option<PageRequest>,
    ) -> StoreResult<Vec<Movement>>;

    async fn count_movements(&self, filter: &MovementFilter) -> StoreResult<i64>;

    async fn find_movement(&self, id: i64) -> StoreResult<Option<Movement>>;

    /// Maintenances ordered by `(date desc, id desc)`
    async fn list_maintenances(&self, filter: &MaintenanceFilter) -> StoreResult<Vec<Maintenance>>;

    async fn find_maintenance(&self, id: i64) -> StoreResult<Option<Maintenance>>;
}

/// Reads and writes that share one atomic unit of work
#[async_trait]
pub trait StoreTx: Send {
    // stations
    async fn find_station(&mut self, id: i64) -> StoreResult<Option<Station>>;

    /// Read a station holding a row lock until commit
    async fn lock_station(&mut self, id: i64) -> StoreResult<Option<Station>>;

    async fn insert_station(&mut self, station: &NewStation) -> StoreResult<Station>;

    async fn update_station_details(
        &mut self,
        id: i64,
        name: &str,
        address: Option<&str>,
    ) -> StoreResult<Option<Station>>;

    /// `balance = balance + delta` when tracked and the result stays non-negative
    async fn add_to_balance(&mut self, station_id: i64, delta_minor: i64) -> StoreResult<DeltaOutcome>;

    async fn overwrite_balance(&mut self, station_id: i64, balance_minor: Option<i64>) -> StoreResult<()>;

    async fn record_adjustment(
        &mut self,
        adjustment: &NewBalanceAdjustment,
    ) -> StoreResult<BalanceAdjustment>;

    async fn count_station_movements(&mut self, station_id: i64) -> StoreResult<i64>;

    async fn delete_station(&mut self, id: i64) -> StoreResult<bool>;

    // vehicles
    async fn find_vehicle(&mut self, id: i64) -> StoreResult<Option<Vehicle>>;

    async fn insert_vehicle(&mut self, vehicle: &VehicleRow) -> StoreResult<Vehicle>;

    async fn update_vehicle(&mut self, id: i64, vehicle: &VehicleRow) -> StoreResult<Option<Vehicle>>;

    async fn set_vehicle_current_km(&mut self, id: i64, km: i64) -> StoreResult<()>;

    async fn set_vehicle_maintenance_km(&mut self, id: i64, km: i64) -> StoreResult<()>;

    // suppliers
    async fn find_supplier(&mut self, id: i64) -> StoreResult<Option<Supplier>>;

    async fn insert_supplier(&mut self, supplier: &NewSupplier) -> StoreResult<Supplier>;

    // movements
    async fn insert_movement(&mut self, movement: &MovementRow) -> StoreResult<Movement>;

    async fn lock_movement(&mut self, id: i64) -> StoreResult<Option<Movement>>;

    async fn update_movement(&mut self, id: i64, movement: &MovementRow) -> StoreResult<Movement>;

    async fn delete_movement(&mut self, id: i64) -> StoreResult<bool>;

    /// `km_end` of the vehicle's latest movement by `(date desc, id desc)`
    async fn latest_km_end(&mut self, vehicle_id: i64) -> StoreResult<Option<i64>>;

    // maintenances
    async fn insert_maintenance(&mut self, maintenance: &MaintenanceRow) -> StoreResult<Maintenance>;

    async fn lock_maintenance(&mut self, id: i64) -> StoreResult<Option<Maintenance>>;

    /// Overwrite a maintenance; `reset_alerts` clears both sent-at flags
    async fn update_maintenance(
        &mut self,
        id: i64,
        maintenance: &MaintenanceRow,
        reset_alerts: bool,
    ) -> StoreResult<Maintenance>;

    async fn delete_maintenance(&mut self, id: i64) -> StoreResult<bool>;

    /// Vehicles with an unsent date alert whose due date is on or before `today`
    async fn vehicles_with_due_dates(&mut self, today: NaiveDate) -> StoreResult<Vec<i64>>;

    /// Latest maintenance without a date alert that carries a km or date target
    async fn latest_pending_maintenance(&mut self, vehicle_id: i64) -> StoreResult<Option<Maintenance>>;

    async fn mark_date_alert_sent(&mut self, maintenance_id: i64) -> StoreResult<()>;

    /// Latest maintenance of the vehicle with `km_after > 0`
    async fn latest_km_target(&mut self, vehicle_id: i64) -> StoreResult<Option<Maintenance>>;

    async fn mark_km_alert_sent(&mut self, maintenance_id: i64) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
