//! PostgreSQL implementation of the store seam

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use super::{
    DeltaOutcome, FleetStore, PageRequest, StoreError, StoreResult, StoreTx, VehicleRefuelTotals,
};
use crate::models::{
    BalanceAdjustment, Maintenance, MaintenanceFilter, MaintenanceRow, Movement, MovementFilter,
    MovementRow, NewBalanceAdjustment, NewStation, NewSupplier, Station, Supplier, Vehicle,
    VehicleRow,
};
use crate::repos::{
    adjustment_repo, maintenance_repo, movement_repo, station_repo, supplier_repo, vehicle_repo,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl FleetStore for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn list_stations(&self) -> StoreResult<Vec<Station>> {
        Ok(station_repo::list(&self.pool).await?)
    }

    async fn find_station(&self, id: i64) -> StoreResult<Option<Station>> {
        Ok(station_repo::find(&self.pool, id).await?)
    }

    async fn list_adjustments(&self, station_id: i64) -> StoreResult<Vec<BalanceAdjustment>> {
        Ok(adjustment_repo::list_by_station(&self.pool, station_id).await?)
    }

    async fn list_vehicles(&self) -> StoreResult<Vec<Vehicle>> {
        Ok(vehicle_repo::list(&self.pool).await?)
    }

    async fn find_vehicle(&self, id: i64) -> StoreResult<Option<Vehicle>> {
        Ok(vehicle_repo::find(&self.pool, id).await?)
    }

    async fn vehicle_refuel_totals(&self) -> StoreResult<Vec<VehicleRefuelTotals>> {
        Ok(vehicle_repo::refuel_totals(&self.pool).await?)
    }

    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>> {
        Ok(supplier_repo::list(&self.pool).await?)
    }

    async fn list_movements(
        &self,
        filter: &MovementFilter,
        page: Option<PageRequest>,
    ) -> StoreResult<Vec<Movement>> {
        Ok(movement_repo::list(&self.pool, filter, page).await?)
    }

    async fn count_movements(&self, filter: &MovementFilter) -> StoreResult<i64> {
        Ok(movement_repo::count(&self.pool, filter).await?)
    }

    async fn find_movement(&self, id: i64) -> StoreResult<Option<Movement>> {
        Ok(movement_repo::find(&self.pool, id).await?)
    }

    async fn list_maintenances(&self, filter: &MaintenanceFilter) -> StoreResult<Vec<Maintenance>> {
        Ok(maintenance_repo::list(&self.pool, filter).await?)
    }

    async fn find_maintenance(&self, id: i64) -> StoreResult<Option<Maintenance>> {
        Ok(maintenance_repo::find(&self.pool, id).await?)
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn find_station(&mut self, id: i64) -> StoreResult<Option<Station>> {
        Ok(station_repo::find_tx(&mut self.tx, id).await?)
    }

    async fn lock_station(&mut self, id: i64) -> StoreResult<Option<Station>> {
        Ok(station_repo::lock_tx(&mut self.tx, id).await?)
    }

    async fn insert_station(&mut self, station: &NewStation) -> StoreResult<Station> {
        Ok(station_repo::insert_tx(&mut self.tx, station).await?)
    }

    async fn update_station_details(
        &mut self,
        id: i64,
        name: &str,
        address: Option<&str>,
    ) -> StoreResult<Option<Station>> {
        Ok(station_repo::update_details_tx(&mut self.tx, id, name, address).await?)
    }

    async fn add_to_balance(&mut self, station_id: i64, delta_minor: i64) -> StoreResult<DeltaOutcome> {
        Ok(station_repo::tx_add_to_balance(&mut self.tx, station_id, delta_minor).await?)
    }

    async fn overwrite_balance(&mut self, station_id: i64, balance_minor: Option<i64>) -> StoreResult<()> {
        Ok(station_repo::tx_overwrite_balance(&mut self.tx, station_id, balance_minor).await?)
    }

    async fn record_adjustment(
        &mut self,
        adjustment: &NewBalanceAdjustment,
    ) -> StoreResult<BalanceAdjustment> {
        Ok(adjustment_repo::insert_tx(&mut self.tx, adjustment).await?)
    }

    async fn count_station_movements(&mut self, station_id: i64) -> StoreResult<i64> {
        Ok(station_repo::count_movements_tx(&mut self.tx, station_id).await?)
    }

    async fn delete_station(&mut self, id: i64) -> StoreResult<bool> {
        Ok(station_repo::delete_tx(&mut self.tx, id).await?)
    }

    async fn find_vehicle(&mut self, id: i64) -> StoreResult<Option<Vehicle>> {
        Ok(vehicle_repo::find_tx(&mut self.tx, id).await?)
    }

    async fn insert_vehicle(&mut self, vehicle: &VehicleRow) -> StoreResult<Vehicle> {
        Ok(vehicle_repo::insert_tx(&mut self.tx, vehicle).await?)
    }

    async fn update_vehicle(&mut self, id: i64, vehicle: &VehicleRow) -> StoreResult<Option<Vehicle>> {
        Ok(vehicle_repo::update_tx(&mut self.tx, id, vehicle).await?)
    }

    async fn set_vehicle_current_km(&mut self, id: i64, km: i64) -> StoreResult<()> {
        Ok(vehicle_repo::set_current_km_tx(&mut self.tx, id, km).await?)
    }

    async fn set_vehicle_maintenance_km(&mut self, id: i64, km: i64) -> StoreResult<()> {
        Ok(vehicle_repo::set_maintenance_km_tx(&mut self.tx, id, km).await?)
    }

    async fn find_supplier(&mut self, id: i64) -> StoreResult<Option<Supplier>> {
        Ok(supplier_repo::find_tx(&mut self.tx, id).await?)
    }

    async fn insert_supplier(&mut self, supplier: &NewSupplier) -> StoreResult<Supplier> {
        Ok(supplier_repo::insert_tx(&mut self.tx, supplier).await?)
    }

    async fn insert_movement(&mut self, movement: &MovementRow) -> StoreResult<Movement> {
        Ok(movement_repo::insert_tx(&mut self.tx, movement).await?)
    }

    async fn lock_movement(&mut self, id: i64) -> StoreResult<Option<Movement>> {
        Ok(movement_repo::lock_tx(&mut self.tx, id).await?)
    }

    async fn update_movement(&mut self, id: i64, movement: &MovementRow) -> StoreResult<Movement> {
        movement_repo::update_tx(&mut self.tx, id, movement)
            .await?
            .ok_or(StoreError::NotFound { entity: "movement", id })
    }

    async fn delete_movement(&mut self, id: i64) -> StoreResult<bool> {
        Ok(movement_repo::delete_tx(&mut self.tx, id).await?)
    }

    async fn latest_km_end(&mut self, vehicle_id: i64) -> StoreResult<Option<i64>> {
        Ok(movement_repo::latest_km_end_tx(&mut self.tx, vehicle_id).await?)
    }

    async fn insert_maintenance(&mut self, maintenance: &MaintenanceRow) -> StoreResult<Maintenance> {
        Ok(maintenance_repo::insert_tx(&mut self.tx, maintenance).await?)
    }

    async fn lock_maintenance(&mut self, id: i64) -> StoreResult<Option<Maintenance>> {
        Ok(maintenance_repo::lock_tx(&mut self.tx, id).await?)
    }

    async fn update_maintenance(
        &mut self,
        id: i64,
        maintenance: &MaintenanceRow,
        reset_alerts: bool,
    ) -> StoreResult<Maintenance> {
        maintenance_repo::update_tx(&mut self.tx, id, maintenance, reset_alerts)
            .await?
            .ok_or(StoreError::NotFound { entity: "maintenance", id })
    }

    async fn delete_maintenance(&mut self, id: i64) -> StoreResult<bool> {
        Ok(maintenance_repo::delete_tx(&mut self.tx, id).await?)
    }

    async fn vehicles_with_due_dates(&mut self, today: NaiveDate) -> StoreResult<Vec<i64>> {
        Ok(maintenance_repo::vehicles_with_due_dates_tx(&mut self.tx, today).await?)
    }

    async fn latest_pending_maintenance(&mut self, vehicle_id: i64) -> StoreResult<Option<Maintenance>> {
        Ok(maintenance_repo::latest_pending_tx(&mut self.tx, vehicle_id).await?)
    }

    async fn mark_date_alert_sent(&mut self, maintenance_id: i64) -> StoreResult<()> {
        Ok(maintenance_repo::mark_date_alert_sent_tx(&mut self.tx, maintenance_id).await?)
    }

    async fn latest_km_target(&mut self, vehicle_id: i64) -> StoreResult<Option<Maintenance>> {
        Ok(maintenance_repo::latest_km_target_tx(&mut self.tx, vehicle_id).await?)
    }

    async fn mark_km_alert_sent(&mut self, maintenance_id: i64) -> StoreResult<()> {
        Ok(maintenance_repo::mark_km_alert_sent_tx(&mut self.tx, maintenance_id).await?)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
