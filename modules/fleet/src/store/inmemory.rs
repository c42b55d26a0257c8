//! In-memory implementation of the store seam for development and tests
//!
//! All state sits behind one `tokio::sync::Mutex`. A transaction holds the
//! lock for its whole lifetime and works on a copy of the state; `commit`
//! swaps the copy in, dropping the transaction discards it. Transactions are
//! therefore fully serialised, which is stricter than PostgreSQL but gives the
//! same observable results for the lifecycle code.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    DeltaOutcome, FleetStore, PageRequest, StoreError, StoreResult, StoreTx, VehicleRefuelTotals,
};
use crate::models::{
    BalanceAdjustment, Maintenance, MaintenanceFilter, MaintenanceRow, Movement, MovementFilter,
    MovementRow, NewBalanceAdjustment, NewStation, NewSupplier, Station, Supplier, Vehicle,
    VehicleRow,
};

#[derive(Debug, Clone, Default)]
struct Sequences {
    station: i64,
    vehicle: i64,
    supplier: i64,
    movement: i64,
    maintenance: i64,
    adjustment: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Debug, Clone, Default)]
struct FleetState {
    seq: Sequences,
    stations: BTreeMap<i64, Station>,
    vehicles: BTreeMap<i64, Vehicle>,
    suppliers: BTreeMap<i64, Supplier>,
    movements: BTreeMap<i64, Movement>,
    maintenances: BTreeMap<i64, Maintenance>,
    adjustments: Vec<BalanceAdjustment>,
}

impl FleetState {
    fn movements_latest_first(&self, filter: &MovementFilter) -> Vec<Movement> {
        let mut movements: Vec<Movement> = self
            .movements
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        movements.sort_by_key(|m| (Reverse(m.date), Reverse(m.id)));
        movements
    }

    fn maintenances_latest_first(&self, keep: impl Fn(&Maintenance) -> bool) -> Vec<&Maintenance> {
        let mut maintenances: Vec<&Maintenance> =
            self.maintenances.values().filter(|&m| keep(m)).collect();
        maintenances.sort_by_key(|m| (Reverse(m.date), Reverse(m.id)));
        maintenances
    }
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<FleetState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct InMemoryTx {
    guard: OwnedMutexGuard<FleetState>,
    working: FleetState,
}

#[async_trait]
impl FleetStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTx { guard, working }))
    }

    async fn list_stations(&self) -> StoreResult<Vec<Station>> {
        let state = self.state.lock().await;
        let mut stations: Vec<Station> = state.stations.values().cloned().collect();
        stations.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(stations)
    }

    async fn find_station(&self, id: i64) -> StoreResult<Option<Station>> {
        Ok(self.state.lock().await.stations.get(&id).cloned())
    }

    async fn list_adjustments(&self, station_id: i64) -> StoreResult<Vec<BalanceAdjustment>> {
        let state = self.state.lock().await;
        Ok(state
            .adjustments
            .iter()
            .filter(|a| a.station_id == station_id)
            .cloned()
            .collect())
    }

    async fn list_vehicles(&self) -> StoreResult<Vec<Vehicle>> {
        let state = self.state.lock().await;
        let mut vehicles: Vec<Vehicle> = state.vehicles.values().cloned().collect();
        vehicles.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(vehicles)
    }

    async fn find_vehicle(&self, id: i64) -> StoreResult<Option<Vehicle>> {
        Ok(self.state.lock().await.vehicles.get(&id).cloned())
    }

    async fn vehicle_refuel_totals(&self) -> StoreResult<Vec<VehicleRefuelTotals>> {
        let state = self.state.lock().await;
        let mut totals: BTreeMap<i64, VehicleRefuelTotals> = BTreeMap::new();
        for m in state
            .movements
            .values()
            .filter(|m| m.km_end >= m.km_start && m.liters_centi > 0)
        {
            let entry = totals.entry(m.vehicle_id).or_insert(VehicleRefuelTotals {
                vehicle_id: m.vehicle_id,
                distance_km: 0,
                liters_centi: 0,
            });
            entry.distance_km = entry.distance_km.saturating_add(m.km_end - m.km_start);
            entry.liters_centi = entry.liters_centi.saturating_add(m.liters_centi);
        }
        Ok(totals.into_values().collect())
    }

    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>> {
        let state = self.state.lock().await;
        let mut suppliers: Vec<Supplier> = state.suppliers.values().cloned().collect();
        suppliers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(suppliers)
    }

    async fn list_movements(
        &self,
        filter: &MovementFilter,
        page: Option<PageRequest>,
    ) -> StoreResult<Vec<Movement>> {
        let movements = self.state.lock().await.movements_latest_first(filter);
        Ok(match page {
            None => movements,
            Some(page) => movements
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(usize::try_from(page.per_page).unwrap_or(0))
                .collect(),
        })
    }

    async fn count_movements(&self, filter: &MovementFilter) -> StoreResult<i64> {
        let state = self.state.lock().await;
        Ok(state.movements.values().filter(|m| filter.matches(m)).count() as i64)
    }

    async fn find_movement(&self, id: i64) -> StoreResult<Option<Movement>> {
        Ok(self.state.lock().await.movements.get(&id).cloned())
    }

    async fn list_maintenances(&self, filter: &MaintenanceFilter) -> StoreResult<Vec<Maintenance>> {
        let state = self.state.lock().await;
        Ok(state
            .maintenances_latest_first(|m| filter.matches(m))
            .into_iter()
            .cloned()
            .collect())
    }

    async fn find_maintenance(&self, id: i64) -> StoreResult<Option<Maintenance>> {
        Ok(self.state.lock().await.maintenances.get(&id).cloned())
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn find_station(&mut self, id: i64) -> StoreResult<Option<Station>> {
        Ok(self.working.stations.get(&id).cloned())
    }

    async fn lock_station(&mut self, id: i64) -> StoreResult<Option<Station>> {
        Ok(self.working.stations.get(&id).cloned())
    }

    async fn insert_station(&mut self, station: &NewStation) -> StoreResult<Station> {
        let now = Utc::now();
        let row = Station {
            id: next(&mut self.working.seq.station),
            name: station.name.clone(),
            address: station.address.clone(),
            credit_balance_minor: station.credit_balance_minor,
            created_at: now,
            updated_at: now,
        };
        self.working.stations.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_station_details(
        &mut self,
        id: i64,
        name: &str,
        address: Option<&str>,
    ) -> StoreResult<Option<Station>> {
        Ok(self.working.stations.get_mut(&id).map(|station| {
            station.name = name.to_string();
            station.address = address.map(str::to_string);
            station.updated_at = Utc::now();
            station.clone()
        }))
    }

    async fn add_to_balance(&mut self, station_id: i64, delta_minor: i64) -> StoreResult<DeltaOutcome> {
        let Some(station) = self.working.stations.get_mut(&station_id) else {
            return Ok(DeltaOutcome::Missing);
        };
        let Some(old) = station.credit_balance_minor else {
            return Ok(DeltaOutcome::Untracked);
        };
        let new = old
            .checked_add(delta_minor)
            .ok_or(StoreError::OutOfRange("credit_balance_minor"))?;
        if new < 0 {
            return Ok(DeltaOutcome::Insufficient { balance: old });
        }
        station.credit_balance_minor = Some(new);
        station.updated_at = Utc::now();
        Ok(DeltaOutcome::Applied { old, new })
    }

    async fn overwrite_balance(&mut self, station_id: i64, balance_minor: Option<i64>) -> StoreResult<()> {
        if let Some(station) = self.working.stations.get_mut(&station_id) {
            station.credit_balance_minor = balance_minor;
            station.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn record_adjustment(
        &mut self,
        adjustment: &NewBalanceAdjustment,
    ) -> StoreResult<BalanceAdjustment> {
        let row = BalanceAdjustment {
            id: next(&mut self.working.seq.adjustment),
            station_id: adjustment.station_id,
            movement_id: adjustment.movement_id,
            reason: adjustment.reason,
            delta_minor: adjustment.delta_minor,
            balance_before_minor: adjustment.balance_before_minor,
            balance_after_minor: adjustment.balance_after_minor,
            created_at: Utc::now(),
        };
        self.working.adjustments.push(row.clone());
        Ok(row)
    }

    async fn count_station_movements(&mut self, station_id: i64) -> StoreResult<i64> {
        Ok(self
            .working
            .movements
            .values()
            .filter(|m| m.station_id == Some(station_id))
            .count() as i64)
    }

    async fn delete_station(&mut self, id: i64) -> StoreResult<bool> {
        let removed = self.working.stations.remove(&id).is_some();
        if removed {
            self.working.adjustments.retain(|a| a.station_id != id);
        }
        Ok(removed)
    }

    async fn find_vehicle(&mut self, id: i64) -> StoreResult<Option<Vehicle>> {
        Ok(self.working.vehicles.get(&id).cloned())
    }

    async fn insert_vehicle(&mut self, vehicle: &VehicleRow) -> StoreResult<Vehicle> {
        let now = Utc::now();
        let row = Vehicle {
            id: next(&mut self.working.seq.vehicle),
            name: vehicle.name.clone(),
            plate: vehicle.plate.clone(),
            color: vehicle.color.clone(),
            current_km: vehicle.current_km,
            maintenance_km: vehicle.maintenance_km,
            created_at: now,
            updated_at: now,
        };
        self.working.vehicles.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_vehicle(&mut self, id: i64, vehicle: &VehicleRow) -> StoreResult<Option<Vehicle>> {
        Ok(self.working.vehicles.get_mut(&id).map(|row| {
            row.name = vehicle.name.clone();
            row.plate = vehicle.plate.clone();
            row.color = vehicle.color.clone();
            row.current_km = vehicle.current_km;
            row.maintenance_km = vehicle.maintenance_km;
            row.updated_at = Utc::now();
            row.clone()
        }))
    }

    async fn set_vehicle_current_km(&mut self, id: i64, km: i64) -> StoreResult<()> {
        if let Some(vehicle) = self.working.vehicles.get_mut(&id) {
            vehicle.current_km = km;
            vehicle.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_vehicle_maintenance_km(&mut self, id: i64, km: i64) -> StoreResult<()> {
        if let Some(vehicle) = self.working.vehicles.get_mut(&id) {
            vehicle.maintenance_km = km;
            vehicle.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_supplier(&mut self, id: i64) -> StoreResult<Option<Supplier>> {
        Ok(self.working.suppliers.get(&id).cloned())
    }

    async fn insert_supplier(&mut self, supplier: &NewSupplier) -> StoreResult<Supplier> {
        let row = Supplier {
            id: next(&mut self.working.seq.supplier),
            name: supplier.name.clone(),
            address: supplier.address.clone(),
            created_at: Utc::now(),
        };
        self.working.suppliers.insert(row.id, row.clone());
        Ok(row)
    }

    async fn insert_movement(&mut self, movement: &MovementRow) -> StoreResult<Movement> {
        let now = Utc::now();
        let row = movement_from_row(next(&mut self.working.seq.movement), movement, now, now);
        self.working.movements.insert(row.id, row.clone());
        Ok(row)
    }

    async fn lock_movement(&mut self, id: i64) -> StoreResult<Option<Movement>> {
        Ok(self.working.movements.get(&id).cloned())
    }

    async fn update_movement(&mut self, id: i64, movement: &MovementRow) -> StoreResult<Movement> {
        let existing = self
            .working
            .movements
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "movement", id })?;
        *existing = movement_from_row(id, movement, existing.created_at, Utc::now());
        Ok(existing.clone())
    }

    async fn delete_movement(&mut self, id: i64) -> StoreResult<bool> {
        Ok(self.working.movements.remove(&id).is_some())
    }

    async fn latest_km_end(&mut self, vehicle_id: i64) -> StoreResult<Option<i64>> {
        Ok(self
            .working
            .movements
            .values()
            .filter(|m| m.vehicle_id == vehicle_id)
            .max_by_key(|m| (m.date, m.id))
            .map(|m| m.km_end))
    }

    async fn insert_maintenance(&mut self, maintenance: &MaintenanceRow) -> StoreResult<Maintenance> {
        let now = Utc::now();
        let row = Maintenance {
            id: next(&mut self.working.seq.maintenance),
            author: maintenance.author.clone(),
            vehicle_id: maintenance.vehicle_id,
            supplier_id: maintenance.supplier_id,
            date: maintenance.date,
            km_current: maintenance.km_current,
            km_after: maintenance.km_after,
            next_maintenance_date: maintenance.next_maintenance_date,
            price_minor: maintenance.price_minor,
            invoice_number: maintenance.invoice_number.clone(),
            notes: maintenance.notes.clone(),
            attachment_path: maintenance.attachment_path.clone(),
            date_alert_sent_at: None,
            km_alert_sent_at: None,
            created_at: now,
            updated_at: now,
        };
        self.working.maintenances.insert(row.id, row.clone());
        Ok(row)
    }

    async fn lock_maintenance(&mut self, id: i64) -> StoreResult<Option<Maintenance>> {
        Ok(self.working.maintenances.get(&id).cloned())
    }

    async fn update_maintenance(
        &mut self,
        id: i64,
        maintenance: &MaintenanceRow,
        reset_alerts: bool,
    ) -> StoreResult<Maintenance> {
        let row = self
            .working
            .maintenances
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "maintenance", id })?;
        row.author = maintenance.author.clone();
        row.vehicle_id = maintenance.vehicle_id;
        row.supplier_id = maintenance.supplier_id;
        row.date = maintenance.date;
        row.km_current = maintenance.km_current;
        row.km_after = maintenance.km_after;
        row.next_maintenance_date = maintenance.next_maintenance_date;
        row.price_minor = maintenance.price_minor;
        row.invoice_number = maintenance.invoice_number.clone();
        row.notes = maintenance.notes.clone();
        row.attachment_path = maintenance.attachment_path.clone();
        if reset_alerts {
            row.date_alert_sent_at = None;
            row.km_alert_sent_at = None;
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_maintenance(&mut self, id: i64) -> StoreResult<bool> {
        Ok(self.working.maintenances.remove(&id).is_some())
    }

    async fn vehicles_with_due_dates(&mut self, today: NaiveDate) -> StoreResult<Vec<i64>> {
        let mut vehicle_ids: Vec<i64> = self
            .working
            .maintenances
            .values()
            .filter(|m| {
                m.date_alert_sent_at.is_none()
                    && m.next_maintenance_date.is_some_and(|due| due <= today)
            })
            .map(|m| m.vehicle_id)
            .collect();
        vehicle_ids.sort_unstable();
        vehicle_ids.dedup();
        Ok(vehicle_ids)
    }

    async fn latest_pending_maintenance(&mut self, vehicle_id: i64) -> StoreResult<Option<Maintenance>> {
        Ok(self
            .working
            .maintenances_latest_first(|m| {
                m.vehicle_id == vehicle_id
                    && m.date_alert_sent_at.is_none()
                    && (m.km_after > 0 || m.next_maintenance_date.is_some())
            })
            .first()
            .map(|m| (*m).clone()))
    }

    async fn mark_date_alert_sent(&mut self, maintenance_id: i64) -> StoreResult<()> {
        if let Some(m) = self.working.maintenances.get_mut(&maintenance_id) {
            m.date_alert_sent_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn latest_km_target(&mut self, vehicle_id: i64) -> StoreResult<Option<Maintenance>> {
        Ok(self
            .working
            .maintenances_latest_first(|m| m.vehicle_id == vehicle_id && m.km_after > 0)
            .first()
            .map(|m| (*m).clone()))
    }

    async fn mark_km_alert_sent(&mut self, maintenance_id: i64) -> StoreResult<()> {
        if let Some(m) = self.working.maintenances.get_mut(&maintenance_id) {
            m.km_alert_sent_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

fn movement_from_row(
    id: i64,
    row: &MovementRow,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
) -> Movement {
    Movement {
        id,
        author: row.author.clone(),
        updated_by: row.updated_by.clone(),
        station_id: row.station_id,
        vehicle_id: row.vehicle_id,
        date: row.date,
        km_start: row.km_start,
        km_end: row.km_end,
        liters_centi: row.liters_centi,
        price_minor: row.price_minor,
        station_charge_minor: row.station_charge_minor,
        adblue_centi: row.adblue_centi,
        km_per_liter: row.km_per_liter,
        notes: row.notes.clone(),
        photo_path: row.photo_path.clone(),
        created_at,
        updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_station(balance: Option<i64>) -> NewStation {
        NewStation {
            name: "North".to_string(),
            address: None,
            credit_balance_minor: balance,
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_station(&new_station(Some(1000))).await.unwrap();
        drop(tx);

        assert!(store.list_stations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_guarded_balance_update() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let tracked = tx.insert_station(&new_station(Some(1000))).await.unwrap();
        let untracked = tx.insert_station(&new_station(None)).await.unwrap();

        assert_eq!(
            tx.add_to_balance(tracked.id, -400).await.unwrap(),
            DeltaOutcome::Applied { old: 1000, new: 600 }
        );
        assert_eq!(
            tx.add_to_balance(tracked.id, -700).await.unwrap(),
            DeltaOutcome::Insufficient { balance: 600 }
        );
        assert_eq!(
            tx.add_to_balance(untracked.id, -1).await.unwrap(),
            DeltaOutcome::Untracked
        );
        assert_eq!(tx.add_to_balance(999, 5).await.unwrap(), DeltaOutcome::Missing);
        tx.commit().await.unwrap();

        let station = store.find_station(tracked.id).await.unwrap().unwrap();
        assert_eq!(station.credit_balance_minor, Some(600));
    }

    #[tokio::test]
    async fn test_balance_credit_past_i64_is_rejected() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let station = tx.insert_station(&new_station(Some(i64::MAX - 10))).await.unwrap();

        let err = tx.add_to_balance(station.id, 11).await.unwrap_err();
        assert!(matches!(err, StoreError::OutOfRange("credit_balance_minor")));
        assert_eq!(
            tx.add_to_balance(station.id, 10).await.unwrap(),
            DeltaOutcome::Applied { old: i64::MAX - 10, new: i64::MAX }
        );
    }

    #[test]
    fn test_page_offset_saturates() {
        let page = PageRequest { page: i64::MAX, per_page: 20 };
        assert_eq!(page.offset(), i64::MAX);
        let first = PageRequest { page: 0, per_page: 20 };
        assert_eq!(first.offset(), 0);
    }
}
