//! Period reports over refuels and maintenances
//!
//! Aggregated in process from the filtered listings; groups come back sorted
//! by spend, highest first.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{MaintenanceFilter, Movement, MovementFilter};
use crate::services::efficiency::EfficiencyAccumulator;
use crate::services::FleetContext;
use crate::store::StoreResult;
use crate::validation::{day_bounds, ValidationResult};

/// Inclusive reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ReportRange {
    /// Missing bounds default to the first day of `today`'s month and `today`
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
    ) -> ValidationResult<Self> {
        let start_date = start.unwrap_or_else(|| today.with_day(1).unwrap_or(today));
        let end_date = end.unwrap_or(today);
        day_bounds(Some(start_date), Some(end_date))?;
        Ok(Self { start_date, end_date })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefuelTotals {
    pub spent_minor: i64,
    pub refuel_count: i64,
    pub station_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRefuels {
    pub station_id: i64,
    pub station_name: String,
    pub spent_minor: i64,
    pub liters_centi: i64,
    pub refuel_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleRefuels {
    pub vehicle_id: i64,
    pub vehicle_label: String,
    pub spent_minor: i64,
    pub liters_centi: i64,
    pub refuel_count: i64,
    pub km_per_liter: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefuelReport {
    #[serde(flatten)]
    pub range: ReportRange,
    pub totals: RefuelTotals,
    pub by_station: Vec<StationRefuels>,
    pub by_vehicle: Vec<VehicleRefuels>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceTotals {
    pub spent_minor: i64,
    pub maintenance_count: i64,
    pub supplier_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleMaintenances {
    pub vehicle_id: i64,
    pub vehicle_label: String,
    pub spent_minor: i64,
    pub maintenance_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierMaintenances {
    pub supplier_id: i64,
    pub supplier_name: String,
    pub spent_minor: i64,
    pub maintenance_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceReport {
    #[serde(flatten)]
    pub range: ReportRange,
    pub totals: MaintenanceTotals,
    pub by_vehicle: Vec<VehicleMaintenances>,
    pub by_supplier: Vec<SupplierMaintenances>,
}

#[derive(Default)]
struct Bucket {
    spent_minor: i64,
    liters_centi: i64,
    count: i64,
    efficiency: EfficiencyAccumulator,
}

// totals saturate rather than wrap
impl Bucket {
    fn add(&mut self, m: &Movement) {
        self.spent_minor = self.spent_minor.saturating_add(m.price_minor);
        self.liters_centi = self.liters_centi.saturating_add(m.liters_centi);
        self.count += 1;
        self.efficiency.add(m.km_start, m.km_end, m.liters_centi);
    }
}

pub async fn refuel_report(ctx: &FleetContext, range: ReportRange) -> StoreResult<RefuelReport> {
    let (from, to) = day_bounds(Some(range.start_date), Some(range.end_date))
        .unwrap_or((None, None));
    let filter = MovementFilter {
        from,
        to,
        ..Default::default()
    };
    let movements = ctx.store.list_movements(&filter, None).await?;

    let station_names: HashMap<i64, String> = ctx
        .store
        .list_stations()
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();
    let vehicle_labels: HashMap<i64, String> = ctx
        .store
        .list_vehicles()
        .await?
        .into_iter()
        .map(|v| (v.id, v.label()))
        .collect();

    let mut stations: BTreeMap<i64, Bucket> = BTreeMap::new();
    let mut vehicles: BTreeMap<i64, Bucket> = BTreeMap::new();
    let mut distinct_stations: BTreeSet<i64> = BTreeSet::new();
    let mut spent_minor: i64 = 0;

    for m in &movements {
        spent_minor = spent_minor.saturating_add(m.price_minor);

        if let Some(station_id) = m.station_id {
            distinct_stations.insert(station_id);
            stations.entry(station_id).or_default().add(m);
        }
        vehicles.entry(m.vehicle_id).or_default().add(m);
    }

    let mut by_station: Vec<StationRefuels> = stations
        .into_iter()
        .map(|(station_id, b)| StationRefuels {
            station_id,
            station_name: station_names.get(&station_id).cloned().unwrap_or_default(),
            spent_minor: b.spent_minor,
            liters_centi: b.liters_centi,
            refuel_count: b.count,
        })
        .collect();
    by_station.sort_by(|a, b| b.spent_minor.cmp(&a.spent_minor));

    let mut by_vehicle: Vec<VehicleRefuels> = vehicles
        .into_iter()
        .map(|(vehicle_id, b)| VehicleRefuels {
            vehicle_id,
            vehicle_label: vehicle_labels.get(&vehicle_id).cloned().unwrap_or_default(),
            spent_minor: b.spent_minor,
            liters_centi: b.liters_centi,
            refuel_count: b.count,
            km_per_liter: b.efficiency.average(),
        })
        .collect();
    by_vehicle.sort_by(|a, b| b.spent_minor.cmp(&a.spent_minor));

    Ok(RefuelReport {
        range,
        totals: RefuelTotals {
            spent_minor,
            refuel_count: movements.len() as i64,
            station_count: distinct_stations.len() as i64,
        },
        by_station,
        by_vehicle,
    })
}

/// Maintenance spend for the period, optionally narrowed to a vehicle or supplier
pub async fn maintenance_report(
    ctx: &FleetContext,
    range: ReportRange,
    vehicle_id: Option<i64>,
    supplier_id: Option<i64>,
) -> StoreResult<MaintenanceReport> {
    let (from, to) = day_bounds(Some(range.start_date), Some(range.end_date))
        .unwrap_or((None, None));
    let filter = MaintenanceFilter {
        vehicle_id,
        supplier_id,
        from,
        to,
        ..Default::default()
    };
    let maintenances = ctx.store.list_maintenances(&filter).await?;

    let vehicle_labels: HashMap<i64, String> = ctx
        .store
        .list_vehicles()
        .await?
        .into_iter()
        .map(|v| (v.id, v.label()))
        .collect();
    let supplier_names: HashMap<i64, String> = ctx
        .store
        .list_suppliers()
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    let mut vehicles: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
    let mut suppliers: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
    for m in &maintenances {
        let entry = vehicles.entry(m.vehicle_id).or_default();
        entry.0 = entry.0.saturating_add(m.price_minor);
        entry.1 += 1;

        let entry = suppliers.entry(m.supplier_id).or_default();
        entry.0 = entry.0.saturating_add(m.price_minor);
        entry.1 += 1;
    }

    let spent_minor = maintenances
        .iter()
        .fold(0_i64, |acc, m| acc.saturating_add(m.price_minor));
    let supplier_count = suppliers.len() as i64;

    let mut by_vehicle: Vec<VehicleMaintenances> = vehicles
        .into_iter()
        .map(|(vehicle_id, (spent_minor, count))| VehicleMaintenances {
            vehicle_id,
            vehicle_label: vehicle_labels.get(&vehicle_id).cloned().unwrap_or_default(),
            spent_minor,
            maintenance_count: count,
        })
        .collect();
    by_vehicle.sort_by(|a, b| b.spent_minor.cmp(&a.spent_minor));

    let mut by_supplier: Vec<SupplierMaintenances> = suppliers
        .into_iter()
        .map(|(supplier_id, (spent_minor, count))| SupplierMaintenances {
            supplier_id,
            supplier_name: supplier_names.get(&supplier_id).cloned().unwrap_or_default(),
            spent_minor,
            maintenance_count: count,
        })
        .collect();
    by_supplier.sort_by(|a, b| b.spent_minor.cmp(&a.spent_minor));

    Ok(MaintenanceReport {
        range,
        totals: MaintenanceTotals {
            spent_minor,
            maintenance_count: maintenances.len() as i64,
            supplier_count,
        },
        by_vehicle,
        by_supplier,
    })
}
