//! Persistent records of the fleet back office
//!
//! Money is kept in minor units (cents) and volumes in centiliters, both as
//! `i64`, so ledger arithmetic never touches floating point.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Fuel station, optionally carrying a prepaid card balance
///
/// `credit_balance_minor == None` means the station is untracked: no charge
/// is ever computed against it.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Station {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub credit_balance_minor: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Station {
    pub fn is_tracked(&self) -> bool {
        self.credit_balance_minor.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Vehicle {
    pub id: i64,
    pub name: String,
    pub plate: Option<String>,
    pub color: Option<String>,
    pub current_km: i64,
    pub maintenance_km: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    /// "PLATE - Name", falling back to whichever part is present
    pub fn label(&self) -> String {
        match self.plate.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            Some(plate) if !self.name.trim().is_empty() => format!("{} - {}", plate, self.name.trim()),
            Some(plate) => plate.to_string(),
            None if !self.name.trim().is_empty() => self.name.trim().to_string(),
            None => "Vehicle".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Refuel transaction
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Movement {
    pub id: i64,
    pub author: String,
    pub updated_by: Option<String>,
    pub station_id: Option<i64>,
    pub vehicle_id: i64,
    pub date: DateTime<Utc>,
    pub km_start: i64,
    pub km_end: i64,
    pub liters_centi: i64,
    pub price_minor: i64,
    pub station_charge_minor: i64,
    pub adblue_centi: Option<i64>,
    pub km_per_liter: Option<f64>,
    pub notes: Option<String>,
    pub photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column values written by a movement insert or update
///
/// `station_charge_minor` and `km_per_liter` are computed by the lifecycle
/// manager, never taken from the request.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementRow {
    pub author: String,
    pub updated_by: Option<String>,
    pub station_id: Option<i64>,
    pub vehicle_id: i64,
    pub date: DateTime<Utc>,
    pub km_start: i64,
    pub km_end: i64,
    pub liters_centi: i64,
    pub price_minor: i64,
    pub station_charge_minor: i64,
    pub adblue_centi: Option<i64>,
    pub km_per_liter: Option<f64>,
    pub notes: Option<String>,
    pub photo_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Maintenance {
    pub id: i64,
    pub author: String,
    pub vehicle_id: i64,
    pub supplier_id: i64,
    pub date: DateTime<Utc>,
    pub km_current: i64,
    pub km_after: i64,
    pub next_maintenance_date: Option<NaiveDate>,
    pub price_minor: i64,
    pub invoice_number: String,
    pub notes: String,
    pub attachment_path: Option<String>,
    pub date_alert_sent_at: Option<DateTime<Utc>>,
    pub km_alert_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceRow {
    pub author: String,
    pub vehicle_id: i64,
    pub supplier_id: i64,
    pub date: DateTime<Utc>,
    pub km_current: i64,
    pub km_after: i64,
    pub next_maintenance_date: Option<NaiveDate>,
    pub price_minor: i64,
    pub invoice_number: String,
    pub notes: String,
    pub attachment_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStation {
    pub name: String,
    pub address: Option<String>,
    pub credit_balance_minor: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRow {
    pub name: String,
    pub plate: Option<String>,
    pub color: Option<String>,
    pub current_km: i64,
    pub maintenance_km: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSupplier {
    pub name: String,
    pub address: Option<String>,
}

/// Why a station balance changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "balance_adjustment_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    Opening,
    MovementCharge,
    MovementRelease,
    MovementReconcile,
    AdminOverwrite,
}

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::MovementCharge => "movement_charge",
            Self::MovementRelease => "movement_release",
            Self::MovementReconcile => "movement_reconcile",
            Self::AdminOverwrite => "admin_overwrite",
        }
    }
}

/// One row of the station balance audit journal
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct BalanceAdjustment {
    pub id: i64,
    pub station_id: i64,
    pub movement_id: Option<i64>,
    pub reason: AdjustmentReason,
    pub delta_minor: i64,
    pub balance_before_minor: Option<i64>,
    pub balance_after_minor: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBalanceAdjustment {
    pub station_id: i64,
    pub movement_id: Option<i64>,
    pub reason: AdjustmentReason,
    pub delta_minor: i64,
    pub balance_before_minor: Option<i64>,
    pub balance_after_minor: Option<i64>,
}

/// Filters for movement listings; every field narrows the result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementFilter {
    pub vehicle_id: Option<i64>,
    pub station_id: Option<i64>,
    pub author: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &Movement) -> bool {
        self.vehicle_id.map_or(true, |v| movement.vehicle_id == v)
            && self.station_id.map_or(true, |s| movement.station_id == Some(s))
            && self.author.as_deref().map_or(true, |a| movement.author == a)
            && self.from.map_or(true, |from| movement.date >= from)
            && self.to.map_or(true, |to| movement.date <= to)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaintenanceFilter {
    pub vehicle_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub author: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl MaintenanceFilter {
    pub fn matches(&self, maintenance: &Maintenance) -> bool {
        self.vehicle_id.map_or(true, |v| maintenance.vehicle_id == v)
            && self.supplier_id.map_or(true, |s| maintenance.supplier_id == s)
            && self.author.as_deref().map_or(true, |a| maintenance.author == a)
            && self.from.map_or(true, |from| maintenance.date >= from)
            && self.to.map_or(true, |to| maintenance.date <= to)
    }
}
