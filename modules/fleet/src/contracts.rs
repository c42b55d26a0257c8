//! Request payloads accepted by the HTTP API
//!
//! Everything is optional at the serde level so that missing fields surface
//! as per-field validation errors instead of a generic body rejection.
//! Amounts and volumes arrive as decimals and are converted in `validation`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

/// Distinguish an absent field from an explicit `null`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementRequest {
    pub author: Option<String>,
    pub updated_by: Option<String>,
    pub station_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub date: Option<DateTime<Utc>>,
    pub km_start: Option<i64>,
    pub km_end: Option<i64>,
    pub liters: Option<f64>,
    pub price: Option<f64>,
    pub adblue: Option<f64>,
    pub notes: Option<String>,
    pub photo_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    /// Absent leaves the balance untouched on edit; `null` stops tracking
    #[serde(default, deserialize_with = "present")]
    pub credit_balance: Option<Option<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleRequest {
    pub name: Option<String>,
    pub plate: Option<String>,
    pub color: Option<String>,
    pub current_km: Option<i64>,
    pub maintenance_km: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierRequest {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaintenanceRequest {
    pub author: Option<String>,
    pub vehicle_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub date: Option<DateTime<Utc>>,
    pub km_current: Option<i64>,
    pub km_after: Option<i64>,
    pub next_maintenance_date: Option<NaiveDate>,
    pub price: Option<f64>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub attachment_path: Option<String>,
}
