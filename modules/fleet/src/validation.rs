//! Validation of API payloads
//!
//! Converts request DTOs into typed drafts with amounts in minor units and
//! volumes in centiliters. Checks that need the database (referenced rows
//! exist) happen later, inside the service transaction, and reuse
//! [`ValidationError::UnknownReference`].

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::contracts::{
    MaintenanceRequest, MovementRequest, StationRequest, SupplierRequest, VehicleRequest,
};
use crate::models::{NewSupplier, VehicleRow};
use crate::units::{to_centi, to_minor};

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 500;

/// Upper bound for prices and volumes, `NUMERIC(10,2)`
pub const MAX_AMOUNT: f64 = 99_999_999.99;
/// Upper bound for station balances, `NUMERIC(12,2)`
pub const MAX_BALANCE: f64 = 9_999_999_999.99;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be a finite number")]
    NotFinite(&'static str),

    #[error("{0} must be greater than or equal to 0")]
    Negative(&'static str),

    #[error("{0} exceeds the maximum allowed value")]
    TooLarge(&'static str),

    #[error("liters must be greater than 0")]
    NonPositiveLiters,

    #[error("price must be greater than liters")]
    PriceNotAboveLiters,

    #[error("{field} {id} does not exist")]
    UnknownReference { field: &'static str, id: i64 },

    #[error("start_date must not be after end_date")]
    InvalidDateRange,
}

impl ValidationError {
    /// Request field the error refers to
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Required(field)
            | Self::NotFinite(field)
            | Self::Negative(field)
            | Self::TooLarge(field) => Some(*field),
            Self::NonPositiveLiters => Some("liters"),
            Self::PriceNotAboveLiters => Some("price"),
            Self::UnknownReference { field, .. } => Some(*field),
            Self::InvalidDateRange => Some("start_date"),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validated refuel, before station and vehicle existence checks
#[derive(Debug, Clone, PartialEq)]
pub struct MovementDraft {
    pub station_id: Option<i64>,
    pub vehicle_id: i64,
    pub date: DateTime<Utc>,
    pub km_start: i64,
    pub km_end: i64,
    pub liters_centi: i64,
    pub price_minor: i64,
    pub adblue_centi: Option<i64>,
    pub notes: Option<String>,
    pub photo_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationDraft {
    pub name: String,
    pub address: Option<String>,
    /// `None` = leave untouched, `Some(None)` = untracked
    pub credit_balance_minor: Option<Option<i64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceDraft {
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

fn required<T: Copy>(value: Option<T>, field: &'static str) -> ValidationResult<T> {
    value.ok_or(ValidationError::Required(field))
}

fn non_negative(value: i64, field: &'static str) -> ValidationResult<i64> {
    if value < 0 {
        return Err(ValidationError::Negative(field));
    }
    Ok(value)
}

fn decimal(value: f64, max: f64, field: &'static str) -> ValidationResult<f64> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite(field));
    }
    if value < 0.0 {
        return Err(ValidationError::Negative(field));
    }
    if value > max {
        return Err(ValidationError::TooLarge(field));
    }
    Ok(value)
}

/// Trimmed text, `None` when blank
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn required_text(value: Option<&str>, field: &'static str) -> ValidationResult<String> {
    optional_text(value).ok_or(ValidationError::Required(field))
}

/// Validate a refuel payload
///
/// - `vehicle_id`, `date`, `km_start`, `km_end`, `liters`, `price` are required
/// - odometer readings and amounts must be non-negative, liters strictly positive
/// - with `require_price_above_liters`, price must exceed liters numerically
pub fn validate_movement(
    payload: &MovementRequest,
    require_price_above_liters: bool,
) -> ValidationResult<MovementDraft> {
    let vehicle_id = required(payload.vehicle_id, "vehicle_id")?;
    let date = required(payload.date, "date")?;
    let km_start = non_negative(required(payload.km_start, "km_start")?, "km_start")?;
    let km_end = non_negative(required(payload.km_end, "km_end")?, "km_end")?;

    let liters = decimal(required(payload.liters, "liters")?, MAX_AMOUNT, "liters")?;
    let liters_centi = to_centi(liters);
    if liters_centi <= 0 {
        return Err(ValidationError::NonPositiveLiters);
    }

    let price_minor = to_minor(decimal(required(payload.price, "price")?, MAX_AMOUNT, "price")?);
    // both in hundredths, so the comparison matches the decimal one
    if require_price_above_liters && price_minor <= liters_centi {
        return Err(ValidationError::PriceNotAboveLiters);
    }

    let adblue_centi = payload
        .adblue
        .map(|v| decimal(v, MAX_AMOUNT, "adblue").map(to_centi))
        .transpose()?;

    Ok(MovementDraft {
        station_id: payload.station_id,
        vehicle_id,
        date,
        km_start,
        km_end,
        liters_centi,
        price_minor,
        adblue_centi,
        notes: optional_text(payload.notes.as_deref()),
        photo_path: optional_text(payload.photo_path.as_deref()),
    })
}

pub fn validate_station(payload: &StationRequest) -> ValidationResult<StationDraft> {
    let name = required_text(payload.name.as_deref(), "name")?;

    let credit_balance_minor = match payload.credit_balance {
        None => None,
        Some(None) => Some(None),
        Some(Some(value)) => {
            let balance = decimal(value, MAX_BALANCE, "credit_balance")?;
            Some(Some(to_minor(balance)))
        }
    };

    Ok(StationDraft {
        name,
        address: optional_text(payload.address.as_deref()),
        credit_balance_minor,
    })
}

pub fn validate_vehicle(payload: &VehicleRequest) -> ValidationResult<VehicleRow> {
    Ok(VehicleRow {
        name: required_text(payload.name.as_deref(), "name")?,
        plate: optional_text(payload.plate.as_deref()),
        color: optional_text(payload.color.as_deref()),
        current_km: non_negative(payload.current_km.unwrap_or(0), "current_km")?,
        maintenance_km: non_negative(payload.maintenance_km.unwrap_or(0), "maintenance_km")?,
    })
}

pub fn validate_supplier(payload: &SupplierRequest) -> ValidationResult<NewSupplier> {
    Ok(NewSupplier {
        name: required_text(payload.name.as_deref(), "name")?,
        address: optional_text(payload.address.as_deref()),
    })
}

/// Validate a maintenance payload
///
/// Invoice number and notes are mandatory; `km_after` defaults to 0 (no km
/// target) and price to 0.
pub fn validate_maintenance(payload: &MaintenanceRequest) -> ValidationResult<MaintenanceDraft> {
    let vehicle_id = required(payload.vehicle_id, "vehicle_id")?;
    let supplier_id = required(payload.supplier_id, "supplier_id")?;
    let date = required(payload.date, "date")?;
    let km_current = non_negative(required(payload.km_current, "km_current")?, "km_current")?;
    let km_after = non_negative(payload.km_after.unwrap_or(0), "km_after")?;
    let price_minor = to_minor(decimal(payload.price.unwrap_or(0.0), MAX_AMOUNT, "price")?);

    Ok(MaintenanceDraft {
        vehicle_id,
        supplier_id,
        date,
        km_current,
        km_after,
        next_maintenance_date: payload.next_maintenance_date,
        price_minor,
        invoice_number: required_text(payload.invoice_number.as_deref(), "invoice_number")?,
        notes: required_text(payload.notes.as_deref(), "notes")?,
        attachment_path: optional_text(payload.attachment_path.as_deref()),
    })
}

/// `per_page`: `all` disables paging, positive numbers are capped at
/// [`MAX_PER_PAGE`], anything else falls back to the default
pub fn parse_per_page(raw: Option<&str>) -> Option<i64> {
    match raw.map(str::trim) {
        Some("all") => None,
        Some(value) => match value.parse::<i64>() {
            Ok(n) if n > 0 => Some(n.min(MAX_PER_PAGE)),
            _ => Some(DEFAULT_PER_PAGE),
        },
        None => Some(DEFAULT_PER_PAGE),
    }
}

/// Inclusive UTC bounds covering whole days
pub fn day_bounds(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> ValidationResult<(Option<DateTime<Utc>>, Option<DateTime<Utc>>)> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ValidationError::InvalidDateRange);
        }
    }

    let from = start
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc());
    let to = end
        .and_then(|d| d.and_hms_micro_opt(23, 59, 59, 999_999))
        .map(|dt| dt.and_utc());

    Ok((from, to))
}
