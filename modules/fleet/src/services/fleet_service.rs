//! Vehicles and suppliers

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::models::{NewSupplier, Supplier, Vehicle, VehicleRow};
use crate::services::efficiency::EfficiencyAccumulator;
use crate::services::FleetContext;
use crate::store::StoreError;
use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("vehicle {0} not found")]
    VehicleNotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type FleetResult<T> = Result<T, FleetError>;

/// Vehicle row of the listing, with its average over qualifying refuels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSummary {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub refuel_km_per_liter_avg: Option<f64>,
}

pub async fn list_vehicles(ctx: &FleetContext) -> FleetResult<Vec<VehicleSummary>> {
    let vehicles = ctx.store.list_vehicles().await?;
    let totals: HashMap<i64, EfficiencyAccumulator> = ctx
        .store
        .vehicle_refuel_totals()
        .await?
        .into_iter()
        .map(|t| {
            (
                t.vehicle_id,
                EfficiencyAccumulator {
                    distance_km: t.distance_km,
                    liters_centi: t.liters_centi,
                },
            )
        })
        .collect();

    Ok(vehicles
        .into_iter()
        .map(|vehicle| {
            let refuel_km_per_liter_avg = totals.get(&vehicle.id).and_then(|acc| acc.average());
            VehicleSummary {
                vehicle,
                refuel_km_per_liter_avg,
            }
        })
        .collect())
}

pub async fn get_vehicle(ctx: &FleetContext, id: i64) -> FleetResult<Vehicle> {
    ctx.store
        .find_vehicle(id)
        .await?
        .ok_or(FleetError::VehicleNotFound(id))
}

pub async fn create_vehicle(ctx: &FleetContext, row: VehicleRow) -> FleetResult<Vehicle> {
    let mut tx = ctx.store.begin().await?;
    let vehicle = tx.insert_vehicle(&row).await?;
    tx.commit().await?;

    tracing::info!(vehicle_id = vehicle.id, "Vehicle created");
    Ok(vehicle)
}

/// Admin edit; odometer values are taken as given
pub async fn update_vehicle(ctx: &FleetContext, id: i64, row: VehicleRow) -> FleetResult<Vehicle> {
    let mut tx = ctx.store.begin().await?;
    let vehicle = tx
        .update_vehicle(id, &row)
        .await?
        .ok_or(FleetError::VehicleNotFound(id))?;
    tx.commit().await?;

    tracing::info!(vehicle_id = id, current_km = vehicle.current_km, "Vehicle updated");
    Ok(vehicle)
}

pub async fn list_suppliers(ctx: &FleetContext) -> FleetResult<Vec<Supplier>> {
    Ok(ctx.store.list_suppliers().await?)
}

pub async fn create_supplier(ctx: &FleetContext, supplier: NewSupplier) -> FleetResult<Supplier> {
    let mut tx = ctx.store.begin().await?;
    let supplier = tx.insert_supplier(&supplier).await?;
    tx.commit().await?;

    tracing::info!(supplier_id = supplier.id, "Supplier created");
    Ok(supplier)
}
