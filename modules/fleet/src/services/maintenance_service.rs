//! Maintenance records and due alerts
//!
//! Two alert kinds, each sent at most once per maintenance until its due
//! fields change:
//! - date: the vehicle's latest pending maintenance reached its
//!   `next_maintenance_date` (periodic scan or manual trigger)
//! - km: the odometer got within the tolerance of `km_after` (checked after
//!   every committed refuel)

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Maintenance, MaintenanceFilter, MaintenanceRow, Supplier, Vehicle};
use crate::services::FleetContext;
use crate::store::{StoreError, StoreTx};
use crate::validation::{MaintenanceDraft, ValidationError};

#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("maintenance {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type MaintenanceResult<T> = Result<T, MaintenanceError>;

/// Whether the odometer is within `tolerance_km` of the km target
pub fn should_alert_for_km(km_after: i64, current_km: i64, tolerance_km: i64) -> bool {
    km_after > 0 && current_km >= km_after - tolerance_km
}

pub fn is_date_reached(due: Option<NaiveDate>, today: NaiveDate) -> bool {
    due.is_some_and(|due| due <= today)
}

async fn references(
    tx: &mut dyn StoreTx,
    draft: &MaintenanceDraft,
) -> MaintenanceResult<(Vehicle, Supplier)> {
    let vehicle = tx
        .find_vehicle(draft.vehicle_id)
        .await?
        .ok_or(ValidationError::UnknownReference {
            field: "vehicle_id",
            id: draft.vehicle_id,
        })?;
    let supplier = tx
        .find_supplier(draft.supplier_id)
        .await?
        .ok_or(ValidationError::UnknownReference {
            field: "supplier_id",
            id: draft.supplier_id,
        })?;
    Ok((vehicle, supplier))
}

fn maintenance_row(author: String, draft: MaintenanceDraft) -> MaintenanceRow {
    MaintenanceRow {
        author,
        vehicle_id: draft.vehicle_id,
        supplier_id: draft.supplier_id,
        date: draft.date,
        km_current: draft.km_current,
        km_after: draft.km_after,
        next_maintenance_date: draft.next_maintenance_date,
        price_minor: draft.price_minor,
        invoice_number: draft.invoice_number,
        notes: draft.notes,
        attachment_path: draft.attachment_path,
    }
}

/// Record a maintenance; the vehicle's `maintenance_km` follows `km_current`
pub async fn create_maintenance(
    ctx: &FleetContext,
    author: &str,
    draft: MaintenanceDraft,
) -> MaintenanceResult<Maintenance> {
    let mut tx = ctx.store.begin().await?;

    let (vehicle, supplier) = references(tx.as_mut(), &draft).await?;
    let maintenance = tx
        .insert_maintenance(&maintenance_row(author.to_string(), draft))
        .await?;
    tx.set_vehicle_maintenance_km(vehicle.id, maintenance.km_current)
        .await?;
    tx.commit().await?;

    tracing::info!(
        maintenance_id = maintenance.id,
        vehicle_id = vehicle.id,
        supplier_id = supplier.id,
        km_after = maintenance.km_after,
        "Maintenance created"
    );

    let vehicle = Vehicle {
        maintenance_km: maintenance.km_current,
        ..vehicle
    };
    ctx.notifier
        .maintenance_recorded(&maintenance, &vehicle, &supplier);
    Ok(maintenance)
}

/// Edit a maintenance; changing the vehicle or a due field re-arms both alerts
pub async fn update_maintenance(
    ctx: &FleetContext,
    id: i64,
    draft: MaintenanceDraft,
) -> MaintenanceResult<Maintenance> {
    let mut tx = ctx.store.begin().await?;

    let existing = tx
        .lock_maintenance(id)
        .await?
        .ok_or(MaintenanceError::NotFound(id))?;
    references(tx.as_mut(), &draft).await?;

    let reset_alerts = existing.vehicle_id != draft.vehicle_id
        || existing.km_after != draft.km_after
        || existing.next_maintenance_date != draft.next_maintenance_date;

    let maintenance = tx
        .update_maintenance(id, &maintenance_row(existing.author, draft), reset_alerts)
        .await?;
    tx.commit().await?;

    tracing::info!(maintenance_id = id, reset_alerts, "Maintenance updated");
    Ok(maintenance)
}

pub async fn delete_maintenance(ctx: &FleetContext, id: i64) -> MaintenanceResult<()> {
    let mut tx = ctx.store.begin().await?;
    if tx.lock_maintenance(id).await?.is_none() {
        return Err(MaintenanceError::NotFound(id));
    }
    tx.delete_maintenance(id).await?;
    tx.commit().await?;

    tracing::info!(maintenance_id = id, "Maintenance deleted");
    Ok(())
}

pub async fn get_maintenance(ctx: &FleetContext, id: i64) -> MaintenanceResult<Maintenance> {
    ctx.store
        .find_maintenance(id)
        .await?
        .ok_or(MaintenanceError::NotFound(id))
}

pub async fn list_maintenances(
    ctx: &FleetContext,
    filter: &MaintenanceFilter,
) -> MaintenanceResult<Vec<Maintenance>> {
    Ok(ctx.store.list_maintenances(filter).await?)
}

/// Send the km alert of the vehicle's latest km target if it is due
///
/// Returns whether an alert went out.
pub async fn check_km_due(ctx: &FleetContext, vehicle_id: i64) -> MaintenanceResult<bool> {
    let tolerance = ctx.settings.maintenance_km_tolerance;
    let mut tx = ctx.store.begin().await?;

    let Some(vehicle) = tx.find_vehicle(vehicle_id).await? else {
        return Ok(false);
    };
    let Some(target) = tx.latest_km_target(vehicle_id).await? else {
        return Ok(false);
    };
    if target.km_alert_sent_at.is_some()
        || !should_alert_for_km(target.km_after, vehicle.current_km, tolerance)
    {
        return Ok(false);
    }

    tx.mark_km_alert_sent(target.id).await?;
    tx.commit().await?;

    tracing::info!(
        vehicle_id,
        maintenance_id = target.id,
        current_km = vehicle.current_km,
        km_after = target.km_after,
        "Maintenance km alert sent"
    );
    ctx.metrics
        .due_alerts_sent_total
        .with_label_values(&["km"])
        .inc();
    ctx.notifier
        .maintenance_km_due(&target, &vehicle, tolerance);
    Ok(true)
}

/// Scan every vehicle with a due date on or before `today` and alert once
///
/// Only the vehicle's latest pending maintenance counts, ordered by
/// `(date desc, id desc)`. Returns the number of alerts sent.
pub async fn notify_due_date_alerts(ctx: &FleetContext, today: NaiveDate) -> MaintenanceResult<usize> {
    let mut tx = ctx.store.begin().await?;

    let mut due: Vec<(Maintenance, Vehicle)> = Vec::new();
    for vehicle_id in tx.vehicles_with_due_dates(today).await? {
        let Some(pending) = tx.latest_pending_maintenance(vehicle_id).await? else {
            continue;
        };
        if !is_date_reached(pending.next_maintenance_date, today) {
            continue;
        }
        let Some(vehicle) = tx.find_vehicle(vehicle_id).await? else {
            continue;
        };

        tx.mark_date_alert_sent(pending.id).await?;
        due.push((pending, vehicle));
    }
    tx.commit().await?;

    for (maintenance, vehicle) in &due {
        tracing::info!(
            vehicle_id = vehicle.id,
            maintenance_id = maintenance.id,
            next_maintenance_date = ?maintenance.next_maintenance_date,
            "Maintenance date alert sent"
        );
        ctx.metrics
            .due_alerts_sent_total
            .with_label_values(&["date"])
            .inc();
        ctx.notifier.maintenance_date_due(maintenance, vehicle);
    }

    Ok(due.len())
}
