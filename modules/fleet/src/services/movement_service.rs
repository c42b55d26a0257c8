//! Movement lifecycle
//!
//! Orchestrates refuel create/update/delete explicitly:
//! validation → ledger pre-check → movement write + ledger delta + odometer
//! sync in one transaction → commit → threshold notifications, refuel event
//! and maintenance km check.
//!
//! A debit the pre-check lets through can still be refused by the guarded
//! balance update; the transaction is then dropped and nothing is persisted.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::models::{AdjustmentReason, Movement, MovementFilter, MovementRow, Station, Vehicle};
use crate::services::charge_deltas::{compute_reconciliation, StationCharge};
use crate::services::efficiency::km_per_liter_centi;
use crate::services::ledger::{self, BalanceChange, LedgerError};
use crate::services::maintenance_service;
use crate::services::FleetContext;
use crate::store::{PageRequest, StoreError, StoreResult, StoreTx};
use crate::validation::{MovementDraft, ValidationError};

#[derive(Debug, Error)]
pub enum MovementError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("insufficient station credit")]
    InsufficientCredit {
        station_id: i64,
        available: i64,
        requested: i64,
    },

    #[error("movement {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for MovementError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientCredit {
                station_id,
                available,
                requested,
            } => MovementError::InsufficientCredit {
                station_id,
                available,
                requested,
            },
            LedgerError::StationNotFound(id) => {
                MovementError::Validation(ValidationError::UnknownReference {
                    field: "station_id",
                    id,
                })
            }
            LedgerError::NegativeBalance(_) => {
                MovementError::Validation(ValidationError::Negative("credit_balance"))
            }
            LedgerError::Store(e) => MovementError::Store(e),
        }
    }
}

pub type MovementResult<T> = Result<T, MovementError>;

/// One page of a movement listing
#[derive(Debug, Clone, Serialize)]
pub struct MovementPage {
    pub data: Vec<Movement>,
    pub total: i64,
    pub page: i64,
    /// `None` when the whole listing was requested
    pub per_page: Option<i64>,
    pub last_page: i64,
}

fn record_outcome<T>(ctx: &FleetContext, operation: &str, result: &MovementResult<T>) {
    let label = match result {
        Ok(_) => "ok",
        Err(MovementError::InsufficientCredit { .. }) => {
            ctx.metrics.credit_rejections_total.inc();
            "rejected"
        }
        Err(MovementError::Validation(_)) => "rejected",
        Err(MovementError::NotFound(_)) => "not_found",
        Err(MovementError::Store(_)) => "error",
    };
    ctx.metrics.record_movement(operation, label);
}

async fn vehicle_for(tx: &mut dyn StoreTx, vehicle_id: i64) -> MovementResult<Vehicle> {
    tx.find_vehicle(vehicle_id).await?.ok_or_else(|| {
        ValidationError::UnknownReference {
            field: "vehicle_id",
            id: vehicle_id,
        }
        .into()
    })
}

async fn station_for(tx: &mut dyn StoreTx, station_id: Option<i64>) -> MovementResult<Option<Station>> {
    let Some(id) = station_id else {
        return Ok(None);
    };
    match tx.find_station(id).await? {
        Some(station) => Ok(Some(station)),
        None => Err(ValidationError::UnknownReference {
            field: "station_id",
            id,
        }
        .into()),
    }
}

fn reject_insufficient(station: &Station, requested: i64, released: i64) -> MovementError {
    let available = station
        .credit_balance_minor
        .unwrap_or(0)
        .saturating_add(released);
    tracing::warn!(
        station_id = station.id,
        available_minor = available,
        requested_minor = requested,
        "Refuel rejected: insufficient station credit"
    );
    MovementError::InsufficientCredit {
        station_id: station.id,
        available,
        requested,
    }
}

fn movement_row(
    author: String,
    updated_by: Option<String>,
    draft: &MovementDraft,
    station_charge_minor: i64,
) -> MovementRow {
    MovementRow {
        author,
        updated_by,
        station_id: draft.station_id,
        vehicle_id: draft.vehicle_id,
        date: draft.date,
        km_start: draft.km_start,
        km_end: draft.km_end,
        liters_centi: draft.liters_centi,
        price_minor: draft.price_minor,
        station_charge_minor,
        adblue_centi: draft.adblue_centi,
        km_per_liter: km_per_liter_centi(draft.km_start, draft.km_end, draft.liters_centi),
        notes: draft.notes.clone(),
        photo_path: draft.photo_path.clone(),
    }
}

/// Point `current_km` at the vehicle's latest remaining movement
///
/// Latest is `(date desc, id desc)`. With no movements left the odometer
/// falls back to the vehicle's last maintenance reading.
pub async fn resync_odometer(tx: &mut dyn StoreTx, vehicle_id: i64) -> StoreResult<Option<i64>> {
    let Some(vehicle) = tx.find_vehicle(vehicle_id).await? else {
        return Ok(None);
    };

    let km = tx
        .latest_km_end(vehicle_id)
        .await?
        .unwrap_or(vehicle.maintenance_km);
    if km != vehicle.current_km {
        tx.set_vehicle_current_km(vehicle_id, km).await?;
    }
    Ok(Some(km))
}

async fn check_maintenance_due(ctx: &FleetContext, vehicle_ids: &BTreeSet<i64>) {
    for &vehicle_id in vehicle_ids {
        if let Err(e) = maintenance_service::check_km_due(ctx, vehicle_id).await {
            tracing::warn!(vehicle_id, error = %e, "Maintenance km check failed");
        }
    }
}

pub async fn create_movement(
    ctx: &FleetContext,
    author: &str,
    draft: MovementDraft,
) -> MovementResult<Movement> {
    let result = create(ctx, author, draft).await;
    record_outcome(ctx, "create", &result);
    result
}

async fn create(ctx: &FleetContext, author: &str, draft: MovementDraft) -> MovementResult<Movement> {
    let mut tx = ctx.store.begin().await?;

    let vehicle = vehicle_for(tx.as_mut(), draft.vehicle_id).await?;
    let station = station_for(tx.as_mut(), draft.station_id).await?;

    let charge = ledger::chargeable_amount(station.as_ref(), draft.price_minor);
    if let Some(station) = station.as_ref().filter(|_| charge > 0) {
        if !ledger::can_absorb(station, charge) {
            return Err(reject_insufficient(station, charge, 0));
        }
    }

    let movement = tx
        .insert_movement(&movement_row(author.to_string(), None, &draft, charge))
        .await?;

    let mut changes: Vec<BalanceChange> = Vec::new();
    if let Some(station) = station.as_ref() {
        changes.extend(
            ledger::apply_delta(
                tx.as_mut(),
                station,
                -charge,
                AdjustmentReason::MovementCharge,
                Some(movement.id),
            )
            .await?,
        );
    }

    tx.set_vehicle_current_km(vehicle.id, movement.km_end).await?;
    tx.commit().await?;

    tracing::info!(
        movement_id = movement.id,
        vehicle_id = movement.vehicle_id,
        station_id = ?movement.station_id,
        station_charge_minor = movement.station_charge_minor,
        "Movement created"
    );

    ctx.publish_balance_changes(&changes);
    let vehicle = Vehicle {
        current_km: movement.km_end,
        ..vehicle
    };
    ctx.notifier
        .refuel_recorded(&movement, &vehicle, station.as_ref());
    check_maintenance_due(ctx, &BTreeSet::from([vehicle.id])).await;

    Ok(movement)
}

pub async fn update_movement(
    ctx: &FleetContext,
    id: i64,
    updated_by: Option<&str>,
    draft: MovementDraft,
) -> MovementResult<Movement> {
    let result = update(ctx, id, updated_by, draft).await;
    record_outcome(ctx, "update", &result);
    result
}

async fn update(
    ctx: &FleetContext,
    id: i64,
    updated_by: Option<&str>,
    draft: MovementDraft,
) -> MovementResult<Movement> {
    let mut tx = ctx.store.begin().await?;

    let existing = tx
        .lock_movement(id)
        .await?
        .ok_or(MovementError::NotFound(id))?;

    vehicle_for(tx.as_mut(), draft.vehicle_id).await?;
    let new_station = station_for(tx.as_mut(), draft.station_id).await?;
    let old_station = match existing.station_id {
        Some(old_id) if Some(old_id) == draft.station_id => new_station.clone(),
        Some(old_id) => tx.find_station(old_id).await?,
        None => None,
    };

    let old_charge = existing.station_charge_minor;
    let new_charge = ledger::chargeable_amount(new_station.as_ref(), draft.price_minor);

    if let Some(station) = new_station.as_ref().filter(|_| new_charge > 0) {
        let released = if existing.station_id == Some(station.id) {
            old_charge
        } else {
            0
        };
        if !ledger::can_absorb_after_release(station, new_charge, released) {
            return Err(reject_insufficient(station, new_charge, released));
        }
    }

    let deltas = compute_reconciliation(
        existing.station_id.map(|station_id| StationCharge {
            station_id,
            amount_minor: old_charge,
        }),
        new_station.as_ref().map(|station| StationCharge {
            station_id: station.id,
            amount_minor: new_charge,
        }),
    );

    let mut changes: Vec<BalanceChange> = Vec::new();
    for delta in deltas {
        let station = [old_station.as_ref(), new_station.as_ref()]
            .into_iter()
            .flatten()
            .find(|s| s.id == delta.station_id);
        if let Some(station) = station {
            changes.extend(
                ledger::apply_delta(tx.as_mut(), station, delta.delta_minor, delta.reason, Some(id))
                    .await?,
            );
        }
    }

    let updated_by = updated_by
        .map(str::to_string)
        .or_else(|| existing.updated_by.clone());
    let movement = tx
        .update_movement(
            id,
            &movement_row(existing.author.clone(), updated_by, &draft, new_charge),
        )
        .await?;

    let vehicles = BTreeSet::from([existing.vehicle_id, movement.vehicle_id]);
    for &vehicle_id in &vehicles {
        resync_odometer(tx.as_mut(), vehicle_id).await?;
    }
    tx.commit().await?;

    tracing::info!(
        movement_id = id,
        old_station_id = ?existing.station_id,
        new_station_id = ?movement.station_id,
        old_charge_minor = old_charge,
        new_charge_minor = new_charge,
        "Movement updated"
    );

    ctx.publish_balance_changes(&changes);
    check_maintenance_due(ctx, &vehicles).await;

    Ok(movement)
}

pub async fn delete_movement(ctx: &FleetContext, id: i64) -> MovementResult<()> {
    let result = delete_many(ctx, &[id]).await.map(|_| ());
    record_outcome(ctx, "delete", &result);
    result
}

/// Delete several movements in one transaction, releasing every charge
///
/// All-or-nothing: an unknown id aborts the whole batch.
pub async fn delete_movements(ctx: &FleetContext, ids: &[i64]) -> MovementResult<usize> {
    let result = if ids.is_empty() {
        Err(ValidationError::Required("ids").into())
    } else {
        delete_many(ctx, ids).await
    };
    record_outcome(ctx, "bulk_delete", &result);
    result
}

async fn delete_many(ctx: &FleetContext, ids: &[i64]) -> MovementResult<usize> {
    let ids: BTreeSet<i64> = ids.iter().copied().collect();
    let mut tx = ctx.store.begin().await?;

    let mut changes: Vec<BalanceChange> = Vec::new();
    let mut vehicles: BTreeSet<i64> = BTreeSet::new();

    for &id in &ids {
        let movement = tx
            .lock_movement(id)
            .await?
            .ok_or(MovementError::NotFound(id))?;

        if let Some(station_id) = movement.station_id {
            if let Some(station) = tx.find_station(station_id).await? {
                changes.extend(
                    ledger::apply_delta(
                        tx.as_mut(),
                        &station,
                        movement.station_charge_minor,
                        AdjustmentReason::MovementRelease,
                        Some(id),
                    )
                    .await?,
                );
            }
        }

        tx.delete_movement(id).await?;
        vehicles.insert(movement.vehicle_id);
    }

    for &vehicle_id in &vehicles {
        resync_odometer(tx.as_mut(), vehicle_id).await?;
    }
    tx.commit().await?;

    tracing::info!(
        count = ids.len(),
        released = changes.len(),
        "Movements deleted"
    );

    ctx.publish_balance_changes(&changes);
    Ok(ids.len())
}

pub async fn get_movement(ctx: &FleetContext, id: i64) -> MovementResult<Movement> {
    ctx.store
        .find_movement(id)
        .await?
        .ok_or(MovementError::NotFound(id))
}

/// List movements latest first; `per_page = None` returns everything
pub async fn list_movements(
    ctx: &FleetContext,
    filter: &MovementFilter,
    per_page: Option<i64>,
    page: i64,
) -> MovementResult<MovementPage> {
    let page = page.max(1);
    let total = ctx.store.count_movements(filter).await?;
    let request = per_page.map(|per_page| PageRequest { page, per_page });
    let data = ctx.store.list_movements(filter, request).await?;

    let last_page = match per_page {
        Some(per_page) => {
            let per_page = per_page.max(1);
            (total / per_page + i64::from(total % per_page != 0)).max(1)
        }
        None => 1,
    };

    Ok(MovementPage {
        data,
        total,
        page: if per_page.is_some() { page } else { 1 },
        per_page,
        last_page,
    })
}
