//! Station administration
//!
//! Create with an optional opening balance, edit details and overwrite the
//! balance, delete while nothing references the station.

use thiserror::Error;

use crate::models::{BalanceAdjustment, NewStation, Station};
use crate::services::ledger::{self, LedgerError};
use crate::services::FleetContext;
use crate::store::StoreError;
use crate::validation::{StationDraft, ValidationError};

#[derive(Debug, Error)]
pub enum StationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("station {0} not found")]
    NotFound(i64),

    #[error("station {station_id} is referenced by {movements} movements")]
    InUse { station_id: i64, movements: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for StationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::StationNotFound(id) => StationError::NotFound(id),
            LedgerError::NegativeBalance(_) => {
                StationError::Validation(ValidationError::Negative("credit_balance"))
            }
            // overwrites never debit through the guard
            LedgerError::InsufficientCredit { .. } => {
                StationError::Validation(ValidationError::Negative("credit_balance"))
            }
            LedgerError::Store(e) => StationError::Store(e),
        }
    }
}

pub type StationResult<T> = Result<T, StationError>;

pub async fn list_stations(ctx: &FleetContext) -> StationResult<Vec<Station>> {
    Ok(ctx.store.list_stations().await?)
}

pub async fn get_station(ctx: &FleetContext, id: i64) -> StationResult<Station> {
    ctx.store
        .find_station(id)
        .await?
        .ok_or(StationError::NotFound(id))
}

pub async fn create_station(ctx: &FleetContext, draft: StationDraft) -> StationResult<Station> {
    let mut tx = ctx.store.begin().await?;

    let station = tx
        .insert_station(&NewStation {
            name: draft.name,
            address: draft.address,
            credit_balance_minor: draft.credit_balance_minor.flatten(),
        })
        .await?;
    ledger::record_opening(tx.as_mut(), &station).await?;
    tx.commit().await?;

    tracing::info!(
        station_id = station.id,
        credit_balance_minor = ?station.credit_balance_minor,
        "Station created"
    );
    Ok(station)
}

/// Edit name and address; a present `credit_balance_minor` overwrites the balance
pub async fn update_station(ctx: &FleetContext, id: i64, draft: StationDraft) -> StationResult<Station> {
    let mut tx = ctx.store.begin().await?;

    let mut station = tx
        .update_station_details(id, &draft.name, draft.address.as_deref())
        .await?
        .ok_or(StationError::NotFound(id))?;

    let change = match draft.credit_balance_minor {
        Some(balance) => {
            let change = ledger::set_balance(tx.as_mut(), id, balance).await?;
            station.credit_balance_minor = balance;
            change
        }
        None => None,
    };
    tx.commit().await?;

    tracing::info!(station_id = id, balance_changed = change.is_some(), "Station updated");

    ctx.publish_balance_changes(change.as_slice());
    Ok(station)
}

pub async fn delete_station(ctx: &FleetContext, id: i64) -> StationResult<()> {
    let mut tx = ctx.store.begin().await?;

    if tx.find_station(id).await?.is_none() {
        return Err(StationError::NotFound(id));
    }

    let movements = tx.count_station_movements(id).await?;
    if movements > 0 {
        return Err(StationError::InUse {
            station_id: id,
            movements,
        });
    }

    tx.delete_station(id).await?;
    tx.commit().await?;

    tracing::info!(station_id = id, "Station deleted");
    Ok(())
}

/// Balance audit journal, oldest first
pub async fn list_adjustments(ctx: &FleetContext, id: i64) -> StationResult<Vec<BalanceAdjustment>> {
    if ctx.store.find_station(id).await?.is_none() {
        return Err(StationError::NotFound(id));
    }
    Ok(ctx.store.list_adjustments(id).await?)
}
