//! Station credit ledger
//!
//! A station's prepaid balance is a single scalar account. Every mutation goes
//! through this module, runs inside the caller's transaction and appends one
//! row to the adjustment journal. Untracked stations (`credit_balance_minor`
//! is `NULL`) are never written.

use thiserror::Error;

use crate::models::{AdjustmentReason, NewBalanceAdjustment, Station};
use crate::store::{DeltaOutcome, StoreError, StoreTx};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient station credit: station {station_id} has {available}, requested {requested}")]
    InsufficientCredit {
        station_id: i64,
        available: i64,
        requested: i64,
    },

    #[error("station {0} not found")]
    StationNotFound(i64),

    #[error("credit balance must be non-negative, got {0}")]
    NegativeBalance(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Before/after pair of one committed ledger mutation
///
/// `new_balance == None` only happens when an admin stops tracking a station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceChange {
    pub station_id: i64,
    pub station_name: String,
    pub reason: AdjustmentReason,
    pub old_balance: Option<i64>,
    pub new_balance: Option<i64>,
}

/// Amount a refuel of `requested` would debit from `station`
pub fn chargeable_amount(station: Option<&Station>, requested: i64) -> i64 {
    match station {
        Some(station) if station.is_tracked() => requested,
        _ => 0,
    }
}

pub fn can_absorb(station: &Station, amount: i64) -> bool {
    can_absorb_after_release(station, amount, 0)
}

/// Whether `station` can absorb `amount` once `released` has been credited back
pub fn can_absorb_after_release(station: &Station, amount: i64, released: i64) -> bool {
    if amount <= 0 {
        return true;
    }
    match station.credit_balance_minor {
        // an overflowing sum is above any representable amount
        Some(balance) => balance
            .checked_add(released)
            .map_or(true, |available| available >= amount),
        None => false,
    }
}

/// Add `delta` to the station balance inside `tx`
///
/// No-op for a zero delta or an untracked station. A debit that would take the
/// balance below zero fails with [`LedgerError::InsufficientCredit`] and
/// writes nothing; the caller drops the transaction.
pub async fn apply_delta(
    tx: &mut dyn StoreTx,
    station: &Station,
    delta_minor: i64,
    reason: AdjustmentReason,
    movement_id: Option<i64>,
) -> LedgerResult<Option<BalanceChange>> {
    if delta_minor == 0 || !station.is_tracked() {
        return Ok(None);
    }

    match tx.add_to_balance(station.id, delta_minor).await? {
        DeltaOutcome::Applied { old, new } => {
            tx.record_adjustment(&NewBalanceAdjustment {
                station_id: station.id,
                movement_id,
                reason,
                delta_minor,
                balance_before_minor: Some(old),
                balance_after_minor: Some(new),
            })
            .await?;

            tracing::debug!(
                station_id = station.id,
                delta_minor,
                reason = reason.as_str(),
                old_balance_minor = old,
                new_balance_minor = new,
                "Station balance adjusted"
            );

            Ok(Some(BalanceChange {
                station_id: station.id,
                station_name: station.name.clone(),
                reason,
                old_balance: Some(old),
                new_balance: Some(new),
            }))
        }
        DeltaOutcome::Untracked => Ok(None),
        DeltaOutcome::Insufficient { balance } => {
            tracing::warn!(
                station_id = station.id,
                balance_minor = balance,
                delta_minor,
                "Guarded balance update rejected debit"
            );
            Err(LedgerError::InsufficientCredit {
                station_id: station.id,
                available: balance,
                requested: -delta_minor,
            })
        }
        DeltaOutcome::Missing => Err(LedgerError::StationNotFound(station.id)),
    }
}

/// Journal the balance a station was created with
///
/// Not a balance transition: creation never notifies.
pub async fn record_opening(tx: &mut dyn StoreTx, station: &Station) -> LedgerResult<()> {
    let Some(opening) = station.credit_balance_minor else {
        return Ok(());
    };

    tx.record_adjustment(&NewBalanceAdjustment {
        station_id: station.id,
        movement_id: None,
        reason: AdjustmentReason::Opening,
        delta_minor: opening,
        balance_before_minor: None,
        balance_after_minor: Some(opening),
    })
    .await?;
    Ok(())
}

/// Admin overwrite of a station balance
///
/// Locks the row, then writes `new_balance` blindly and journals a single
/// `admin_overwrite` adjustment of `new - old`. Setting the current value
/// again writes nothing.
pub async fn set_balance(
    tx: &mut dyn StoreTx,
    station_id: i64,
    new_balance: Option<i64>,
) -> LedgerResult<Option<BalanceChange>> {
    if let Some(value) = new_balance {
        if value < 0 {
            return Err(LedgerError::NegativeBalance(value));
        }
    }

    let station = tx
        .lock_station(station_id)
        .await?
        .ok_or(LedgerError::StationNotFound(station_id))?;

    let old_balance = station.credit_balance_minor;
    if old_balance == new_balance {
        return Ok(None);
    }

    tx.overwrite_balance(station_id, new_balance).await?;

    let delta_minor = new_balance.unwrap_or(0) - old_balance.unwrap_or(0);
    tx.record_adjustment(&NewBalanceAdjustment {
        station_id,
        movement_id: None,
        reason: AdjustmentReason::AdminOverwrite,
        delta_minor,
        balance_before_minor: old_balance,
        balance_after_minor: new_balance,
    })
    .await?;

    tracing::info!(
        station_id,
        old_balance_minor = ?old_balance,
        new_balance_minor = ?new_balance,
        "Station balance overwritten"
    );

    Ok(Some(BalanceChange {
        station_id,
        station_name: station.name,
        reason: AdjustmentReason::AdminOverwrite,
        old_balance,
        new_balance,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewStation;
    use crate::store::{FleetStore, InMemoryStore};
    use chrono::Utc;

    fn station(balance: Option<i64>) -> Station {
        Station {
            id: 1,
            name: "Central".to_string(),
            address: None,
            credit_balance_minor: balance,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_chargeable_amount() {
        assert_eq!(chargeable_amount(None, 800), 0);
        assert_eq!(chargeable_amount(Some(&station(None)), 800), 0);
        assert_eq!(chargeable_amount(Some(&station(Some(0))), 800), 800);
    }

    #[test]
    fn test_can_absorb() {
        assert!(can_absorb(&station(Some(800)), 800));
        assert!(!can_absorb(&station(Some(799)), 800));
        assert!(can_absorb(&station(None), 0));
        assert!(!can_absorb(&station(None), 1));
        assert!(can_absorb(&station(Some(0)), -50));
    }

    #[test]
    fn test_can_absorb_after_release() {
        // 300 already charged on the same station, editing to 400
        assert!(can_absorb_after_release(&station(Some(100)), 400, 300));
        assert!(!can_absorb_after_release(&station(Some(99)), 400, 300));
    }

    #[test]
    fn test_release_on_saturated_balance() {
        assert!(can_absorb_after_release(&station(Some(i64::MAX)), 500, 800));
        assert!(can_absorb(&station(Some(i64::MAX)), i64::MAX));
    }

    async fn seeded(balance: Option<i64>) -> (InMemoryStore, Station) {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let station = tx
            .insert_station(&NewStation {
                name: "Central".to_string(),
                address: None,
                credit_balance_minor: balance,
            })
            .await
            .unwrap();
        tx.commit().await.unwrap();
        (store, station)
    }

    #[tokio::test]
    async fn test_apply_delta_records_adjustment() {
        let (store, station) = seeded(Some(6000)).await;

        let mut tx = store.begin().await.unwrap();
        let change = apply_delta(tx.as_mut(), &station, -800, AdjustmentReason::MovementCharge, Some(7))
            .await
            .unwrap()
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(change.old_balance, Some(6000));
        assert_eq!(change.new_balance, Some(5200));

        let journal = store.list_adjustments(station.id).await.unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].delta_minor, -800);
        assert_eq!(journal[0].movement_id, Some(7));
    }

    #[tokio::test]
    async fn test_apply_delta_untracked_is_noop() {
        let (store, station) = seeded(None).await;

        let mut tx = store.begin().await.unwrap();
        let change = apply_delta(tx.as_mut(), &station, -800, AdjustmentReason::MovementCharge, None)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(change.is_none());
        assert!(store.list_adjustments(station.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_delta_rejects_overdraw() {
        let (store, station) = seeded(Some(100)).await;

        let mut tx = store.begin().await.unwrap();
        let err = apply_delta(tx.as_mut(), &station, -500, AdjustmentReason::MovementCharge, None)
            .await
            .unwrap_err();
        drop(tx);

        assert!(matches!(
            err,
            LedgerError::InsufficientCredit { available: 100, requested: 500, .. }
        ));
        let after = store.find_station(station.id).await.unwrap().unwrap();
        assert_eq!(after.credit_balance_minor, Some(100));
    }

    #[tokio::test]
    async fn test_set_balance_single_overwrite_adjustment() {
        let (store, station) = seeded(Some(1000)).await;

        let mut tx = store.begin().await.unwrap();
        let change = set_balance(tx.as_mut(), station.id, Some(250)).await.unwrap().unwrap();
        tx.commit().await.unwrap();

        assert_eq!(change.old_balance, Some(1000));
        assert_eq!(change.new_balance, Some(250));

        let journal = store.list_adjustments(station.id).await.unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].reason, AdjustmentReason::AdminOverwrite);
        assert_eq!(journal[0].delta_minor, -750);
    }

    #[tokio::test]
    async fn test_set_balance_rejects_negative() {
        let (store, station) = seeded(Some(1000)).await;

        let mut tx = store.begin().await.unwrap();
        let err = set_balance(tx.as_mut(), station.id, Some(-1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::NegativeBalance(-1)));
    }
}
