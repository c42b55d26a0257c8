//! Ledger delta computation for movement edits
//!
//! An edit releases the old charge and applies the new one. When both land on
//! the same station they are netted into one delta, so the station sees a
//! single balance transition and a single notification.

use std::collections::BTreeMap;

use crate::models::AdjustmentReason;

/// Charge a movement holds (or will hold) against one station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationCharge {
    pub station_id: i64,
    pub amount_minor: i64,
}

/// Signed balance change for one station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChargeDelta {
    pub station_id: i64,
    pub delta_minor: i64,
    pub reason: AdjustmentReason,
}

/// Compute the deltas that move a movement from `old` to `new`
///
/// Zero deltas are dropped. Output is sorted by `station_id`, which keeps the
/// row-lock order of concurrent edits stable.
///
/// # Example
/// ```
/// use fleet_rs::services::charge_deltas::{compute_reconciliation, StationCharge};
///
/// let deltas = compute_reconciliation(
///     Some(StationCharge { station_id: 1, amount_minor: 300 }),
///     Some(StationCharge { station_id: 2, amount_minor: 400 }),
/// );
/// assert_eq!(deltas.len(), 2);
/// assert_eq!(deltas[0].delta_minor, 300);
/// assert_eq!(deltas[1].delta_minor, -400);
/// ```
pub fn compute_reconciliation(
    old: Option<StationCharge>,
    new: Option<StationCharge>,
) -> Vec<ChargeDelta> {
    // station_id -> (released, charged)
    let mut per_station: BTreeMap<i64, (i64, i64)> = BTreeMap::new();

    if let Some(old) = old {
        per_station.entry(old.station_id).or_insert((0, 0)).0 += old.amount_minor;
    }
    if let Some(new) = new {
        per_station.entry(new.station_id).or_insert((0, 0)).1 += new.amount_minor;
    }

    per_station
        .into_iter()
        .filter_map(|(station_id, (released, charged))| {
            let delta_minor = released - charged;
            if delta_minor == 0 {
                return None;
            }
            let reason = match (released > 0, charged > 0) {
                (true, true) => AdjustmentReason::MovementReconcile,
                (true, false) => AdjustmentReason::MovementRelease,
                _ => AdjustmentReason::MovementCharge,
            };
            Some(ChargeDelta {
                station_id,
                delta_minor,
                reason,
            })
        })
        .collect()
}
