//! Append-only journal of station balance changes

use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{BalanceAdjustment, NewBalanceAdjustment};

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    adjustment: &NewBalanceAdjustment,
) -> Result<BalanceAdjustment, sqlx::Error> {
    sqlx::query_as::<_, BalanceAdjustment>(
        r#"
        INSERT INTO station_balance_adjustments (
            station_id, movement_id, reason, delta_minor,
            balance_before_minor, balance_after_minor
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING
            id, station_id, movement_id, reason, delta_minor,
            balance_before_minor, balance_after_minor, created_at
        "#,
    )
    .bind(adjustment.station_id)
    .bind(adjustment.movement_id)
    .bind(adjustment.reason)
    .bind(adjustment.delta_minor)
    .bind(adjustment.balance_before_minor)
    .bind(adjustment.balance_after_minor)
    .fetch_one(&mut **tx)
    .await
}

pub async fn list_by_station(
    pool: &PgPool,
    station_id: i64,
) -> Result<Vec<BalanceAdjustment>, sqlx::Error> {
    sqlx::query_as::<_, BalanceAdjustment>(
        r#"
        SELECT
            id, station_id, movement_id, reason, delta_minor,
            balance_before_minor, balance_after_minor, created_at
        FROM station_balance_adjustments
        WHERE station_id = $1
        ORDER BY id
        "#,
    )
    .bind(station_id)
    .fetch_all(pool)
    .await
}
