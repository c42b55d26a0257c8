//! Repository for stations and their prepaid balance
//!
//! The balance column is only written through [`tx_add_to_balance`] (guarded
//! additive update) and [`tx_overwrite_balance`] (admin set). Both run inside
//! the caller's transaction.

use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{NewStation, Station};
use crate::store::DeltaOutcome;

const STATION_COLUMNS: &str = "id, name, address, credit_balance_minor, created_at, updated_at";

pub async fn list(pool: &PgPool) -> Result<Vec<Station>, sqlx::Error> {
    let sql = format!("SELECT {STATION_COLUMNS} FROM stations ORDER BY name, id");
    sqlx::query_as::<_, Station>(&sql).fetch_all(pool).await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Station>, sqlx::Error> {
    let sql = format!("SELECT {STATION_COLUMNS} FROM stations WHERE id = $1");
    sqlx::query_as::<_, Station>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Station>, sqlx::Error> {
    let sql = format!("SELECT {STATION_COLUMNS} FROM stations WHERE id = $1");
    sqlx::query_as::<_, Station>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

/// Read a station with `FOR UPDATE`, serialising concurrent admin overwrites
pub async fn lock_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Station>, sqlx::Error> {
    let sql = format!("SELECT {STATION_COLUMNS} FROM stations WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, Station>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    station: &NewStation,
) -> Result<Station, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO stations (name, address, credit_balance_minor)
        VALUES ($1, $2, $3)
        RETURNING {STATION_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Station>(&sql)
        .bind(&station.name)
        .bind(&station.address)
        .bind(station.credit_balance_minor)
        .fetch_one(&mut **tx)
        .await
}

pub async fn update_details_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    name: &str,
    address: Option<&str>,
) -> Result<Option<Station>, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE stations
        SET name = $2, address = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {STATION_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Station>(&sql)
        .bind(id)
        .bind(name)
        .bind(address)
        .fetch_optional(&mut **tx)
        .await
}

/// Add `delta_minor` to a tracked balance without letting it go negative
///
/// The guard lives in the `WHERE` clause, so two debits racing past the
/// service pre-check cannot both succeed. When no row is updated a follow-up
/// read classifies why.
pub async fn tx_add_to_balance(
    tx: &mut Transaction<'_, Postgres>,
    station_id: i64,
    delta_minor: i64,
) -> Result<DeltaOutcome, sqlx::Error> {
    let applied: Option<(i64, i64)> = sqlx::query_as(
        r#"
        UPDATE stations
        SET credit_balance_minor = credit_balance_minor + $2,
            updated_at = NOW()
        WHERE id = $1
          AND credit_balance_minor IS NOT NULL
          AND credit_balance_minor + $2 >= 0
        RETURNING credit_balance_minor - $2, credit_balance_minor
        "#,
    )
    .bind(station_id)
    .bind(delta_minor)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some((old, new)) = applied {
        return Ok(DeltaOutcome::Applied { old, new });
    }

    let current: Option<Option<i64>> =
        sqlx::query_scalar("SELECT credit_balance_minor FROM stations WHERE id = $1")
            .bind(station_id)
            .fetch_optional(&mut **tx)
            .await?;

    Ok(match current {
        None => DeltaOutcome::Missing,
        Some(None) => DeltaOutcome::Untracked,
        Some(Some(balance)) => DeltaOutcome::Insufficient { balance },
    })
}

pub async fn tx_overwrite_balance(
    tx: &mut Transaction<'_, Postgres>,
    station_id: i64,
    balance_minor: Option<i64>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE stations
        SET credit_balance_minor = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(station_id)
    .bind(balance_minor)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn count_movements_tx(
    tx: &mut Transaction<'_, Postgres>,
    station_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM movements WHERE station_id = $1")
        .bind(station_id)
        .fetch_one(&mut **tx)
        .await
}

pub async fn delete_tx(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM stations WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() > 0)
}
