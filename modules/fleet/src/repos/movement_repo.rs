//! Repository for refuel movements
//!
//! Listing order is always `(date DESC, id DESC)`; the odometer resync relies
//! on the same order through [`latest_km_end_tx`].

use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{Movement, MovementFilter, MovementRow};
use crate::store::PageRequest;

const MOVEMENT_COLUMNS: &str = r#"
    id, author, updated_by, station_id, vehicle_id, date, km_start, km_end,
    liters_centi, price_minor, station_charge_minor, adblue_centi, km_per_liter,
    notes, photo_path, created_at, updated_at
"#;

const FILTER_CLAUSE: &str = r#"
    ($1::BIGINT IS NULL OR vehicle_id = $1)
    AND ($2::BIGINT IS NULL OR station_id = $2)
    AND ($3::TEXT IS NULL OR author = $3)
    AND ($4::TIMESTAMPTZ IS NULL OR date >= $4)
    AND ($5::TIMESTAMPTZ IS NULL OR date <= $5)
"#;

/// List movements matching `filter`; `page = None` returns every row
pub async fn list(
    pool: &PgPool,
    filter: &MovementFilter,
    page: Option<PageRequest>,
) -> Result<Vec<Movement>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {MOVEMENT_COLUMNS}
        FROM movements
        WHERE {FILTER_CLAUSE}
        ORDER BY date DESC, id DESC
        LIMIT $6 OFFSET $7
        "#
    );
    sqlx::query_as::<_, Movement>(&sql)
        .bind(filter.vehicle_id)
        .bind(filter.station_id)
        .bind(filter.author.as_deref())
        .bind(filter.from)
        .bind(filter.to)
        .bind(page.map(|p| p.per_page))
        .bind(page.map(|p| p.offset()).unwrap_or(0))
        .fetch_all(pool)
        .await
}

pub async fn count(pool: &PgPool, filter: &MovementFilter) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM movements WHERE {FILTER_CLAUSE}");
    sqlx::query_scalar(&sql)
        .bind(filter.vehicle_id)
        .bind(filter.station_id)
        .bind(filter.author.as_deref())
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(pool)
        .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Movement>, sqlx::Error> {
    let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM movements WHERE id = $1");
    sqlx::query_as::<_, Movement>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Read a movement with `FOR UPDATE` so edits and deletes see a stable charge
pub async fn lock_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Movement>, sqlx::Error> {
    let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM movements WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, Movement>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    movement: &MovementRow,
) -> Result<Movement, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO movements (
            author, updated_by, station_id, vehicle_id, date, km_start, km_end,
            liters_centi, price_minor, station_charge_minor, adblue_centi,
            km_per_liter, notes, photo_path
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING {MOVEMENT_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Movement>(&sql)
        .bind(&movement.author)
        .bind(&movement.updated_by)
        .bind(movement.station_id)
        .bind(movement.vehicle_id)
        .bind(movement.date)
        .bind(movement.km_start)
        .bind(movement.km_end)
        .bind(movement.liters_centi)
        .bind(movement.price_minor)
        .bind(movement.station_charge_minor)
        .bind(movement.adblue_centi)
        .bind(movement.km_per_liter)
        .bind(&movement.notes)
        .bind(&movement.photo_path)
        .fetch_one(&mut **tx)
        .await
}

pub async fn update_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    movement: &MovementRow,
) -> Result<Option<Movement>, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE movements
        SET author = $2,
            updated_by = $3,
            station_id = $4,
            vehicle_id = $5,
            date = $6,
            km_start = $7,
            km_end = $8,
            liters_centi = $9,
            price_minor = $10,
            station_charge_minor = $11,
            adblue_centi = $12,
            km_per_liter = $13,
            notes = $14,
            photo_path = $15,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {MOVEMENT_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Movement>(&sql)
        .bind(id)
        .bind(&movement.author)
        .bind(&movement.updated_by)
        .bind(movement.station_id)
        .bind(movement.vehicle_id)
        .bind(movement.date)
        .bind(movement.km_start)
        .bind(movement.km_end)
        .bind(movement.liters_centi)
        .bind(movement.price_minor)
        .bind(movement.station_charge_minor)
        .bind(movement.adblue_centi)
        .bind(movement.km_per_liter)
        .bind(&movement.notes)
        .bind(&movement.photo_path)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn delete_tx(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM movements WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn latest_km_end_tx(
    tx: &mut Transaction<'_, Postgres>,
    vehicle_id: i64,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT km_end
        FROM movements
        WHERE vehicle_id = $1
        ORDER BY date DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(vehicle_id)
    .fetch_optional(&mut **tx)
    .await
}
