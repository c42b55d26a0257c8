//! Repository for maintenances and their due-alert flags

use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{Maintenance, MaintenanceFilter, MaintenanceRow};

const MAINTENANCE_COLUMNS: &str = r#"
    id, author, vehicle_id, supplier_id, date, km_current, km_after,
    next_maintenance_date, price_minor, invoice_number, notes, attachment_path,
    date_alert_sent_at, km_alert_sent_at, created_at, updated_at
"#;

pub async fn list(pool: &PgPool, filter: &MaintenanceFilter) -> Result<Vec<Maintenance>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {MAINTENANCE_COLUMNS}
        FROM maintenances
        WHERE ($1::BIGINT IS NULL OR vehicle_id = $1)
          AND ($2::BIGINT IS NULL OR supplier_id = $2)
          AND ($3::TEXT IS NULL OR author = $3)
          AND ($4::TIMESTAMPTZ IS NULL OR date >= $4)
          AND ($5::TIMESTAMPTZ IS NULL OR date <= $5)
        ORDER BY date DESC, id DESC
        "#
    );
    sqlx::query_as::<_, Maintenance>(&sql)
        .bind(filter.vehicle_id)
        .bind(filter.supplier_id)
        .bind(filter.author.as_deref())
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(pool)
        .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Maintenance>, sqlx::Error> {
    let sql = format!("SELECT {MAINTENANCE_COLUMNS} FROM maintenances WHERE id = $1");
    sqlx::query_as::<_, Maintenance>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn lock_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Maintenance>, sqlx::Error> {
    let sql = format!("SELECT {MAINTENANCE_COLUMNS} FROM maintenances WHERE id = $1 FOR UPDATE");
    sqlx::query_as::<_, Maintenance>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    maintenance: &MaintenanceRow,
) -> Result<Maintenance, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO maintenances (
            author, vehicle_id, supplier_id, date, km_current, km_after,
            next_maintenance_date, price_minor, invoice_number, notes, attachment_path
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {MAINTENANCE_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Maintenance>(&sql)
        .bind(&maintenance.author)
        .bind(maintenance.vehicle_id)
        .bind(maintenance.supplier_id)
        .bind(maintenance.date)
        .bind(maintenance.km_current)
        .bind(maintenance.km_after)
        .bind(maintenance.next_maintenance_date)
        .bind(maintenance.price_minor)
        .bind(&maintenance.invoice_number)
        .bind(&maintenance.notes)
        .bind(&maintenance.attachment_path)
        .fetch_one(&mut **tx)
        .await
}

pub async fn update_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    maintenance: &MaintenanceRow,
    reset_alerts: bool,
) -> Result<Option<Maintenance>, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE maintenances
        SET author = $2,
            vehicle_id = $3,
            supplier_id = $4,
            date = $5,
            km_current = $6,
            km_after = $7,
            next_maintenance_date = $8,
            price_minor = $9,
            invoice_number = $10,
            notes = $11,
            attachment_path = $12,
            date_alert_sent_at = CASE WHEN $13 THEN NULL ELSE date_alert_sent_at END,
            km_alert_sent_at = CASE WHEN $13 THEN NULL ELSE km_alert_sent_at END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {MAINTENANCE_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Maintenance>(&sql)
        .bind(id)
        .bind(&maintenance.author)
        .bind(maintenance.vehicle_id)
        .bind(maintenance.supplier_id)
        .bind(maintenance.date)
        .bind(maintenance.km_current)
        .bind(maintenance.km_after)
        .bind(maintenance.next_maintenance_date)
        .bind(maintenance.price_minor)
        .bind(&maintenance.invoice_number)
        .bind(&maintenance.notes)
        .bind(&maintenance.attachment_path)
        .bind(reset_alerts)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn delete_tx(tx: &mut Transaction<'_, Postgres>, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM maintenances WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn vehicles_with_due_dates_tx(
    tx: &mut Transaction<'_, Postgres>,
    today: NaiveDate,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT DISTINCT vehicle_id
        FROM maintenances
        WHERE date_alert_sent_at IS NULL
          AND next_maintenance_date IS NOT NULL
          AND next_maintenance_date <= $1
        ORDER BY vehicle_id
        "#,
    )
    .bind(today)
    .fetch_all(&mut **tx)
    .await
}

pub async fn latest_pending_tx(
    tx: &mut Transaction<'_, Postgres>,
    vehicle_id: i64,
) -> Result<Option<Maintenance>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {MAINTENANCE_COLUMNS}
        FROM maintenances
        WHERE vehicle_id = $1
          AND date_alert_sent_at IS NULL
          AND (km_after > 0 OR next_maintenance_date IS NOT NULL)
        ORDER BY date DESC, id DESC
        LIMIT 1
        FOR UPDATE
        "#
    );
    sqlx::query_as::<_, Maintenance>(&sql)
        .bind(vehicle_id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn latest_km_target_tx(
    tx: &mut Transaction<'_, Postgres>,
    vehicle_id: i64,
) -> Result<Option<Maintenance>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {MAINTENANCE_COLUMNS}
        FROM maintenances
        WHERE vehicle_id = $1
          AND km_after > 0
        ORDER BY date DESC, id DESC
        LIMIT 1
        FOR UPDATE
        "#
    );
    sqlx::query_as::<_, Maintenance>(&sql)
        .bind(vehicle_id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn mark_date_alert_sent_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE maintenances SET date_alert_sent_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn mark_km_alert_sent_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE maintenances SET km_alert_sent_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
