use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{Vehicle, VehicleRow};
use crate::store::VehicleRefuelTotals;

const VEHICLE_COLUMNS: &str =
    "id, name, plate, color, current_km, maintenance_km, created_at, updated_at";

pub async fn list(pool: &PgPool) -> Result<Vec<Vehicle>, sqlx::Error> {
    let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles ORDER BY name, id");
    sqlx::query_as::<_, Vehicle>(&sql).fetch_all(pool).await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Vehicle>, sqlx::Error> {
    let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1");
    sqlx::query_as::<_, Vehicle>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Vehicle>, sqlx::Error> {
    let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1");
    sqlx::query_as::<_, Vehicle>(&sql)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    vehicle: &VehicleRow,
) -> Result<Vehicle, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO vehicles (name, plate, color, current_km, maintenance_km)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {VEHICLE_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Vehicle>(&sql)
        .bind(&vehicle.name)
        .bind(&vehicle.plate)
        .bind(&vehicle.color)
        .bind(vehicle.current_km)
        .bind(vehicle.maintenance_km)
        .fetch_one(&mut **tx)
        .await
}

pub async fn update_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    vehicle: &VehicleRow,
) -> Result<Option<Vehicle>, sqlx::Error> {
    let sql = format!(
        r#"
        UPDATE vehicles
        SET name = $2, plate = $3, color = $4, current_km = $5, maintenance_km = $6,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {VEHICLE_COLUMNS}
        "#
    );
    sqlx::query_as::<_, Vehicle>(&sql)
        .bind(id)
        .bind(&vehicle.name)
        .bind(&vehicle.plate)
        .bind(&vehicle.color)
        .bind(vehicle.current_km)
        .bind(vehicle.maintenance_km)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn set_current_km_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    km: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE vehicles SET current_km = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(km)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn set_maintenance_km_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
    km: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE vehicles SET maintenance_km = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(km)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Sum distance and liters of the refuels eligible for an efficiency average
pub async fn refuel_totals(pool: &PgPool) -> Result<Vec<VehicleRefuelTotals>, sqlx::Error> {
    sqlx::query_as::<_, VehicleRefuelTotals>(
        r#"
        SELECT
            vehicle_id,
            COALESCE(SUM(km_end - km_start), 0)::BIGINT AS distance_km,
            COALESCE(SUM(liters_centi), 0)::BIGINT AS liters_centi
        FROM movements
        WHERE km_end >= km_start
          AND liters_centi > 0
        GROUP BY vehicle_id
        ORDER BY vehicle_id
        "#,
    )
    .fetch_all(pool)
    .await
}
