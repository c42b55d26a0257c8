use sqlx::{PgPool, Postgres, Transaction};

use crate::models::{NewSupplier, Supplier};

pub async fn list(pool: &PgPool) -> Result<Vec<Supplier>, sqlx::Error> {
    sqlx::query_as::<_, Supplier>(
        "SELECT id, name, address, created_at FROM suppliers ORDER BY name, id",
    )
    .fetch_all(pool)
    .await
}

pub async fn find_tx(
    tx: &mut Transaction<'_, Postgres>,
    id: i64,
) -> Result<Option<Supplier>, sqlx::Error> {
    sqlx::query_as::<_, Supplier>("SELECT id, name, address, created_at FROM suppliers WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    supplier: &NewSupplier,
) -> Result<Supplier, sqlx::Error> {
    sqlx::query_as::<_, Supplier>(
        r#"
        INSERT INTO suppliers (name, address)
        VALUES ($1, $2)
        RETURNING id, name, address, created_at
        "#,
    )
    .bind(&supplier.name)
    .bind(&supplier.address)
    .fetch_one(&mut **tx)
    .await
}
