use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::contracts::SupplierRequest;
use crate::models::Supplier;
use crate::routes::ApiResult;
use crate::services::fleet_service;
use crate::services::FleetContext;
use crate::validation::validate_supplier;

/// GET /api/suppliers
pub async fn list_suppliers(State(ctx): State<FleetContext>) -> ApiResult<Json<Vec<Supplier>>> {
    Ok(Json(fleet_service::list_suppliers(&ctx).await?))
}

/// POST /api/suppliers
pub async fn create_supplier(
    State(ctx): State<FleetContext>,
    payload: Result<Json<SupplierRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    let Json(payload) = payload?;
    let supplier = fleet_service::create_supplier(&ctx, validate_supplier(&payload)?).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}
