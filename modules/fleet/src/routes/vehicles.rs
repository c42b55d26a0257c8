use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::contracts::VehicleRequest;
use crate::models::Vehicle;
use crate::routes::ApiResult;
use crate::services::fleet_service::{self, VehicleSummary};
use crate::services::FleetContext;
use crate::validation::validate_vehicle;

/// GET /api/vehicles
pub async fn list_vehicles(State(ctx): State<FleetContext>) -> ApiResult<Json<Vec<VehicleSummary>>> {
    Ok(Json(fleet_service::list_vehicles(&ctx).await?))
}

/// POST /api/vehicles
pub async fn create_vehicle(
    State(ctx): State<FleetContext>,
    payload: Result<Json<VehicleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vehicle>)> {
    let Json(payload) = payload?;
    let row = validate_vehicle(&payload)?;
    let vehicle = fleet_service::create_vehicle(&ctx, row).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// GET /api/vehicles/{id}
pub async fn get_vehicle(
    State(ctx): State<FleetContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vehicle>> {
    Ok(Json(fleet_service::get_vehicle(&ctx, id).await?))
}

/// PUT /api/vehicles/{id}
pub async fn update_vehicle(
    State(ctx): State<FleetContext>,
    Path(id): Path<i64>,
    payload: Result<Json<VehicleRequest>, JsonRejection>,
) -> ApiResult<Json<Vehicle>> {
    let Json(payload) = payload?;
    let row = validate_vehicle(&payload)?;
    Ok(Json(fleet_service::update_vehicle(&ctx, id, row).await?))
}
