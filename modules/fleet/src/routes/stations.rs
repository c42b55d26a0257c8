use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::contracts::StationRequest;
use crate::models::{BalanceAdjustment, Station};
use crate::routes::ApiResult;
use crate::services::station_service;
use crate::services::FleetContext;
use crate::validation::validate_station;

/// GET /api/stations
pub async fn list_stations(State(ctx): State<FleetContext>) -> ApiResult<Json<Vec<Station>>> {
    Ok(Json(station_service::list_stations(&ctx).await?))
}

/// POST /api/stations
///
/// A `credit_balance` starts tracking the station with that opening balance.
pub async fn create_station(
    State(ctx): State<FleetContext>,
    payload: Result<Json<StationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Station>)> {
    let Json(payload) = payload?;
    let draft = validate_station(&payload)?;
    let station = station_service::create_station(&ctx, draft).await?;
    Ok((StatusCode::CREATED, Json(station)))
}

/// GET /api/stations/{id}
pub async fn get_station(
    State(ctx): State<FleetContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Station>> {
    Ok(Json(station_service::get_station(&ctx, id).await?))
}

/// PUT /api/stations/{id}
///
/// `credit_balance` absent keeps the balance, a number overwrites it and
/// `null` stops tracking.
pub async fn update_station(
    State(ctx): State<FleetContext>,
    Path(id): Path<i64>,
    payload: Result<Json<StationRequest>, JsonRejection>,
) -> ApiResult<Json<Station>> {
    let Json(payload) = payload?;
    let draft = validate_station(&payload)?;
    Ok(Json(station_service::update_station(&ctx, id, draft).await?))
}

/// DELETE /api/stations/{id}
pub async fn delete_station(
    State(ctx): State<FleetContext>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    station_service::delete_station(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/stations/{id}/adjustments
pub async fn list_adjustments(
    State(ctx): State<FleetContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<BalanceAdjustment>>> {
    Ok(Json(station_service::list_adjustments(&ctx, id).await?))
}
