//! Refuel movement endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::contracts::{BulkDeleteRequest, MovementRequest};
use crate::models::{Movement, MovementFilter};
use crate::routes::ApiResult;
use crate::services::movement_service::{self, MovementPage};
use crate::services::FleetContext;
use crate::validation::{day_bounds, optional_text, parse_per_page, required_text, validate_movement};

/// Query parameters for GET /api/movements
#[derive(Debug, Default, Deserialize)]
pub struct MovementListQuery {
    pub vehicle_id: Option<i64>,
    pub station_id: Option<i64>,
    pub author: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Page size, or `all`
    pub per_page: Option<String>,
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: usize,
}

/// GET /api/movements
pub async fn list_movements(
    State(ctx): State<FleetContext>,
    Query(params): Query<MovementListQuery>,
) -> ApiResult<Json<MovementPage>> {
    let (from, to) = day_bounds(params.start_date, params.end_date)?;
    let filter = MovementFilter {
        vehicle_id: params.vehicle_id,
        station_id: params.station_id,
        author: optional_text(params.author.as_deref()),
        from,
        to,
    };
    let per_page = parse_per_page(params.per_page.as_deref());
    let page = params.page.unwrap_or(1);

    Ok(Json(
        movement_service::list_movements(&ctx, &filter, per_page, page).await?,
    ))
}

/// POST /api/movements
pub async fn create_movement(
    State(ctx): State<FleetContext>,
    payload: Result<Json<MovementRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Movement>)> {
    let Json(payload) = payload?;
    let author = required_text(payload.author.as_deref(), "author")?;
    let draft = validate_movement(&payload, ctx.settings.require_price_above_liters)?;

    let movement = movement_service::create_movement(&ctx, &author, draft).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// GET /api/movements/{id}
pub async fn get_movement(
    State(ctx): State<FleetContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Movement>> {
    Ok(Json(movement_service::get_movement(&ctx, id).await?))
}

/// PUT /api/movements/{id}
///
/// The original author is kept; `updated_by` records who edited.
pub async fn update_movement(
    State(ctx): State<FleetContext>,
    Path(id): Path<i64>,
    payload: Result<Json<MovementRequest>, JsonRejection>,
) -> ApiResult<Json<Movement>> {
    let Json(payload) = payload?;
    let updated_by = optional_text(payload.updated_by.as_deref());
    let draft = validate_movement(&payload, ctx.settings.require_price_above_liters)?;

    Ok(Json(
        movement_service::update_movement(&ctx, id, updated_by.as_deref(), draft).await?,
    ))
}

/// DELETE /api/movements/{id}
pub async fn delete_movement(
    State(ctx): State<FleetContext>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    movement_service::delete_movement(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/movements/bulk-delete
pub async fn bulk_delete_movements(
    State(ctx): State<FleetContext>,
    payload: Result<Json<BulkDeleteRequest>, JsonRejection>,
) -> ApiResult<Json<BulkDeleteResponse>> {
    let Json(payload) = payload?;
    let deleted = movement_service::delete_movements(&ctx, &payload.ids).await?;
    Ok(Json(BulkDeleteResponse { deleted }))
}
