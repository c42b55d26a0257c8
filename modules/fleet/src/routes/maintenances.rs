use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::contracts::MaintenanceRequest;
use crate::models::{Maintenance, MaintenanceFilter};
use crate::routes::ApiResult;
use crate::services::maintenance_service;
use crate::services::FleetContext;
use crate::validation::{day_bounds, optional_text, required_text, validate_maintenance};

#[derive(Debug, Default, Deserialize)]
pub struct MaintenanceListQuery {
    pub vehicle_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub author: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct DueAlertsResponse {
    pub sent: usize,
}

/// GET /api/maintenances
pub async fn list_maintenances(
    State(ctx): State<FleetContext>,
    Query(params): Query<MaintenanceListQuery>,
) -> ApiResult<Json<Vec<Maintenance>>> {
    let (from, to) = day_bounds(params.start_date, params.end_date)?;
    let filter = MaintenanceFilter {
        vehicle_id: params.vehicle_id,
        supplier_id: params.supplier_id,
        author: optional_text(params.author.as_deref()),
        from,
        to,
    };
    Ok(Json(
        maintenance_service::list_maintenances(&ctx, &filter).await?,
    ))
}

/// POST /api/maintenances
pub async fn create_maintenance(
    State(ctx): State<FleetContext>,
    payload: Result<Json<MaintenanceRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Maintenance>)> {
    let Json(payload) = payload?;
    let author = required_text(payload.author.as_deref(), "author")?;
    let draft = validate_maintenance(&payload)?;

    let maintenance = maintenance_service::create_maintenance(&ctx, &author, draft).await?;
    Ok((StatusCode::CREATED, Json(maintenance)))
}

/// GET /api/maintenances/{id}
pub async fn get_maintenance(
    State(ctx): State<FleetContext>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Maintenance>> {
    Ok(Json(maintenance_service::get_maintenance(&ctx, id).await?))
}

/// PUT /api/maintenances/{id}
pub async fn update_maintenance(
    State(ctx): State<FleetContext>,
    Path(id): Path<i64>,
    payload: Result<Json<MaintenanceRequest>, JsonRejection>,
) -> ApiResult<Json<Maintenance>> {
    let Json(payload) = payload?;
    let draft = validate_maintenance(&payload)?;
    Ok(Json(
        maintenance_service::update_maintenance(&ctx, id, draft).await?,
    ))
}

/// DELETE /api/maintenances/{id}
pub async fn delete_maintenance(
    State(ctx): State<FleetContext>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    maintenance_service::delete_maintenance(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/maintenances/due-alerts/run
///
/// Runs the due-date scan immediately, the same pass the scheduler makes.
pub async fn run_due_alerts(State(ctx): State<FleetContext>) -> ApiResult<Json<DueAlertsResponse>> {
    let today = Utc::now().date_naive();
    let sent = maintenance_service::notify_due_date_alerts(&ctx, today).await?;
    Ok(Json(DueAlertsResponse { sent }))
}
