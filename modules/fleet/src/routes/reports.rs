//! Period report endpoints
//!
//! Both reports cover `[start_date, end_date]`, defaulting to the current
//! month up to today.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::routes::ApiResult;
use crate::services::report_service::{self, MaintenanceReport, RefuelReport, ReportRange};
use crate::services::FleetContext;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub vehicle_id: Option<i64>,
    pub supplier_id: Option<i64>,
}

/// GET /api/reports/refuels
pub async fn refuel_report(
    State(ctx): State<FleetContext>,
    Query(params): Query<ReportQuery>,
) -> ApiResult<Json<RefuelReport>> {
    let range = ReportRange::resolve(params.start_date, params.end_date, Utc::now().date_naive())?;
    Ok(Json(report_service::refuel_report(&ctx, range).await?))
}

/// GET /api/reports/maintenances
pub async fn maintenance_report(
    State(ctx): State<FleetContext>,
    Query(params): Query<ReportQuery>,
) -> ApiResult<Json<MaintenanceReport>> {
    let range = ReportRange::resolve(params.start_date, params.end_date, Utc::now().date_naive())?;
    Ok(Json(
        report_service::maintenance_report(&ctx, range, params.vehicle_id, params.supplier_id)
            .await?,
    ))
}
