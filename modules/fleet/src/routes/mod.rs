//! HTTP surface of the fleet back office
//!
//! Every handler maps its service error into [`ApiError`], whose body is
//! `{"error": <code>, "message": <text>, "field": <optional>}`.

pub mod maintenances;
pub mod movements;
pub mod reports;
pub mod stations;
pub mod suppliers;
pub mod vehicles;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::health::health;
use crate::services::fleet_service::FleetError;
use crate::services::maintenance_service::MaintenanceError;
use crate::services::movement_service::MovementError;
use crate::services::station_service::StationError;
use crate::services::FleetContext;
use crate::store::StoreError;
use crate::validation::ValidationError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

/// Error returned by every handler
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub field: Option<&'static str>,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }

    /// Internal failure; details go to the log only
    pub fn internal(error: &dyn std::error::Error) -> Self {
        tracing::error!(error = %error, "Request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.code,
            message: self.message,
            field: self.field,
        });
        (self.status, body).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: "validation_error",
            message: err.to_string(),
            field: err.field(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::not_found(err.to_string()),
            StoreError::Database(_) | StoreError::OutOfRange(_) => Self::internal(&err),
        }
    }
}

impl From<MovementError> for ApiError {
    fn from(err: MovementError) -> Self {
        match err {
            MovementError::Validation(e) => e.into(),
            MovementError::InsufficientCredit { .. } => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                code: "insufficient_credit",
                message: err.to_string(),
                field: Some("price"),
            },
            MovementError::NotFound(_) => Self::not_found(err.to_string()),
            MovementError::Store(e) => e.into(),
        }
    }
}

impl From<StationError> for ApiError {
    fn from(err: StationError) -> Self {
        match err {
            StationError::Validation(e) => e.into(),
            StationError::NotFound(_) => Self::not_found(err.to_string()),
            StationError::InUse { .. } => Self::conflict(err.to_string()),
            StationError::Store(e) => e.into(),
        }
    }
}

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        match err {
            FleetError::Validation(e) => e.into(),
            FleetError::VehicleNotFound(_) => Self::not_found(err.to_string()),
            FleetError::Store(e) => e.into(),
        }
    }
}

impl From<MaintenanceError> for ApiError {
    fn from(err: MaintenanceError) -> Self {
        match err {
            MaintenanceError::Validation(e) => e.into(),
            MaintenanceError::NotFound(_) => Self::not_found(err.to_string()),
            MaintenanceError::Store(e) => e.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Prometheus text exposition
pub async fn metrics(State(ctx): State<FleetContext>) -> Response {
    match ctx.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => ApiError::internal(&e).into_response(),
    }
}

/// All routes, without the CORS and trace layers added by the binary
pub fn fleet_router(ctx: FleetContext) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/metrics", get(metrics))
        .route(
            "/api/stations",
            get(stations::list_stations).post(stations::create_station),
        )
        .route(
            "/api/stations/{id}",
            get(stations::get_station)
                .put(stations::update_station)
                .delete(stations::delete_station),
        )
        .route("/api/stations/{id}/adjustments", get(stations::list_adjustments))
        .route(
            "/api/vehicles",
            get(vehicles::list_vehicles).post(vehicles::create_vehicle),
        )
        .route(
            "/api/vehicles/{id}",
            get(vehicles::get_vehicle).put(vehicles::update_vehicle),
        )
        .route(
            "/api/suppliers",
            get(suppliers::list_suppliers).post(suppliers::create_supplier),
        )
        .route(
            "/api/movements",
            get(movements::list_movements).post(movements::create_movement),
        )
        .route("/api/movements/bulk-delete", post(movements::bulk_delete_movements))
        .route(
            "/api/movements/{id}",
            get(movements::get_movement)
                .put(movements::update_movement)
                .delete(movements::delete_movement),
        )
        .route(
            "/api/maintenances",
            get(maintenances::list_maintenances).post(maintenances::create_maintenance),
        )
        .route("/api/maintenances/due-alerts/run", post(maintenances::run_due_alerts))
        .route(
            "/api/maintenances/{id}",
            get(maintenances::get_maintenance)
                .put(maintenances::update_maintenance)
                .delete(maintenances::delete_maintenance),
        )
        .route("/api/reports/refuels", get(reports::refuel_report))
        .route("/api/reports/maintenances", get(reports::maintenance_report))
        .with_state(ctx)
}
