use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::services::FleetContext;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub store: &'static str,
}

/// Liveness plus a store round trip; an unreachable store reports 503
pub async fn health(State(ctx): State<FleetContext>) -> (StatusCode, Json<HealthResponse>) {
    let store_ok = match ctx.store.begin().await {
        Ok(tx) => {
            drop(tx);
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "health check could not open a store transaction");
            false
        }
    };

    let (code, status, store) = if store_ok {
        (StatusCode::OK, "healthy", "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
    };

    (
        code,
        Json(HealthResponse {
            status,
            service: "fleet-rs",
            version: env!("CARGO_PKG_VERSION"),
            store,
        }),
    )
}
