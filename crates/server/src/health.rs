use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use supportdesk_db::{ping, DbPool};
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    model: String,
    tool_count: usize,
}

impl HealthState {
    pub fn new(db_pool: DbPool, model: impl Into<String>, tool_count: usize) -> Self {
        Self { db_pool, model: model.into(), tool_count }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Probe {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub ticket_store: Probe,
    pub agent: Probe,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Readiness is decided by the ticket store alone. The model endpoint is
/// not called so health checks never spend LLM quota.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthReport>) {
    let ticket_store = probe_store(&state.db_pool).await;
    let ready = ticket_store.status == "ready";

    let report = HealthReport {
        status: if ready { "ready" } else { "degraded" },
        ticket_store,
        agent: Probe {
            status: "ready",
            detail: format!("model `{}` with {} tools", state.model, state.tool_count),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(report))
}

async fn probe_store(pool: &DbPool) -> Probe {
    match ping(pool).await {
        Ok(_) => Probe { status: "ready", detail: "SELECT 1 succeeded".to_string() },
        Err(error) => {
            warn!(event_name = "system.health.store_degraded", error = %error, "ticket store probe failed");
            Probe { status: "degraded", detail: format!("SELECT 1 failed: {error}") }
        }
    }
}
