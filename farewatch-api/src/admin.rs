use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    routing::post,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use farewatch_core::ports::BoxError;
use farewatch_engine::fanout::run_fanout;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::error::AppError;
use crate::state::AppState;

/// Manual trigger surface: operators can kick off a fan-out pass or a single
/// award-availability pagination run without waiting for the timer.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/fanout", post(trigger_fanout))
        .route("/admin/search", post(trigger_search))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            admin_auth_middleware,
        ))
}

pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;
    if token != state.auth.admin_token {
        return Err(StatusCode::UNAUTHORIZED);
    }
    if !state.auth.manual_triggers_enabled {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(next.run(req).await)
}

fn internal(err: BoxError) -> AppError {
    AppError::Anyhow(anyhow::anyhow!(err))
}

async fn trigger_fanout(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    info!("manual fan-out trigger received");
    let enqueued = run_fanout(state.alerts.as_ref(), state.queue.as_ref(), Utc::now())
        .await
        .map_err(internal)?;
    Ok(Json(json!({ "enqueued": enqueued })))
}

#[derive(Debug, Deserialize)]
pub struct SearchTrigger {
    pub origin: String,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

async fn trigger_search(
    State(state): State<AppState>,
    Json(body): Json<SearchTrigger>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let origin = body.origin.trim().to_ascii_uppercase();
    let destination = body.destination.trim().to_ascii_uppercase();
    if origin.len() != 3 || destination.len() != 3 {
        return Err(AppError::ValidationError(
            "origin and destination must be 3-letter airport codes".to_string(),
        ));
    }
    if body.end_date < body.start_date {
        return Err(AppError::ValidationError(
            "end_date must not precede start_date".to_string(),
        ));
    }

    // The route/date tuple is the idempotency key: reuse an in-flight request
    // rather than creating a competing one.
    let existing = state
        .requests
        .find_open_for_route(&origin, &destination, body.start_date, body.end_date)
        .await
        .map_err(internal)?;
    let (request, resumed) = match existing {
        Some(request) => (request, true),
        None => (
            state
                .requests
                .create(&origin, &destination, body.start_date, body.end_date)
                .await
                .map_err(internal)?,
            false,
        ),
    };

    info!(request_id = %request.id, resumed, "starting pagination run");
    let engine = state.pagination.clone();
    let request_id = request.id;
    tokio::spawn(async move {
        if let Err(err) = engine.run(request_id).await {
            error!(%request_id, "pagination run failed: {err}");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "requestId": request.id,
            "status": request.status.as_str(),
            "resumed": resumed,
        })),
    ))
}
