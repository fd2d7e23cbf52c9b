use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::alerts;
use crate::api::extract::{AppJson, AppPath, OptionalJson};
use crate::app::AppState;
use crate::auth::Identity;
use crate::dispatch::TriggerAlertRequest;
use crate::error::AppError;

#[derive(Deserialize)]
pub struct UpdateAlertRequest {
    pub status: Option<String>,
}

/// Ids that are not UUIDs cannot name an alert.
fn parse_alert_id(id: &str) -> Result<Uuid, AppError> {
    let id = Uuid::parse_str(id).map_err(|_| AppError::NotFound("SOS alert not found"))?;
    tracing::Span::current().record("alert_id", tracing::field::display(id));
    Ok(id)
}

fn record_action(action: &'static str) {
    tracing::Span::current().record("action", action);
}

// POST /alerts (an empty body triggers with defaults)
pub async fn trigger_alert(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    OptionalJson(payload): OptionalJson<TriggerAlertRequest>,
) -> Result<impl IntoResponse, AppError> {
    record_action("trigger_alert");
    let dispatched = state.dispatcher.trigger_alert(&identity, payload).await?;
    tracing::Span::current().record("alert_id", tracing::field::display(dispatched.alert.id));

    // Fan-out keeps running after the response.
    drop(dispatched.fan_out);
    Ok((StatusCode::CREATED, Json(dispatched.alert)))
}

// GET /alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    record_action("list_alerts");
    let alerts =
        alerts::list_alerts(state.alerts.as_ref(), &identity, state.alert_history_limit).await?;
    Ok(Json(alerts))
}

// GET /alerts/:id
pub async fn get_alert(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    record_action("get_alert");
    let id = parse_alert_id(&id)?;
    let alert = alerts::get_alert(state.alerts.as_ref(), &identity, id).await?;
    Ok(Json(alert))
}

// PUT /alerts/:id
pub async fn update_alert(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<String>,
    AppJson(payload): AppJson<UpdateAlertRequest>,
) -> Result<impl IntoResponse, AppError> {
    record_action("update_alert");
    let id = parse_alert_id(&id)?;
    let alert =
        alerts::set_status(state.alerts.as_ref(), &identity, id, payload.status.as_deref())
            .await?;
    Ok(Json(alert))
}

// DELETE /alerts/:id
pub async fn delete_alert(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<String>,
) -> Result<impl IntoResponse, AppError> {
    record_action("delete_alert");
    let id = parse_alert_id(&id)?;
    alerts::delete_alert(state.alerts.as_ref(), &identity, id).await?;
    Ok(Json(json!({ "message": "SOS alert deleted successfully" })))
}
