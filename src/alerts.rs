//! Read and status operations on a user's SOS history. Ownership is checked
//! after existence, so a missing alert is 404 and someone else's is 403.

use uuid::Uuid;

use crate::auth::Identity;
use crate::entities::sos_alert::{self, AlertStatus};
use crate::error::AppError;
use crate::store::AlertStore;

const NOT_FOUND: &str = "SOS alert not found";
const INVALID_STATUS: &str = "Invalid status. Must be: active, resolved, or cancelled";

pub async fn list_alerts(
    store: &dyn AlertStore,
    identity: &Identity,
    limit: u64,
) -> Result<Vec<sos_alert::Model>, AppError> {
    store
        .list_alerts_for_user(identity.user_id, limit)
        .await
        .map_err(AppError::storage("Server error: unable to fetch SOS alerts"))
}

async fn owned_alert(
    store: &dyn AlertStore,
    identity: &Identity,
    id: Uuid,
    forbidden: &'static str,
) -> Result<sos_alert::Model, AppError> {
    let alert = store
        .find_alert(id)
        .await
        .map_err(AppError::storage("Server error: unable to fetch SOS alert"))?
        .ok_or(AppError::NotFound(NOT_FOUND))?;

    if alert.user_id != identity.user_id {
        return Err(AppError::Forbidden(forbidden));
    }
    Ok(alert)
}

pub async fn get_alert(
    store: &dyn AlertStore,
    identity: &Identity,
    id: Uuid,
) -> Result<sos_alert::Model, AppError> {
    owned_alert(store, identity, id, "Not authorized to view this alert").await
}

/// The status is validated before the alert is looked up.
pub async fn set_status(
    store: &dyn AlertStore,
    identity: &Identity,
    id: Uuid,
    status: Option<&str>,
) -> Result<sos_alert::Model, AppError> {
    let status: AlertStatus = status
        .ok_or_else(|| AppError::InvalidArgument(INVALID_STATUS.to_string()))?
        .parse()
        .map_err(|_| AppError::InvalidArgument(INVALID_STATUS.to_string()))?;

    let alert = owned_alert(store, identity, id, "Not authorized to update this alert").await?;
    let updated = store
        .update_alert_status(alert.id, status, chrono::Utc::now().naive_utc())
        .await
        .map_err(AppError::storage("Server error: unable to update SOS alert"))?;

    crate::metrics::increment_status_changes(status.as_str());
    tracing::info!(alert_id = %updated.id, status = %status, "SOS alert status changed");
    Ok(updated)
}

pub async fn delete_alert(
    store: &dyn AlertStore,
    identity: &Identity,
    id: Uuid,
) -> Result<(), AppError> {
    let alert = owned_alert(store, identity, id, "Not authorized to delete this alert").await?;
    store
        .delete_alert(alert.id)
        .await
        .map_err(AppError::storage("Server error: unable to delete SOS alert"))?;

    crate::metrics::decrement_sos_alerts();
    tracing::info!(alert_id = %alert.id, "SOS alert deleted");
    Ok(())
}
