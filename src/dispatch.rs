use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Deserializer};
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::auth::Identity;
use crate::entities::sos_alert::{self, AlertStatus, GeoLocation};
use crate::error::AppError;
use crate::notifications::{AlertContext, BatchReport, ChannelRegistry};
use crate::store::{AlertStore, ContactStore};

pub const DEFAULT_ALERT_MESSAGE: &str = "Emergency alert triggered";

/// Body of `POST /alerts`.
///
/// `latitude` and `longitude` distinguish an absent key (`None`) from an
/// explicit `null` (`Some(None)`): a location is recorded whenever both keys
/// are present, even if the device could not produce coordinates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerAlertRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "key_present")]
    pub latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "key_present")]
    pub longitude: Option<Option<f64>>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

fn key_present<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

impl TriggerAlertRequest {
    fn message(&self) -> String {
        match self.message.as_deref().map(str::trim) {
            Some(message) if !message.is_empty() => message.to_string(),
            _ => DEFAULT_ALERT_MESSAGE.to_string(),
        }
    }

    fn location(&self) -> Option<GeoLocation> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoLocation {
                latitude,
                longitude,
                accuracy: self.accuracy,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FanOutOutcome {
    NoContacts,
    /// Contacts could not be loaded. Logged, never surfaced to the caller.
    ContactsUnavailable(String),
    Delivered(Vec<BatchReport>),
}

#[derive(Debug, Clone)]
pub struct FanOutReport {
    pub alert_id: Uuid,
    pub outcome: FanOutOutcome,
}

impl FanOutReport {
    pub fn batch(&self, channel: &str) -> Option<&BatchReport> {
        match &self.outcome {
            FanOutOutcome::Delivered(reports) => reports.iter().find(|r| r.channel == channel),
            _ => None,
        }
    }
}

/// A persisted alert plus its detached notification task. Dropping the
/// handle does not cancel the fan-out.
pub struct Dispatched {
    pub alert: sos_alert::Model,
    pub fan_out: JoinHandle<FanOutReport>,
}

#[derive(Clone)]
pub struct SosDispatcher {
    alerts: Arc<dyn AlertStore>,
    contacts: Arc<dyn ContactStore>,
    channels: ChannelRegistry,
}

impl SosDispatcher {
    pub fn new(
        alerts: Arc<dyn AlertStore>,
        contacts: Arc<dyn ContactStore>,
        channels: ChannelRegistry,
    ) -> Self {
        Self {
            alerts,
            contacts,
            channels,
        }
    }

    /// Persists the alert, then notifies every contact in the background.
    /// Only the persistence step can fail.
    pub async fn trigger_alert(
        &self,
        identity: &Identity,
        request: TriggerAlertRequest,
    ) -> Result<Dispatched, AppError> {
        let now = chrono::Utc::now().naive_utc();
        let alert = sos_alert::Model {
            id: Uuid::new_v4(),
            user_id: identity.user_id,
            message: request.message(),
            location: request.location(),
            status: AlertStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let alert = self
            .alerts
            .insert_alert(alert)
            .await
            .map_err(AppError::storage("Server error: unable to create SOS alert"))?;

        crate::metrics::increment_sos_alerts();
        info!(
            alert_id = %alert.id,
            user_id = identity.user_id,
            has_location = alert.location.is_some(),
            "SOS alert created"
        );

        let span = tracing::info_span!("sos_fan_out", alert_id = %alert.id, user_id = identity.user_id);
        let fan_out = tokio::spawn(
            fan_out(
                Arc::clone(&self.contacts),
                self.channels.clone(),
                identity.user_id,
                alert.id,
                AlertContext::new(identity, &alert),
            )
            .instrument(span),
        );

        Ok(Dispatched { alert, fan_out })
    }
}

async fn fan_out(
    contacts: Arc<dyn ContactStore>,
    channels: ChannelRegistry,
    user_id: i32,
    alert_id: Uuid,
    context: AlertContext,
) -> FanOutReport {
    let started = Instant::now();

    let contacts = match contacts.list_contacts_for_user(user_id).await {
        Ok(contacts) => contacts,
        Err(err) => {
            error!("Failed to load emergency contacts: {}", err);
            return FanOutReport {
                alert_id,
                outcome: FanOutOutcome::ContactsUnavailable(err.to_string()),
            };
        }
    };

    if contacts.is_empty() {
        info!("No emergency contacts to notify");
        return FanOutReport {
            alert_id,
            outcome: FanOutOutcome::NoContacts,
        };
    }
    if channels.is_empty() {
        warn!("No notification channels configured");
    }

    let contacts = Arc::new(contacts);
    let context = Arc::new(context);

    // One task per channel so a panic in one cannot reach the others.
    let tasks = channels.channels().iter().map(|channel| {
        let channel = Arc::clone(channel);
        let contacts = Arc::clone(&contacts);
        let context = Arc::clone(&context);
        let name = channel.name();
        let handle = tokio::spawn(
            async move { channel.send_batch(&contacts, &context).await }.in_current_span(),
        );
        async move { (name, handle.await) }
    });

    let mut reports = Vec::new();
    for (channel, joined) in join_all(tasks).await {
        match joined {
            Ok(report) => {
                info!(
                    channel,
                    sent = report.sent,
                    failed = report.failed,
                    total = report.total_contacts,
                    "SOS notifications: {} sent successfully, {} failed",
                    report.sent,
                    report.failed
                );
                reports.push(report);
            }
            Err(err) => error!(channel, "Notification channel task failed: {}", err),
        }
    }

    crate::metrics::record_fan_out_duration(started.elapsed().as_secs_f64());

    FanOutReport {
        alert_id,
        outcome: FanOutOutcome::Delivered(reports),
    }
}
