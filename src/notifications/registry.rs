use std::sync::Arc;
use std::time::Duration;

use handlebars::TemplateError;
use tracing::{info, warn};

use super::channel::{EmailChannel, NotificationChannel, SmsChannel};
use super::dry_run::DryRunTransport;
use super::sendgrid::SendGridTransport;
use super::templates::NotificationTemplates;
use super::twilio::TwilioTransport;
use crate::config::NotificationConfig;

/// Bounds how long a single provider call may wait for a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Ordered set of configured channels. Cheap to clone.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    channels: Arc<Vec<Arc<dyn NotificationChannel>>>,
}

impl ChannelRegistry {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>) -> Self {
        Self {
            channels: Arc::new(channels),
        }
    }

    pub fn from_config(
        config: &NotificationConfig,
        client: reqwest::Client,
    ) -> Result<Self, TemplateError> {
        let templates = Arc::new(NotificationTemplates::new()?);
        let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();

        if config.dry_run {
            info!("Notification dry run enabled. Email and SMS will only be logged.");
            channels.push(Arc::new(EmailChannel::new(
                Arc::new(DryRunTransport),
                templates.clone(),
            )));
            channels.push(Arc::new(SmsChannel::new(
                Arc::new(DryRunTransport),
                templates,
            )));
            return Ok(Self::new(channels));
        }

        match &config.sendgrid {
            Some(sendgrid) => channels.push(Arc::new(EmailChannel::new(
                Arc::new(SendGridTransport::new(
                    client.clone(),
                    sendgrid,
                    &config.email_from,
                )),
                templates.clone(),
            ))),
            None => warn!("⚠️ SendGrid API key not found. Email notifications are disabled."),
        }

        match &config.twilio {
            Some(twilio) => channels.push(Arc::new(SmsChannel::new(
                Arc::new(TwilioTransport::new(client, twilio)),
                templates,
            ))),
            None => warn!("⚠️ Twilio credentials not found. SMS notifications are disabled."),
        }

        Ok(Self::new(channels))
    }

    pub fn channels(&self) -> &[Arc<dyn NotificationChannel>] {
        &self.channels
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Shared HTTP client for the provider transports.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
}
