use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::transport::{EmailMessage, EmailTransport, SmsTransport, TransportError};

/// Logs what would have been sent and reports success.
#[derive(Clone, Copy, Debug, Default)]
pub struct DryRunTransport;

fn message_id() -> String {
    format!("dry-run-{}", Uuid::new_v4())
}

#[async_trait]
impl EmailTransport for DryRunTransport {
    async fn send_email(&self, message: &EmailMessage) -> Result<String, TransportError> {
        info!("(Dry run) Would send email to: {}", message.to);
        info!("(Dry run) Subject: {}", message.subject);
        info!("(Dry run) Body length: {} chars", message.html.len());
        Ok(message_id())
    }
}

#[async_trait]
impl SmsTransport for DryRunTransport {
    async fn send_sms(&self, to: &str, body: &str) -> Result<String, TransportError> {
        info!("(Dry run) Would send SMS to: {}", to);
        info!("(Dry run) Body: {}", body);
        Ok(message_id())
    }
}
