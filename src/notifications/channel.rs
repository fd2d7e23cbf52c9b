use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use tracing::{error, info, warn};

use super::templates::NotificationTemplates;
use super::transport::{EmailMessage, EmailTransport, SmsTransport, TransportError};
use crate::auth::Identity;
use crate::entities::emergency_contact;
use crate::entities::sos_alert::{self, GeoLocation};

/// Everything a channel needs to describe one alert.
#[derive(Debug, Clone)]
pub struct AlertContext {
    pub user_name: String,
    pub user_email: String,
    pub user_phone: Option<String>,
    pub location: Option<GeoLocation>,
    pub message: String,
    pub timestamp: String,
}

impl AlertContext {
    pub fn new(identity: &Identity, alert: &sos_alert::Model) -> Self {
        Self {
            user_name: identity.name.clone(),
            user_email: identity.email.clone(),
            user_phone: identity.phone.clone(),
            location: alert.location.clone(),
            message: alert.message.clone(),
            timestamp: alert.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationAttempt {
    pub recipient: String,
    /// Provider message id, or the reason delivery failed.
    pub result: Result<String, String>,
}

impl NotificationAttempt {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub channel: &'static str,
    pub sent: usize,
    pub failed: usize,
    /// Eligible recipients, not every contact handed to the channel.
    pub total_contacts: usize,
    pub results: Vec<NotificationAttempt>,
}

impl BatchReport {
    pub fn empty(channel: &'static str) -> Self {
        Self::from_attempts(channel, Vec::new())
    }

    pub fn from_attempts(channel: &'static str, results: Vec<NotificationAttempt>) -> Self {
        let sent = results.iter().filter(|a| a.is_success()).count();
        Self {
            channel,
            sent,
            failed: results.len() - sent,
            total_contacts: results.len(),
            results,
        }
    }
}

/// A notification medium. Implementations never fail as a whole: every
/// problem is reported per recipient inside the batch report.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send_batch(
        &self,
        contacts: &[emergency_contact::Model],
        alert: &AlertContext,
    ) -> BatchReport;
}

async fn attempt<F>(channel: &'static str, recipient: String, delivery: F) -> NotificationAttempt
where
    F: Future<Output = Result<String, TransportError>>,
{
    let result = match AssertUnwindSafe(delivery).catch_unwind().await {
        Ok(Ok(message_id)) => Ok(message_id),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err("delivery panicked".to_string()),
    };

    match &result {
        Ok(message_id) => {
            info!(channel, recipient = %recipient, message_id = %message_id, "notification sent");
            crate::metrics::increment_notifications_sent(channel);
        }
        Err(reason) => {
            warn!(channel, recipient = %recipient, error = %reason, "notification failed");
            crate::metrics::increment_notifications_failed(channel);
        }
    }

    NotificationAttempt { recipient, result }
}

fn fail_all(channel: &'static str, recipients: Vec<String>, reason: &str) -> BatchReport {
    let attempts = recipients
        .into_iter()
        .map(|recipient| {
            crate::metrics::increment_notifications_failed(channel);
            NotificationAttempt {
                recipient,
                result: Err(reason.to_string()),
            }
        })
        .collect();
    BatchReport::from_attempts(channel, attempts)
}

pub struct EmailChannel {
    transport: Arc<dyn EmailTransport>,
    templates: Arc<NotificationTemplates>,
}

impl EmailChannel {
    pub fn new(transport: Arc<dyn EmailTransport>, templates: Arc<NotificationTemplates>) -> Self {
        Self {
            transport,
            templates,
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send_batch(
        &self,
        contacts: &[emergency_contact::Model],
        alert: &AlertContext,
    ) -> BatchReport {
        let recipients: Vec<String> = contacts
            .iter()
            .filter_map(|c| c.email_address())
            .map(str::to_string)
            .collect();
        if recipients.is_empty() {
            info!("No contacts with email addresses found");
            return BatchReport::empty(self.name());
        }

        let rendered = match self.templates.render_email(alert) {
            Ok(rendered) => rendered,
            Err(err) => {
                error!("Failed to render SOS email: {}", err);
                return fail_all(self.name(), recipients, "email rendering failed");
            }
        };

        let reply_to = Some(alert.user_email.trim().to_string()).filter(|e| !e.is_empty());
        let sender_name = match &reply_to {
            Some(email) => format!("{} ({}) via CareConnect", alert.user_name, email),
            None => format!("{} via CareConnect", alert.user_name),
        };

        let attempts = recipients.into_iter().map(|to| {
            let message = EmailMessage {
                to: to.clone(),
                subject: rendered.subject.clone(),
                text: rendered.text.clone(),
                html: rendered.html.clone(),
                sender_name: sender_name.clone(),
                reply_to: reply_to.clone(),
            };
            let transport = Arc::clone(&self.transport);
            attempt(self.name(), to, async move { transport.send_email(&message).await })
        });

        BatchReport::from_attempts(self.name(), join_all(attempts).await)
    }
}

pub struct SmsChannel {
    transport: Arc<dyn SmsTransport>,
    templates: Arc<NotificationTemplates>,
}

impl SmsChannel {
    pub fn new(transport: Arc<dyn SmsTransport>, templates: Arc<NotificationTemplates>) -> Self {
        Self {
            transport,
            templates,
        }
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn name(&self) -> &'static str {
        "sms"
    }

    async fn send_batch(
        &self,
        contacts: &[emergency_contact::Model],
        alert: &AlertContext,
    ) -> BatchReport {
        let recipients: Vec<String> = contacts
            .iter()
            .filter_map(|c| c.phone_number())
            .map(str::to_string)
            .collect();
        if recipients.is_empty() {
            info!("No contacts with phone numbers found");
            return BatchReport::empty(self.name());
        }

        let body = match self.templates.render_sms(alert) {
            Ok(body) => body,
            Err(err) => {
                error!("Failed to render SOS SMS: {}", err);
                return fail_all(self.name(), recipients, "sms rendering failed");
            }
        };

        let attempts = recipients.into_iter().map(|to| {
            let transport = Arc::clone(&self.transport);
            let body = body.clone();
            let number = to.clone();
            attempt(self.name(), to, async move {
                transport.send_sms(&number, &body).await
            })
        });

        BatchReport::from_attempts(self.name(), join_all(attempts).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedEmail {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailTransport for ScriptedEmail {
        async fn send_email(&self, message: &EmailMessage) -> Result<String, TransportError> {
            if message.to.starts_with("panic") {
                panic!("transport bug");
            }
            if message.to.starts_with("bounce") {
                return Err(TransportError::Rejected {
                    status: 400,
                    body: "mailbox unavailable".to_string(),
                });
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(format!("id-{}", message.to))
        }
    }

    fn contact(id: i32, phone: &str, email: Option<&str>) -> emergency_contact::Model {
        let now = chrono::NaiveDate::from_ymd_opt(2026, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 30, 0))
            .unwrap();
        emergency_contact::Model {
            id,
            user_id: 1,
            name: format!("Contact {id}"),
            relation: String::new(),
            phone: phone.to_string(),
            email: email.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    fn alert() -> AlertContext {
        AlertContext {
            user_name: "Rosa".to_string(),
            user_email: "rosa@example.com".to_string(),
            user_phone: None,
            location: None,
            message: "Emergency alert triggered".to_string(),
            timestamp: "2026-03-14 09:30:00 UTC".to_string(),
        }
    }

    #[tokio::test]
    async fn only_contacts_with_email_are_attempted() {
        let transport = Arc::new(ScriptedEmail {
            sent: Mutex::new(Vec::new()),
        });
        let channel = EmailChannel::new(
            transport.clone(),
            Arc::new(NotificationTemplates::new().unwrap()),
        );
        let contacts = vec![
            contact(1, "+1 555 0101", Some(" ana@example.com ")),
            contact(2, "+1 555 0102", Some("   ")),
            contact(3, "+1 555 0103", None),
        ];

        let report = channel.send_batch(&contacts, &alert()).await;

        assert_eq!((report.sent, report.failed, report.total_contacts), (1, 0, 1));
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].to, "ana@example.com");
        assert_eq!(sent[0].reply_to.as_deref(), Some("rosa@example.com"));
        assert_eq!(sent[0].sender_name, "Rosa (rosa@example.com) via CareConnect");
    }

    #[tokio::test]
    async fn sender_without_email_has_no_reply_to() {
        let transport = Arc::new(ScriptedEmail {
            sent: Mutex::new(Vec::new()),
        });
        let channel = EmailChannel::new(
            transport.clone(),
            Arc::new(NotificationTemplates::new().unwrap()),
        );
        let mut alert = alert();
        alert.user_email = "  ".to_string();

        let report = channel
            .send_batch(&[contact(1, "", Some("ana@example.com"))], &alert)
            .await;

        assert_eq!(report.sent, 1);
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].reply_to, None);
        assert_eq!(sent[0].sender_name, "Rosa via CareConnect");
    }

    #[tokio::test]
    async fn a_panicking_recipient_does_not_sink_the_batch() {
        let transport = Arc::new(ScriptedEmail {
            sent: Mutex::new(Vec::new()),
        });
        let channel = EmailChannel::new(
            transport.clone(),
            Arc::new(NotificationTemplates::new().unwrap()),
        );
        let contacts = vec![
            contact(1, "", Some("panic@example.com")),
            contact(2, "", Some("bounce@example.com")),
            contact(3, "", Some("ok@example.com")),
        ];

        let report = channel.send_batch(&contacts, &alert()).await;

        assert_eq!((report.sent, report.failed), (1, 2));
        let ok = report
            .results
            .iter()
            .find(|a| a.recipient == "ok@example.com")
            .unwrap();
        assert_eq!(ok.result.as_deref(), Ok("id-ok@example.com"));
    }

    #[test]
    fn empty_report_has_zero_counts() {
        let report = BatchReport::empty("sms");
        assert_eq!((report.sent, report.failed, report.total_contacts), (0, 0, 0));
        assert!(report.results.is_empty());
    }
}
