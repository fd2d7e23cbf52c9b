use async_trait::async_trait;

/// One outbound email, already rendered.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    /// Display name shown in the From header.
    pub sender_name: String,
    pub reply_to: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("transport misconfigured: {0}")]
    Misconfigured(String),
    #[error("unexpected provider response: {0}")]
    MalformedResponse(String),
}

/// Returns the provider's message id on success.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<String, TransportError>;
}

#[async_trait]
pub trait SmsTransport: Send + Sync {
    async fn send_sms(&self, to: &str, body: &str) -> Result<String, TransportError>;
}
