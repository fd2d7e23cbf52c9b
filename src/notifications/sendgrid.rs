use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::transport::{EmailMessage, EmailTransport, TransportError};
use crate::config::SendGridConfig;

/// Email over the SendGrid v3 `mail/send` endpoint.
pub struct SendGridTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from_email: String,
}

impl SendGridTransport {
    pub fn new(client: reqwest::Client, config: &SendGridConfig, from_email: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/v3/mail/send", config.api_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            from_email: from_email.to_string(),
        }
    }
}

#[async_trait]
impl EmailTransport for SendGridTransport {
    async fn send_email(&self, message: &EmailMessage) -> Result<String, TransportError> {
        if self.from_email.trim().is_empty() {
            return Err(TransportError::Misconfigured(
                "sender address is empty".to_string(),
            ));
        }

        let mut body = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": self.from_email, "name": message.sender_name },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.text },
                { "type": "text/html", "value": message.html },
            ],
        });
        if let Some(reply_to) = &message.reply_to {
            body["reply_to"] = json!({ "email": reply_to });
        }

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        // SendGrid answers 202 with an empty body; the id travels in a header.
        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("accepted")
            .to_string();
        info!("Email accepted by SendGrid for {} ({})", message.to, message_id);
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> EmailMessage {
        EmailMessage {
            to: "ana@example.com".to_string(),
            subject: "EMERGENCY ALERT from Rosa".to_string(),
            text: "help".to_string(),
            html: "<p>help</p>".to_string(),
            sender_name: "Rosa (rosa@example.com) via CareConnect".to_string(),
            reply_to: Some("rosa@example.com".to_string()),
        }
    }

    fn transport(server: &MockServer) -> SendGridTransport {
        let config = SendGridConfig {
            api_key: "SG.test".to_string(),
            api_url: server.uri(),
        };
        SendGridTransport::new(reqwest::Client::new(), &config, "alerts@careconnect.app")
    }

    #[tokio::test]
    async fn accepted_mail_returns_the_message_id_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .and(header("authorization", "Bearer SG.test"))
            .respond_with(ResponseTemplate::new(202).insert_header("x-message-id", "msg-123"))
            .expect(1)
            .mount(&server)
            .await;

        let id = transport(&server).send_email(&message()).await.unwrap();

        assert_eq!(id, "msg-123");
    }

    #[tokio::test]
    async fn rejection_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/mail/send"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = transport(&server).send_email(&message()).await.unwrap_err();

        match err {
            TransportError::Rejected { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
