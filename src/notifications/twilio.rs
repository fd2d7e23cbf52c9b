use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::transport::{SmsTransport, TransportError};
use crate::config::TwilioConfig;

/// SMS over the Twilio Messages REST API.
pub struct TwilioTransport {
    client: reqwest::Client,
    endpoint: String,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Deserialize)]
struct MessageResource {
    sid: String,
}

impl TwilioTransport {
    pub fn new(client: reqwest::Client, config: &TwilioConfig) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/2010-04-01/Accounts/{}/Messages.json",
                config.api_url.trim_end_matches('/'),
                config.account_sid
            ),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
        }
    }
}

#[async_trait]
impl SmsTransport for TwilioTransport {
    async fn send_sms(&self, to: &str, body: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("From", self.from_number.as_str()), ("To", to), ("Body", body)])
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

        let resource: MessageResource = response
            .json()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;
        info!("SMS queued by Twilio for {} ({})", to, resource.sid);
        Ok(resource.sid)
    }
}
