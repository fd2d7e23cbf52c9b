use std::net::SocketAddr;

use crate::telemetry::{LogFormat, TelemetryConfig};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_ALERT_HISTORY_LIMIT: u64 = 50;
pub const DEFAULT_EMAIL_FROM: &str = "alerts@careconnect.app";
pub const DEFAULT_SENDGRID_API_URL: &str = "https://api.sendgrid.com";
pub const DEFAULT_TWILIO_API_URL: &str = "https://api.twilio.com";
pub const DEFAULT_LOG_FILTER: &str = "info,careconnect_sos=info,sqlx=warn,sea_orm=warn";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from the process environment (after `.env` is loaded).
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub cors_allowed_origin: String,
    pub alert_history_limit: u64,
    pub notifications: NotificationConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug)]
pub struct NotificationConfig {
    /// Route every channel through the log-only transport.
    pub dry_run: bool,
    pub email_from: String,
    pub sendgrid: Option<SendGridConfig>,
    pub twilio: Option<TwilioConfig>,
}

#[derive(Clone)]
pub struct SendGridConfig {
    pub api_key: String,
    pub api_url: String,
}

#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_url: String,
}

impl std::fmt::Debug for SendGridConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridConfig")
            .field("api_key", &"[redacted]")
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[redacted]")
            .field("from_number", &self.from_number)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let bind_addr = parse(
            "BIND_ADDR",
            get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        )?;
        let alert_history_limit = match get("ALERT_HISTORY_LIMIT") {
            Some(value) => parse::<u64>("ALERT_HISTORY_LIMIT", value)?,
            None => DEFAULT_ALERT_HISTORY_LIMIT,
        };
        let dry_run = match get("NOTIFICATIONS_DRY_RUN") {
            Some(value) => parse_bool("NOTIFICATIONS_DRY_RUN", value)?,
            None => false,
        };
        let log_format = match get("RUST_LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "RUST_LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        let sendgrid = get("SENDGRID_API_KEY").map(|api_key| SendGridConfig {
            api_key,
            api_url: get("SENDGRID_API_URL")
                .unwrap_or_else(|| DEFAULT_SENDGRID_API_URL.to_string()),
        });

        // SMS needs the full credential triple; a partial set leaves it disabled.
        let twilio = match (
            get("TWILIO_ACCOUNT_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("TWILIO_SMS_FROM_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
                api_url: get("TWILIO_API_URL").unwrap_or_else(|| DEFAULT_TWILIO_API_URL.to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            jwt_secret: require("JWT_SECRET")?,
            bind_addr,
            cors_allowed_origin: get("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
            alert_history_limit,
            notifications: NotificationConfig {
                dry_run,
                email_from: get("NOTIFICATION_EMAIL_FROM")
                    .unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
                sendgrid,
                twilio,
            },
            telemetry: TelemetryConfig {
                log_format,
                filter: get("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
                otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
            },
        })
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

fn parse_bool(key: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/careconnect"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn defaults_apply_when_only_required_keys_are_set() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR.parse().unwrap());
        assert_eq!(config.alert_history_limit, 50);
        assert_eq!(config.cors_allowed_origin, DEFAULT_CORS_ORIGIN);
        assert!(!config.notifications.dry_run);
        assert!(config.notifications.sendgrid.is_none());
        assert!(config.notifications.twilio.is_none());
        assert_eq!(config.telemetry.log_format, LogFormat::Text);
        assert_eq!(config.telemetry.filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "secret")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn blank_secret_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/careconnect"),
            ("JWT_SECRET", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn partial_twilio_credentials_leave_sms_disabled() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("TWILIO_ACCOUNT_SID", "AC123"));
        pairs.push(("TWILIO_AUTH_TOKEN", "token"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert!(config.notifications.twilio.is_none());

        pairs.push(("TWILIO_SMS_FROM_NUMBER", "+15550100"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        let twilio = config.notifications.twilio.unwrap();
        assert_eq!(twilio.from_number, "+15550100");
        assert_eq!(twilio.api_url, DEFAULT_TWILIO_API_URL);
    }

    #[test]
    fn invalid_numbers_and_flags_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("ALERT_HISTORY_LIMIT", "lots"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ALERT_HISTORY_LIMIT", .. }));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("NOTIFICATIONS_DRY_RUN", "maybe"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "NOTIFICATIONS_DRY_RUN", .. }));
    }

    #[test]
    fn secrets_are_redacted_from_debug_output() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SENDGRID_API_KEY", "SG.very-secret"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        let debug = format!("{:?}", config.notifications);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("[redacted]"));
    }
}
