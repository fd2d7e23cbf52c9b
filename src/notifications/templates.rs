use handlebars::{no_escape, Handlebars, RenderError, TemplateError};
use serde::Serialize;

use super::channel::AlertContext;

pub const FALLBACK_MESSAGE: &str = "Emergency assistance needed immediately!";
pub const NO_LOCATION_TEXT: &str = "Location not available";
/// Two concatenated SMS segments.
pub const SMS_MAX_CHARS: usize = 320;

const EMAIL_SUBJECT: &str = "🚨 EMERGENCY ALERT from {{user_name}}";

const EMAIL_TEXT: &str = r#"🚨 EMERGENCY ALERT 🚨

{{user_name}} ({{user_email}}) has triggered an emergency alert and needs your help!

{{message}}

{{location_text}}
{{#if map_link}}
View location on map: {{map_link}}
{{/if}}

Time: {{timestamp}}

⚠️ IMMEDIATE ACTION REQUIRED:
- Check on {{user_name}} immediately
{{#if user_phone}}
- Call them at {{user_phone}}
{{else}}
- Call them at their phone number
{{/if}}
- Contact emergency services (911) if needed

---
This alert was sent by {{user_name}} through CareConnect Emergency System.
You can reply to this email to reach {{user_name}} directly at: {{user_email}}"#;

const EMAIL_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
        .container { max-width: 600px; margin: 0 auto; padding: 20px; }
        .header { background: #dc2626; color: white; padding: 20px; border-radius: 5px; text-align: center; }
        .content { background: #f9fafb; padding: 20px; border-radius: 5px; margin-top: 20px; }
        .alert-box { background: #fef2f2; border-left: 4px solid #dc2626; padding: 15px; margin: 15px 0; }
        .button { display: inline-block; background: #2563eb; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; margin-top: 15px; }
        .footer { text-align: center; margin-top: 20px; color: #6b7280; font-size: 12px; }
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>🚨 EMERGENCY ALERT</h1>
        </div>
        <div class="content">
            <div class="alert-box">
                <h2>{{user_name}} has triggered an emergency alert</h2>
                <p><strong>Sent by:</strong> {{user_name}} ({{user_email}})</p>
                {{#if user_phone}}<p><strong>Phone:</strong> {{user_phone}}</p>{{/if}}
                <p><strong>Time:</strong> {{timestamp}}</p>
            </div>

            <p><strong>Message:</strong> {{message}}</p>

            {{#if map_link}}
            <p><strong>Location:</strong></p>
            <ul>
                <li>Latitude: {{latitude}}</li>
                <li>Longitude: {{longitude}}</li>
                {{#if accuracy}}<li>Accuracy: {{accuracy}} meters</li>{{/if}}
            </ul>
            <a href="{{map_link}}" class="button">📍 View Location on Google Maps</a>
            {{else}}
            <p><strong>Location:</strong> Not available</p>
            {{/if}}
        </div>
        <div class="footer">
            <p>This alert was sent by <strong>{{user_name}}</strong> through CareConnect Emergency System.</p>
            <p>Reply to this email to reach {{user_name}} directly at: <strong>{{user_email}}</strong></p>
        </div>
    </div>
</body>
</html>"#;

const SMS: &str = "🚨 EMERGENCY: {{user_name}} needs help. {{message}} {{location_text}}.{{#if map_link}} Map: {{map_link}}{{/if}}{{#if user_phone}} Call {{user_phone}}.{{/if}}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Serialize)]
struct AlertView<'a> {
    user_name: &'a str,
    user_email: &'a str,
    user_phone: Option<&'a str>,
    message: &'a str,
    location_text: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>,
    map_link: Option<String>,
    timestamp: &'a str,
}

impl<'a> AlertView<'a> {
    fn new(alert: &'a AlertContext) -> Self {
        let coordinates = alert.location.as_ref().and_then(|l| l.coordinates());
        let message = match alert.message.trim() {
            "" => FALLBACK_MESSAGE,
            message => message,
        };

        Self {
            user_name: &alert.user_name,
            user_email: &alert.user_email,
            user_phone: alert.user_phone.as_deref(),
            message,
            location_text: match coordinates {
                Some((lat, lng)) => format!("Latitude: {}, Longitude: {}", lat, lng),
                None => NO_LOCATION_TEXT.to_string(),
            },
            latitude: coordinates.map(|(lat, _)| lat),
            longitude: coordinates.map(|(_, lng)| lng),
            // Accuracy without coordinates says nothing useful.
            accuracy: coordinates.and(alert.location.as_ref().and_then(|l| l.accuracy)),
            map_link: coordinates
                .map(|(lat, lng)| format!("https://www.google.com/maps?q={},{}", lat, lng)),
            timestamp: &alert.timestamp,
        }
    }
}

/// Compiled SOS templates. Subject, text and SMS bodies are rendered without
/// HTML escaping; the HTML body escapes every interpolated value.
pub struct NotificationTemplates {
    plain: Handlebars<'static>,
    html: Handlebars<'static>,
}

impl NotificationTemplates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut plain = Handlebars::new();
        plain.register_escape_fn(no_escape);
        plain.register_template_string("sos_email_subject", EMAIL_SUBJECT)?;
        plain.register_template_string("sos_email_text", EMAIL_TEXT)?;
        plain.register_template_string("sos_sms", SMS)?;

        let mut html = Handlebars::new();
        html.register_template_string("sos_email_html", EMAIL_HTML)?;

        Ok(Self { plain, html })
    }

    pub fn render_email(&self, alert: &AlertContext) -> Result<RenderedEmail, RenderError> {
        let view = AlertView::new(alert);
        Ok(RenderedEmail {
            subject: self.plain.render("sos_email_subject", &view)?,
            text: self.plain.render("sos_email_text", &view)?.trim().to_string(),
            html: self.html.render("sos_email_html", &view)?,
        })
    }

    pub fn render_sms(&self, alert: &AlertContext) -> Result<String, RenderError> {
        let body = self.plain.render("sos_sms", &AlertView::new(alert))?;
        Ok(truncate_chars(&body, SMS_MAX_CHARS))
    }
}

fn truncate_chars(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((end, _)) => body[..end].to_string(),
        None => body.to_string(),
    }
}
