#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use careconnect_sos::app::{self, AppState};
use careconnect_sos::auth::{AuthKeys, Claims, Identity};
use careconnect_sos::dispatch::SosDispatcher;
use careconnect_sos::entities::sos_alert::{AlertStatus, GeoLocation};
use careconnect_sos::entities::{emergency_contact, sos_alert, user};
use careconnect_sos::notifications::{
    AlertContext, BatchReport, ChannelRegistry, EmailChannel, EmailMessage, EmailTransport,
    NotificationChannel, NotificationTemplates, SmsChannel, SmsTransport, TransportError,
};
use careconnect_sos::sea_orm::prelude::DateTime;
use careconnect_sos::sea_orm::DbErr;
use careconnect_sos::store::{AlertStore, ContactStore, NewContact, UserDirectory};
use jsonwebtoken::{encode, EncodingKey, Header};
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "test-secret";

/// Ordered record of store writes and deliveries, shared by every fake.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn timestamp(hour: u32) -> DateTime {
    chrono::NaiveDate::from_ymd_opt(2026, 3, 14)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap()
}

#[derive(Default)]
pub struct MemoryStore {
    pub users: Mutex<Vec<user::Model>>,
    pub contacts: Mutex<Vec<emergency_contact::Model>>,
    pub alerts: Mutex<Vec<sos_alert::Model>>,
    pub events: EventLog,
    pub fail_alert_writes: AtomicBool,
    pub fail_contact_reads: AtomicBool,
    next_contact_id: AtomicI32,
}

impl MemoryStore {
    pub fn new(events: EventLog) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    fn log(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn add_user(&self, id: i32, name: &str, email: &str) -> Identity {
        let user = user::Model {
            id,
            name: name.to_string(),
            email: email.to_string(),
            phone: "+1 555 0000".to_string(),
            created_at: timestamp(8),
            updated_at: timestamp(8),
        };
        self.users.lock().unwrap().push(user.clone());
        Identity::from(user)
    }

    pub fn add_contact(
        &self,
        user_id: i32,
        name: &str,
        phone: &str,
        email: Option<&str>,
    ) -> emergency_contact::Model {
        let contact = emergency_contact::Model {
            id: self.next_contact_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            name: name.to_string(),
            relation: String::new(),
            phone: phone.to_string(),
            email: email.map(str::to_string),
            created_at: timestamp(8),
            updated_at: timestamp(8),
        };
        self.contacts.lock().unwrap().push(contact.clone());
        contact
    }

    pub fn add_alert(&self, user_id: i32, hour: u32) -> sos_alert::Model {
        let alert = sos_alert::Model {
            id: Uuid::new_v4(),
            user_id,
            message: "Emergency alert triggered".to_string(),
            location: Some(GeoLocation {
                latitude: Some(40.0),
                longitude: Some(-74.0),
                accuracy: None,
            }),
            status: AlertStatus::Active,
            created_at: timestamp(hour),
            updated_at: timestamp(hour),
        };
        self.alerts.lock().unwrap().push(alert.clone());
        alert
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn insert_alert(&self, alert: sos_alert::Model) -> Result<sos_alert::Model, DbErr> {
        if self.fail_alert_writes.load(Ordering::SeqCst) {
            return Err(DbErr::Custom("connection refused".to_string()));
        }
        self.alerts.lock().unwrap().push(alert.clone());
        self.log("alert_persisted");
        Ok(alert)
    }

    async fn find_alert(&self, id: Uuid) -> Result<Option<sos_alert::Model>, DbErr> {
        Ok(self.alerts.lock().unwrap().iter().find(|a| a.id == id).cloned())
    }

    async fn list_alerts_for_user(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<sos_alert::Model>, DbErr> {
        let mut alerts: Vec<_> = self
            .alerts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts.truncate(limit as usize);
        Ok(alerts)
    }

    async fn update_alert_status(
        &self,
        id: Uuid,
        status: AlertStatus,
        updated_at: DateTime,
    ) -> Result<sos_alert::Model, DbErr> {
        let mut alerts = self.alerts.lock().unwrap();
        let alert = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| DbErr::RecordNotFound(id.to_string()))?;
        alert.status = status;
        alert.updated_at = updated_at;
        Ok(alert.clone())
    }

    async fn delete_alert(&self, id: Uuid) -> Result<(), DbErr> {
        self.alerts.lock().unwrap().retain(|a| a.id != id);
        Ok(())
    }

    async fn count_alerts(&self) -> Result<u64, DbErr> {
        Ok(self.alert_count() as u64)
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn list_contacts_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<emergency_contact::Model>, DbErr> {
        if self.fail_contact_reads.load(Ordering::SeqCst) {
            return Err(DbErr::Custom("contacts unavailable".to_string()));
        }
        self.log("contacts_loaded");
        let mut contacts: Vec<_> = self
            .contacts
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        contacts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(contacts)
    }

    async fn find_contact(&self, id: i32) -> Result<Option<emergency_contact::Model>, DbErr> {
        Ok(self.contacts.lock().unwrap().iter().find(|c| c.id == id).cloned())
    }

    async fn insert_contact(
        &self,
        contact: NewContact,
    ) -> Result<emergency_contact::Model, DbErr> {
        let model = emergency_contact::Model {
            id: self.next_contact_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id: contact.user_id,
            name: contact.name,
            relation: contact.relation,
            phone: contact.phone,
            email: contact.email,
            created_at: timestamp(9),
            updated_at: timestamp(9),
        };
        self.contacts.lock().unwrap().push(model.clone());
        Ok(model)
    }

    async fn update_contact(
        &self,
        contact: emergency_contact::Model,
    ) -> Result<emergency_contact::Model, DbErr> {
        let mut contacts = self.contacts.lock().unwrap();
        let stored = contacts
            .iter_mut()
            .find(|c| c.id == contact.id)
            .ok_or_else(|| DbErr::RecordNotFound(contact.id.to_string()))?;
        *stored = contact.clone();
        Ok(contact)
    }

    async fn delete_contact(&self, id: i32) -> Result<(), DbErr> {
        self.contacts.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user(&self, id: i32) -> Result<Option<user::Model>, DbErr> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }
}

/// Email transport that records deliveries. Recipients listed in `failing`
/// are rejected and those in `panicking` make the transport panic.
#[derive(Default)]
pub struct RecordingEmail {
    pub events: EventLog,
    pub sent: Mutex<Vec<EmailMessage>>,
    pub failing: Vec<String>,
    pub panicking: Vec<String>,
}

#[async_trait]
impl EmailTransport for RecordingEmail {
    async fn send_email(&self, message: &EmailMessage) -> Result<String, TransportError> {
        if self.panicking.contains(&message.to) {
            panic!("email transport crashed for {}", message.to);
        }
        if self.failing.contains(&message.to) {
            return Err(TransportError::Rejected {
                status: 550,
                body: "mailbox unavailable".to_string(),
            });
        }
        self.events.lock().unwrap().push(format!("email:{}", message.to));
        self.sent.lock().unwrap().push(message.clone());
        Ok(format!("email-{}", message.to))
    }
}

#[derive(Default)]
pub struct RecordingSms {
    pub events: EventLog,
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_all: bool,
}

#[async_trait]
impl SmsTransport for RecordingSms {
    async fn send_sms(&self, to: &str, body: &str) -> Result<String, TransportError> {
        if self.fail_all {
            return Err(TransportError::Misconfigured("no sender number".to_string()));
        }
        self.events.lock().unwrap().push(format!("sms:{}", to));
        self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
        Ok(format!("sms-{}", to))
    }
}

/// A channel whose whole batch blows up.
pub struct PanickingChannel;

#[async_trait]
impl NotificationChannel for PanickingChannel {
    fn name(&self) -> &'static str {
        "pager"
    }

    async fn send_batch(
        &self,
        _contacts: &[emergency_contact::Model],
        _alert: &AlertContext,
    ) -> BatchReport {
        panic!("pager channel crashed");
    }
}

pub struct Harness {
    pub events: EventLog,
    pub store: Arc<MemoryStore>,
    pub email: Arc<RecordingEmail>,
    pub sms: Arc<RecordingSms>,
    pub dispatcher: SosDispatcher,
    pub state: AppState,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(RecordingEmail::default(), RecordingSms::default(), Vec::new())
    }

    /// `extra` channels run ahead of email and SMS.
    pub fn build(
        email: RecordingEmail,
        sms: RecordingSms,
        extra: Vec<Arc<dyn NotificationChannel>>,
    ) -> Self {
        let events: EventLog = Arc::default();
        let store = Arc::new(MemoryStore::new(events.clone()));
        let email = Arc::new(RecordingEmail {
            events: events.clone(),
            ..email
        });
        let sms = Arc::new(RecordingSms {
            events: events.clone(),
            ..sms
        });

        let templates = Arc::new(NotificationTemplates::new().unwrap());
        let mut channels = extra;
        channels.push(Arc::new(EmailChannel::new(email.clone(), templates.clone())));
        channels.push(Arc::new(SmsChannel::new(sms.clone(), templates)));

        let dispatcher =
            SosDispatcher::new(store.clone(), store.clone(), ChannelRegistry::new(channels));
        let state = AppState {
            alerts: store.clone(),
            contacts: store.clone(),
            users: store.clone(),
            dispatcher: dispatcher.clone(),
            auth: AuthKeys::from_secret(SECRET.as_bytes()),
            alert_history_limit: 50,
        };

        Self {
            events,
            store,
            email,
            sms,
            dispatcher,
            state,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn delivery_events(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with("email:") || e.starts_with("sms:"))
            .collect()
    }

    pub fn router(&self) -> Router {
        app::router(self.state.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.unwrap()
    }
}

pub fn token_for(user_id: i32) -> String {
    let exp = (chrono::Utc::now().timestamp() + 3600) as usize;
    encode(
        &Header::default(),
        &Claims { id: user_id, exp },
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn authed(method: &str, uri: &str, user_id: i32, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token_for(user_id)));
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
