pub mod channel;
pub mod dry_run;
pub mod registry;
pub mod sendgrid;
pub mod templates;
pub mod transport;
pub mod twilio;

pub use channel::{AlertContext, BatchReport, EmailChannel, NotificationAttempt, NotificationChannel, SmsChannel};
pub use registry::ChannelRegistry;
pub use templates::NotificationTemplates;
pub use transport::{EmailMessage, EmailTransport, SmsTransport, TransportError};
