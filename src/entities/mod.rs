pub mod emergency_contact;
pub mod sos_alert;
pub mod user;

pub use emergency_contact::Entity as EmergencyContact;
pub use sos_alert::Entity as SosAlert;
pub use user::Entity as User;

