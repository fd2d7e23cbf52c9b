use std::sync::LazyLock;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::api::extract::{AppJson, AppPath};
use crate::app::AppState;
use crate::auth::Identity;
use crate::entities::emergency_contact;
use crate::error::AppError;
use crate::store::{ContactStore, NewContact};

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s\-\+\(\)]+$").unwrap());
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w+([\.-]?\w+)*@\w+([\.-]?\w+)*(\.\w{2,3})+$").unwrap()
});

#[derive(Debug, Default, Deserialize)]
pub struct CreateContactRequest {
    pub name: Option<String>,
    pub relation: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateContactRequest {
    pub name: Option<String>,
    pub relation: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn validate_phone(phone: &str) -> Result<String, AppError> {
    if !PHONE_PATTERN.is_match(phone) {
        return Err(AppError::InvalidArgument(
            "Please provide a valid phone number".to_string(),
        ));
    }
    Ok(phone.to_string())
}

/// Blank clears the address; anything else must look like an email.
fn validate_email(email: &str) -> Result<Option<String>, AppError> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(None);
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(AppError::InvalidArgument(
            "Please provide a valid email address".to_string(),
        ));
    }
    Ok(Some(email.to_lowercase()))
}

impl CreateContactRequest {
    fn validate(self, user_id: i32) -> Result<NewContact, AppError> {
        let (Some(name), Some(phone)) = (
            non_blank(self.name.as_deref()),
            non_blank(self.phone.as_deref()),
        ) else {
            return Err(AppError::InvalidArgument(
                "Please provide contact name and phone number".to_string(),
            ));
        };

        Ok(NewContact {
            user_id,
            name: name.to_string(),
            relation: self.relation.as_deref().unwrap_or("").trim().to_string(),
            phone: validate_phone(phone)?,
            email: match self.email.as_deref() {
                Some(email) => validate_email(email)?,
                None => None,
            },
        })
    }
}

impl UpdateContactRequest {
    /// Blank name or phone leaves the stored value alone.
    fn apply(
        self,
        mut contact: emergency_contact::Model,
    ) -> Result<emergency_contact::Model, AppError> {
        if let Some(name) = non_blank(self.name.as_deref()) {
            contact.name = name.to_string();
        }
        if let Some(relation) = self.relation.as_deref() {
            contact.relation = relation.trim().to_string();
        }
        if let Some(phone) = non_blank(self.phone.as_deref()) {
            contact.phone = validate_phone(phone)?;
        }
        if let Some(email) = self.email.as_deref() {
            contact.email = validate_email(email)?;
        }
        contact.updated_at = chrono::Utc::now().naive_utc();
        Ok(contact)
    }
}

async fn owned_contact(
    store: &dyn ContactStore,
    identity: &Identity,
    id: i32,
    forbidden: &'static str,
) -> Result<emergency_contact::Model, AppError> {
    let contact = store
        .find_contact(id)
        .await
        .map_err(AppError::storage("Server error: unable to fetch contact"))?
        .ok_or(AppError::NotFound("Contact not found"))?;

    if contact.user_id != identity.user_id {
        return Err(AppError::Forbidden(forbidden));
    }
    Ok(contact)
}

// GET /contacts
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError> {
    let contacts = state
        .contacts
        .list_contacts_for_user(identity.user_id)
        .await
        .map_err(AppError::storage("Server error: unable to fetch contacts"))?;
    Ok(Json(contacts))
}

// POST /contacts
pub async fn create_contact(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppJson(payload): AppJson<CreateContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    let contact = payload.validate(identity.user_id)?;
    let contact = state
        .contacts
        .insert_contact(contact)
        .await
        .map_err(AppError::storage("Server error: unable to add contact"))?;

    info!("Created emergency contact: {}", contact.id);
    Ok((StatusCode::CREATED, Json(contact)))
}

// PUT /contacts/:id
pub async fn update_contact(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<i32>,
    AppJson(payload): AppJson<UpdateContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    let contact = owned_contact(
        state.contacts.as_ref(),
        &identity,
        id,
        "Not authorized to update this contact",
    )
    .await?;
    let contact = payload.apply(contact)?;
    let contact = state
        .contacts
        .update_contact(contact)
        .await
        .map_err(AppError::storage("Server error: unable to update contact"))?;

    info!("Updated emergency contact: {}", contact.id);
    Ok(Json(contact))
}

// DELETE /contacts/:id
pub async fn delete_contact(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    AppPath(id): AppPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let contact = owned_contact(
        state.contacts.as_ref(),
        &identity,
        id,
        "Not authorized to delete this contact",
    )
    .await?;
    state
        .contacts
        .delete_contact(contact.id)
        .await
        .map_err(AppError::storage("Server error: unable to delete contact"))?;

    info!("Deleted emergency contact: {}", contact.id);
    Ok(Json(json!({ "message": "Contact deleted successfully" })))
}
