use async_trait::async_trait;
use sea_orm::prelude::DateTime;
use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entities::sos_alert::AlertStatus;
use crate::entities::{emergency_contact, sos_alert, user, EmergencyContact, SosAlert, User};

/// Durable log of SOS events.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert_alert(&self, alert: sos_alert::Model) -> Result<sos_alert::Model, DbErr>;
    async fn find_alert(&self, id: Uuid) -> Result<Option<sos_alert::Model>, DbErr>;
    /// Newest first, at most `limit` rows.
    async fn list_alerts_for_user(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<sos_alert::Model>, DbErr>;
    async fn update_alert_status(
        &self,
        id: Uuid,
        status: AlertStatus,
        updated_at: DateTime,
    ) -> Result<sos_alert::Model, DbErr>;
    async fn delete_alert(&self, id: Uuid) -> Result<(), DbErr>;
    async fn count_alerts(&self) -> Result<u64, DbErr>;
}

#[derive(Clone, Debug)]
pub struct NewContact {
    pub user_id: i32,
    pub name: String,
    pub relation: String,
    pub phone: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Sorted by name.
    async fn list_contacts_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<emergency_contact::Model>, DbErr>;
    async fn find_contact(&self, id: i32) -> Result<Option<emergency_contact::Model>, DbErr>;
    async fn insert_contact(
        &self,
        contact: NewContact,
    ) -> Result<emergency_contact::Model, DbErr>;
    /// Writes the mutable fields of `contact` back to its row.
    async fn update_contact(
        &self,
        contact: emergency_contact::Model,
    ) -> Result<emergency_contact::Model, DbErr>;
    async fn delete_contact(&self, id: i32) -> Result<(), DbErr>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: i32) -> Result<Option<user::Model>, DbErr>;
}

pub struct DbStore {
    db: DatabaseConnection,
}

impl DbStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AlertStore for DbStore {
    async fn insert_alert(&self, alert: sos_alert::Model) -> Result<sos_alert::Model, DbErr> {
        sos_alert::ActiveModel {
            id: Set(alert.id),
            user_id: Set(alert.user_id),
            message: Set(alert.message),
            location: Set(alert.location),
            status: Set(alert.status),
            created_at: Set(alert.created_at),
            updated_at: Set(alert.updated_at),
        }
        .insert(&self.db)
        .await
    }

    async fn find_alert(&self, id: Uuid) -> Result<Option<sos_alert::Model>, DbErr> {
        SosAlert::find_by_id(id).one(&self.db).await
    }

    async fn list_alerts_for_user(
        &self,
        user_id: i32,
        limit: u64,
    ) -> Result<Vec<sos_alert::Model>, DbErr> {
        SosAlert::find()
            .filter(sos_alert::Column::UserId.eq(user_id))
            .order_by_desc(sos_alert::Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await
    }

    async fn update_alert_status(
        &self,
        id: Uuid,
        status: AlertStatus,
        updated_at: DateTime,
    ) -> Result<sos_alert::Model, DbErr> {
        sos_alert::ActiveModel {
            id: Unchanged(id),
            status: Set(status),
            updated_at: Set(updated_at),
            ..Default::default()
        }
        .update(&self.db)
        .await
    }

    async fn delete_alert(&self, id: Uuid) -> Result<(), DbErr> {
        SosAlert::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    async fn count_alerts(&self) -> Result<u64, DbErr> {
        SosAlert::find().count(&self.db).await
    }
}

#[async_trait]
impl ContactStore for DbStore {
    async fn list_contacts_for_user(
        &self,
        user_id: i32,
    ) -> Result<Vec<emergency_contact::Model>, DbErr> {
        EmergencyContact::find()
            .filter(emergency_contact::Column::UserId.eq(user_id))
            .order_by_asc(emergency_contact::Column::Name)
            .all(&self.db)
            .await
    }

    async fn find_contact(&self, id: i32) -> Result<Option<emergency_contact::Model>, DbErr> {
        EmergencyContact::find_by_id(id).one(&self.db).await
    }

    async fn insert_contact(
        &self,
        contact: NewContact,
    ) -> Result<emergency_contact::Model, DbErr> {
        let now = chrono::Utc::now().naive_utc();
        emergency_contact::ActiveModel {
            user_id: Set(contact.user_id),
            name: Set(contact.name),
            relation: Set(contact.relation),
            phone: Set(contact.phone),
            email: Set(contact.email),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await
    }

    async fn update_contact(
        &self,
        contact: emergency_contact::Model,
    ) -> Result<emergency_contact::Model, DbErr> {
        emergency_contact::ActiveModel {
            id: Unchanged(contact.id),
            name: Set(contact.name),
            relation: Set(contact.relation),
            phone: Set(contact.phone),
            email: Set(contact.email),
            updated_at: Set(contact.updated_at),
            ..Default::default()
        }
        .update(&self.db)
        .await
    }

    async fn delete_contact(&self, id: i32) -> Result<(), DbErr> {
        EmergencyContact::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for DbStore {
    async fn find_user(&self, id: i32) -> Result<Option<user::Model>, DbErr> {
        User::find_by_id(id).one(&self.db).await
    }
}
