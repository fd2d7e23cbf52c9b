use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account owned by the identity provider. Read-only from this service.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub phone: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::emergency_contact::Entity")]
    EmergencyContact,
    #[sea_orm(has_many = "super::sos_alert::Entity")]
    SosAlert,
}

impl Related<super::emergency_contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EmergencyContact.def()
    }
}

impl Related<super::sos_alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SosAlert.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
