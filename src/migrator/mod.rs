use sea_orm_migration::prelude::*;

mod m20260101_000001_create_users;
mod m20260102_000001_create_emergency_contacts;
mod m20260103_000001_create_sos_alerts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260101_000001_create_users::Migration),
            Box::new(m20260102_000001_create_emergency_contacts::Migration),
            Box::new(m20260103_000001_create_sos_alerts::Migration),
        ]
    }
}
