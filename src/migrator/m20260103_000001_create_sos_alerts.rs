use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SosAlerts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SosAlerts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(SosAlerts::UserId).integer().not_null())
                    .col(ColumnDef::new(SosAlerts::Message).text().not_null())
                    // NULL means geolocation was never attempted
                    .col(ColumnDef::new(SosAlerts::Location).json_binary())
                    .col(
                        ColumnDef::new(SosAlerts::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(SosAlerts::CreatedAt).date_time().not_null())
                    .col(ColumnDef::new(SosAlerts::UpdatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sos_alerts_user")
                            .from(SosAlerts::Table, SosAlerts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sos_alerts_user_created_at")
                    .table(SosAlerts::Table)
                    .col(SosAlerts::UserId)
                    .col(SosAlerts::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SosAlerts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SosAlerts {
    Table,
    Id,
    UserId,
    Message,
    Location,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
