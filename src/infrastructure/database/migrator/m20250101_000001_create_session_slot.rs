//! Create session_slot table
//!
//! One row per concrete occurrence of a session template. The unique index
//! is what makes slot resolution a get-or-create under concurrent callers.
//! It is keyed on `template_key`, the template reference or `''` for ad-hoc
//! slots, since NULLs never conflict in a unique index.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SessionSlot::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionSlot::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SessionSlot::Reference)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(SessionSlot::SessionTemplateReference).string())
                    .col(
                        ColumnDef::new(SessionSlot::TemplateKey)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(SessionSlot::PrisonId).integer().not_null())
                    .col(ColumnDef::new(SessionSlot::SlotDate).date().not_null())
                    .col(
                        ColumnDef::new(SessionSlot::SlotStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionSlot::SlotEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionSlot::CreateTimestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionSlot::ModifyTimestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_session_slot_unique_occurrence")
                    .table(SessionSlot::Table)
                    .col(SessionSlot::PrisonId)
                    .col(SessionSlot::TemplateKey)
                    .col(SessionSlot::SlotStart)
                    .col(SessionSlot::SlotEnd)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_session_slot_date")
                    .table(SessionSlot::Table)
                    .col(SessionSlot::PrisonId)
                    .col(SessionSlot::SlotDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionSlot::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum SessionSlot {
    Table,
    Id,
    Reference,
    SessionTemplateReference,
    TemplateKey,
    PrisonId,
    SlotDate,
    SlotStart,
    SlotEnd,
    CreateTimestamp,
    ModifyTimestamp,
}
