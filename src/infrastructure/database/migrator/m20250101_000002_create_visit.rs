//! Create visit table and its owned child tables

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_session_slot::SessionSlot;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Visit::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Visit::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Visit::Reference).string().not_null().unique_key())
                    .col(ColumnDef::new(Visit::PrisonerId).string().not_null())
                    .col(ColumnDef::new(Visit::PrisonId).integer().not_null())
                    .col(ColumnDef::new(Visit::SessionSlotId).integer().not_null())
                    .col(ColumnDef::new(Visit::Restriction).string().not_null())
                    .col(ColumnDef::new(Visit::VisitType).string().not_null())
                    .col(ColumnDef::new(Visit::VisitRoom).string().not_null())
                    .col(
                        ColumnDef::new(Visit::VisitStatus)
                            .string()
                            .not_null()
                            .default("BOOKED"),
                    )
                    .col(ColumnDef::new(Visit::OutcomeStatus).string())
                    .col(ColumnDef::new(Visit::UserType).string().not_null())
                    .col(
                        ColumnDef::new(Visit::CreateTimestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Visit::ModifyTimestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_visit_session_slot")
                            .from(Visit::Table, Visit::SessionSlotId)
                            .to(SessionSlot::Table, SessionSlot::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_visit_slot_capacity")
                    .table(Visit::Table)
                    .col(Visit::SessionSlotId)
                    .col(Visit::Restriction)
                    .col(Visit::VisitStatus)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_visit_prisoner")
                    .table(Visit::Table)
                    .col(Visit::PrisonerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VisitContact::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VisitContact::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VisitContact::VisitId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(VisitContact::Name).string().not_null())
                    .col(ColumnDef::new(VisitContact::Telephone).string())
                    .col(ColumnDef::new(VisitContact::Email).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_visit_contact_visit")
                            .from(VisitContact::Table, VisitContact::VisitId)
                            .to(Visit::Table, Visit::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VisitVisitor::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VisitVisitor::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VisitVisitor::VisitId).integer().not_null())
                    .col(
                        ColumnDef::new(VisitVisitor::NomisPersonId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VisitVisitor::VisitContact)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_visit_visitor_visit")
                            .from(VisitVisitor::Table, VisitVisitor::VisitId)
                            .to(Visit::Table, Visit::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VisitSupport::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VisitSupport::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VisitSupport::VisitId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(VisitSupport::Description).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_visit_support_visit")
                            .from(VisitSupport::Table, VisitSupport::VisitId)
                            .to(Visit::Table, Visit::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VisitNote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VisitNote::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VisitNote::VisitId).integer().not_null())
                    .col(ColumnDef::new(VisitNote::NoteType).string().not_null())
                    .col(ColumnDef::new(VisitNote::Text).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_visit_note_visit")
                            .from(VisitNote::Table, VisitNote::VisitId)
                            .to(Visit::Table, Visit::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VisitNote::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VisitSupport::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VisitVisitor::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(VisitContact::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Visit::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Visit {
    Table,
    Id,
    Reference,
    PrisonerId,
    PrisonId,
    SessionSlotId,
    Restriction,
    VisitType,
    VisitRoom,
    VisitStatus,
    OutcomeStatus,
    UserType,
    CreateTimestamp,
    ModifyTimestamp,
}

#[derive(Iden)]
enum VisitContact {
    Table,
    Id,
    VisitId,
    Name,
    Telephone,
    Email,
}

#[derive(Iden)]
enum VisitVisitor {
    Table,
    Id,
    VisitId,
    NomisPersonId,
    VisitContact,
}

#[derive(Iden)]
enum VisitSupport {
    Table,
    Id,
    VisitId,
    Description,
}

#[derive(Iden)]
enum VisitNote {
    Table,
    Id,
    VisitId,
    NoteType,
    Text,
}
