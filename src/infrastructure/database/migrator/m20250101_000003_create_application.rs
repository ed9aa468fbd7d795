//! Create application table and its owned child tables
//!
//! Capacity counts scan applications by (slot, restriction); the expiry
//! sweep scans by (completed, modify_timestamp).

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_session_slot::SessionSlot;
use super::m20250101_000002_create_visit::Visit;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Application::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Application::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Application::Reference)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Application::PrisonerId).string().not_null())
                    .col(ColumnDef::new(Application::PrisonId).integer().not_null())
                    .col(ColumnDef::new(Application::SessionSlotId).integer().not_null())
                    .col(ColumnDef::new(Application::VisitType).string().not_null())
                    .col(ColumnDef::new(Application::Restriction).string().not_null())
                    .col(
                        ColumnDef::new(Application::ReservedSlot)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Application::Completed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Application::UserType).string().not_null())
                    .col(
                        ColumnDef::new(Application::ApplicationMethod)
                            .string()
                            .not_null()
                            .default("NOT_KNOWN"),
                    )
                    .col(ColumnDef::new(Application::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Application::VisitId).integer())
                    .col(
                        ColumnDef::new(Application::CreateTimestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Application::ModifyTimestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_application_session_slot")
                            .from(Application::Table, Application::SessionSlotId)
                            .to(SessionSlot::Table, SessionSlot::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_application_visit")
                            .from(Application::Table, Application::VisitId)
                            .to(Visit::Table, Visit::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_application_slot_capacity")
                    .table(Application::Table)
                    .col(Application::SessionSlotId)
                    .col(Application::Restriction)
                    .col(Application::ReservedSlot)
                    .col(Application::Completed)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_application_expiry")
                    .table(Application::Table)
                    .col(Application::Completed)
                    .col(Application::ModifyTimestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApplicationContact::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApplicationContact::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApplicationContact::ApplicationId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ApplicationContact::Name).string().not_null())
                    .col(ColumnDef::new(ApplicationContact::Telephone).string())
                    .col(ColumnDef::new(ApplicationContact::Email).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_application_contact_application")
                            .from(ApplicationContact::Table, ApplicationContact::ApplicationId)
                            .to(Application::Table, Application::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApplicationVisitor::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApplicationVisitor::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApplicationVisitor::ApplicationId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApplicationVisitor::NomisPersonId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApplicationVisitor::VisitContact)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_application_visitor_application")
                            .from(ApplicationVisitor::Table, ApplicationVisitor::ApplicationId)
                            .to(Application::Table, Application::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApplicationSupport::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApplicationSupport::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ApplicationSupport::ApplicationId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ApplicationSupport::SupportType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ApplicationSupport::SupportDetails).string())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_application_support_application")
                            .from(ApplicationSupport::Table, ApplicationSupport::ApplicationId)
                            .to(Application::Table, Application::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ApplicationSupport::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApplicationVisitor::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApplicationContact::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Application::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Application {
    Table,
    Id,
    Reference,
    PrisonerId,
    PrisonId,
    SessionSlotId,
    VisitType,
    Restriction,
    ReservedSlot,
    Completed,
    UserType,
    ApplicationMethod,
    CreatedBy,
    VisitId,
    CreateTimestamp,
    ModifyTimestamp,
}

#[derive(Iden)]
enum ApplicationContact {
    Table,
    Id,
    ApplicationId,
    Name,
    Telephone,
    Email,
}

#[derive(Iden)]
enum ApplicationVisitor {
    Table,
    Id,
    ApplicationId,
    NomisPersonId,
    VisitContact,
}

#[derive(Iden)]
enum ApplicationSupport {
    Table,
    Id,
    ApplicationId,
    SupportType,
    SupportDetails,
}
