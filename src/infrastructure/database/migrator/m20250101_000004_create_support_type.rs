//! Create support_type lookup table and seed the known codes

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const SUPPORT_TYPES: [(&str, &str); 5] = [
    ("WHEELCHAIR", "Wheelchair ramp"),
    ("INDUCTION_LOOP", "Portable induction loop for people with hearing aids"),
    ("BSL_INTERPRETER", "British Sign Language (BSL) Interpreter"),
    ("MASK_EXEMPT", "Face covering exemption"),
    ("OTHER", "Other"),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SupportType::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SupportType::Code)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SupportType::Description).string().not_null())
                    .to_owned(),
            )
            .await?;

        let mut insert = Query::insert();
        insert
            .into_table(SupportType::Table)
            .columns([SupportType::Code, SupportType::Description]);
        for (code, description) in SUPPORT_TYPES {
            insert.values_panic([code.into(), description.into()]);
        }
        manager.exec_stmt(insert.to_owned()).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SupportType::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SupportType {
    Table,
    Code,
    Description,
}
