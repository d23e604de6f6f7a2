//! Budget thresholds, one row per category.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Budgets {
    Table,
    CategoryId,
    LimitMinor,
    WarnRatio,
    PeriodStart,
    PeriodEnd,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Budgets::CategoryId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Budgets::LimitMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Budgets::WarnRatio)
                            .double()
                            .not_null()
                            .default(0.8),
                    )
                    .col(ColumnDef::new(Budgets::PeriodStart).date().not_null())
                    .col(ColumnDef::new(Budgets::PeriodEnd).date().not_null())
                    .col(
                        ColumnDef::new(Budgets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Budgets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-period")
                    .table(Budgets::Table)
                    .col(Budgets::PeriodStart)
                    .col(Budgets::PeriodEnd)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await
    }
}
