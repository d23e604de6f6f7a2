//! Transfers and their ledger entries.
//!
//! - `transfers`: one row per committed transfer, keyed by the caller's
//!   transfer id. The primary key is the idempotency constraint.
//! - `ledger_entries`: exactly two rows per transfer (debit + credit).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Transfers {
    Table,
    Id,
    SourceAccountId,
    SourceAccountName,
    DestinationAccountId,
    DestinationAccountName,
    AmountMinor,
    Memo,
    OccurredAt,
}

#[derive(Iden)]
enum LedgerEntries {
    Table,
    Id,
    TransferId,
    Side,
    AccountId,
    DeltaMinor,
    OccurredAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transfers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Transfers::SourceAccountId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transfers::SourceAccountName).string())
                    .col(
                        ColumnDef::new(Transfers::DestinationAccountId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transfers::DestinationAccountName).string())
                    .col(
                        ColumnDef::new(Transfers::AmountMinor)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Transfers::AmountMinor).gt(0)),
                    )
                    .col(ColumnDef::new(Transfers::Memo).string())
                    .col(
                        ColumnDef::new(Transfers::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LedgerEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerEntries::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::TransferId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerEntries::Side).string().not_null())
                    .col(
                        ColumnDef::new(LedgerEntries::AccountId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::DeltaMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerEntries::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-ledger_entries-transfer_id")
                            .from(LedgerEntries::Table, LedgerEntries::TransferId)
                            .to(Transfers::Table, Transfers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-ledger_entries-transfer_id-side")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::TransferId)
                    .col(LedgerEntries::Side)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger_entries-account_id")
                    .table(LedgerEntries::Table)
                    .col(LedgerEntries::AccountId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LedgerEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transfers::Table).to_owned())
            .await
    }
}
