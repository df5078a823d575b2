//! Migration to create the reports table (one row per UTC day of deposit totals)

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reports::Table)
                    .if_not_exists()
                    .col(pk_auto(Reports::Id))
                    // YYYY-MM-DD; the upsert conflict target
                    .col(string_len_uniq(Reports::Day, 10))
                    .col(big_integer(Reports::TotalDeposit).default(0))
                    .col(big_integer(Reports::CashappDeposit).default(0))
                    .col(big_integer(Reports::CardDeposit).default(0))
                    .col(big_integer(Reports::CryptoDeposit).default(0))
                    .col(timestamp_with_time_zone(Reports::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reports::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Reports {
    Table,
    Id,
    Day,
    TotalDeposit,
    CashappDeposit,
    CardDeposit,
    CryptoDeposit,
    UpdatedAt,
}
