//! Migration to create the deposit_transactions table for pending and completed cashier deposits

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DepositTransactions::Table)
                    .if_not_exists()
                    .col(pk_auto(DepositTransactions::Id))
                    .col(integer(DepositTransactions::UserId).not_null())
                    .col(string(DepositTransactions::Kind).not_null())
                    .col(string(DepositTransactions::Provider).not_null())
                    .col(string(DepositTransactions::State).not_null())
                    .col(big_integer(DepositTransactions::Amount).not_null())
                    .col(big_integer_null(DepositTransactions::CreditedAmount))
                    .col(string_uniq(DepositTransactions::ProviderId))
                    .col(string(DepositTransactions::ProviderUrl).not_null())
                    .col(string(DepositTransactions::Currency).not_null())
                    .col(string(DepositTransactions::AmountCurrency).not_null())
                    .col(timestamp_with_time_zone(DepositTransactions::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(DepositTransactions::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deposit_transactions_user")
                            .from(DepositTransactions::Table, DepositTransactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for querying by user
        manager
            .create_index(
                Index::create()
                    .name("idx_deposit_transactions_user_id")
                    .table(DepositTransactions::Table)
                    .col(DepositTransactions::UserId)
                    .to_owned(),
            )
            .await?;

        // At most one pending request per user/provider/amount/currency.
        // Partial indexes are not expressible through the index builder, and
        // this statement is valid for both Postgres and SQLite.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_deposit_transactions_pending \
                 ON deposit_transactions (user_id, kind, provider, amount, currency) \
                 WHERE state = 'created'",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DepositTransactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DepositTransactions {
    Table,
    Id,
    UserId,
    Kind,
    Provider,
    State,
    Amount,
    CreditedAmount,
    ProviderId,
    ProviderUrl,
    Currency,
    AmountCurrency,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
