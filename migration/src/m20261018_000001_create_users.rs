//! Migration to create the users table holding cashier balances and counters

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Username).not_null())
                    .col(big_integer(Users::Balance).default(0))
                    .col(big_integer(Users::StatsDeposit).default(0))
                    .col(big_integer(Users::LimitsBetToWithdraw).default(0))
                    .col(big_integer(Users::AffiliatesDeposit).default(0))
                    .col(integer_null(Users::AffiliatesReferrer))
                    .col(timestamp_with_time_zone(Users::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Users::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_affiliates_referrer")
                            .from(Users::Table, Users::AffiliatesReferrer)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Referrer lookups when crediting affiliates
        manager
            .create_index(
                Index::create()
                    .name("idx_users_affiliates_referrer")
                    .table(Users::Table)
                    .col(Users::AffiliatesReferrer)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Balance,
    StatsDeposit,
    LimitsBetToWithdraw,
    AffiliatesDeposit,
    AffiliatesReferrer,
    CreatedAt,
    UpdatedAt,
}
