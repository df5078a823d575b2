//! `SeaORM` Entity for users table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    /// Spendable coins
    pub balance: i64,
    /// Lifetime coins deposited
    pub stats_deposit: i64,
    /// Coins that must be wagered before a withdrawal is allowed
    pub limits_bet_to_withdraw: i64,
    /// Coins deposited by users this user referred
    pub affiliates_deposit: i64,
    pub affiliates_referrer: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::deposit_transactions::Entity")]
    DepositTransactions,
}

impl Related<super::deposit_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DepositTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
