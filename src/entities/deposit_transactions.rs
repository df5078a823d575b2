//! SeaORM Entity for deposit_transactions table
//!
//! Amounts are stored in minor units: `amount` is fiat cents, `credited_amount`
//! is platform coins and stays `None` until the deposit is completed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "deposit_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub kind: String,
    pub provider: String,
    pub state: String,
    pub amount: i64,
    pub credited_amount: Option<i64>,
    /// Verification note, order id or deposit address
    #[sea_orm(unique)]
    pub provider_id: String,
    /// Cash tag, checkout URL or deposit address
    pub provider_url: String,
    pub currency: String,
    pub amount_currency: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
