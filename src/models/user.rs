use serde::{Deserialize, Serialize};

use crate::entities::users;

/// Balance view pushed to the user's sessions after a credit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub id: i32,
    pub username: String,
    pub balance: i64,
    pub stats: UserStats,
    pub limits: UserLimits,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    pub deposit: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLimits {
    pub bet_to_withdraw: i64,
}

impl From<users::Model> for UserSnapshot {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            balance: model.balance,
            stats: UserStats {
                deposit: model.stats_deposit,
            },
            limits: UserLimits {
                bet_to_withdraw: model.limits_bet_to_withdraw,
            },
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Event fanned out to every session, filtered per connection by `user_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEvent {
    pub user_id: i32,
    pub user: UserSnapshot,
}
