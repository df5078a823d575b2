pub use super::deposit_transactions::Entity as DepositTransactions;
pub use super::reports::Entity as Reports;
pub use super::users::Entity as Users;
