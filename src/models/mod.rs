pub mod cashier;
pub mod deposit;
pub mod user;
