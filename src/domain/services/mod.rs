pub mod account_store;
pub mod math;
pub mod reports;
