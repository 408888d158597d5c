pub mod balance;
pub mod leverage;
pub mod order;
pub mod position;
