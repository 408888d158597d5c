pub mod pnl;
pub mod price_event;
pub mod sort;
