pub mod price_history;
pub mod stats;
pub mod transactions;
