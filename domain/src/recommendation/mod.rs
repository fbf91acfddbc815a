//! Recommendation: conflict ranking and installation order.

pub mod order;
pub mod ranking;

pub use order::installation_order;
pub use ranking::rank_conflicts;
