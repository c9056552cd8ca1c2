pub mod hierarchy;
pub mod model;
pub mod weighted_quote;
