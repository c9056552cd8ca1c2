pub mod prior_day;
pub mod tracker;
