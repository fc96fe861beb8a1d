pub mod alignment;
pub mod answer;
pub mod bracket;
pub mod candidates;
pub mod cascade;
pub mod classify;
pub mod criteria;
pub mod group;
pub mod lifting;
pub mod taxonomy;
pub mod types;
