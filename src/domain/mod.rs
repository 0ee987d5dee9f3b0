pub mod day_boundary;
pub mod messages;
pub mod models;
