pub mod cache;
pub mod models;
