pub mod common;
pub mod config_loading;
pub mod metadata_loading;
