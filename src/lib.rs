pub mod config;
pub mod datasets;
pub mod db;
pub mod fetch;
pub mod load;
pub mod process;
pub mod schema;
