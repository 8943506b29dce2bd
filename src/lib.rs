pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod store;
