pub mod config;
pub mod error;
pub mod models;
pub mod secret;
pub mod util;
