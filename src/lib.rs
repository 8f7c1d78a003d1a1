pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod inventory;
pub mod model;
pub mod store;
pub mod util;
