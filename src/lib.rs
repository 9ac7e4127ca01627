pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod receipt;
pub mod routes;
pub mod state;
pub mod store;
pub mod token;
pub mod utils;
