pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod permissions;
pub mod models;
pub mod controllers;
pub mod services;

pub use database::MIGRATOR;

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub config: config::Config,
}
