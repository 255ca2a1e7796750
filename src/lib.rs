pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod resources;
pub mod store;

pub use app::{app, connect_user_store, AppState};
pub use config::AppConfig;
