//! `taxbook-server` answers tax handbook questions over HTTP.
//! It loads the handbook from a CSV manifest at startup and can re-index on request.

pub mod config;
pub mod error;
pub mod server;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{AppState, app_router, build_state, run_server};
