// pagetest-server library
// Echo endpoints and static assets for text tests, served over axum

// Router and handlers
pub mod app;

// Configuration
pub mod config;

pub use app::{router, AppState};
pub use config::ServerConfig;
