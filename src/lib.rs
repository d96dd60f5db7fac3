pub mod app;
pub mod auth;
pub mod chart;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod session;
pub mod storage;
pub mod ui;
pub mod state;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
