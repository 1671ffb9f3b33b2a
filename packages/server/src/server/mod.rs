// HTTP server setup (Axum, read-only page API)
pub mod app;
pub mod routes;

pub use app::*;
