//! Acme book API library: header authentication backed by a cached user
//! directory, plus the book catalogue and the standalone auth service.

pub mod auth_service;
pub mod books;
pub mod config;
pub mod db;
pub mod directory;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;

pub use config::AppConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
