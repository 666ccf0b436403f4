// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod envelope;
pub mod http_api;
pub mod session_store;
pub mod session_sync;
