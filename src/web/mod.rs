//! Web API module for mailgate.
//!
//! This module provides the HTTP surface: registration, login, and the two
//! token-protected mail endpoints.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::{shutdown_signal, WebServer};
