//! Authgate API Library
//!
//! Session authentication service: password and OAuth sign-in backed by
//! signed, cookie-borne tokens.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod security;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
