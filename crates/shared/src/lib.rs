//! Authgate Shared Types and Storage
//!
//! Account types, the storage capabilities the auth service depends on, and
//! their PostgreSQL and in-memory implementations.

pub mod db;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod types;

pub use db::*;
pub use error::*;
pub use memory::{MemoryOAuthStateStore, MemoryUserStore};
pub use postgres::{PgOAuthStateStore, PgUserStore};
pub use store::{OAuthStateStore, UserStore};
pub use types::*;
