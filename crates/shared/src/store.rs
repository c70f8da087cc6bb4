//! Storage capabilities injected into the auth service
//!
//! The auth core never opens connections itself; it talks to these traits.
//! [`crate::postgres`] backs them with `sqlx`, [`crate::memory`] keeps
//! everything in process for tests and local runs.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::StoreResult;
use crate::types::{NewUser, PageRequest, ProfileUpdate, Role, UserId, UserPage, UserRecord};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact, case-sensitive lookup
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>>;

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<UserRecord>>;

    /// Insert a new account. A taken username yields `StoreError::Duplicate`.
    async fn create_user(&self, user: NewUser) -> StoreResult<UserId>;

    /// Apply a profile update. Unknown username yields `StoreError::NotFound`.
    async fn update_profile(&self, username: &str, update: ProfileUpdate) -> StoreResult<()>;

    async fn list_users(&self, page: PageRequest) -> StoreResult<UserPage>;

    /// Unknown id yields `StoreError::NotFound`.
    async fn update_role(&self, id: UserId, role: &Role) -> StoreResult<()>;

    /// Cheap round trip used by readiness probes
    async fn ping(&self) -> StoreResult<()>;
}

/// Single-use OAuth `state` values awaiting the provider callback
#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    async fn save(&self, state: &str, expires_at: OffsetDateTime) -> StoreResult<()>;

    /// Remove `state` and report whether it existed and was still live.
    /// A state can be consumed at most once.
    async fn consume(&self, state: &str) -> StoreResult<bool>;
}
