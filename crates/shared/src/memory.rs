//! In-process stores for tests and local development

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::store::{OAuthStateStore, UserStore};
use crate::types::{NewUser, PageRequest, ProfileUpdate, Role, UserId, UserPage, UserRecord};

#[derive(Default)]
struct Users {
    next_id: i64,
    rows: Vec<UserRecord>,
}

/// `UserStore` kept in memory. Username uniqueness is enforced the same
/// way the database index does it.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Users>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let users = self.inner.read().await;
        Ok(users.rows.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<UserRecord>> {
        let users = self.inner.read().await;
        Ok(users.rows.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        let mut users = self.inner.write().await;
        if users.rows.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate);
        }

        users.next_id += 1;
        let id = UserId(users.next_id);
        users.rows.push(UserRecord {
            id,
            username: user.username,
            password_hash: user.password_hash,
            salt: user.salt,
            email: user.email,
            phone_number: user.phone_number,
            role: user.role,
        });
        Ok(id)
    }

    async fn update_profile(&self, username: &str, update: ProfileUpdate) -> StoreResult<()> {
        let mut users = self.inner.write().await;
        let user = users
            .rows
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or(StoreError::NotFound)?;

        if let Some(change) = update.password {
            user.password_hash = change.password_hash;
            user.salt = change.salt;
        }
        if let Some(email) = update.email {
            user.email = Some(email);
        }
        if let Some(phone) = update.phone_number {
            user.phone_number = Some(phone);
        }
        Ok(())
    }

    async fn list_users(&self, page: PageRequest) -> StoreResult<UserPage> {
        let users = self.inner.read().await;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(0);

        Ok(UserPage {
            users: users
                .rows
                .iter()
                .skip(offset)
                .take(limit)
                .map(UserRecord::summary)
                .collect(),
            page: page.page,
            limit: page.limit,
            total: users.rows.len() as i64,
        })
    }

    async fn update_role(&self, id: UserId, role: &Role) -> StoreResult<()> {
        let mut users = self.inner.write().await;
        let user = users
            .rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        user.role = role.clone();
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// `OAuthStateStore` kept in memory
#[derive(Default)]
pub struct MemoryOAuthStateStore {
    states: RwLock<HashMap<String, OffsetDateTime>>,
}

impl MemoryOAuthStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OAuthStateStore for MemoryOAuthStateStore {
    async fn save(&self, state: &str, expires_at: OffsetDateTime) -> StoreResult<()> {
        let now = OffsetDateTime::now_utc();
        let mut states = self.states.write().await;
        states.retain(|_, exp| *exp > now);
        states.insert(state.to_string(), expires_at);
        Ok(())
    }

    async fn consume(&self, state: &str) -> StoreResult<bool> {
        let mut states = self.states.write().await;
        Ok(states
            .remove(state)
            .is_some_and(|exp| exp > OffsetDateTime::now_utc()))
    }
}
