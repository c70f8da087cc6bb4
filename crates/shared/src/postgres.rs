//! PostgreSQL-backed stores

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::error::{StoreError, StoreResult};
use crate::store::{OAuthStateStore, UserStore};
use crate::types::{NewUser, PageRequest, ProfileUpdate, Role, UserId, UserPage, UserRecord, UserSummary};

const USER_COLUMNS: &str = "id, username, password, salt, email, phone_number, role";

/// `user_account` table access
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM user_account WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM user_account WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        // The unique index on username turns a racing duplicate into 23505
        let id: (UserId,) = sqlx::query_as(
            r#"
            INSERT INTO user_account (username, password, salt, email, phone_number, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.salt)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(id.0)
    }

    async fn update_profile(&self, username: &str, update: ProfileUpdate) -> StoreResult<()> {
        let (password_hash, salt) = match update.password {
            Some(change) => (Some(change.password_hash), Some(change.salt)),
            None => (None, None),
        };

        // Password and salt travel in the same statement so they never diverge
        let result = sqlx::query(
            r#"
            UPDATE user_account SET
                password = COALESCE($1, password),
                salt = COALESCE($2, salt),
                email = COALESCE($3, email),
                phone_number = COALESCE($4, phone_number),
                updated_at = NOW()
            WHERE username = $5
            "#,
        )
        .bind(password_hash)
        .bind(salt)
        .bind(update.email)
        .bind(update.phone_number)
        .bind(username)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_users(&self, page: PageRequest) -> StoreResult<UserPage> {
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_account")
            .fetch_one(&self.pool)
            .await?;

        let users: Vec<UserSummary> = sqlx::query_as(
            r#"
            SELECT id, username, email, phone_number, role
            FROM user_account
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(UserPage {
            users,
            page: page.page,
            limit: page.limit,
            total: total.0,
        })
    }

    async fn update_role(&self, id: UserId, role: &Role) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE user_account SET role = $1, updated_at = NOW() WHERE id = $2")
                .bind(role)
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// `oauth_state_tokens` table access
#[derive(Clone)]
pub struct PgOAuthStateStore {
    pool: PgPool,
}

impl PgOAuthStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OAuthStateStore for PgOAuthStateStore {
    async fn save(&self, state: &str, expires_at: OffsetDateTime) -> StoreResult<()> {
        sqlx::query("INSERT INTO oauth_state_tokens (state_token, expires_at) VALUES ($1, $2)")
            .bind(state)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        // Opportunistic cleanup; a failure here must not fail the login redirect
        if let Err(e) = sqlx::query("DELETE FROM oauth_state_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
        {
            tracing::warn!(error = ?e, "Failed to purge expired OAuth state tokens");
        }

        Ok(())
    }

    async fn consume(&self, state: &str) -> StoreResult<bool> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            DELETE FROM oauth_state_tokens
            WHERE state_token = $1 AND expires_at > NOW()
            RETURNING state_token
            "#,
        )
        .bind(state)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }
}
