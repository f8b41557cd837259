use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::User;

/// Fields persisted for a fresh signup. Role and the verified flag are
/// fixed by the flow, never caller-chosen.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// What the session flows need from user persistence, kept narrow so the
/// auth subsystem does not care which store sits behind it.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn create(&self, new: NewUser) -> anyhow::Result<User>;

    /// Flip the verified flag, returning the updated record. Calling it
    /// on an already-verified user changes nothing and still succeeds.
    async fn mark_verified(&self, email: &str) -> anyhow::Result<Option<User>>;
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT uid, username, email, first_name, last_name, role, is_verified,
                   password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, first_name, last_name, role, is_verified, password_hash)
            VALUES ($1, $2, $3, $4, 'user', FALSE, $5)
            RETURNING uid, username, email, first_name, last_name, role, is_verified,
                      password_hash, created_at, updated_at
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn mark_verified(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_verified = TRUE, updated_at = now()
            WHERE email = $1
            RETURNING uid, username, email, first_name, last_name, role, is_verified,
                      password_hash, created_at, updated_at
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}

/// In-memory user store backing `AppState::fake`.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryUserStore {
    users: dashmap::DashMap<String, User>,
}

#[cfg(test)]
#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.users.get(email).map(|u| u.clone()))
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        if self.users.contains_key(&new.email) {
            anyhow::bail!("duplicate email {}", new.email);
        }
        let now = time::OffsetDateTime::now_utc();
        let user = User {
            uid: uuid::Uuid::new_v4(),
            username: new.username,
            email: new.email.clone(),
            first_name: new.first_name,
            last_name: new.last_name,
            role: crate::auth::repo_types::Role::User,
            is_verified: false,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(new.email, user.clone());
        Ok(user)
    }

    async fn mark_verified(&self, email: &str) -> anyhow::Result<Option<User>> {
        let Some(mut user) = self.users.get_mut(email) else {
            return Ok(None);
        };
        user.is_verified = true;
        user.updated_at = time::OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}
