use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::contract::model::{LightReading, User};

/// A user row including the credential hash; stays inside the module.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<StoredUser> for User {
    fn from(u: StoredUser) -> Self {
        Self {
            id: u.id,
            username: u.username,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum InsertUserOutcome {
    Inserted(User),
    /// The unique index on `username` rejected the row.
    Duplicate,
}

#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<StoredUser>>;

    async fn username_exists(&self, username: &str) -> anyhow::Result<bool>;

    async fn insert(&self, user: NewUserRecord) -> anyhow::Result<InsertUserOutcome>;
}

/// Append-only log of readings.
#[async_trait]
pub trait LightReadingsRepository: Send + Sync {
    /// Most recently inserted reading.
    async fn latest(&self) -> anyhow::Result<Option<LightReading>>;

    async fn insert(&self, intensity: i32, created_at: DateTime<Utc>) -> anyhow::Result<LightReading>;
}
