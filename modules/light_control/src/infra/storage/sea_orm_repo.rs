use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};

use crate::contract::model::{LightReading, User};
use crate::domain::repo::{
    InsertUserOutcome, LightReadingsRepository, NewUserRecord, StoredUser, UsersRepository,
};
use crate::infra::storage::entity::{light_reading, user};

impl From<user::Model> for StoredUser {
    fn from(m: user::Model) -> Self {
        Self {
            id: i64::from(m.id),
            username: m.username,
            password_hash: m.password_hash,
            created_at: m.created_at,
        }
    }
}

impl From<light_reading::Model> for LightReading {
    fn from(m: light_reading::Model) -> Self {
        Self {
            id: i64::from(m.id),
            intensity: m.intensity,
            created_at: m.created_at,
        }
    }
}

/// Users table over any SeaORM connection.
pub struct SeaOrmUsersRepository<C> {
    conn: C,
}

impl<C> SeaOrmUsersRepository<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C> UsersRepository for SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<StoredUser>> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.conn)
            .await?;
        Ok(found.map(StoredUser::from))
    }

    async fn username_exists(&self, username: &str) -> anyhow::Result<bool> {
        let count = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .count(&self.conn)
            .await?;
        Ok(count > 0)
    }

    async fn insert(&self, new_user: NewUserRecord) -> anyhow::Result<InsertUserOutcome> {
        let am = user::ActiveModel {
            username: Set(new_user.username),
            password_hash: Set(new_user.password_hash),
            created_at: Set(new_user.created_at),
            ..Default::default()
        };
        match am.insert(&self.conn).await {
            Ok(m) => Ok(InsertUserOutcome::Inserted(User::from(StoredUser::from(m)))),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(InsertUserOutcome::Duplicate)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Light readings table over any SeaORM connection.
pub struct SeaOrmLightReadingsRepository<C> {
    conn: C,
}

impl<C> SeaOrmLightReadingsRepository<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<C> LightReadingsRepository for SeaOrmLightReadingsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn latest(&self) -> anyhow::Result<Option<LightReading>> {
        // ids are assigned in insertion order
        let row = light_reading::Entity::find()
            .order_by_desc(light_reading::Column::Id)
            .one(&self.conn)
            .await?;
        Ok(row.map(LightReading::from))
    }

    async fn insert(&self, intensity: i32, created_at: DateTime<Utc>) -> anyhow::Result<LightReading> {
        let am = light_reading::ActiveModel {
            intensity: Set(intensity),
            created_at: Set(created_at),
            ..Default::default()
        };
        let m = am.insert(&self.conn).await?;
        Ok(m.into())
    }
}
