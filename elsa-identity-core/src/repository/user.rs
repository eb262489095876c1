use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use super::UserRepository;
use crate::{models::User, Result};

/// User repository for database operations
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: &PgRow) -> Result<User> {
        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            password_hash: row.try_get("password_hash")?,
            roles: row.try_get("roles")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r"
            SELECT id, name, password_hash, roles, created_at
            FROM users
            WHERE name = $1
            ",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert(&self, user: &User) -> Result<User> {
        // unique_violation on users_name_key surfaces as Error::AlreadyExists
        let row = sqlx::query(
            r"
            INSERT INTO users (id, name, password_hash, roles, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, password_hash, roles, created_at
            ",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.roles)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_user(&row)
    }
}
