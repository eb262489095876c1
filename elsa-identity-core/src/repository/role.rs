use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};

use super::RoleRepository;
use crate::{models::Role, Result};

/// Role repository for database operations
#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_role(row: &PgRow) -> Result<Role> {
        Ok(Role {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            permissions: row.try_get("permissions")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Role>> {
        let row = sqlx::query(
            r"
            SELECT id, name, permissions, created_at
            FROM roles
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_role).transpose()
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn insert(&self, role: &Role) -> Result<Role> {
        // unique_violation on roles_pkey surfaces as Error::AlreadyExists
        let row = sqlx::query(
            r"
            INSERT INTO roles (id, name, permissions, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, permissions, created_at
            ",
        )
        .bind(&role.id)
        .bind(&role.name)
        .bind(&role.permissions)
        .bind(role.created_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_role(&row)
    }
}
