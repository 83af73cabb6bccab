use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::{
    errors::StoreError,
    repo_types::{NewUser, UserChanges, UserRecord, UserRow},
};

/// Durable user storage keyed by normalized email.
///
/// Implementations must make insert fail with `StoreError::Duplicate` when the
/// email is taken, atomically with respect to concurrent inserts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn count_by_email(&self, email: &str) -> Result<i64, StoreError>;

    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    /// Merge `changes` into the record; `StoreError::NotFound` if it is gone.
    async fn update_fields(&self, email: &str, changes: &UserChanges) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str =
    "id, email, name, password_hash, plan, role, created_at, updated_at, external_id";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            StoreError::Duplicate
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(UserRecord::from))
    }

    async fn count_by_email(&self, email: &str) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(email)
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, plan, role, created_at, external_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.plan.as_str())
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(&user.external_id)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_error)?;
        Ok(row.into())
    }

    async fn update_fields(&self, email: &str, changes: &UserChanges) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                plan = COALESCE($3, plan),
                password_hash = COALESCE($4, password_hash),
                updated_at = $5
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(&changes.name)
        .bind(changes.plan.map(|p| p.as_str()))
        .bind(&changes.password_hash)
        .bind(changes.updated_at)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
