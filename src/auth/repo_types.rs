use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::claims::{Plan, Role};

/// User record as the rest of the crate sees it.
#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,      // Argon2 PHC string, never exposed
    pub plan: Plan,
    pub role: Role,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
    pub external_id: Option<String>,
}

/// Raw `users` row; plan and role are plain text in the table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub plan: String,
    pub role: String,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
    pub external_id: Option<String>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            plan: Plan::or_default(Some(&row.plan)),
            role: Role::or_default(Some(&row.role)),
            created_at: row.created_at,
            updated_at: row.updated_at,
            external_id: row.external_id,
        }
    }
}

/// Everything needed to insert a user; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub plan: Plan,
    pub role: Role,
    pub created_at: OffsetDateTime,
    pub external_id: Option<String>,
}

/// Sparse update. `None` leaves the column untouched.
#[derive(Debug, Clone)]
pub struct UserChanges {
    pub name: Option<String>,
    pub plan: Option<Plan>,
    pub password_hash: Option<String>,
    pub updated_at: OffsetDateTime,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.plan.is_none() && self.password_hash.is_none()
    }
}
