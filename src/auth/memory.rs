use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{
    errors::StoreError,
    repo::UserStore,
    repo_types::{NewUser, UserChanges, UserRecord},
};

/// Process-local `UserStore`. Insert holds the write lock across the
/// existence check, so duplicate emails lose deterministically.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn count_by_email(&self, email: &str) -> Result<i64, StoreError> {
        Ok(i64::from(self.users.read().await.contains_key(email)))
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(StoreError::Duplicate);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            plan: user.plan,
            role: user.role,
            created_at: user.created_at,
            updated_at: None,
            external_id: user.external_id,
        };
        users.insert(record.email.clone(), record.clone());
        Ok(record)
    }

    async fn update_fields(&self, email: &str, changes: &UserChanges) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let record = users.get_mut(email).ok_or(StoreError::NotFound)?;
        if let Some(name) = &changes.name {
            record.name = Some(name.clone());
        }
        if let Some(plan) = changes.plan {
            record.plan = plan;
        }
        if let Some(hash) = &changes.password_hash {
            record.password_hash = hash.clone();
        }
        record.updated_at = Some(changes.updated_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::{Plan, Role};
    use time::OffsetDateTime;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            name: Some("Al".into()),
            password_hash: "$argon2id$fake".into(),
            plan: Plan::Free,
            role: Role::User,
            created_at: OffsetDateTime::now_utc(),
            external_id: None,
        }
    }

    #[tokio::test]
    async fn insert_then_find() {
        let store = InMemoryUserStore::new();
        let created = store.insert(new_user("a@x.com")).await.unwrap();
        let found = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(found.updated_at.is_none());
        assert_eq!(store.count_by_email("a@x.com").await.unwrap(), 1);
        assert_eq!(store.count_by_email("b@x.com").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("a@x.com")).await.unwrap();
        let err = store.insert(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_merges_only_given_fields() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("a@x.com")).await.unwrap();
        let now = OffsetDateTime::now_utc();
        let changes = UserChanges {
            name: None,
            plan: Some(Plan::Premium),
            password_hash: None,
            updated_at: now,
        };
        store.update_fields("a@x.com", &changes).await.unwrap();

        let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("Al"));
        assert_eq!(user.plan, Plan::Premium);
        assert_eq!(user.password_hash, "$argon2id$fake");
        assert_eq!(user.updated_at, Some(now));
    }

    #[tokio::test]
    async fn update_of_missing_user_is_not_found() {
        let store = InMemoryUserStore::new();
        let changes = UserChanges {
            name: Some("x".into()),
            plan: None,
            password_hash: None,
            updated_at: OffsetDateTime::now_utc(),
        };
        let err = store.update_fields("nobody@x.com", &changes).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
