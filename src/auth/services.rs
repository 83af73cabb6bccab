use std::{future::Future, sync::Arc, time::Duration};

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::auth::{
    claims::{Claims, Plan, Role},
    errors::{AuthError, StoreError},
    jwt::JwtKeys,
    password::PasswordHasher,
    repo::UserStore,
    repo_types::{NewUser, UserChanges, UserRecord},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Input of `AuthService::register`.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub plan: Option<String>,
    pub role: Option<String>,
    pub external_id: Option<String>,
}

/// Requested profile changes; empty strings count as absent.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub plan: Option<String>,
    pub password: Option<String>,
}

/// Register, login and self-service profile updates over a `UserStore`.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
    hasher: PasswordHasher,
    store_timeout: Duration,
    // verified against when the email is unknown, so both login failures cost the same
    dummy_hash: String,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        keys: JwtKeys,
        hasher: PasswordHasher,
        store_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let dummy_hash = hasher.hash("authgate-timing-placeholder")?;
        Ok(Self {
            store,
            keys,
            hasher,
            store_timeout,
            dummy_hash,
        })
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    async fn with_timeout<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn hash_password(&self, plain: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| {
                error!(error = %e, "hash task failed");
                AuthError::internal("Failed to hash password")
            })?
            .map_err(|e| {
                error!(error = %e, "hash_password failed");
                AuthError::internal("Failed to hash password")
            })
    }

    async fn verify_password(&self, plain: String, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .map_err(|e| {
                error!(error = %e, "verify task failed");
                AuthError::internal("Failed to verify password")
            })
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: Registration) -> Result<UserRecord, AuthError> {
        let email = normalize_email(&input.email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AuthError::validation("Invalid email format"));
        }
        if input.password.is_empty() {
            return Err(AuthError::validation("Password is required"));
        }

        let existing = self.with_timeout(self.store.count_by_email(&email)).await?;
        if existing > 0 {
            warn!(email = %email, "email already registered");
            return Err(AuthError::Conflict);
        }

        let password_hash = self.hash_password(input.password).await?;

        let new_user = NewUser {
            email,
            name: non_empty(input.name),
            password_hash,
            plan: Plan::or_default(input.plan.as_deref()),
            role: Role::or_default(input.role.as_deref()),
            created_at: OffsetDateTime::now_utc(),
            external_id: non_empty(input.external_id),
        };

        // a concurrent registration may win between the count and the insert;
        // the store reports it as Duplicate, which converts to Conflict
        let user = self.with_timeout(self.store.insert(new_user)).await?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let email = normalize_email(email);

        let user = self.with_timeout(self.store.find_by_email(&email)).await?;
        let Some(user) = user else {
            let _ = self
                .verify_password(password.to_string(), self.dummy_hash.clone())
                .await?;
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        let ok = self
            .verify_password(password.to_string(), user.password_hash.clone())
            .await?;
        if !ok {
            warn!(email = %email, user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.keys.issue(&user).map_err(|e| {
            error!(error = %e, "jwt sign failed");
            AuthError::internal("Failed to generate token")
        })?;

        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(token)
    }

    #[instrument(skip(self, bearer, fields))]
    pub async fn update_profile(
        &self,
        bearer: Option<&str>,
        target_email: &str,
        fields: ProfileUpdate,
    ) -> Result<(), AuthError> {
        let claims = self.keys.verify_bearer(bearer)?;

        let caller = normalize_email(&claims.email);
        let target = normalize_email(target_email);

        let user = self
            .with_timeout(self.store.find_by_email(&target))
            .await?
            .ok_or(AuthError::NotFound)?;

        if caller != target {
            warn!(caller = %caller, target = %target, "update of another account refused");
            return Err(AuthError::Forbidden);
        }

        let password_hash = match non_empty(fields.password) {
            Some(plain) => Some(self.hash_password(plain).await?),
            None => None,
        };
        let changes = UserChanges {
            name: non_empty(fields.name),
            plan: fields.plan.as_deref().and_then(Plan::parse_exact),
            password_hash,
            updated_at: OffsetDateTime::now_utc(),
        };

        if changes.is_empty() {
            return Err(AuthError::validation("No valid fields to update"));
        }

        self.with_timeout(self.store.update_fields(&target, &changes))
            .await?;
        info!(user_id = %user.id, email = %target, "user updated");
        Ok(())
    }

    /// Current stored record of the account a verified token names.
    #[instrument(skip(self, claims), fields(email = %claims.email))]
    pub async fn profile(&self, claims: &Claims) -> Result<UserRecord, AuthError> {
        let email = normalize_email(&claims.email);
        self.with_timeout(self.store.find_by_email(&email))
            .await?
            .ok_or(AuthError::NotFound)
    }
}
