use serde::{Deserialize, Serialize};

/// Subscription plan of a user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Premium,
}

impl Plan {
    /// Recognized plan name, if any.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "free" => Some(Plan::Free),
            "premium" => Some(Plan::Premium),
            _ => None,
        }
    }

    /// Exact enumerated name only, no trimming or case folding.
    pub fn parse_exact(raw: &str) -> Option<Self> {
        match raw {
            "free" => Some(Plan::Free),
            "premium" => Some(Plan::Premium),
            _ => None,
        }
    }

    /// Only an explicit "premium" overrides the default.
    pub fn or_default(raw: Option<&str>) -> Self {
        match raw.and_then(Plan::parse) {
            Some(Plan::Premium) => Plan::Premium,
            _ => Plan::Free,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Premium => "premium",
        }
    }
}

/// Account role.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Only an explicit "admin" overrides the default.
    pub fn or_default(raw: Option<&str>) -> Self {
        match raw.and_then(Role::parse) {
            Some(Role::Admin) => Role::Admin,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// JWT payload: a snapshot of the user at issuance time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub email: String,              // normalized account key
    #[serde(default)]
    pub name: Option<String>,
    pub plan: Plan,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>, // federated subject id
    pub iat: i64,                   // issued at (unix timestamp)
    pub exp: i64,                   // expires at (unix timestamp)
    pub iss: String,                // issuer
    pub aud: String,                // audience
}
