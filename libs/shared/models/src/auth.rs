use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Role of whoever is calling into the booking engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Patient,
    Provider,
    Administrator,
    /// Internal collaborators such as payment confirmation. Never derived from a token.
    System,
}

impl ActorRole {
    pub fn from_claim(role: &str) -> Option<Self> {
        match role.trim().to_ascii_lowercase().as_str() {
            "patient" | "user" => Some(ActorRole::Patient),
            "provider" | "doctor" => Some(ActorRole::Provider),
            "admin" | "administrator" => Some(ActorRole::Administrator),
            _ => None,
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorRole::Patient => write!(f, "patient"),
            ActorRole::Provider => write!(f, "provider"),
            ActorRole::Administrator => write!(f, "administrator"),
            ActorRole::System => write!(f, "system"),
        }
    }
}

/// Already-authenticated caller identity handed to the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }

    pub fn patient(id: Uuid) -> Self {
        Self::new(id, ActorRole::Patient)
    }

    pub fn provider(id: Uuid) -> Self {
        Self::new(id, ActorRole::Provider)
    }

    pub fn administrator(id: Uuid) -> Self {
        Self::new(id, ActorRole::Administrator)
    }

    pub fn payment_confirmation() -> Self {
        Self::new(Uuid::nil(), ActorRole::System)
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Administrator
    }

    /// The same principal acting in the given role.
    pub fn is(&self, role: ActorRole, id: Uuid) -> bool {
        self.role == role && self.id == id
    }

    pub fn from_user(user: &User) -> Result<Self, AppError> {
        let id = Uuid::parse_str(&user.id)
            .map_err(|_| AppError::Auth(format!("Subject {} is not a valid user id", user.id)))?;

        let role = user
            .role
            .as_deref()
            .and_then(ActorRole::from_claim)
            .ok_or_else(|| AppError::Forbidden("Token carries no recognised role".to_string()))?;

        Ok(Self { id, role })
    }
}
