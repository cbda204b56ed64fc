use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A learner known to Cerebro. Created lazily the first time a verified
/// identity requests a plan, and never updated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Subject id issued by the external identity service. Unique.
    pub identity_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(identity_id: String, email: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            identity_id,
            email,
            name: None,
            avatar: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_avatar(mut self, avatar: Option<String>) -> Self {
        self.avatar = avatar.filter(|a| !a.trim().is_empty());
        self
    }
}

/// The verified caller, as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: IdentityMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Identity {
    /// Build the `User` record this identity maps to on first contact.
    pub fn to_user(&self) -> User {
        User::new(self.id.clone(), self.email.clone().unwrap_or_default())
            .with_name(self.user_metadata.full_name.clone())
            .with_avatar(self.user_metadata.avatar_url.clone())
    }
}
