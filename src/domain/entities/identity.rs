//! Verified caller identity and the provider trait that produces it.

use serde::{Deserialize, Serialize};

/// Opaque user identifier issued by the identity provider.
pub type UserId = u64;

/// A verified `(user id, username)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
}

impl Identity {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// Token verification failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    Invalid,

    #[error("Invalid token claims: {0}")]
    InvalidClaims(String),
}

/// Verifies bearer tokens. Credential issuance lives outside this service.
pub trait IdentityProvider: Send + Sync {
    fn verify(&self, token: &str) -> Result<Identity, IdentityError>;
}
