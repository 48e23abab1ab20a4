//! JWT Identity Provider
//!
//! Verifies HS256 access tokens minted by the external auth service.

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::domain::{Identity, IdentityError, IdentityProvider, UserId};

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Display name captured at login
    pub username: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(settings: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = settings.leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
        }
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn verify(&self, token: &str) -> Result<Identity, IdentityError> {
        let token_data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => IdentityError::Expired,
                _ => IdentityError::Invalid,
            }
        })?;

        let claims = token_data.claims;
        let user_id: UserId = claims
            .sub
            .parse()
            .map_err(|_| IdentityError::InvalidClaims("sub is not a user id".into()))?;

        if claims.username.trim().is_empty() {
            return Err(IdentityError::InvalidClaims("username is empty".into()));
        }

        Ok(Identity::new(user_id, claims.username))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "an-adequately-long-test-secret-value-0123";

    fn provider() -> JwtIdentityProvider {
        JwtIdentityProvider::new(&JwtSettings {
            secret: SECRET.into(),
            leeway_secs: 0,
        })
    }

    fn token(sub: &str, username: &str, exp_offset: i64, secret: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.into(),
            username: username.into(),
            exp: now + exp_offset,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_identity() {
        let identity = provider().verify(&token("42", "alice", 600, SECRET)).unwrap();
        assert_eq!(identity, Identity::new(42, "alice"));
    }

    #[test]
    fn expired_token_is_rejected() {
        assert_eq!(
            provider().verify(&token("42", "alice", -600, SECRET)),
            Err(IdentityError::Expired)
        );
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let other = "another-adequately-long-secret-value-9876";
        assert_eq!(
            provider().verify(&token("42", "alice", 600, other)),
            Err(IdentityError::Invalid)
        );
        assert_eq!(provider().verify("not-a-jwt"), Err(IdentityError::Invalid));
    }

    #[test]
    fn non_numeric_subject_is_rejected() {
        assert!(matches!(
            provider().verify(&token("alice", "alice", 600, SECRET)),
            Err(IdentityError::InvalidClaims(_))
        ));
    }
}
