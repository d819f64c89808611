use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access level required for tenant administration
pub const ROOT_ACCESS: &str = "root";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub access: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(subject: impl Into<String>, access: impl Into<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        Self {
            sub: subject.into(),
            access: access.into(),
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    NotConfigured,

    #[error("Missing Authorization header")]
    MissingToken,

    #[error("Authorization header must use Bearer token format")]
    MalformedHeader,

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Root access required")]
    NotRoot,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
}

/// Issues and verifies the HS256 tokens that guard tenant administration.
///
/// An empty secret disables administration: nothing verifies and nothing
/// can be issued.
pub struct RootAuth {
    keys: Option<(EncodingKey, DecodingKey)>,
    expiry_hours: u64,
}

impl RootAuth {
    pub fn new(secret: &str, expiry_hours: u64) -> Self {
        let keys = (!secret.is_empty()).then(|| {
            (
                EncodingKey::from_secret(secret.as_bytes()),
                DecodingKey::from_secret(secret.as_bytes()),
            )
        });
        Self { keys, expiry_hours }
    }

    /// Root token for an operator
    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        self.encode(&Claims::new(subject, ROOT_ACCESS, self.expiry_hours))
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        let (encoding, _) = self.keys.as_ref().ok_or(AuthError::NotConfigured)?;
        encode(&Header::default(), claims, encoding).map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    /// Claims of a valid, unexpired token carrying root access
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let (_, decoding) = self.keys.as_ref().ok_or(AuthError::NotConfigured)?;
        let data = decode::<Claims>(token, decoding, &Validation::default())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if data.claims.access != ROOT_ACCESS {
            return Err(AuthError::NotRoot);
        }
        Ok(data.claims)
    }
}
