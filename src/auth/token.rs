use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::store::UserRecord;

/// Claim set carried by access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub username: String,
    /// Kept optional so a token without a role still decodes and reaches the
    /// guard, which reports it as a missing credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Longest access-token lifetime the service will issue (one year).
pub const MAX_EXPIRY_HOURS: u64 = 24 * 365;

impl Claims {
    /// Claims issued now and expiring after `ttl`; a negative `ttl` yields an
    /// already-expired claim set.
    pub fn new(
        id: Uuid,
        username: impl Into<String>,
        role: Option<String>,
        ttl: Duration,
    ) -> Result<Self, JwtError> {
        let now = Utc::now();
        let exp = now
            .checked_add_signed(ttl)
            .ok_or_else(|| JwtError::Lifetime(format!("{}s is out of range", ttl.num_seconds())))?;
        Ok(Self {
            id,
            username: username.into(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        })
    }

    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    Encode(String),

    #[error("token has expired")]
    Expired,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("invalid token lifetime: {0}")]
    Lifetime(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidSignature => JwtError::InvalidSignature,
            _ => JwtError::Malformed(err.to_string()),
        }
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
    pub expires_in: i64,
}

/// Issues and verifies HS256 access tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, JwtError> {
        if secret.trim().is_empty() {
            return Err(JwtError::MissingSecret);
        }
        if !(1..=MAX_EXPIRY_HOURS).contains(&expiry_hours) {
            return Err(JwtError::Lifetime(format!(
                "{} hours is outside 1..={}",
                expiry_hours, MAX_EXPIRY_HOURS
            )));
        }
        let ttl = i64::try_from(expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .ok_or_else(|| JwtError::Lifetime(format!("{} hours", expiry_hours)))?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for a user record, carrying the role exactly as stored.
    pub fn issue(&self, user: &UserRecord) -> Result<IssuedToken, JwtError> {
        let claims = Claims::new(user.id, user.username.clone(), Some(user.role.clone()), self.ttl)?;
        let token = self.issue_claims(&claims)?;
        Ok(IssuedToken {
            token,
            claims,
            expires_in: self.ttl.num_seconds(),
        })
    }

    /// Sign an arbitrary claim set.
    pub fn issue_claims(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::Encode(e.to_string()))
    }

    /// Check signature and expiry and return the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

/// Decode a token's claims without checking signature or expiry.
///
/// For diagnostics only; the server never trusts the result.
pub fn inspect(token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}
