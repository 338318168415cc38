//! JWT token generation and validation
//!
//! Tokens are signed with HS256 (HMAC-SHA256) against a server-held secret.
//! Two token types exist: short-lived access tokens presented on every
//! request, and long-lived refresh tokens exchanged for new pairs. Both
//! tokens of a pair share a `jti` so the credential layer can make refresh
//! tokens single-use (rotation) by remembering the latest `jti` per user.
//!
//! Validation is a pure function of (token, secret, current time); nothing
//! is held between calls.
//!
//! # Example
//!
//! ```
//! use taskbox_shared::auth::jwt::{create_token, validate_token, Claims, TokenTtl, TokenType};
//! use taskbox_shared::models::user::UserRole;
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let secret = "an-example-secret-of-at-least-32-bytes!!";
//! let pair_id = Uuid::new_v4();
//!
//! let claims = Claims::new(
//!     Uuid::new_v4(),
//!     UserRole::User,
//!     pair_id,
//!     TokenType::Access,
//!     TokenTtl::default().access,
//! );
//! let token = create_token(&claims, secret)?;
//!
//! let validated = validate_token(&token, secret)?;
//! assert_eq!(validated.sub, claims.sub);
//! # Ok(())
//! # }
//! ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::UserRole;

/// Issuer claim stamped into and required from every token
pub const ISSUER: &str = "taskbox";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Signature, issuer, payload shape, or token type is wrong
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token, presented on every protected request
    Access,

    /// Refresh token, exchanged for a new token pair
    Refresh,
}

impl TokenType {
    /// Gets token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Token lifetimes, injected from configuration.
///
/// Defaults: 12 hours for access tokens, 30 days for refresh tokens.
#[derive(Debug, Clone, Copy)]
pub struct TokenTtl {
    /// Access token lifetime
    pub access: Duration,

    /// Refresh token lifetime
    pub refresh: Duration,
}

impl Default for TokenTtl {
    fn default() -> Self {
        Self {
            access: Duration::hours(12),
            refresh: Duration::days(30),
        }
    }
}

impl TokenTtl {
    /// Builds lifetimes from second counts (the configuration surface)
    pub fn from_secs(access_secs: i64, refresh_secs: i64) -> Self {
        Self {
            access: Duration::seconds(access_secs),
            refresh: Duration::seconds(refresh_secs),
        }
    }
}

/// JWT claims structure
///
/// Standard claims (`sub`, `iss`, `iat`, `exp`, `nbf`, `jti`) plus two
/// custom claims: the user's role at issue time and the token type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: Uuid,

    /// Issuer - always "taskbox"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Token-pair generation ID; both tokens of a pair share one
    pub jti: Uuid,

    /// User role at issue time (custom claim)
    pub role: UserRole,

    /// Token type (custom claim)
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims expiring `ttl` from now.
    pub fn new(user_id: Uuid, role: UserRole, jti: Uuid, token_type: TokenType, ttl: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + ttl;

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            jti,
            role,
            token_type,
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// A freshly issued access/refresh token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Signed access token
    pub access_token: String,

    /// Signed refresh token
    pub refresh_token: String,

    /// Generation ID shared by both tokens; the caller persists this on the
    /// user row to make the refresh token single-use
    pub jti: Uuid,

    /// Access token lifetime in seconds, for the response body
    pub expires_in: i64,
}

/// Creates a JWT token from claims.
///
/// Signs with HS256. The secret should be at least 32 bytes and live in
/// process-wide configuration, never in source.
///
/// # Errors
///
/// Returns `JwtError::CreateError` if token encoding fails.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues an access/refresh pair sharing a freshly generated `jti`.
pub fn issue_token_pair(
    user_id: Uuid,
    role: UserRole,
    ttl: TokenTtl,
    secret: &str,
) -> Result<TokenPair, JwtError> {
    let jti = Uuid::new_v4();

    let access_claims = Claims::new(user_id, role, jti, TokenType::Access, ttl.access);
    let refresh_claims = Claims::new(user_id, role, jti, TokenType::Refresh, ttl.refresh);

    Ok(TokenPair {
        access_token: create_token(&access_claims, secret)?,
        refresh_token: create_token(&refresh_claims, secret)?,
        jti,
        expires_in: ttl.access.num_seconds(),
    })
}

/// Validates a JWT token and extracts claims.
///
/// Verifies the signature, expiry, not-before, and issuer.
///
/// # Errors
///
/// - `JwtError::Expired` when `exp` has passed
/// - `JwtError::Invalid` for bad signature, wrong issuer, or malformed payload
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::Invalid(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Validates a token and requires `token_type == access`.
///
/// A refresh token presented where an access token is expected fails here,
/// whatever its signature says.
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Access {
        return Err(JwtError::Invalid(
            "Expected access token, got refresh token".to_string(),
        ));
    }

    Ok(claims)
}

/// Validates a token and requires `token_type == refresh`.
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != TokenType::Refresh {
        return Err(JwtError::Invalid(
            "Expected refresh token, got access token".to_string(),
        ));
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn claims(token_type: TokenType, ttl: Duration) -> Claims {
        Claims::new(Uuid::new_v4(), UserRole::User, Uuid::new_v4(), token_type, ttl)
    }

    #[test]
    fn test_default_ttls() {
        let ttl = TokenTtl::default();
        assert_eq!(ttl.access, Duration::hours(12));
        assert_eq!(ttl.refresh, Duration::days(30));
    }

    #[test]
    fn test_ttl_from_secs() {
        let ttl = TokenTtl::from_secs(3600, 86400);
        assert_eq!(ttl.access, Duration::hours(1));
        assert_eq!(ttl.refresh, Duration::days(1));
    }

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let jti = Uuid::new_v4();
        let claims = Claims::new(user_id, UserRole::Admin, jti, TokenType::Access, Duration::hours(1));

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.jti, jti);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_create_and_validate_token() {
        let c = claims(TokenType::Access, Duration::hours(1));
        let token = create_token(&c, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated.sub, c.sub);
        assert_eq!(validated.jti, c.jti);
        assert_eq!(validated.token_type, TokenType::Access);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let c = claims(TokenType::Access, Duration::hours(1));
        let token = create_token(&c, SECRET).expect("Should create token");

        assert!(validate_token(&token, "wrong-secret-key-of-sufficient-size").is_err());
    }

    #[test]
    fn test_validate_tampered_token() {
        let c = claims(TokenType::Access, Duration::hours(1));
        let token = create_token(&c, SECRET).expect("Should create token");

        // Flip a character in the signature segment
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        assert!(validate_token(&tampered, SECRET).is_err());
    }

    #[test]
    fn test_validate_expired_token() {
        let c = claims(TokenType::Access, Duration::seconds(-3600));
        assert!(c.is_expired());

        let token = create_token(&c, SECRET).expect("Should create token");
        let result = validate_token(&token, SECRET);

        assert!(matches!(result.unwrap_err(), JwtError::Expired));
    }

    #[test]
    fn test_validate_garbage_token() {
        assert!(validate_token("not.a.jwt", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn test_token_type_confusion_rejected() {
        let access = create_token(&claims(TokenType::Access, Duration::hours(1)), SECRET).unwrap();
        let refresh = create_token(&claims(TokenType::Refresh, Duration::days(1)), SECRET).unwrap();

        // A refresh token must never pass an access check, and vice versa
        assert!(validate_access_token(&access, SECRET).is_ok());
        assert!(validate_access_token(&refresh, SECRET).is_err());
        assert!(validate_refresh_token(&refresh, SECRET).is_ok());
        assert!(validate_refresh_token(&access, SECRET).is_err());
    }

    #[test]
    fn test_issue_token_pair() {
        let user_id = Uuid::new_v4();
        let pair = issue_token_pair(user_id, UserRole::User, TokenTtl::default(), SECRET)
            .expect("Should issue pair");

        let access = validate_access_token(&pair.access_token, SECRET).unwrap();
        let refresh = validate_refresh_token(&pair.refresh_token, SECRET).unwrap();

        assert_eq!(access.sub, user_id);
        assert_eq!(refresh.sub, user_id);
        // Both halves of the pair carry the same generation ID
        assert_eq!(access.jti, pair.jti);
        assert_eq!(refresh.jti, pair.jti);
        assert_eq!(pair.expires_in, 12 * 3600);
    }

    #[test]
    fn test_issued_pairs_have_distinct_jti() {
        let user_id = Uuid::new_v4();
        let a = issue_token_pair(user_id, UserRole::User, TokenTtl::default(), SECRET).unwrap();
        let b = issue_token_pair(user_id, UserRole::User, TokenTtl::default(), SECRET).unwrap();

        assert_ne!(a.jti, b.jti);
    }
}
