//! Bearer-token authentication middleware for Axum
//!
//! Protected routes get this layer; it extracts the `Authorization: Bearer`
//! header, validates the token as an access token, and inserts an
//! [`AuthContext`] into request extensions for handlers to pick up.
//!
//! Every failure (missing header, malformed header, bad signature, expired
//! token, wrong token type) produces the same 401 response body, so the
//! endpoint cannot be used as an oracle for which check failed. The precise
//! kind is logged at debug level for diagnostics.
//!
//! Public routes (register, login, refresh, health) simply never get the
//! layer; that routing decision belongs to the router builder.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::models::user::UserRole;

/// Authenticated identity attached to request extensions.
///
/// Handlers extract it with Axum's `Extension` extractor:
///
/// ```
/// use axum::Extension;
/// use taskbox_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Role carried by the access token
    pub role: UserRole,
}

impl AuthContext {
    /// Builds the context from validated access-token claims
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// Whether the acting user holds the admin role
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Internal error kinds for the authentication middleware.
///
/// Externally these all collapse into one 401; the distinction exists for
/// logging only.
#[derive(Debug)]
pub enum AuthError {
    /// Authorization header absent
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    MalformedHeader,

    /// Token expired
    TokenExpired,

    /// Signature, issuer, payload, or token type is wrong
    TokenInvalid(String),
}

impl AuthError {
    /// Stable label for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenInvalid(_) => "token_invalid",
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::TokenExpired,
            other => AuthError::TokenInvalid(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::debug!(kind = self.kind(), "rejecting unauthenticated request");

        // One body for every kind: no oracle for which check failed
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "status": "error",
                "message": "Authentication required",
            })),
        )
            .into_response()
    }
}

/// Validates the bearer token on `req` and returns the resolved identity.
///
/// Split out of the middleware so the router builder can call it with its
/// own state shape.
pub fn authenticate(req: &Request, secret: &str) -> Result<AuthContext, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedHeader)?;

    let claims = validate_access_token(token, secret)?;

    Ok(AuthContext::new(claims.sub, claims.role))
}

/// JWT authentication middleware.
///
/// On success the request proceeds with an [`AuthContext`] extension; on
/// failure the request is short-circuited with a uniform 401.
pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_context = authenticate(&req, &secret)?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims, TokenType};
    use axum::body::Body;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn request_with_auth(value: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/api/v1/tasks");
        if let Some(v) = value {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn token(token_type: TokenType, ttl: Duration) -> String {
        let claims = Claims::new(Uuid::new_v4(), UserRole::User, Uuid::new_v4(), token_type, ttl);
        create_token(&claims, SECRET).unwrap()
    }

    #[test]
    fn test_authenticate_success() {
        let t = token(TokenType::Access, Duration::hours(1));
        let req = request_with_auth(Some(&format!("Bearer {}", t)));

        let ctx = authenticate(&req, SECRET).expect("Should authenticate");
        assert_eq!(ctx.role, UserRole::User);
        assert!(!ctx.is_admin());
    }

    #[test]
    fn test_authenticate_missing_header() {
        let req = request_with_auth(None);
        let err = authenticate(&req, SECRET).unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
    }

    #[test]
    fn test_authenticate_malformed_header() {
        let req = request_with_auth(Some("Token abc"));
        let err = authenticate(&req, SECRET).unwrap_err();
        assert!(matches!(err, AuthError::MalformedHeader));
    }

    #[test]
    fn test_authenticate_expired_token() {
        let t = token(TokenType::Access, Duration::seconds(-60));
        let req = request_with_auth(Some(&format!("Bearer {}", t)));

        let err = authenticate(&req, SECRET).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn test_authenticate_refresh_token_rejected() {
        let t = token(TokenType::Refresh, Duration::days(1));
        let req = request_with_auth(Some(&format!("Bearer {}", t)));

        let err = authenticate(&req, SECRET).unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid(_)));
    }

    #[test]
    fn test_all_failures_share_one_response() {
        let errors = vec![
            AuthError::MissingCredentials,
            AuthError::MalformedHeader,
            AuthError::TokenExpired,
            AuthError::TokenInvalid("bad signature".to_string()),
        ];

        for err in errors {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_admin_context() {
        let ctx = AuthContext::new(Uuid::new_v4(), UserRole::Admin);
        assert!(ctx.is_admin());
    }
}
