/// Authentication middleware for Axum
///
/// This module provides JWT authentication middleware for Axum
/// applications. The middleware extracts the Bearer token from the
/// Authorization header, validates it, and adds an [`AuthContext`] to the
/// request extensions.
///
/// Authentication is stateless: the context is built entirely from token
/// claims, with no database lookup per request. Role or organization
/// changes take effect when the client obtains a fresh token.
///
/// # Status Codes
///
/// - **401 Unauthorized**: Authorization header missing or malformed
/// - **403 Forbidden**: token present but fails verification (bad
///   signature, expired, wrong issuer)
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use worktrack_shared::auth::middleware::{create_jwt_middleware, AuthContext};
///
/// async fn protected_handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// let app: Router = Router::new()
///     .route("/protected", get(protected_handler))
///     .layer(middleware::from_fn(create_jwt_middleware("your-jwt-secret")));
/// ```

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

use super::jwt::{validate_token, Claims, JwtError};
use crate::models::user::UserRole;

/// Authentication context added to request extensions
///
/// Handlers extract it using Axum's `Extension` extractor.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use worktrack_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {} ({})", auth.user_id, auth.email)
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// User email at token issue time
    pub email: String,

    /// User role at token issue time
    pub role: UserRole,

    /// Organization context, if the user belongs to one
    pub organization_id: Option<Uuid>,
}

impl AuthContext {
    /// Creates auth context from validated JWT claims
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email.clone(),
            role: claims.role,
            organization_id: claims.organization_id,
        }
    }

    /// Returns the organization id, or an error for users who haven't
    /// created or joined an organization yet. Organization-scoped handlers
    /// call this first.
    pub fn require_organization(&self) -> Result<Uuid, AuthError> {
        self.organization_id.ok_or(AuthError::NoOrganization)
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Invalid authorization header format
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),

    /// Authenticated user has no organization context
    NoOrganization,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing credentials".to_string(),
            ),
            AuthError::InvalidFormat(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            AuthError::InvalidToken(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            AuthError::NoOrganization => (
                StatusCode::FORBIDDEN,
                "forbidden",
                "You must belong to an organization to perform this action".to_string(),
            ),
        };

        let body = Json(json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// JWT authentication middleware
///
/// Validates JWT tokens from the `Authorization: Bearer <token>` header
/// and inserts an [`AuthContext`] extension on success.
///
/// # Errors
///
/// - 401 Unauthorized if the header is missing or not a Bearer token
/// - 403 Forbidden if the token fails validation or has expired
pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    // Parse Bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    // Validate token
    let claims = validate_token(token, &secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken("Invalid token".to_string()),
    })?;

    // Add auth context to request extensions
    let auth_context = AuthContext::from_claims(&claims);
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Creates a JWT authentication middleware closure
///
/// Helper function that captures the JWT secret and returns a middleware
/// function suitable for `middleware::from_fn`.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use worktrack_shared::auth::middleware::create_jwt_middleware;
///
/// let app: Router = Router::new()
///     .route("/protected", get(|| async { "OK" }))
///     .layer(middleware::from_fn(create_jwt_middleware("secret")));
/// ```
pub fn create_jwt_middleware(
    secret: impl Into<String>,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>> + Clone {
    let secret = secret.into();
    move |req, next| {
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(secret, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_auth_context_from_claims() {
        let org_id = Uuid::new_v4();
        let claims = Claims::new(
            Uuid::new_v4(),
            "jane@acme.io",
            UserRole::Pmo,
            Some(org_id),
            Duration::hours(1),
        );

        let context = AuthContext::from_claims(&claims);

        assert_eq!(context.user_id, claims.sub);
        assert_eq!(context.email, "jane@acme.io");
        assert_eq!(context.role, UserRole::Pmo);
        assert_eq!(context.organization_id, Some(org_id));
    }

    #[test]
    fn test_require_organization() {
        let org_id = Uuid::new_v4();
        let claims = Claims::new(
            Uuid::new_v4(),
            "a@b.io",
            UserRole::Member,
            Some(org_id),
            Duration::hours(1),
        );
        let context = AuthContext::from_claims(&claims);
        assert_eq!(context.require_organization().unwrap(), org_id);

        let orphan_claims =
            Claims::new(Uuid::new_v4(), "a@b.io", UserRole::Member, None, Duration::hours(1));
        let orphan = AuthContext::from_claims(&orphan_claims);
        assert!(orphan.require_organization().is_err());
    }

    #[test]
    fn test_auth_error_into_response() {
        let err = AuthError::MissingCredentials;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let err = AuthError::InvalidFormat("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let err = AuthError::InvalidToken("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let err = AuthError::NoOrganization;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
