/// JWT token generation and validation module
///
/// This module provides JWT (JSON Web Token) functionality for user
/// authentication. Tokens are signed using HS256 (HMAC-SHA256) and carry
/// the user's identity and organization context.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: Configurable (default 24 hours)
/// - **Validation**: Signature, expiration, and issuer checks
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// Tokens are single-purpose access tokens. There is no refresh flow;
/// clients log in again when a token expires.
///
/// # Example
///
/// ```
/// use worktrack_shared::auth::jwt::{create_token, validate_token, Claims};
/// use worktrack_shared::models::user::UserRole;
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let org_id = Uuid::new_v4();
///
/// let claims = Claims::new(
///     user_id,
///     "jane@acme.io",
///     UserRole::Member,
///     Some(org_id),
///     Duration::hours(24),
/// );
/// let token = create_token(&claims, "your-secret-key-at-least-32-bytes")?;
///
/// let validated = validate_token(&token, "your-secret-key-at-least-32-bytes")?;
/// assert_eq!(validated.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{User, UserRole};

/// Issuer claim stamped into every token.
pub const ISSUER: &str = "worktrack";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },
}

/// JWT claims structure
///
/// Contains standard JWT claims plus WorkTrack identity claims. The
/// organization id is optional because freshly registered users have no
/// organization until they create or join one.
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "worktrack")
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
/// - `nbf`: Not before timestamp
///
/// # Custom Claims
///
/// - `email`: User email at issue time
/// - `role`: User role at issue time
/// - `organization_id`: Organization context, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer - Always "worktrack"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// User email (custom claim)
    pub email: String,

    /// User role (custom claim)
    pub role: UserRole,

    /// Organization ID (custom claim)
    pub organization_id: Option<Uuid>,
}

impl Claims {
    /// Creates claims for a user identity.
    ///
    /// # Example
    ///
    /// ```
    /// use worktrack_shared::auth::jwt::Claims;
    /// use worktrack_shared::models::user::UserRole;
    /// use chrono::Duration;
    /// use uuid::Uuid;
    ///
    /// let claims = Claims::new(
    ///     Uuid::new_v4(),
    ///     "jane@acme.io",
    ///     UserRole::Admin,
    ///     None,
    ///     Duration::hours(1),
    /// );
    /// assert!(!claims.is_expired());
    /// ```
    pub fn new(
        user_id: Uuid,
        email: &str,
        role: UserRole,
        organization_id: Option<Uuid>,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            email: email.to_string(),
            role,
            organization_id,
        }
    }

    /// Creates claims from a user record. Handlers call this after login,
    /// registration, and any operation that changes the identity baked into
    /// the token (organization bootstrap re-issues the token this way).
    pub fn for_user(user: &User, expires_in: Duration) -> Self {
        Self::new(
            user.id,
            &user.email,
            user.role,
            user.organization_id,
            expires_in,
        )
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

/// Creates a JWT token from claims
///
/// Signs the token using HS256 (HMAC-SHA256) with the provided secret.
///
/// # Errors
///
/// Returns `JwtError::CreateError` if token creation fails
///
/// # Security
///
/// The secret should be:
/// - At least 32 bytes (256 bits) for HS256
/// - Randomly generated
/// - Stored securely (environment variable or secret manager)
/// - Rotated periodically
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT token and extracts claims
///
/// Verifies:
/// - Signature is valid
/// - Token hasn't expired
/// - Issuer is "worktrack"
/// - Token is not used before nbf time
///
/// # Errors
///
/// Returns error if:
/// - Signature is invalid
/// - Token has expired
/// - Issuer doesn't match
/// - Token format is invalid
///
/// # Example
///
/// ```
/// use worktrack_shared::auth::jwt::{create_token, validate_token, Claims};
/// use worktrack_shared::models::user::UserRole;
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let secret = "your-secret-key-at-least-32-bytes";
///
/// let claims = Claims::new(user_id, "a@b.io", UserRole::Member, None, Duration::hours(24));
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret)?;
/// assert_eq!(validated.sub, user_id);
/// assert_eq!(validated.email, "a@b.io");
/// # Ok(())
/// # }
/// ```
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
                expected: ISSUER.to_string(),
            },
            _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
        }
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims(organization_id: Option<Uuid>, expires_in: Duration) -> Claims {
        Claims::new(
            Uuid::new_v4(),
            "jane@acme.io",
            UserRole::ProjectManager,
            organization_id,
            expires_in,
        )
    }

    #[test]
    fn test_claims_creation() {
        let org_id = Uuid::new_v4();
        let claims = sample_claims(Some(org_id), Duration::hours(24));

        assert_eq!(claims.iss, "worktrack");
        assert_eq!(claims.email, "jane@acme.io");
        assert_eq!(claims.role, UserRole::ProjectManager);
        assert_eq!(claims.organization_id, Some(org_id));
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_claims_time_until_expiration() {
        let claims = sample_claims(None, Duration::hours(1));

        let time_left = claims.time_until_expiration().unwrap();
        assert!(time_left.num_seconds() > 3500);
        assert!(time_left.num_seconds() <= 3600);
    }

    #[test]
    fn test_create_and_validate_token() {
        let org_id = Uuid::new_v4();
        let secret = "test-secret-key-at-least-32-bytes-long";

        let claims = sample_claims(Some(org_id), Duration::hours(24));
        let token = create_token(&claims, secret).expect("Should create token");

        let validated = validate_token(&token, secret).expect("Should validate token");
        assert_eq!(validated.sub, claims.sub);
        assert_eq!(validated.email, "jane@acme.io");
        assert_eq!(validated.role, UserRole::ProjectManager);
        assert_eq!(validated.organization_id, Some(org_id));
        assert_eq!(validated.iss, "worktrack");
    }

    #[test]
    fn test_validate_token_without_organization() {
        let secret = "test-secret-key-at-least-32-bytes-long";

        let claims = sample_claims(None, Duration::hours(24));
        let token = create_token(&claims, secret).unwrap();

        let validated = validate_token(&token, secret).unwrap();
        assert_eq!(validated.organization_id, None);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let claims = sample_claims(None, Duration::hours(24));
        let token = create_token(&claims, "secret1").expect("Should create token");

        let result = validate_token(&token, "wrong-secret");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_expired_token() {
        let secret = "test-secret";

        // Negative duration = already expired
        let claims = sample_claims(None, Duration::seconds(-3600));

        assert!(claims.is_expired());
        assert!(claims.time_until_expiration().is_none());

        let token = create_token(&claims, secret).expect("Should create token");
        let result = validate_token(&token, secret);

        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), JwtError::Expired));
    }

    #[test]
    fn test_validate_wrong_issuer() {
        let secret = "test-secret";

        let mut claims = sample_claims(None, Duration::hours(24));
        claims.iss = "someone-else".to_string();

        let token = create_token(&claims, secret).unwrap();
        let result = validate_token(&token, secret);

        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), JwtError::InvalidIssuer { .. }));
    }

    #[test]
    fn test_validate_tampered_token() {
        let secret = "test-secret";

        let claims = sample_claims(None, Duration::hours(24));
        let token = create_token(&claims, secret).unwrap();

        // Flip a character in the payload segment
        let mut tampered = token.clone();
        let mid = tampered.len() / 2;
        let replacement = if tampered.as_bytes()[mid] == b'A' { "B" } else { "A" };
        tampered.replace_range(mid..mid + 1, replacement);

        assert!(validate_token(&tampered, secret).is_err());
    }

    #[test]
    fn test_for_user_copies_identity() {
        let org_id = Uuid::new_v4();
        let user = User {
            id: Uuid::new_v4(),
            email: "pm@acme.io".to_string(),
            password_hash: "hash".to_string(),
            name: "PM".to_string(),
            role: UserRole::Admin,
            organization_id: Some(org_id),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        };

        let claims = Claims::for_user(&user, Duration::hours(24));
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "pm@acme.io");
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.organization_id, Some(org_id));
    }
}
