/// Authentication and authorization utilities
///
/// This module provides the security primitives for WorkTrack:
///
/// # Modules
///
/// - [`password`]: bcrypt password hashing and strength validation
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Axum middleware that turns Bearer tokens into an
///   [`middleware::AuthContext`]
/// - [`policy`]: the role capability table all permission checks go
///   through
///
/// # Security Features
///
/// - **Password Hashing**: bcrypt with cost 10, salted per hash
/// - **JWT Tokens**: HS256 signing with configurable expiration
/// - **Status Codes**: missing credentials yield 401, failed verification
///   yields 403
///
/// # Example
///
/// ```no_run
/// use worktrack_shared::auth::password::{hash_password, verify_password};
/// use worktrack_shared::auth::jwt::{create_token, Claims};
/// use worktrack_shared::models::user::UserRole;
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Password authentication
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// // JWT token generation
/// let claims = Claims::new(
///     Uuid::new_v4(),
///     "user@example.com",
///     UserRole::Member,
///     None,
///     Duration::hours(24),
/// );
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod jwt;
pub mod middleware;
pub mod policy;
