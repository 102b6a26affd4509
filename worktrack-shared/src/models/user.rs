/// User model and database operations.
///
/// A user belongs to at most one organization (`organization_id` is NULL
/// until the user creates or is invited into one) and carries exactly one
/// role. Accounts are soft-disabled via `is_active`, never deleted.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'member',
///     organization_id UUID REFERENCES organizations(id) ON DELETE SET NULL,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role held by a user within their organization.
///
/// Stored lowercase in Postgres (`user_role` enum), exposed uppercase in
/// JSON and JWT claims (`ADMIN`, `PMO`, `PROJECT_MANAGER`, `MEMBER`).
/// Capability decisions live in `auth::policy`, not on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Pmo,
    ProjectManager,
    Member,
}

impl UserRole {
    /// The API-facing form of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Pmo => "PMO",
            UserRole::ProjectManager => "PROJECT_MANAGER",
            UserRole::Member => "MEMBER",
        }
    }

    /// Parses a role from its API-facing form, case-insensitively.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Some(UserRole::Admin),
            "PMO" => Some(UserRole::Pmo),
            "PROJECT_MANAGER" => Some(UserRole::ProjectManager),
            "MEMBER" => Some(UserRole::Member),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account row.
///
/// The password hash never leaves the server: it is skipped during
/// serialization and handlers additionally map users through sanitized
/// response types.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Email address, unique and case-insensitive via CITEXT.
    pub email: String,

    /// bcrypt password hash.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub name: String,

    pub role: UserRole,

    /// Organization the user belongs to; NULL until assigned.
    pub organization_id: Option<Uuid>,

    /// Disabled accounts cannot log in but keep their history.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user. `password_hash` is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub organization_id: Option<Uuid>,
}

/// Partial update for a user. Only non-None fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

const USER_COLUMNS: &str = "id, email, password_hash, name, role, organization_id, is_active, \
                            created_at, updated_at, last_login_at";

impl User {
    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// Fails with a unique-constraint violation if the email is taken;
    /// callers map that to a conflict response.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, role, organization_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.name)
        .bind(data.role)
        .bind(data.organization_id)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Case-insensitive email lookup (CITEXT column).
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1",
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Tenant-scoped lookup used by administrative endpoints; a user outside
    /// the caller's organization is indistinguishable from a missing one.
    pub async fn find_by_id_in_org(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND organization_id = $2",
        ))
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Applies a partial update. Returns None if the user doesn't exist.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }

        let user = q.fetch_optional(pool).await?;

        Ok(user)
    }

    /// Changes a member's role. Scoped to the organization so admins cannot
    /// reach across tenants.
    pub async fn set_role(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
        role: UserRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET role = $3, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(organization_id)
        .bind(role)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Soft-enables or soft-disables an account within the organization.
    pub async fn set_active(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
        is_active: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET is_active = $3, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(organization_id)
        .bind(is_active)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Stamps a successful login.
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists an organization's users, newest first.
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE organization_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        ))
        .bind(organization_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Lists an organization's users holding a specific role.
    pub async fn list_by_organization_and_role(
        pool: &PgPool,
        organization_id: Uuid,
        role: UserRole,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE organization_id = $1 AND role = $2
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        ))
        .bind(organization_id)
        .bind(role)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn count_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE organization_id = $1")
                .bind(organization_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(UserRole::Admin.as_str(), "ADMIN");
        assert_eq!(UserRole::Pmo.as_str(), "PMO");
        assert_eq!(UserRole::ProjectManager.as_str(), "PROJECT_MANAGER");
        assert_eq!(UserRole::Member.as_str(), "MEMBER");
    }

    #[test]
    fn test_role_from_str_round_trip() {
        for role in [
            UserRole::Admin,
            UserRole::Pmo,
            UserRole::ProjectManager,
            UserRole::Member,
        ] {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_role_from_str_case_insensitive() {
        assert_eq!(UserRole::from_str("admin"), Some(UserRole::Admin));
        assert_eq!(
            UserRole::from_str("project_manager"),
            Some(UserRole::ProjectManager)
        );
        assert_eq!(UserRole::from_str("supervisor"), None);
    }

    #[test]
    fn test_role_serde_uses_api_form() {
        let json = serde_json::to_string(&UserRole::ProjectManager).unwrap();
        assert_eq!(json, "\"PROJECT_MANAGER\"");

        let parsed: UserRole = serde_json::from_str("\"PMO\"").unwrap();
        assert_eq!(parsed, UserRole::Pmo);
    }

    #[test]
    fn test_update_user_default_is_empty() {
        let update = UpdateUser::default();
        assert!(update.name.is_none());
        assert!(update.password_hash.is_none());
    }
}
