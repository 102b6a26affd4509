/// User directory endpoint
///
/// `GET /users` lists the caller's organization members, optionally
/// filtered by role. Assignee pickers use this; it is readable by every
/// role.
///
/// The `UserResponse` shape defined here is the only user representation
/// the API ever returns. It carries no password hash.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use worktrack_shared::{
    auth::{
        middleware::AuthContext,
        policy::{authorize, Action},
    },
    models::user::{User, UserRole},
};

/// User as returned to clients. Never includes the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub organization_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            organization_id: user.organization_id,
            is_active: user.is_active,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// List users query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct ListUsersQuery {
    /// Filter to a single role, e.g. `?role=PROJECT_MANAGER`
    pub role: Option<String>,

    #[serde(default = "default_limit")]
    pub limit: i64,

    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// List the organization's users
///
/// # Endpoint
///
/// ```text
/// GET /users?role=MEMBER&limit=50&offset=0
/// Authorization: Bearer <token>
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown role filter
/// - `403 Forbidden`: Caller has no organization yet
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Vec<UserResponse>>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ViewUsers)?;

    let limit = query.limit.clamp(1, 200);
    let offset = query.offset.max(0);

    let users = match &query.role {
        Some(s) => {
            let role = UserRole::from_str(s)
                .ok_or_else(|| ApiError::validation("role", &format!("Unknown role: {}", s)))?;
            User::list_by_organization_and_role(&state.db, organization_id, role, limit, offset)
                .await?
        }
        None => User::list_by_organization(&state.db, organization_id, limit, offset).await?,
    };

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
