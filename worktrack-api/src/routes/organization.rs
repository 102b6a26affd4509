/// Organization management endpoints
///
/// Everything here operates on the caller's own organization, taken from
/// the token. There is no cross-organization surface: a request can never
/// name another tenant, so it can never read one.
///
/// # Endpoints
///
/// - `GET  /organization` - The caller's organization
/// - `PUT  /organization` - Update name, description, or settings (admin)
/// - `GET  /organization/users` - List members
/// - `GET  /organization/users/count` - Member count
/// - `POST /organization/users` - Invite a user directly into the org (admin)
/// - `PUT  /organization/users/:id/role` - Change a member's role (admin)
/// - `PUT  /organization/users/:id/activate` - Reactivate a member (admin)
/// - `PUT  /organization/users/:id/deactivate` - Deactivate a member (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::users::UserResponse,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use worktrack_shared::{
    auth::{
        middleware::AuthContext,
        password,
        policy::{authorize, Action},
    },
    models::{
        organization::{Organization, UpdateOrganization},
        user::{CreateUser, User, UserRole},
    },
};

/// Organization as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub settings: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Organization> for OrganizationResponse {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id,
            name: org.name,
            description: org.description,
            created_by: org.created_by,
            settings: org.settings,
            created_at: org.created_at,
            updated_at: org.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,

    /// Merged into existing settings key by key.
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct UserCountResponse {
    pub count: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InviteUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Role string such as "MEMBER" or "PROJECT_MANAGER". Defaults to MEMBER.
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleRequest {
    pub role: String,
}

/// The caller's organization
pub async fn get_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<OrganizationResponse>> {
    let organization_id = auth.require_organization()?;

    let organization = Organization::find_by_id(&state.db, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    Ok(Json(OrganizationResponse::from(organization)))
}

/// Update the caller's organization
///
/// Settings are merged key by key, so sending `{"settings": {"logoPosition":
/// "right"}}` leaves the other settings untouched.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an admin
pub async fn update_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateOrganizationRequest>,
) -> ApiResult<Json<OrganizationResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::UpdateOrganization)?;
    req.validate()?;

    let organization = Organization::update(
        &state.db,
        organization_id,
        UpdateOrganization {
            name: req.name,
            description: req.description.map(Some),
            settings: req.settings,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    Ok(Json(OrganizationResponse::from(organization)))
}

/// List the organization's users
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserListResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ViewUsers)?;

    let users = User::list_by_organization(&state.db, organization_id, 500, 0).await?;
    let total = User::count_by_organization(&state.db, organization_id).await?;

    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
        total,
    }))
}

/// Member count for the caller's organization
pub async fn count_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserCountResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ViewUsers)?;

    let count = User::count_by_organization(&state.db, organization_id).await?;

    Ok(Json(UserCountResponse { count }))
}

/// Invite a user directly into the organization
///
/// The account is created already attached to the caller's organization,
/// with the given (or default MEMBER) role, and can log in immediately
/// with the supplied password.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, weak password, or unknown role
/// - `403 Forbidden`: Caller is not an admin
/// - `409 Conflict`: Email already exists
pub async fn invite_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<InviteUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ManageUsers)?;
    req.validate()?;

    let role = match &req.role {
        Some(s) => UserRole::from_str(s)
            .ok_or_else(|| ApiError::validation("role", &format!("Unknown role: {}", s)))?,
        None => UserRole::Member,
    };

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::validation("password", &e))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            name: req.name,
            role,
            organization_id: Some(organization_id),
        },
    )
    .await?;

    Ok(Json(UserResponse::from(user)))
}

/// Change a member's role
///
/// Admins cannot change their own role. That guard keeps an organization
/// from locking itself out by demoting its last admin.
///
/// # Errors
///
/// - `400 Bad Request`: Unknown role, or caller targeting themselves
/// - `403 Forbidden`: Caller is not an admin
/// - `404 Not Found`: No such user in this organization
pub async fn change_user_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeRoleRequest>,
) -> ApiResult<Json<UserResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ManageUsers)?;

    if id == auth.user_id {
        return Err(ApiError::BadRequest(
            "You cannot change your own role".to_string(),
        ));
    }

    let role = UserRole::from_str(&req.role)
        .ok_or_else(|| ApiError::validation("role", &format!("Unknown role: {}", req.role)))?;

    let user = User::set_role(&state.db, id, organization_id, role)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}

/// Reactivate a member
pub async fn activate_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ManageUsers)?;

    let user = User::set_active(&state.db, id, organization_id, true)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}

/// Deactivate a member
///
/// Deactivated users keep their history but can no longer log in. Callers
/// cannot deactivate themselves.
///
/// # Errors
///
/// - `400 Bad Request`: Caller targeting themselves
/// - `403 Forbidden`: Caller is not an admin
/// - `404 Not Found`: No such user in this organization
pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ManageUsers)?;

    if id == auth.user_id {
        return Err(ApiError::BadRequest(
            "You cannot deactivate your own account".to_string(),
        ));
    }

    let user = User::set_active(&state.db, id, organization_id, false)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}
