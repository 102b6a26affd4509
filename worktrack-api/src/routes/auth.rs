/// Authentication endpoints
///
/// This module provides user authentication and account endpoints:
/// - Registration and login
/// - Profile read/update and password change
/// - Organization bootstrap for users who don't belong to one yet
///
/// # Endpoints
///
/// - `POST /auth/register` - Register new user
/// - `POST /auth/login` - Login and get a token
/// - `GET /auth/profile` - Current user's profile
/// - `PUT /auth/profile` - Update profile
/// - `POST /auth/change-password` - Change password
/// - `POST /auth/create-organization` - Create an organization and become
///   its admin

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::organization::OrganizationResponse,
    routes::users::UserResponse,
};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;
use worktrack_shared::{
    auth::{jwt, middleware::AuthContext, password},
    models::{
        organization::{CreateOrganization, Organization},
        user::{CreateUser, UpdateUser, User, UserRole},
    },
};

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (also validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    /// Starting role; defaults to MEMBER
    pub role: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Response for register and login: the user plus a fresh token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,

    /// Bearer token carrying the user's identity claims
    pub access_token: String,

    /// Token lifetime in seconds
    pub expires_in: i64,
}

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

/// Password change request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Organization bootstrap request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,
}

/// Organization bootstrap response. The token is re-issued because the
/// caller's organization and role changed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationResponse {
    pub organization: OrganizationResponse,

    pub user: UserResponse,

    pub access_token: String,

    pub expires_in: i64,
}

/// Register a new user
///
/// New accounts start without an organization, with the MEMBER role unless
/// another is requested; `POST /auth/create-organization` turns the caller
/// into an admin of a fresh organization.
///
/// # Endpoint
///
/// ```text
/// POST /auth/register
/// Content-Type: application/json
///
/// {
///   "email": "admin@acme.com",
///   "password": "Passw0rd!",
///   "name": "Acme Admin"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or password too weak
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
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
            organization_id: None,
        },
    )
    .await?;

    let claims = jwt::Claims::for_user(&user, state.token_lifetime());
    let access_token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok(Json(AuthResponse {
        user: UserResponse::from(user),
        access_token,
        expires_in: state.config.jwt.expires_in_seconds,
    }))
}

/// Login
///
/// # Endpoint
///
/// ```text
/// POST /auth/login
/// Content-Type: application/json
///
/// {
///   "email": "admin@acme.com",
///   "password": "Passw0rd!"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Unknown email or wrong password. The message is
///   identical in both cases so the endpoint doesn't reveal which emails
///   have accounts.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized(
            "Account is deactivated".to_string(),
        ));
    }

    User::update_last_login(&state.db, user.id).await?;

    let claims = jwt::Claims::for_user(&user, state.token_lifetime());
    let access_token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok(Json(AuthResponse {
        user: UserResponse::from(user),
        access_token,
        expires_in: state.config.jwt.expires_in_seconds,
    }))
}

/// Current user's profile
///
/// Reads fresh state from the database rather than echoing token claims,
/// so role or organization changes show up before the token is renewed.
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}

/// Update the current user's profile
///
/// Email is immutable; only the display name can change.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate()?;

    let user = User::update(
        &state.db,
        auth.user_id,
        UpdateUser {
            name: Some(req.name),
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(user)))
}

/// Change the current user's password
///
/// # Errors
///
/// - `400 Bad Request`: New password too weak
/// - `401 Unauthorized`: Current password doesn't match
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    req.validate()?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let valid = password::verify_password(&req.current_password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    password::validate_password_strength(&req.new_password)
        .map_err(|e| ApiError::validation("newPassword", &e))?;

    let password_hash = password::hash_password(&req.new_password)?;

    User::update(
        &state.db,
        user.id,
        UpdateUser {
            password_hash: Some(password_hash),
            ..Default::default()
        },
    )
    .await?;

    Ok(Json(serde_json::json!({ "message": "Password updated" })))
}

/// Create an organization and become its admin
///
/// Runs the bootstrap transaction: insert the organization, attach the
/// caller as its first user with the ADMIN role, and seed the default
/// status registry. All of it commits or none of it does.
///
/// The response carries a re-issued token because the caller's
/// organization and role claims changed.
///
/// # Endpoint
///
/// ```text
/// POST /auth/create-organization
/// Content-Type: application/json
///
/// {
///   "name": "Acme",
///   "description": "Acme Corp workspace"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Caller already belongs to an organization
pub async fn create_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateOrganizationRequest>,
) -> ApiResult<Json<CreateOrganizationResponse>> {
    req.validate()?;

    // The bootstrap transaction re-checks this atomically.
    if auth.organization_id.is_some() {
        return Err(ApiError::Conflict(
            "You already belong to an organization".to_string(),
        ));
    }

    let organization = Organization::create_with_admin(
        &state.db,
        CreateOrganization {
            name: req.name,
            description: req.description,
        },
        auth.user_id,
    )
    .await?
    .ok_or_else(|| {
        ApiError::Conflict("You already belong to an organization".to_string())
    })?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::InternalError("User vanished during bootstrap".to_string()))?;

    let claims = jwt::Claims::for_user(&user, state.token_lifetime());
    let access_token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok(Json(CreateOrganizationResponse {
        organization: OrganizationResponse::from(organization),
        user: UserResponse::from(user),
        access_token,
        expires_in: state.config.jwt.expires_in_seconds,
    }))
}
