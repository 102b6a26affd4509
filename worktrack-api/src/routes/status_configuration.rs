/// Status registry endpoints
///
/// The status registry is the organization-scoped catalog of status names
/// and display metadata that activities and tasks reference by name.
/// Clients resolve display names and colors from here instead of
/// hardcoding them. Admins edit the registry; everyone reads it.
///
/// Default entries are seeded at organization creation and cannot be
/// deleted, only deactivated, so old rows always resolve.
///
/// # Endpoints
///
/// - `GET    /status-configuration[?type=]` - List all entries
/// - `POST   /status-configuration` - Create an entry (admin)
/// - `GET    /status-configuration/active[?type=]` - Active entries only
/// - `GET    /status-configuration/mapping` - Display lookup keyed by type and name
/// - `POST   /status-configuration/validate-transition` - Dry-run a status change
/// - `PUT    /status-configuration/:id` - Update display fields and rules (admin)
/// - `DELETE /status-configuration/:id` - Delete a non-default entry (admin)
/// - `PUT    /status-configuration/:id/toggle-active` - Flip active flag (admin)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;
use worktrack_shared::{
    auth::{
        middleware::AuthContext,
        policy::{authorize, Action},
    },
    models::status_configuration::{
        CreateStatusConfiguration, StatusConfiguration, StatusType, TransitionCheck,
        UpdateStatusConfiguration, WorkflowRules,
    },
};

#[derive(Debug, Clone, Deserialize)]
pub struct TypeQuery {
    /// Narrow to one status type: `activity`, `task`, or `approval`.
    #[serde(rename = "type")]
    pub status_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStatusConfigurationRequest {
    /// `activity`, `task`, or `approval`
    #[serde(rename = "type")]
    pub status_type: String,

    /// Internal code referenced by activity/task rows. Immutable after
    /// creation.
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    pub display_name: String,

    /// Hex color such as `#ff9800`
    #[validate(length(min = 1, max = 20, message = "Color must be 1-20 characters"))]
    pub color: String,

    #[serde(default)]
    pub order: i32,

    pub workflow_rules: Option<JsonValue>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusConfigurationRequest {
    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    pub display_name: Option<String>,

    #[validate(length(min = 1, max = 20, message = "Color must be 1-20 characters"))]
    pub color: Option<String>,

    pub order: Option<i32>,

    pub workflow_rules: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTransitionRequest {
    /// `activity`, `task`, or `approval`
    #[serde(rename = "type")]
    pub status_type: String,

    pub from: String,

    pub to: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusConfigurationResponse {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub status_type: StatusType,

    pub name: String,

    pub display_name: String,

    pub color: String,

    pub order: i32,

    pub is_default: bool,

    pub is_active: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_rules: Option<JsonValue>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl From<StatusConfiguration> for StatusConfigurationResponse {
    fn from(config: StatusConfiguration) -> Self {
        Self {
            id: config.id,
            status_type: config.status_type,
            name: config.name,
            display_name: config.display_name,
            color: config.color,
            order: config.sort_order,
            is_default: config.is_default,
            is_active: config.is_active,
            workflow_rules: config.workflow_rules,
            created_at: config.created_at,
            updated_at: config.updated_at,
        }
    }
}

fn parse_type(s: &str) -> ApiResult<StatusType> {
    StatusType::from_str(s)
        .ok_or_else(|| ApiError::validation("type", &format!("Unknown status type: {}", s)))
}

fn parse_optional_type(query: &TypeQuery) -> ApiResult<Option<StatusType>> {
    query.status_type.as_deref().map(parse_type).transpose()
}

/// Rejects workflow rules that don't parse as a rules object. Storing
/// them would silently disable enforcement for that status.
fn check_rules_shape(rules: &Option<JsonValue>) -> ApiResult<()> {
    if let Some(value) = rules {
        if WorkflowRules::from_value(value).is_none() {
            return Err(ApiError::validation(
                "workflowRules",
                "Not a valid workflow rules object",
            ));
        }
    }
    Ok(())
}

/// List the organization's status registry
pub async fn list_configurations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<TypeQuery>,
) -> ApiResult<Json<Vec<StatusConfigurationResponse>>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ViewStatusConfigurations)?;

    let status_type = parse_optional_type(&query)?;

    let configs =
        StatusConfiguration::list_by_organization(&state.db, organization_id, status_type).await?;

    Ok(Json(
        configs
            .into_iter()
            .map(StatusConfigurationResponse::from)
            .collect(),
    ))
}

/// Create a registry entry
///
/// # Endpoint
///
/// ```text
/// POST /status-configuration
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// {
///   "type": "task",
///   "name": "in_review",
///   "displayName": "In Review",
///   "color": "#9c27b0",
///   "order": 2,
///   "workflowRules": { "allowedTransitions": ["done", "todo"] }
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or malformed workflow rules
/// - `403 Forbidden`: Caller is not an admin
/// - `409 Conflict`: An entry with this type and name already exists
pub async fn create_configuration(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateStatusConfigurationRequest>,
) -> ApiResult<Json<StatusConfigurationResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ManageStatusConfigurations)?;
    req.validate()?;

    let status_type = parse_type(&req.status_type)?;
    check_rules_shape(&req.workflow_rules)?;

    let config = StatusConfiguration::create(
        &state.db,
        CreateStatusConfiguration {
            organization_id,
            status_type,
            name: req.name,
            display_name: req.display_name,
            color: req.color,
            sort_order: req.order,
            workflow_rules: req.workflow_rules,
        },
    )
    .await?;

    Ok(Json(StatusConfigurationResponse::from(config)))
}

/// List only active entries, in display order
pub async fn list_active(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<TypeQuery>,
) -> ApiResult<Json<Vec<StatusConfigurationResponse>>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ViewStatusConfigurations)?;

    let status_type = parse_optional_type(&query)?;

    let configs = StatusConfiguration::list_active(&state.db, organization_id, status_type).await?;

    Ok(Json(
        configs
            .into_iter()
            .map(StatusConfigurationResponse::from)
            .collect(),
    ))
}

/// Display metadata lookup, keyed by type then status name
///
/// # Response
///
/// ```json
/// {
///   "activity": {
///     "planned": { "displayName": "Planned", "color": "#2196f3", "order": 0 }
///   },
///   "task": { "todo": { "displayName": "To Do", "color": "#9e9e9e", "order": 0 } },
///   "approval": { "draft": { "displayName": "Draft", "color": "#9e9e9e", "order": 0 } }
/// }
/// ```
pub async fn get_mapping(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<JsonValue>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ViewStatusConfigurations)?;

    let configs = StatusConfiguration::list_active(&state.db, organization_id, None).await?;

    let mut mapping = serde_json::Map::new();
    for status_type in [StatusType::Activity, StatusType::Task, StatusType::Approval] {
        mapping.insert(
            status_type.as_str().to_string(),
            JsonValue::Object(serde_json::Map::new()),
        );
    }

    for config in configs {
        let entry = serde_json::json!({
            "displayName": config.display_name,
            "color": config.color,
            "order": config.sort_order,
        });
        if let Some(JsonValue::Object(by_name)) = mapping.get_mut(config.status_type.as_str()) {
            by_name.insert(config.name, entry);
        }
    }

    Ok(Json(JsonValue::Object(mapping)))
}

/// Dry-run a status change against the registry's workflow rules
///
/// Returns whether the caller's role could move an item of the given type
/// between the two named statuses, and why not if it can't. This is the
/// same check the activity and task update endpoints enforce.
///
/// # Endpoint
///
/// ```text
/// POST /status-configuration/validate-transition
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// { "type": "task", "from": "todo", "to": "done" }
/// ```
pub async fn validate_transition(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ValidateTransitionRequest>,
) -> ApiResult<Json<TransitionCheck>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ViewStatusConfigurations)?;

    let status_type = parse_type(&req.status_type)?;

    let check = StatusConfiguration::validate_transition(
        &state.db,
        organization_id,
        status_type,
        &req.from,
        &req.to,
        auth.role,
    )
    .await?;

    Ok(Json(check))
}

/// Update a registry entry's display fields and rules
///
/// The internal `name` is immutable because existing activity and task
/// rows reference it.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or malformed workflow rules
/// - `403 Forbidden`: Caller is not an admin
/// - `404 Not Found`: No such entry in this organization
pub async fn update_configuration(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusConfigurationRequest>,
) -> ApiResult<Json<StatusConfigurationResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ManageStatusConfigurations)?;
    req.validate()?;

    check_rules_shape(&req.workflow_rules)?;

    let config = StatusConfiguration::update(
        &state.db,
        id,
        organization_id,
        UpdateStatusConfiguration {
            display_name: req.display_name,
            color: req.color,
            sort_order: req.order,
            workflow_rules: req.workflow_rules.map(Some),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Status configuration not found".to_string()))?;

    Ok(Json(StatusConfigurationResponse::from(config)))
}

/// Delete a non-default registry entry
///
/// Default entries are protected; deactivate them instead.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an admin
/// - `404 Not Found`: No such entry in this organization
/// - `409 Conflict`: Entry is a default and cannot be deleted
pub async fn delete_configuration(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ManageStatusConfigurations)?;

    let existing = StatusConfiguration::find_by_id_in_org(&state.db, id, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Status configuration not found".to_string()))?;

    if existing.is_default {
        return Err(ApiError::Conflict(
            "Default status configurations cannot be deleted, only deactivated".to_string(),
        ));
    }

    let deleted = StatusConfiguration::delete(&state.db, id, organization_id).await?;
    if !deleted {
        return Err(ApiError::NotFound(
            "Status configuration not found".to_string(),
        ));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Flip an entry's active flag
///
/// Deactivating hides the entry from pickers and `active` listings while
/// keeping rows that reference it readable.
pub async fn toggle_active(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StatusConfigurationResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ManageStatusConfigurations)?;

    let config = StatusConfiguration::toggle_active(&state.db, id, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Status configuration not found".to_string()))?;

    Ok(Json(StatusConfigurationResponse::from(config)))
}
