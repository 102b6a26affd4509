/// Activity endpoints
///
/// Activities are the unit of work that flows through the approval
/// lifecycle: draft → submitted → approved → closed, with rejected as the
/// other terminal outcome. Content fields are edited through the normal
/// update endpoint; the approval state only ever moves through the
/// dedicated transition endpoints below, which map onto conditional
/// UPDATEs so racing decisions cannot both win.
///
/// # Endpoints
///
/// - `GET    /activities` - List with filters
/// - `POST   /activities` - Create (starts in draft)
/// - `GET    /activities/:id` - Fetch one, with assignees
/// - `PUT    /activities/:id` - Update editable fields
/// - `DELETE /activities/:id` - Delete (creator in draft, or admin)
/// - `POST   /activities/:id/submit` - draft → submitted
/// - `POST   /activities/:id/approve` - submitted → approved
/// - `POST   /activities/:id/reject` - submitted → rejected (comment required)
/// - `POST   /activities/:id/close` - approved → closed

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
use uuid::Uuid;
use validator::Validate;
use worktrack_shared::{
    auth::{
        middleware::AuthContext,
        policy::{authorize, Action},
    },
    models::{
        activity::{
            Activity, ActivityFilter, ApprovalState, CreateActivity, Priority, UpdateActivity,
        },
        project::Project,
        status_configuration::{StatusConfiguration, StatusType},
    },
};

/// Fallback execution status when an organization has no default activity
/// status configured.
const FALLBACK_ACTIVITY_STATUS: &str = "planned";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Execution status name; must be an active entry in the status
    /// registry. Defaults to the organization's default activity status.
    pub status: Option<String>,

    pub priority: Option<Priority>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub project_id: Option<Uuid>,

    /// Assignee user ids; ids outside the organization are ignored.
    #[serde(default)]
    pub assignees: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActivityRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub status: Option<String>,

    pub priority: Option<Priority>,

    pub tags: Option<Vec<String>>,

    pub project_id: Option<Uuid>,

    pub assignees: Option<Vec<Uuid>>,
}

/// Approval decision body. The comment is optional for approve and
/// mandatory for reject.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListActivitiesQuery {
    pub project_id: Option<Uuid>,

    /// Filter by approval state, e.g. `?approvalState=submitted`
    pub approval_state: Option<String>,

    pub status: Option<String>,

    /// Only activities assigned to this user
    pub assignee_id: Option<Uuid>,

    #[serde(default = "default_limit")]
    pub limit: i64,

    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Activity detail, including its assignees.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub project_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub approval_state: ApprovalState,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub approval_comment: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<Uuid>,
    pub assignees: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActivityResponse {
    fn from_activity(activity: Activity, assignees: Vec<Uuid>) -> Self {
        Self {
            id: activity.id,
            organization_id: activity.organization_id,
            project_id: activity.project_id,
            created_by: activity.created_by,
            title: activity.title,
            description: activity.description,
            status: activity.status,
            approval_state: activity.approval_state,
            priority: activity.priority,
            tags: activity.tags,
            approval_comment: activity.approval_comment,
            submitted_at: activity.submitted_at,
            decided_at: activity.decided_at,
            decided_by: activity.decided_by,
            assignees,
            created_at: activity.created_at,
            updated_at: activity.updated_at,
        }
    }
}

/// Activity list item. Assignees are not expanded here; fetch the detail
/// endpoint for them.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityListItem {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub title: String,
    pub status: String,
    pub approval_state: ApprovalState,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub approval_comment: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Activity> for ActivityListItem {
    fn from(activity: Activity) -> Self {
        Self {
            id: activity.id,
            project_id: activity.project_id,
            created_by: activity.created_by,
            title: activity.title,
            status: activity.status,
            approval_state: activity.approval_state,
            priority: activity.priority,
            tags: activity.tags,
            approval_comment: activity.approval_comment,
            submitted_at: activity.submitted_at,
            decided_at: activity.decided_at,
            created_at: activity.created_at,
            updated_at: activity.updated_at,
        }
    }
}

/// Resolves which execution status a new activity starts in. A caller-
/// provided name must be an active registry entry; otherwise the
/// organization's default is used.
async fn resolve_initial_status(
    state: &AppState,
    organization_id: Uuid,
    requested: Option<String>,
) -> ApiResult<String> {
    if let Some(name) = requested {
        let config =
            StatusConfiguration::find_by_name(&state.db, organization_id, StatusType::Activity, &name)
                .await?;
        return match config {
            Some(c) if c.is_active => Ok(name),
            _ => Err(ApiError::validation(
                "status",
                &format!("'{}' is not an active activity status", name),
            )),
        };
    }

    let default =
        StatusConfiguration::find_default(&state.db, organization_id, StatusType::Activity).await?;

    Ok(default
        .map(|c| c.name)
        .unwrap_or_else(|| FALLBACK_ACTIVITY_STATUS.to_string()))
}

/// Builds the 404-or-409 error for a transition that changed no row: the
/// activity is either gone or not in the state the transition requires.
async fn transition_conflict(
    state: &AppState,
    id: Uuid,
    organization_id: Uuid,
    conflict_message: &str,
) -> ApiError {
    match Activity::find_by_id_in_org(&state.db, id, organization_id).await {
        Ok(Some(_)) => ApiError::Conflict(conflict_message.to_string()),
        Ok(None) => ApiError::NotFound("Activity not found".to_string()),
        Err(e) => ApiError::from(e),
    }
}

/// List activities
///
/// # Endpoint
///
/// ```text
/// GET /activities?approvalState=submitted&projectId=<uuid>&limit=50
/// Authorization: Bearer <token>
/// ```
pub async fn list_activities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListActivitiesQuery>,
) -> ApiResult<Json<Vec<ActivityListItem>>> {
    let organization_id = auth.require_organization()?;

    let approval_state = match &query.approval_state {
        Some(s) => Some(ApprovalState::from_str(s).ok_or_else(|| {
            ApiError::validation("approvalState", &format!("Unknown approval state: {}", s))
        })?),
        None => None,
    };

    let filter = ActivityFilter {
        project_id: query.project_id,
        approval_state,
        status: query.status.clone(),
        assignee_id: query.assignee_id,
    };

    let limit = query.limit.clamp(1, 200);
    let offset = query.offset.max(0);

    let activities =
        Activity::list_by_organization(&state.db, organization_id, filter, limit, offset).await?;

    Ok(Json(
        activities.into_iter().map(ActivityListItem::from).collect(),
    ))
}

/// Create an activity
///
/// New activities always start in the draft approval state, regardless of
/// the request body.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, unknown project, or inactive
///   status name
pub async fn create_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateActivityRequest>,
) -> ApiResult<Json<ActivityResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::CreateActivity)?;
    req.validate()?;

    if let Some(project_id) = req.project_id {
        Project::find_by_id_in_org(&state.db, project_id, organization_id)
            .await?
            .ok_or_else(|| ApiError::validation("projectId", "Unknown project"))?;
    }

    let status = resolve_initial_status(&state, organization_id, req.status).await?;

    let activity = Activity::create(
        &state.db,
        CreateActivity {
            organization_id,
            project_id: req.project_id,
            created_by: Some(auth.user_id),
            title: req.title,
            description: req.description,
            status,
            priority: req.priority.unwrap_or_default(),
            tags: req.tags,
            assignees: req.assignees,
        },
    )
    .await?;

    let assignees = Activity::assignee_ids(&state.db, activity.id).await?;

    Ok(Json(ActivityResponse::from_activity(activity, assignees)))
}

/// Fetch one activity with its assignees
pub async fn get_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActivityResponse>> {
    let organization_id = auth.require_organization()?;

    let activity = Activity::find_by_id_in_org(&state.db, id, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Activity not found".to_string()))?;

    let assignees = Activity::assignee_ids(&state.db, activity.id).await?;

    Ok(Json(ActivityResponse::from_activity(activity, assignees)))
}

/// Update an activity's editable fields
///
/// Members may only edit their own activities; other roles may edit any.
/// Once an activity leaves draft its content is frozen for everyone but
/// admins. A `status` change is validated against the status registry's
/// workflow rules. The approval state cannot be changed here.
///
/// # Errors
///
/// - `403 Forbidden`: Member editing someone else's activity, or a
///   non-admin editing past draft
/// - `404 Not Found`: No such activity in this organization
/// - `409 Conflict`: Status transition not allowed by workflow rules
pub async fn update_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateActivityRequest>,
) -> ApiResult<Json<ActivityResponse>> {
    let organization_id = auth.require_organization()?;
    req.validate()?;

    let existing = Activity::find_by_id_in_org(&state.db, id, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Activity not found".to_string()))?;

    let is_creator = existing.created_by == Some(auth.user_id);
    let is_draft = existing.approval_state == ApprovalState::Draft;
    authorize(auth.role, Action::UpdateActivity { is_creator, is_draft })?;

    if let Some(project_id) = req.project_id {
        Project::find_by_id_in_org(&state.db, project_id, organization_id)
            .await?
            .ok_or_else(|| ApiError::validation("projectId", "Unknown project"))?;
    }

    if let Some(new_status) = &req.status {
        if *new_status != existing.status {
            let check = StatusConfiguration::validate_transition(
                &state.db,
                organization_id,
                StatusType::Activity,
                &existing.status,
                new_status,
                auth.role,
            )
            .await?;

            if !check.allowed {
                return Err(ApiError::Conflict(format!(
                    "Status transition not allowed: {}",
                    check.reason.unwrap_or_else(|| "denied".to_string())
                )));
            }
        }
    }

    let activity = Activity::update(
        &state.db,
        id,
        organization_id,
        UpdateActivity {
            title: req.title,
            description: req.description.map(Some),
            status: req.status,
            priority: req.priority,
            tags: req.tags,
            project_id: req.project_id.map(Some),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Activity not found".to_string()))?;

    if let Some(assignees) = &req.assignees {
        Activity::set_assignees(&state.db, id, organization_id, assignees).await?;
    }

    let assignees = Activity::assignee_ids(&state.db, activity.id).await?;

    Ok(Json(ActivityResponse::from_activity(activity, assignees)))
}

/// Delete an activity
///
/// Creators may delete their own drafts; admins may delete anything.
///
/// # Errors
///
/// - `403 Forbidden`: Not the creator, or not a draft (and not admin)
/// - `404 Not Found`: No such activity in this organization
pub async fn delete_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let organization_id = auth.require_organization()?;

    let existing = Activity::find_by_id_in_org(&state.db, id, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Activity not found".to_string()))?;

    authorize(
        auth.role,
        Action::DeleteActivity {
            is_creator: existing.created_by == Some(auth.user_id),
            is_draft: existing.approval_state == ApprovalState::Draft,
        },
    )?;

    let deleted = Activity::delete(&state.db, id, organization_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Activity not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Submit an activity for approval (draft → submitted)
///
/// Creators may submit their own drafts; any non-MEMBER role may submit
/// someone else's.
///
/// # Errors
///
/// - `403 Forbidden`: Member submitting someone else's activity
/// - `404 Not Found`: No such activity in this organization
/// - `409 Conflict`: Activity is not in draft
pub async fn submit_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActivityResponse>> {
    let organization_id = auth.require_organization()?;

    let existing = Activity::find_by_id_in_org(&state.db, id, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Activity not found".to_string()))?;

    authorize(
        auth.role,
        Action::SubmitActivity {
            is_creator: existing.created_by == Some(auth.user_id),
        },
    )?;

    let activity = match Activity::submit(&state.db, id, organization_id).await? {
        Some(a) => a,
        None => {
            return Err(transition_conflict(
                &state,
                id,
                organization_id,
                "Only draft activities can be submitted",
            )
            .await)
        }
    };

    let assignees = Activity::assignee_ids(&state.db, activity.id).await?;

    Ok(Json(ActivityResponse::from_activity(activity, assignees)))
}

/// Approve a submitted activity (submitted → approved)
///
/// Only ADMIN and PROJECT_MANAGER decide. The optional comment is stored
/// on the activity.
///
/// # Errors
///
/// - `403 Forbidden`: Role may not approve
/// - `404 Not Found`: No such activity in this organization
/// - `409 Conflict`: Activity is not in submitted
pub async fn approve_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    req: Option<Json<DecisionRequest>>,
) -> ApiResult<Json<ActivityResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::ApproveActivity)?;

    let comment = req.and_then(|Json(r)| r.comment);

    let activity =
        match Activity::approve(&state.db, id, organization_id, auth.user_id, comment.as_deref())
            .await?
        {
            Some(a) => a,
            None => {
                return Err(transition_conflict(
                    &state,
                    id,
                    organization_id,
                    "Only submitted activities can be approved",
                )
                .await)
            }
        };

    let assignees = Activity::assignee_ids(&state.db, activity.id).await?;

    Ok(Json(ActivityResponse::from_activity(activity, assignees)))
}

/// Reject a submitted activity (submitted → rejected)
///
/// The comment is mandatory; rejections without an explanation are
/// refused.
///
/// # Errors
///
/// - `400 Bad Request`: Missing or empty comment
/// - `403 Forbidden`: Role may not reject
/// - `404 Not Found`: No such activity in this organization
/// - `409 Conflict`: Activity is not in submitted
pub async fn reject_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    req: Option<Json<DecisionRequest>>,
) -> ApiResult<Json<ActivityResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::RejectActivity)?;

    let comment = req
        .and_then(|Json(r)| r.comment)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::validation("comment", "Rejection comment is required"))?;

    let activity =
        match Activity::reject(&state.db, id, organization_id, auth.user_id, &comment).await? {
            Some(a) => a,
            None => {
                return Err(transition_conflict(
                    &state,
                    id,
                    organization_id,
                    "Only submitted activities can be rejected",
                )
                .await)
            }
        };

    let assignees = Activity::assignee_ids(&state.db, activity.id).await?;

    Ok(Json(ActivityResponse::from_activity(activity, assignees)))
}

/// Close an approved activity (approved → closed)
///
/// # Errors
///
/// - `403 Forbidden`: Role may not close
/// - `404 Not Found`: No such activity in this organization
/// - `409 Conflict`: Activity is not in approved
pub async fn close_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ActivityResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::CloseActivity)?;

    let activity = match Activity::close(&state.db, id, organization_id).await? {
        Some(a) => a,
        None => {
            return Err(transition_conflict(
                &state,
                id,
                organization_id,
                "Only approved activities can be closed",
            )
            .await)
        }
    };

    let assignees = Activity::assignee_ids(&state.db, activity.id).await?;

    Ok(Json(ActivityResponse::from_activity(activity, assignees)))
}
