/// Task endpoints
///
/// Tasks are lighter than activities: no approval lifecycle, just an
/// execution status from the organization's task status registry, an
/// optional assignee, and an optional due date. Members self-assign;
/// assigning someone else requires ADMIN or PROJECT_MANAGER.
///
/// # Endpoints
///
/// - `GET    /tasks` - List with filters
/// - `POST   /tasks` - Create
/// - `GET    /tasks/:id` - Fetch one
/// - `PUT    /tasks/:id` - Update
/// - `DELETE /tasks/:id` - Delete

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use worktrack_shared::{
    auth::{
        middleware::AuthContext,
        policy::{authorize, Action},
    },
    models::{
        activity::Priority,
        project::Project,
        status_configuration::{StatusConfiguration, StatusType},
        task::{CreateTask, Task, TaskFilter, UpdateTask},
        user::User,
    },
};

/// Fallback status when an organization has no default task status
/// configured.
const FALLBACK_TASK_STATUS: &str = "todo";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Status name; must be an active entry in the task status registry.
    /// Defaults to the organization's default task status.
    pub status: Option<String>,

    pub priority: Option<Priority>,

    /// Assignee; must belong to the same organization. Assigning anyone
    /// but yourself requires ADMIN or PROJECT_MANAGER.
    pub assignee_id: Option<Uuid>,

    pub project_id: Option<Uuid>,

    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub status: Option<String>,

    pub priority: Option<Priority>,

    pub assignee_id: Option<Uuid>,

    pub project_id: Option<Uuid>,

    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub project_id: Option<Uuid>,

    pub assignee_id: Option<Uuid>,

    pub status: Option<String>,

    #[serde(default = "default_limit")]
    pub limit: i64,

    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub project_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub overdue: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        let overdue = task.is_overdue(Utc::now().date_naive());
        Self {
            id: task.id,
            organization_id: task.organization_id,
            project_id: task.project_id,
            created_by: task.created_by,
            assignee_id: task.assignee_id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            overdue,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Checks an assignee change: the target must exist in the organization,
/// and assigning anyone but yourself takes ADMIN or PROJECT_MANAGER.
async fn check_assignee(
    state: &AppState,
    auth: &AuthContext,
    organization_id: Uuid,
    assignee_id: Uuid,
) -> ApiResult<()> {
    User::find_by_id_in_org(&state.db, assignee_id, organization_id)
        .await?
        .ok_or_else(|| ApiError::validation("assigneeId", "Unknown user"))?;

    if assignee_id != auth.user_id {
        authorize(auth.role, Action::AssignTaskToOther)?;
    }

    Ok(())
}

async fn resolve_initial_status(
    state: &AppState,
    organization_id: Uuid,
    requested: Option<String>,
) -> ApiResult<String> {
    if let Some(name) = requested {
        let config =
            StatusConfiguration::find_by_name(&state.db, organization_id, StatusType::Task, &name)
                .await?;
        return match config {
            Some(c) if c.is_active => Ok(name),
            _ => Err(ApiError::validation(
                "status",
                &format!("'{}' is not an active task status", name),
            )),
        };
    }

    let default =
        StatusConfiguration::find_default(&state.db, organization_id, StatusType::Task).await?;

    Ok(default
        .map(|c| c.name)
        .unwrap_or_else(|| FALLBACK_TASK_STATUS.to_string()))
}

/// List tasks
///
/// # Endpoint
///
/// ```text
/// GET /tasks?assigneeId=<uuid>&status=in_progress&limit=50
/// Authorization: Bearer <token>
/// ```
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<TaskResponse>>> {
    let organization_id = auth.require_organization()?;

    let filter = TaskFilter {
        project_id: query.project_id,
        assignee_id: query.assignee_id,
        status: query.status.clone(),
    };

    let limit = query.limit.clamp(1, 200);
    let offset = query.offset.max(0);

    let tasks = Task::list_by_organization(&state.db, organization_id, filter, limit, offset).await?;

    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// Create a task
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, unknown project or assignee,
///   or inactive status name
/// - `403 Forbidden`: Member assigning someone else
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let organization_id = auth.require_organization()?;
    authorize(auth.role, Action::CreateTask)?;
    req.validate()?;

    if let Some(project_id) = req.project_id {
        Project::find_by_id_in_org(&state.db, project_id, organization_id)
            .await?
            .ok_or_else(|| ApiError::validation("projectId", "Unknown project"))?;
    }

    if let Some(assignee_id) = req.assignee_id {
        check_assignee(&state, &auth, organization_id, assignee_id).await?;
    }

    let status = resolve_initial_status(&state, organization_id, req.status).await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            organization_id,
            project_id: req.project_id,
            created_by: Some(auth.user_id),
            assignee_id: req.assignee_id,
            title: req.title,
            description: req.description,
            status,
            priority: req.priority.unwrap_or_default(),
            due_date: req.due_date,
        },
    )
    .await?;

    Ok(Json(TaskResponse::from(task)))
}

/// Fetch one task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let organization_id = auth.require_organization()?;

    let task = Task::find_by_id_in_org(&state.db, id, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(TaskResponse::from(task)))
}

/// Update a task
///
/// Members may only update tasks they created or are assigned to; other
/// roles may update any. A `status` change is validated against the task
/// status registry's workflow rules.
///
/// # Errors
///
/// - `403 Forbidden`: Member updating an unrelated task, or assigning
///   someone else
/// - `404 Not Found`: No such task in this organization
/// - `409 Conflict`: Status transition not allowed by workflow rules
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let organization_id = auth.require_organization()?;
    req.validate()?;

    let existing = Task::find_by_id_in_org(&state.db, id, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let is_involved = existing.created_by == Some(auth.user_id)
        || existing.assignee_id == Some(auth.user_id);
    authorize(auth.role, Action::UpdateTask { is_involved })?;

    if let Some(project_id) = req.project_id {
        Project::find_by_id_in_org(&state.db, project_id, organization_id)
            .await?
            .ok_or_else(|| ApiError::validation("projectId", "Unknown project"))?;
    }

    if let Some(assignee_id) = req.assignee_id {
        if existing.assignee_id != Some(assignee_id) {
            check_assignee(&state, &auth, organization_id, assignee_id).await?;
        }
    }

    if let Some(new_status) = &req.status {
        if *new_status != existing.status {
            let check = StatusConfiguration::validate_transition(
                &state.db,
                organization_id,
                StatusType::Task,
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

    let task = Task::update(
        &state.db,
        id,
        organization_id,
        UpdateTask {
            title: req.title,
            description: req.description.map(Some),
            status: req.status,
            priority: req.priority,
            assignee_id: req.assignee_id.map(Some),
            project_id: req.project_id.map(Some),
            due_date: req.due_date.map(Some),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(TaskResponse::from(task)))
}

/// Delete a task
///
/// Creators may delete their own tasks; ADMIN and PROJECT_MANAGER may
/// delete any.
///
/// # Errors
///
/// - `403 Forbidden`: Not the creator and not ADMIN/PROJECT_MANAGER
/// - `404 Not Found`: No such task in this organization
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let organization_id = auth.require_organization()?;

    let existing = Task::find_by_id_in_org(&state.db, id, organization_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    authorize(
        auth.role,
        Action::DeleteTask {
            is_creator: existing.created_by == Some(auth.user_id),
        },
    )?;

    let deleted = Task::delete(&state.db, id, organization_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "deleted": true })))
}
