/// Project listing endpoint
///
/// Projects are managed by a separate administration surface; the API
/// exposes them read-only so activity and task forms can offer a project
/// picker with member counts.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use worktrack_shared::{
    auth::middleware::AuthContext,
    models::project::{Project, ProjectWithMemberCount},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectWithMemberCount> for ProjectResponse {
    fn from(project: ProjectWithMemberCount) -> Self {
        Self {
            id: project.id,
            organization_id: project.organization_id,
            name: project.name,
            description: project.description,
            member_count: project.member_count,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// List the organization's projects with member counts
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ProjectResponse>>> {
    let organization_id = auth.require_organization()?;

    let projects = Project::list_with_member_counts(&state.db, organization_id).await?;

    Ok(Json(projects.into_iter().map(ProjectResponse::from).collect()))
}
