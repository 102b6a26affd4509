/// Project model: named groupings that activities and tasks attach to.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
/// );
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     added_at TIMESTAMPTZ NOT NULL DEFAULT now(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A project.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,

    pub organization_id: Uuid,

    pub name: String,

    pub description: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// A project row joined with its member count, for listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectWithMemberCount {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project.
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

const PROJECT_COLUMNS: &str =
    "id, organization_id, name, description, created_at, updated_at";

impl Project {
    /// Creates a project.
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (organization_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING {PROJECT_COLUMNS}
            "#,
        ))
        .bind(data.organization_id)
        .bind(data.name)
        .bind(data.description)
        .fetch_one(pool)
        .await?;

        Ok(project)
    }

    /// Finds a project by id within an organization. Used to validate
    /// `project_id` references before attaching activities or tasks.
    pub async fn find_by_id_in_org(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE id = $1 AND organization_id = $2
            "#,
        ))
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Lists an organization's projects with their member counts, newest
    /// first.
    pub async fn list_with_member_counts(
        pool: &PgPool,
        organization_id: Uuid,
    ) -> Result<Vec<ProjectWithMemberCount>, sqlx::Error> {
        let projects = sqlx::query_as::<_, ProjectWithMemberCount>(
            r#"
            SELECT p.id, p.organization_id, p.name, p.description,
                   COUNT(pm.user_id) AS member_count,
                   p.created_at, p.updated_at
            FROM projects p
            LEFT JOIN project_members pm ON pm.project_id = p.id
            WHERE p.organization_id = $1
            GROUP BY p.id
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    /// Adds a user to a project. Membership is idempotent; the user must
    /// belong to the project's organization or the insert matches nothing.
    pub async fn add_member(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id)
            SELECT p.id, u.id
            FROM projects p, users u
            WHERE p.id = $1 AND p.organization_id = $3
              AND u.id = $2 AND u.organization_id = $3
            ON CONFLICT (project_id, user_id) DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(organization_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
