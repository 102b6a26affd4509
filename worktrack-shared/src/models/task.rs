/// Task model: lightweight work items, optionally attached to a project
/// and assigned to a single user.
///
/// Unlike activities, tasks carry no approval workflow. Their `status` is a
/// free-form code resolved against the organization's status registry
/// (`status_type = 'task'`); handlers validate it before writes. Handlers
/// also verify that `assignee_id` belongs to the same organization.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status VARCHAR(64) NOT NULL DEFAULT 'todo',
///     priority priority NOT NULL DEFAULT 'medium',
///     due_date DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::activity::Priority;

/// A work item.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    pub organization_id: Uuid,

    pub project_id: Option<Uuid>,

    /// Creator; null if that user was deleted.
    pub created_by: Option<Uuid>,

    pub assignee_id: Option<Uuid>,

    pub title: String,

    pub description: Option<String>,

    /// Status code from the organization's task status registry.
    pub status: String,

    pub priority: Priority,

    pub due_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the task is past its due date as of `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(self.due_date, Some(due) if due < today)
    }
}

/// Input for creating a task.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub organization_id: Uuid,
    pub project_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}

/// Partial update for a task. Nullable columns use nested options so a
/// caller can distinguish "leave alone" from "clear".
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<Option<Uuid>>,
    pub project_id: Option<Option<Uuid>>,
    pub due_date: Option<Option<NaiveDate>>,
}

/// Filters for task listings.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub status: Option<String>,
}

const TASK_COLUMNS: &str =
    "id, organization_id, project_id, created_by, assignee_id, title, description, \
     status, priority, due_date, created_at, updated_at";

impl Task {
    /// Creates a task.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks
                (organization_id, project_id, created_by, assignee_id, title, description,
                 status, priority, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(data.organization_id)
        .bind(data.project_id)
        .bind(data.created_by)
        .bind(data.assignee_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.due_date)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by id within an organization. The organization filter is
    /// part of the lookup, never an afterthought, so cross-tenant ids come
    /// back as None.
    pub async fn find_by_id_in_org(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE id = $1 AND organization_id = $2
            "#,
        ))
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Applies a partial update. Returns None if the task doesn't exist in
    /// this organization.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.priority.is_some() {
            bind_count += 1;
            query.push_str(&format!(", priority = ${}", bind_count));
        }
        if data.assignee_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", assignee_id = ${}", bind_count));
        }
        if data.project_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", project_id = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND organization_id = $2 RETURNING {TASK_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id).bind(organization_id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(priority) = data.priority {
            q = q.bind(priority);
        }
        if let Some(assignee_id) = data.assignee_id {
            q = q.bind(assignee_id);
        }
        if let Some(project_id) = data.project_id {
            q = q.bind(project_id);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task within an organization.
    pub async fn delete(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists tasks for an organization with optional filters, newest first.
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
        filter: TaskFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE organization_id = $1"
        );
        let mut bind_count = 1;

        if filter.project_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND project_id = ${}", bind_count));
        }
        if filter.assignee_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND assignee_id = ${}", bind_count));
        }
        if filter.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${}", bind_count));
        }

        query.push_str(&format!(
            " ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            bind_count + 1,
            bind_count + 2
        ));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(organization_id);

        if let Some(project_id) = filter.project_id {
            q = q.bind(project_id);
        }
        if let Some(assignee_id) = filter.assignee_id {
            q = q.bind(assignee_id);
        }
        if let Some(status) = filter.status {
            q = q.bind(status);
        }

        let tasks = q.bind(limit).bind(offset).fetch_all(pool).await?;

        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task(due_date: Option<NaiveDate>) -> Task {
        Task {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            project_id: None,
            created_by: None,
            assignee_id: None,
            title: "Write release notes".to_string(),
            description: None,
            status: "todo".to_string(),
            priority: Priority::Medium,
            due_date,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_is_overdue() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();

        let past = sample_task(NaiveDate::from_ymd_opt(2026, 3, 14));
        assert!(past.is_overdue(today));

        let due_today = sample_task(NaiveDate::from_ymd_opt(2026, 3, 15));
        assert!(!due_today.is_overdue(today));

        let future = sample_task(NaiveDate::from_ymd_opt(2026, 4, 1));
        assert!(!future.is_overdue(today));

        let undated = sample_task(None);
        assert!(!undated.is_overdue(today));
    }

    #[test]
    fn test_update_task_default_is_empty() {
        let update = UpdateTask::default();
        assert!(update.title.is_none());
        assert!(update.status.is_none());
        assert!(update.assignee_id.is_none());
    }

    #[test]
    fn test_task_filter_default_is_unfiltered() {
        let filter = TaskFilter::default();
        assert!(filter.project_id.is_none());
        assert!(filter.assignee_id.is_none());
        assert!(filter.status.is_none());
    }
}
