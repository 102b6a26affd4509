/// Activity model and database operations.
///
/// Activities are the tracked unit of work. Their execution `status` is a
/// registry-driven string (see `status_configuration`), while the approval
/// lifecycle is a typed state machine and the only enforced one.
///
/// # Approval state machine
///
/// ```text
/// draft → submitted → approved → closed
///                   → rejected
/// ```
///
/// Rejected and closed are terminal. Every transition runs as a conditional
/// UPDATE keyed on the expected current state, so two racing decisions
/// cannot both win.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE approval_state AS ENUM (
///     'draft', 'submitted', 'approved', 'rejected', 'closed'
/// );
///
/// CREATE TABLE activities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     project_id UUID REFERENCES projects(id) ON DELETE SET NULL,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status VARCHAR(64) NOT NULL DEFAULT 'planned',
///     approval_state approval_state NOT NULL DEFAULT 'draft',
///     priority priority NOT NULL DEFAULT 'medium',
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     approval_comment TEXT,
///     submitted_at TIMESTAMPTZ,
///     decided_at TIMESTAMPTZ,
///     decided_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Workflow state of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    /// Being edited by its creator; not yet visible to approvers.
    Draft,

    /// Waiting for an approval decision.
    Submitted,

    /// Accepted; may still be archived via close.
    Approved,

    /// Refused with a mandatory comment.
    Rejected,

    /// Archived after approval.
    Closed,
}

impl ApprovalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalState::Draft => "draft",
            ApprovalState::Submitted => "submitted",
            ApprovalState::Approved => "approved",
            ApprovalState::Rejected => "rejected",
            ApprovalState::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ApprovalState::Draft),
            "submitted" => Some(ApprovalState::Submitted),
            "approved" => Some(ApprovalState::Approved),
            "rejected" => Some(ApprovalState::Rejected),
            "closed" => Some(ApprovalState::Closed),
            _ => None,
        }
    }

    /// True when no further transition exists from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApprovalState::Rejected | ApprovalState::Closed)
    }

    /// Checks whether a transition to `target` is valid.
    pub fn can_transition_to(&self, target: ApprovalState) -> bool {
        match (self, target) {
            (ApprovalState::Draft, ApprovalState::Submitted) => true,

            (ApprovalState::Submitted, ApprovalState::Approved) => true,
            (ApprovalState::Submitted, ApprovalState::Rejected) => true,

            // Archival of an accepted activity.
            (ApprovalState::Approved, ApprovalState::Closed) => true,

            _ => false,
        }
    }
}

/// Importance of an activity or task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Activity row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    pub id: Uuid,

    pub organization_id: Uuid,

    pub project_id: Option<Uuid>,

    /// Creator; nullable because users are soft-disabled, not deleted, but
    /// the column follows ON DELETE SET NULL for safety.
    pub created_by: Option<Uuid>,

    pub title: String,

    pub description: Option<String>,

    /// Execution status; a name from the organization's status registry.
    pub status: String,

    pub approval_state: ApprovalState,

    pub priority: Priority,

    pub tags: Vec<String>,

    /// Approver's comment; always set on reject, optionally on approve.
    pub approval_comment: Option<String>,

    pub submitted_at: Option<DateTime<Utc>>,

    pub decided_at: Option<DateTime<Utc>>,

    pub decided_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating an activity. New activities always start in draft.
#[derive(Debug, Clone)]
pub struct CreateActivity {
    pub organization_id: Uuid,
    pub project_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub assignees: Vec<Uuid>,
}

/// Partial update for an activity's editable fields. The approval state is
/// never updated here; it only moves through the transition methods.
#[derive(Debug, Clone, Default)]
pub struct UpdateActivity {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Option<Vec<String>>,
    pub project_id: Option<Option<Uuid>>,
}

/// Filters for the organization-scoped listing.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub project_id: Option<Uuid>,
    pub approval_state: Option<ApprovalState>,
    pub status: Option<String>,
    pub assignee_id: Option<Uuid>,
}

const ACTIVITY_COLUMNS: &str = "id, organization_id, project_id, created_by, title, description, \
                                status, approval_state, priority, tags, approval_comment, \
                                submitted_at, decided_at, decided_by, created_at, updated_at";

impl Activity {
    /// Creates an activity in draft state, together with its assignee rows,
    /// in one transaction. Assignees outside the organization are dropped by
    /// the scoped insert rather than leaking across tenants.
    pub async fn create(pool: &PgPool, data: CreateActivity) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let activity = sqlx::query_as::<_, Activity>(&format!(
            r#"
            INSERT INTO activities
                (organization_id, project_id, created_by, title, description, status, priority, tags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {ACTIVITY_COLUMNS}
            "#,
        ))
        .bind(data.organization_id)
        .bind(data.project_id)
        .bind(data.created_by)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.tags)
        .fetch_one(&mut *tx)
        .await?;

        if !data.assignees.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO activity_assignees (activity_id, user_id)
                SELECT $1, u.id
                FROM users u
                WHERE u.id = ANY($2) AND u.organization_id = $3
                "#,
            )
            .bind(activity.id)
            .bind(&data.assignees)
            .bind(data.organization_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(activity)
    }

    /// Tenant-scoped lookup; activities in other organizations are
    /// indistinguishable from missing ones.
    pub async fn find_by_id_in_org(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let activity = sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = $1 AND organization_id = $2",
        ))
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(activity)
    }

    /// Applies a partial update to the editable fields. Returns None if the
    /// activity doesn't exist in this organization.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
        data: UpdateActivity,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE activities SET updated_at = NOW()");
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
        if data.tags.is_some() {
            bind_count += 1;
            query.push_str(&format!(", tags = ${}", bind_count));
        }
        if data.project_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", project_id = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND organization_id = $2 RETURNING {ACTIVITY_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Activity>(&query)
            .bind(id)
            .bind(organization_id);

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
        if let Some(tags) = data.tags {
            q = q.bind(tags);
        }
        if let Some(project_id) = data.project_id {
            q = q.bind(project_id);
        }

        let activity = q.fetch_optional(pool).await?;

        Ok(activity)
    }

    /// draft → submitted. Returns None when the activity is missing from the
    /// organization or not in draft (including a concurrent transition).
    pub async fn submit(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let activity = sqlx::query_as::<_, Activity>(&format!(
            r#"
            UPDATE activities
            SET approval_state = 'submitted',
                submitted_at = NOW(),
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2 AND approval_state = 'draft'
            RETURNING {ACTIVITY_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(activity)
    }

    /// submitted → approved. The WHERE clause makes the decision atomic: of
    /// two racing approve/reject calls, exactly one sees a row.
    pub async fn approve(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
        decided_by: Uuid,
        comment: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let activity = sqlx::query_as::<_, Activity>(&format!(
            r#"
            UPDATE activities
            SET approval_state = 'approved',
                approval_comment = $3,
                decided_at = NOW(),
                decided_by = $4,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2 AND approval_state = 'submitted'
            RETURNING {ACTIVITY_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(organization_id)
        .bind(comment)
        .bind(decided_by)
        .fetch_optional(pool)
        .await?;

        Ok(activity)
    }

    /// submitted → rejected. The comment is mandatory and recorded on the
    /// activity; handlers refuse empty comments before calling this.
    pub async fn reject(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
        decided_by: Uuid,
        comment: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let activity = sqlx::query_as::<_, Activity>(&format!(
            r#"
            UPDATE activities
            SET approval_state = 'rejected',
                approval_comment = $3,
                decided_at = NOW(),
                decided_by = $4,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2 AND approval_state = 'submitted'
            RETURNING {ACTIVITY_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(organization_id)
        .bind(comment)
        .bind(decided_by)
        .fetch_optional(pool)
        .await?;

        Ok(activity)
    }

    /// approved → closed. Archives an accepted activity.
    pub async fn close(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let activity = sqlx::query_as::<_, Activity>(&format!(
            r#"
            UPDATE activities
            SET approval_state = 'closed',
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2 AND approval_state = 'approved'
            RETURNING {ACTIVITY_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(activity)
    }

    /// Deletes an activity. Assignee rows go with it via ON DELETE CASCADE.
    /// Authorization (creator-in-draft or admin) happens in the handler.
    pub async fn delete(
        pool: &PgPool,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM activities WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists an organization's activities, newest first, with optional
    /// filters.
    pub async fn list_by_organization(
        pool: &PgPool,
        organization_id: Uuid,
        filter: ActivityFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE organization_id = $1"
        );
        let mut bind_count = 1;

        if filter.project_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND project_id = ${}", bind_count));
        }
        if filter.approval_state.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND approval_state = ${}", bind_count));
        }
        if filter.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${}", bind_count));
        }
        if filter.assignee_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM activity_assignees aa \
                 WHERE aa.activity_id = activities.id AND aa.user_id = ${})",
                bind_count
            ));
        }

        query.push_str(&format!(
            " ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            bind_count + 1,
            bind_count + 2
        ));

        let mut q = sqlx::query_as::<_, Activity>(&query).bind(organization_id);

        if let Some(project_id) = filter.project_id {
            q = q.bind(project_id);
        }
        if let Some(state) = filter.approval_state {
            q = q.bind(state);
        }
        if let Some(status) = filter.status {
            q = q.bind(status);
        }
        if let Some(assignee_id) = filter.assignee_id {
            q = q.bind(assignee_id);
        }

        let activities = q.bind(limit).bind(offset).fetch_all(pool).await?;

        Ok(activities)
    }

    /// Returns the assignee user ids for an activity.
    pub async fn assignee_ids(pool: &PgPool, activity_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM activity_assignees WHERE activity_id = $1 ORDER BY assigned_at",
        )
        .bind(activity_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Replaces the assignee set. Out-of-organization ids are dropped by the
    /// scoped insert.
    pub async fn set_assignees(
        pool: &PgPool,
        activity_id: Uuid,
        organization_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM activity_assignees WHERE activity_id = $1")
            .bind(activity_id)
            .execute(&mut *tx)
            .await?;

        if !user_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO activity_assignees (activity_id, user_id)
                SELECT $1, u.id
                FROM users u
                WHERE u.id = ANY($2) AND u.organization_id = $3
                "#,
            )
            .bind(activity_id)
            .bind(user_ids)
            .bind(organization_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_state_as_str() {
        assert_eq!(ApprovalState::Draft.as_str(), "draft");
        assert_eq!(ApprovalState::Submitted.as_str(), "submitted");
        assert_eq!(ApprovalState::Approved.as_str(), "approved");
        assert_eq!(ApprovalState::Rejected.as_str(), "rejected");
        assert_eq!(ApprovalState::Closed.as_str(), "closed");
    }

    #[test]
    fn test_approval_state_from_str_round_trip() {
        for state in [
            ApprovalState::Draft,
            ApprovalState::Submitted,
            ApprovalState::Approved,
            ApprovalState::Rejected,
            ApprovalState::Closed,
        ] {
            assert_eq!(ApprovalState::from_str(state.as_str()), Some(state));
        }
        assert_eq!(ApprovalState::from_str("pending"), None);
    }

    #[test]
    fn test_basic_flow_transitions() {
        assert!(ApprovalState::Draft.can_transition_to(ApprovalState::Submitted));
        assert!(ApprovalState::Submitted.can_transition_to(ApprovalState::Approved));
        assert!(ApprovalState::Submitted.can_transition_to(ApprovalState::Rejected));
    }

    #[test]
    fn test_decisions_require_submission() {
        assert!(!ApprovalState::Draft.can_transition_to(ApprovalState::Approved));
        assert!(!ApprovalState::Draft.can_transition_to(ApprovalState::Rejected));
    }

    #[test]
    fn test_no_reopen_or_skip_transitions() {
        assert!(!ApprovalState::Rejected.can_transition_to(ApprovalState::Draft));
        assert!(!ApprovalState::Rejected.can_transition_to(ApprovalState::Submitted));
        assert!(!ApprovalState::Approved.can_transition_to(ApprovalState::Submitted));
        assert!(!ApprovalState::Draft.can_transition_to(ApprovalState::Closed));
        assert!(!ApprovalState::Closed.can_transition_to(ApprovalState::Approved));
    }

    #[test]
    fn test_close_only_from_approved() {
        assert!(ApprovalState::Approved.can_transition_to(ApprovalState::Closed));
        assert!(!ApprovalState::Submitted.can_transition_to(ApprovalState::Closed));
        assert!(!ApprovalState::Rejected.can_transition_to(ApprovalState::Closed));
    }

    #[test]
    fn test_terminal_states() {
        assert!(ApprovalState::Rejected.is_terminal());
        assert!(ApprovalState::Closed.is_terminal());
        assert!(!ApprovalState::Draft.is_terminal());
        assert!(!ApprovalState::Submitted.is_terminal());
        assert!(!ApprovalState::Approved.is_terminal());
    }

    #[test]
    fn test_approval_state_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&ApprovalState::Submitted).unwrap(),
            "\"submitted\""
        );
        let parsed: ApprovalState = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(parsed, ApprovalState::Rejected);
    }

    #[test]
    fn test_priority_default_and_str() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Priority::Critical.as_str(), "critical");
    }
}
