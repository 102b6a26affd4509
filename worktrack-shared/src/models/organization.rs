/// Organization model and database operations.
///
/// Organizations are the tenancy boundary: every domain row carries an
/// `organization_id` and every query filters on it. An organization is
/// created once via the setup flow, which also promotes the creating user
/// to ADMIN inside the same transaction.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organizations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     settings JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::status_configuration::StatusConfiguration;

/// Typed view over the `settings` JSONB column.
///
/// Unknown keys are preserved in the raw column; this struct only describes
/// the settings the backend itself interprets. Serialized camelCase to match
/// the API's wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrganizationSettings {
    /// Where clients render the organization logo.
    pub logo_position: String,

    /// Default working hours shown on scheduling views.
    pub working_hours: WorkingHours,

    /// Whether users may self-register into this organization, or must be
    /// invited by an admin.
    pub allow_self_registration: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
}

impl Default for OrganizationSettings {
    fn default() -> Self {
        Self {
            logo_position: "left".to_string(),
            working_hours: WorkingHours::default(),
            allow_self_registration: true,
        }
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: "09:00".to_string(),
            end: "17:00".to_string(),
        }
    }
}

/// Organization row. `settings` stays raw JSONB so client-side keys survive
/// round trips; use [`Organization::parsed_settings`] for the typed view.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,

    pub name: String,

    pub description: Option<String>,

    /// The user who ran the setup flow.
    pub created_by: Option<Uuid>,

    pub settings: JsonValue,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// Parses the JSONB settings into the typed view, falling back to
    /// defaults for missing or malformed fields.
    pub fn parsed_settings(&self) -> OrganizationSettings {
        serde_json::from_value(self.settings.clone()).unwrap_or_default()
    }
}

/// Input for creating an organization.
#[derive(Debug, Clone)]
pub struct CreateOrganization {
    pub name: String,
    pub description: Option<String>,
}

/// Partial update for an organization. `settings` is merged into the
/// existing JSONB, not replaced.
#[derive(Debug, Clone, Default)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub settings: Option<JsonValue>,
}

const ORGANIZATION_COLUMNS: &str =
    "id, name, description, created_by, settings, created_at, updated_at";

impl Organization {
    /// Creates an organization and binds `creator_id` to it as ADMIN, in one
    /// transaction. Also seeds the default status configurations so the
    /// registry is never empty for a fresh tenant.
    ///
    /// Returns `None` without side effects if the creator already belongs to
    /// an organization; the guard lives in the UPDATE's WHERE clause so two
    /// concurrent setup calls cannot both succeed.
    pub async fn create_with_admin(
        pool: &PgPool,
        data: CreateOrganization,
        creator_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let settings = serde_json::to_value(OrganizationSettings::default())
            .unwrap_or_else(|_| serde_json::json!({}));

        let organization = sqlx::query_as::<_, Organization>(&format!(
            r#"
            INSERT INTO organizations (name, description, created_by, settings)
            VALUES ($1, $2, $3, $4)
            RETURNING {ORGANIZATION_COLUMNS}
            "#,
        ))
        .bind(data.name)
        .bind(data.description)
        .bind(creator_id)
        .bind(settings)
        .fetch_one(&mut *tx)
        .await?;

        let bound = sqlx::query(
            r#"
            UPDATE users
            SET organization_id = $1, role = 'admin', updated_at = NOW()
            WHERE id = $2 AND organization_id IS NULL
            "#,
        )
        .bind(organization.id)
        .bind(creator_id)
        .execute(&mut *tx)
        .await?;

        if bound.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        StatusConfiguration::seed_defaults(&mut tx, organization.id).await?;

        tx.commit().await?;

        Ok(Some(organization))
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let organization = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(organization)
    }

    /// Applies a partial update. Settings are merged with the `||` JSONB
    /// operator so unrelated keys survive.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateOrganization,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE organizations SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.settings.is_some() {
            bind_count += 1;
            query.push_str(&format!(", settings = settings || ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {ORGANIZATION_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Organization>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(settings) = data.settings {
            q = q.bind(settings);
        }

        let organization = q.fetch_optional(pool).await?;

        Ok(organization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_defaults() {
        let settings = OrganizationSettings::default();
        assert_eq!(settings.logo_position, "left");
        assert_eq!(settings.working_hours.start, "09:00");
        assert_eq!(settings.working_hours.end, "17:00");
        assert!(settings.allow_self_registration);
    }

    #[test]
    fn test_settings_parse_partial_json() {
        let parsed: OrganizationSettings =
            serde_json::from_value(json!({ "logoPosition": "center" })).unwrap();
        assert_eq!(parsed.logo_position, "center");
        assert_eq!(parsed.working_hours, WorkingHours::default());
    }

    #[test]
    fn test_parsed_settings_falls_back_on_malformed_json() {
        let organization = Organization {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            description: None,
            created_by: None,
            settings: json!({ "workingHours": "not-an-object" }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(organization.parsed_settings(), OrganizationSettings::default());
    }

    #[test]
    fn test_settings_round_trip_camel_case() {
        let settings = OrganizationSettings::default();
        let value = serde_json::to_value(&settings).unwrap();
        assert!(value.get("logoPosition").is_some());
        assert!(value.get("allowSelfRegistration").is_some());
    }
}
