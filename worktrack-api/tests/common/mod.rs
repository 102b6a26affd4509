/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - Test database setup and migrations
/// - Organization and user provisioning
/// - JWT token generation
/// - API client helpers
///
/// The database-backed tests expect `DATABASE_URL` (or the `DB_*`
/// variables) to point at a disposable PostgreSQL instance.

use axum::Router;
use sqlx::PgPool;
use uuid::Uuid;
use worktrack_api::app::{build_router, AppState};
use worktrack_api::config::Config;
use worktrack_shared::auth::jwt::{create_token, Claims};
use worktrack_shared::auth::password;
use worktrack_shared::models::activity::{Activity, CreateActivity, Priority};
use worktrack_shared::models::organization::{CreateOrganization, Organization};
use worktrack_shared::models::user::{CreateUser, User, UserRole};

/// The password every provisioned test user gets.
pub const TEST_PASSWORD: &str = "Passw0rd!";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub config: Config,
    pub organization: Organization,
    pub admin: User,
    pub admin_token: String,
}

impl TestContext {
    /// Creates a new test context with a fresh organization and its admin.
    pub async fn new() -> anyhow::Result<Self> {
        if std::env::var("JWT_SECRET").is_err() {
            std::env::set_var(
                "JWT_SECRET",
                "worktrack-integration-test-secret-0123456789",
            );
        }

        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;

        // Run migrations (path relative to Cargo.toml, not this file)
        sqlx::migrate!("../worktrack-shared/migrations").run(&db).await?;

        // Provision an organization through the same bootstrap path the API
        // uses, so the status registry is seeded.
        let admin = User::create(
            &db,
            CreateUser {
                email: format!("admin-{}@example.com", Uuid::new_v4()),
                password_hash: password::hash_password(TEST_PASSWORD)?,
                name: "Test Admin".to_string(),
                role: UserRole::Member,
                organization_id: None,
            },
        )
        .await?;

        let organization = Organization::create_with_admin(
            &db,
            CreateOrganization {
                name: format!("Test Org {}", Uuid::new_v4()),
                description: None,
            },
            admin.id,
        )
        .await?
        .expect("fresh user must be able to bootstrap an organization");

        // Re-read the admin; bootstrap changed their role and organization.
        let admin = User::find_by_id(&db, admin.id)
            .await?
            .expect("admin must exist after bootstrap");

        let admin_token = mint_token(&config, &admin)?;

        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            organization,
            admin,
            admin_token,
        })
    }

    /// Returns authorization header value for the admin
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.admin_token)
    }

    /// Creates another user inside this organization with the given role,
    /// returning the user and a token for them.
    pub async fn create_member(&self, role: UserRole) -> anyhow::Result<(User, String)> {
        let user = User::create(
            &self.db,
            CreateUser {
                email: format!("user-{}@example.com", Uuid::new_v4()),
                password_hash: password::hash_password(TEST_PASSWORD)?,
                name: "Test Member".to_string(),
                role,
                organization_id: Some(self.organization.id),
            },
        )
        .await?;

        let token = mint_token(&self.config, &user)?;
        Ok((user, token))
    }

    /// Cleans up test data. Users go first because organization deletion
    /// only detaches them.
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE organization_id = $1")
            .bind(self.organization.id)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(self.organization.id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// Signs a token for `user` with the test configuration's secret.
pub fn mint_token(config: &Config, user: &User) -> anyhow::Result<String> {
    let claims = Claims::for_user(
        user,
        chrono::Duration::seconds(config.jwt.expires_in_seconds),
    );
    Ok(create_token(&claims, &config.jwt.secret)?)
}

/// Helper to create a draft activity directly through the model layer.
pub async fn create_test_activity(
    ctx: &TestContext,
    creator: &User,
    title: &str,
) -> anyhow::Result<Uuid> {
    let activity = Activity::create(
        &ctx.db,
        CreateActivity {
            organization_id: ctx.organization.id,
            project_id: None,
            created_by: Some(creator.id),
            title: title.to_string(),
            description: None,
            status: "planned".to_string(),
            priority: Priority::Medium,
            tags: vec![],
            assignees: vec![],
        },
    )
    .await?;

    Ok(activity.id)
}
