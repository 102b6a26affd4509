/// Database models for WorkTrack
///
/// This module contains all database models and their CRUD operations.
/// Every query that touches organization-owned data takes the organization
/// id as part of its WHERE clause; tenant isolation lives here, not in the
/// handlers.
///
/// # Models
///
/// - `user`: User accounts, roles and lifecycle
/// - `organization`: Tenants, their settings and the bootstrap transaction
/// - `activity`: Trackable work with the approval workflow
/// - `task`: Lightweight assignable work items
/// - `project`: Groupings that activities and tasks attach to
/// - `status_configuration`: Per-organization status registry
///
/// # Example
///
/// ```no_run
/// use worktrack_shared::models::user::{User, CreateUser, UserRole};
/// use worktrack_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$2b$10$...".to_string(),
///     name: "Jane Doe".to_string(),
///     role: UserRole::Member,
///     organization_id: None,
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod activity;
pub mod organization;
pub mod project;
pub mod status_configuration;
pub mod task;
pub mod user;
