/// Role capability policy
///
/// Every permission rule in the API lives in the single match inside
/// [`allows`]. Handlers describe what is being attempted as an [`Action`]
/// (including any creator/state context the rule needs) and ask the table;
/// no handler carries its own role checks.
///
/// Policy answers "may this role do this"; whether the item is in a state
/// that permits the operation is the workflow's job and fails with a
/// conflict, not a permission error.
///
/// # Example
///
/// ```
/// use worktrack_shared::auth::policy::{allows, Action};
/// use worktrack_shared::models::user::UserRole;
///
/// assert!(allows(UserRole::ProjectManager, Action::ApproveActivity));
/// assert!(!allows(UserRole::Member, Action::ApproveActivity));
/// ```

use crate::models::user::UserRole;

/// An operation a handler wants to perform, with the context the rules
/// depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// List or read users in the organization
    ViewUsers,

    /// Invite users, change roles, activate or deactivate accounts
    ManageUsers,

    /// Read organization details and settings
    ViewOrganization,

    /// Update organization details and settings
    UpdateOrganization,

    /// Read the status registry
    ViewStatusConfigurations,

    /// Create, update, delete or toggle status registry entries
    ManageStatusConfigurations,

    /// Create a draft activity
    CreateActivity,

    /// Edit an activity's content. Drafts only, unless admin.
    UpdateActivity { is_creator: bool, is_draft: bool },

    /// Submit a draft activity for approval
    SubmitActivity { is_creator: bool },

    /// Approve a submitted activity
    ApproveActivity,

    /// Reject a submitted activity
    RejectActivity,

    /// Close an approved activity
    CloseActivity,

    /// Delete an activity. Creators may delete their own drafts; admins may
    /// delete regardless of state.
    DeleteActivity { is_creator: bool, is_draft: bool },

    /// Create a task
    CreateTask,

    /// Edit a task. `is_involved` means the caller created it or is
    /// assigned to it.
    UpdateTask { is_involved: bool },

    /// Delete a task
    DeleteTask { is_creator: bool },

    /// Assign a task to someone other than the caller
    AssignTaskToOther,
}

/// The capability table.
pub fn allows(role: UserRole, action: Action) -> bool {
    use Action::*;
    use UserRole::*;

    match action {
        ViewUsers | ViewOrganization | ViewStatusConfigurations => true,
        CreateActivity | CreateTask => true,

        ManageUsers | UpdateOrganization | ManageStatusConfigurations => role == Admin,

        UpdateActivity {
            is_creator,
            is_draft,
        } => (is_creator || role != Member) && (is_draft || role == Admin),
        SubmitActivity { is_creator } => is_creator || role != Member,

        ApproveActivity | RejectActivity | CloseActivity => {
            matches!(role, Admin | ProjectManager)
        }

        DeleteActivity { is_creator, is_draft } => (is_creator && is_draft) || role == Admin,

        UpdateTask { is_involved } => is_involved || role != Member,
        DeleteTask { is_creator } => is_creator || matches!(role, Admin | ProjectManager),
        AssignTaskToOther => matches!(role, Admin | ProjectManager),
    }
}

/// Error type for denied actions
#[derive(Debug, thiserror::Error)]
#[error("Insufficient permissions: role {} may not perform this action", .role.as_str())]
pub struct PolicyError {
    pub role: UserRole,
}

/// Checks the table and converts a denial into an error.
pub fn authorize(role: UserRole, action: Action) -> Result<(), PolicyError> {
    if allows(role, action) {
        Ok(())
    } else {
        Err(PolicyError { role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROLES: [UserRole; 4] = [
        UserRole::Admin,
        UserRole::Pmo,
        UserRole::ProjectManager,
        UserRole::Member,
    ];

    fn allowed_roles(action: Action) -> Vec<UserRole> {
        ALL_ROLES
            .iter()
            .copied()
            .filter(|role| allows(*role, action))
            .collect()
    }

    #[test]
    fn test_everyone_can_view() {
        for action in [
            Action::ViewUsers,
            Action::ViewOrganization,
            Action::ViewStatusConfigurations,
            Action::CreateActivity,
            Action::CreateTask,
        ] {
            assert_eq!(allowed_roles(action), ALL_ROLES.to_vec());
        }
    }

    #[test]
    fn test_management_is_admin_only() {
        for action in [
            Action::ManageUsers,
            Action::UpdateOrganization,
            Action::ManageStatusConfigurations,
        ] {
            assert_eq!(allowed_roles(action), vec![UserRole::Admin]);
        }
    }

    #[test]
    fn test_submit_by_creator_or_elevated_role() {
        // Creators can always submit their own drafts
        assert_eq!(
            allowed_roles(Action::SubmitActivity { is_creator: true }),
            ALL_ROLES.to_vec()
        );

        // Members cannot submit other people's drafts
        assert_eq!(
            allowed_roles(Action::SubmitActivity { is_creator: false }),
            vec![UserRole::Admin, UserRole::Pmo, UserRole::ProjectManager]
        );
    }

    #[test]
    fn test_approval_decisions_need_admin_or_project_manager() {
        for action in [
            Action::ApproveActivity,
            Action::RejectActivity,
            Action::CloseActivity,
        ] {
            assert_eq!(
                allowed_roles(action),
                vec![UserRole::Admin, UserRole::ProjectManager]
            );
        }
    }

    #[test]
    fn test_pmo_observes_but_does_not_decide() {
        assert!(allows(UserRole::Pmo, Action::SubmitActivity { is_creator: false }));
        assert!(!allows(UserRole::Pmo, Action::ApproveActivity));
        assert!(!allows(UserRole::Pmo, Action::RejectActivity));
    }

    #[test]
    fn test_update_activity_rules() {
        // Drafts: the creator or any elevated role
        assert_eq!(
            allowed_roles(Action::UpdateActivity {
                is_creator: true,
                is_draft: true,
            }),
            ALL_ROLES.to_vec()
        );
        assert_eq!(
            allowed_roles(Action::UpdateActivity {
                is_creator: false,
                is_draft: true,
            }),
            vec![UserRole::Admin, UserRole::Pmo, UserRole::ProjectManager]
        );

        // Once submitted, content is frozen for everyone but admins
        assert_eq!(
            allowed_roles(Action::UpdateActivity {
                is_creator: true,
                is_draft: false,
            }),
            vec![UserRole::Admin]
        );
    }

    #[test]
    fn test_delete_activity_rules() {
        // Creator deleting their own draft: always fine
        let own_draft = Action::DeleteActivity {
            is_creator: true,
            is_draft: true,
        };
        assert_eq!(allowed_roles(own_draft), ALL_ROLES.to_vec());

        // Creator deleting a submitted activity: admin only
        let own_submitted = Action::DeleteActivity {
            is_creator: true,
            is_draft: false,
        };
        assert_eq!(allowed_roles(own_submitted), vec![UserRole::Admin]);

        // Someone else's draft: admin only
        let other_draft = Action::DeleteActivity {
            is_creator: false,
            is_draft: true,
        };
        assert_eq!(allowed_roles(other_draft), vec![UserRole::Admin]);
    }

    #[test]
    fn test_task_rules() {
        assert_eq!(
            allowed_roles(Action::UpdateTask { is_involved: true }),
            ALL_ROLES.to_vec()
        );
        assert_eq!(
            allowed_roles(Action::UpdateTask { is_involved: false }),
            vec![UserRole::Admin, UserRole::Pmo, UserRole::ProjectManager]
        );
        assert_eq!(
            allowed_roles(Action::DeleteTask { is_creator: false }),
            vec![UserRole::Admin, UserRole::ProjectManager]
        );
        assert_eq!(
            allowed_roles(Action::AssignTaskToOther),
            vec![UserRole::Admin, UserRole::ProjectManager]
        );
    }

    #[test]
    fn test_authorize_error_names_role() {
        let err = authorize(UserRole::Member, Action::ApproveActivity).unwrap_err();
        assert!(err.to_string().contains("MEMBER"));
    }
}
