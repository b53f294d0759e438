//! System roles and role-group reconciliation

use std::collections::HashSet;

pub const ROLE_SYSADMIN: &str = "SysAdmin";
pub const ROLE_LICENSE_REVIEWER: &str = "LicenseReviewer";
pub const ROLE_SUPPORT_STAFF: &str = "SupportStaff";
pub const ROLE_LIMITED_ADMIN: &str = "LimitedAdmin";
pub const ROLE_PRACTITIONER: &str = "Practitioner";
pub const ROLE_PROJECT_MANAGER: &str = "ProjectManager";
pub const ROLE_LIBRARIAN: &str = "Librarian";
pub const ROLE_READ_ONLY_SUPPORT_STAFF: &str = "ReadOnlySupportStaff";

pub const ALL_ROLES: [&str; 8] = [
    ROLE_SYSADMIN,
    ROLE_LICENSE_REVIEWER,
    ROLE_SUPPORT_STAFF,
    ROLE_LIMITED_ADMIN,
    ROLE_PRACTITIONER,
    ROLE_PROJECT_MANAGER,
    ROLE_LIBRARIAN,
    ROLE_READ_ONLY_SUPPORT_STAFF,
];

/// Name of the top-level identity-provider group whose sub-groups are the roles
pub const ROLES_GROUP: &str = "roles";

/// Empty lists are valid.
pub fn are_roles_valid(roles: &[String]) -> bool {
    roles.iter().all(|r| ALL_ROLES.contains(&r.as_str()))
}

pub fn invalid_roles_message() -> String {
    format!(
        "Error One of the roles is invalid. Must be empty or each element one of {}",
        ALL_ROLES.join(",")
    )
}

/// Group membership changes that bring a user from `current` to `desired` roles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleChanges {
    pub remove: Vec<String>,
    pub add: Vec<String>,
}

impl RoleChanges {
    /// Roles dropped from `current` are removed only where the user is
    /// actually in that group. Roles new in `desired` are always added.
    pub fn plan(current: &[String], desired: &[String], member_of: &HashSet<String>) -> Self {
        let remove = current
            .iter()
            .filter(|r| !desired.contains(r) && member_of.contains(r.as_str()))
            .cloned()
            .collect();
        let add = desired
            .iter()
            .filter(|r| !current.contains(r))
            .cloned()
            .collect();

        Self { remove, add }
    }

    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_role_validation() {
        assert!(are_roles_valid(&[]));
        assert!(are_roles_valid(&roles(&["SysAdmin", "Librarian"])));
        assert!(!are_roles_valid(&roles(&["SysAdmin", "Overlord"])));
    }

    #[test]
    fn test_invalid_message_lists_roles() {
        let message = invalid_roles_message();
        assert!(message.starts_with("Error One of the roles is invalid."));
        assert!(message.ends_with("SysAdmin,LicenseReviewer,SupportStaff,LimitedAdmin,Practitioner,ProjectManager,Librarian,ReadOnlySupportStaff"));
    }

    #[test]
    fn test_plan_set_difference() {
        let member_of: HashSet<String> = ["SysAdmin", "Librarian"].iter().map(|s| s.to_string()).collect();
        let changes = RoleChanges::plan(
            &roles(&["SysAdmin", "Librarian", "Practitioner"]),
            &roles(&["Librarian", "ProjectManager"]),
            &member_of,
        );

        // Practitioner is dropped but the user is not in that group
        assert_eq!(changes.remove, roles(&["SysAdmin"]));
        assert_eq!(changes.add, roles(&["ProjectManager"]));
    }

    #[test]
    fn test_plan_no_changes() {
        let changes = RoleChanges::plan(&roles(&["Librarian"]), &roles(&["Librarian"]), &HashSet::new());
        assert!(changes.is_empty());
    }
}
