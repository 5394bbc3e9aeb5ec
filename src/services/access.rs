use serde::Serialize;

pub(crate) const ADMIN_ROLE: &str = "Admin";
pub(crate) const LEADER_ROLE: &str = "Leader";
pub(crate) const MANAGER_ROLE: &str = "Manager";
pub(crate) const EMPLOYEE_ROLE: &str = "Employee";

/// Computed per request from the account and its role names; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct AccessFlags {
    pub(crate) is_admin: bool,
    pub(crate) is_leader: bool,
    pub(crate) has_admin_access: bool,
    pub(crate) is_employee: bool,
}

impl AccessFlags {
    pub(crate) fn derive<S: AsRef<str>>(is_superuser: bool, roles: &[S]) -> Self {
        let has_role = |name: &str| roles.iter().any(|role| role.as_ref() == name);

        let admin_role = has_role(ADMIN_ROLE);
        let leader_role = has_role(LEADER_ROLE) || has_role(MANAGER_ROLE);

        let is_admin = is_superuser || admin_role;
        let has_admin_access = is_admin || leader_role;

        Self {
            is_admin,
            is_leader: leader_role,
            has_admin_access,
            is_employee: !has_admin_access,
        }
    }
}
