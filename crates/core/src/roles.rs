//! The permission vocabulary.
//!
//! These must match the seed data in `20260101000002_create_roles_and_permissions.sql`.

use std::fmt;

/// Resource names used in the `permissions` table.
pub mod resources {
    pub const APPOINTMENTS: &str = "appointments";
    pub const CUSTOMERS: &str = "customers";
    pub const USERS: &str = "users";
    pub const ROLES: &str = "roles";
}

/// Action names used in the `permissions` table.
pub mod actions {
    pub const READ: &str = "read";
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const DELETE: &str = "delete";
    pub const MANAGE: &str = "manage";
}

/// A `(resource, action)` pair checked before a handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission {
    pub resource: &'static str,
    pub action: &'static str,
}

impl Permission {
    pub const fn new(resource: &'static str, action: &'static str) -> Self {
        Self { resource, action }
    }

    pub const APPOINTMENTS_READ: Permission = Permission::new(resources::APPOINTMENTS, actions::READ);
    pub const APPOINTMENTS_CREATE: Permission =
        Permission::new(resources::APPOINTMENTS, actions::CREATE);
    pub const APPOINTMENTS_UPDATE: Permission =
        Permission::new(resources::APPOINTMENTS, actions::UPDATE);
    pub const APPOINTMENTS_DELETE: Permission =
        Permission::new(resources::APPOINTMENTS, actions::DELETE);

    pub const CUSTOMERS_READ: Permission = Permission::new(resources::CUSTOMERS, actions::READ);
    pub const CUSTOMERS_CREATE: Permission = Permission::new(resources::CUSTOMERS, actions::CREATE);
    pub const CUSTOMERS_UPDATE: Permission = Permission::new(resources::CUSTOMERS, actions::UPDATE);
    pub const CUSTOMERS_DELETE: Permission = Permission::new(resources::CUSTOMERS, actions::DELETE);

    pub const USERS_READ: Permission = Permission::new(resources::USERS, actions::READ);
    pub const USERS_MANAGE: Permission = Permission::new(resources::USERS, actions::MANAGE);

    pub const ROLES_READ: Permission = Permission::new(resources::ROLES, actions::READ);
    pub const ROLES_MANAGE: Permission = Permission::new(resources::ROLES, actions::MANAGE);
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_resource_and_action() {
        assert_eq!(Permission::APPOINTMENTS_CREATE.to_string(), "appointments:create");
        assert_eq!(Permission::ROLES_MANAGE.to_string(), "roles:manage");
    }
}
