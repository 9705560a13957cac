/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Built-in roles and their permissions. Custom roles stored in the `roles`
 * table extend this set; built-in names cannot be redefined.
 */

use lazy_static::lazy_static;
use std::collections::HashMap;

use super::permissions::{consts::*, WILDCARD};

pub const MASTER_ADMIN: &str = "master_admin";
pub const ADMIN: &str = "admin";
pub const MANAGER: &str = "manager";
pub const USER: &str = "user";

/// Role definition with associated permissions
#[derive(Debug, Clone)]
pub struct Role {
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: Vec<&'static str>,
}

lazy_static! {
    pub static ref ROLES: HashMap<&'static str, Role> = {
        let mut roles = HashMap::new();

        // Everything, including user and role management.
        roles.insert(
            MASTER_ADMIN,
            Role {
                name: MASTER_ADMIN,
                description: "Owner account with unrestricted access",
                permissions: vec![WILDCARD],
            },
        );

        roles.insert(
            ADMIN,
            Role {
                name: ADMIN,
                description: "Administrator for all back-office data",
                permissions: vec![
                    "items:*",
                    "catalog:*",
                    "suppliers:*",
                    "orders:*",
                    "wastage:*",
                    "gallery:*",
                ],
            },
        );

        roles.insert(
            MANAGER,
            Role {
                name: MANAGER,
                description: "Branch manager maintaining the catalog and operations",
                permissions: vec![
                    ITEMS_READ,
                    ITEMS_WRITE,
                    CATALOG_READ,
                    CATALOG_WRITE,
                    SUPPLIERS_READ,
                    SUPPLIERS_WRITE,
                    ORDERS_READ,
                    ORDERS_WRITE,
                    WASTAGE_READ,
                    WASTAGE_WRITE,
                    GALLERY_READ,
                    GALLERY_WRITE,
                ],
            },
        );

        roles.insert(
            USER,
            Role {
                name: USER,
                description: "Staff member: reads the catalog, raises orders and wastage",
                permissions: vec![
                    ITEMS_READ,
                    CATALOG_READ,
                    SUPPLIERS_READ,
                    ORDERS_READ,
                    ORDERS_WRITE,
                    WASTAGE_READ,
                    WASTAGE_WRITE,
                    GALLERY_READ,
                ],
            },
        );

        roles
    };
}

pub fn is_builtin_role(name: &str) -> bool {
    ROLES.contains_key(name)
}

/// Permissions of a built-in role, `None` for anything else.
pub fn builtin_permissions(name: &str) -> Option<Vec<String>> {
    ROLES
        .get(name)
        .map(|role| role.permissions.iter().map(|p| p.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::permission_implies;

    fn grants(role: &str, required: &str) -> bool {
        builtin_permissions(role)
            .unwrap_or_default()
            .iter()
            .any(|p| permission_implies(p, required))
    }

    #[test]
    fn role_table_matches_responsibilities() {
        assert!(grants(MASTER_ADMIN, "users:write"));
        assert!(grants(ADMIN, ITEMS_DELETE));
        assert!(!grants(ADMIN, "users:read"));
        assert!(grants(MANAGER, CATALOG_WRITE));
        assert!(!grants(MANAGER, ITEMS_DELETE));
        assert!(grants(USER, ORDERS_WRITE));
        assert!(!grants(USER, ITEMS_WRITE));
    }

    #[test]
    fn unknown_roles_are_not_builtin() {
        assert!(is_builtin_role("manager"));
        assert!(!is_builtin_role("chef"));
        assert!(builtin_permissions("chef").is_none());
    }
}
