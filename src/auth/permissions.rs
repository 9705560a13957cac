//! Permission strings are `resource:action`. A grant of `resource:*` covers every
//! action on that resource and `*` covers everything.

/// Grants every permission, or every action when used after `resource:`.
pub const WILDCARD: &str = "*";

/// Common permission string constants for compile-time safety
pub mod consts {
    pub const ITEMS_READ: &str = "items:read";
    pub const ITEMS_WRITE: &str = "items:write";
    pub const ITEMS_DELETE: &str = "items:delete";

    /// Reference data: categories, units, taxes, branches, brands, currencies,
    /// departments, sections and recipes.
    pub const CATALOG_READ: &str = "catalog:read";
    pub const CATALOG_WRITE: &str = "catalog:write";

    pub const SUPPLIERS_READ: &str = "suppliers:read";
    pub const SUPPLIERS_WRITE: &str = "suppliers:write";

    pub const ORDERS_READ: &str = "orders:read";
    pub const ORDERS_WRITE: &str = "orders:write";

    pub const WASTAGE_READ: &str = "wastage:read";
    pub const WASTAGE_WRITE: &str = "wastage:write";

    pub const GALLERY_READ: &str = "gallery:read";
    pub const GALLERY_WRITE: &str = "gallery:write";
}

/// True when `granted` covers `required`.
pub fn permission_implies(granted: &str, required: &str) -> bool {
    if granted == WILDCARD || granted == required {
        return true;
    }
    match (granted.split_once(':'), required.split_once(':')) {
        (Some((g_resource, g_action)), Some((r_resource, _))) => {
            g_action == WILDCARD && g_resource == r_resource
        }
        _ => false,
    }
}

/// Shape check for custom role grants.
pub fn is_well_formed(permission: &str) -> bool {
    if permission == WILDCARD {
        return true;
    }
    match permission.split_once(':') {
        Some((resource, action)) => {
            !resource.is_empty()
                && !action.is_empty()
                && !action.contains(':')
                && resource
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c == '-' || c == '_')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("items:read", "items:read", true)]
    #[case("items:*", "items:delete", true)]
    #[case("*", "orders:write", true)]
    #[case("items:*", "itemsx:read", false)]
    #[case("items:read", "items:write", false)]
    #[case("orders:write", "orders:read", false)]
    fn implication(#[case] granted: &str, #[case] required: &str, #[case] expected: bool) {
        assert_eq!(permission_implies(granted, required), expected);
    }

    #[test]
    fn well_formed_grants() {
        assert!(is_well_formed("items:read"));
        assert!(is_well_formed("recipe-experts:*"));
        assert!(is_well_formed("*"));
        assert!(!is_well_formed("items"));
        assert!(!is_well_formed("Items:read"));
        assert!(!is_well_formed("a:b:c"));
    }
}
