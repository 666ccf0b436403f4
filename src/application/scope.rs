// Scope resolver - Pure mapping from identity and selection to query parameters
use crate::domain::identity::{Identity, RoleCode, TenantScope};

/// Tenant filter for every dashboard query.
///
/// A selected incubation wins regardless of role; otherwise admins see all
/// tenants and everyone else is scoped to their own id.
pub fn resolve_user_inc_id(role: Option<RoleCode>, selected_incubation: Option<i64>) -> TenantScope {
    match selected_incubation {
        Some(id) => TenantScope::SpecificTenant(id),
        None if role.is_some_and(RoleCode::is_tenant_wide) => TenantScope::AllTenants,
        None => TenantScope::OwnTenant,
    }
}

/// User id sent to list endpoints (documents, incubatees)
pub fn resolve_list_user(role: Option<RoleCode>) -> TenantScope {
    if role.is_some_and(RoleCode::is_tenant_wide) {
        TenantScope::AllTenants
    } else {
        TenantScope::OwnTenant
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedScope {
    user_id: String,
    user_inc_id: TenantScope,
    list_user: TenantScope,
}

impl ResolvedScope {
    /// `None` until a user id is known
    pub fn resolve(identity: &Identity, selected_incubation: Option<i64>) -> Option<Self> {
        let user_id = identity.user_id.clone()?;
        Some(Self {
            user_id,
            user_inc_id: resolve_user_inc_id(identity.role_id, selected_incubation),
            list_user: resolve_list_user(identity.role_id),
        })
    }

    pub fn user_inc_id(&self) -> &TenantScope {
        &self.user_inc_id
    }

    pub fn user_inc_id_wire(&self) -> String {
        self.user_inc_id.wire_value(&self.user_id)
    }

    pub fn user_id_for_list_apis(&self) -> String {
        self.list_user.wire_value(&self.user_id)
    }

    /// Stats and aggregates are always asked as the caller
    pub fn user_id_for_general_apis(&self) -> &str {
        &self.user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(user: &str, role: u32) -> Identity {
        Identity::new(Some(user.to_string()), Some(RoleCode::from_code(role)), None)
    }

    #[test]
    fn test_list_user_is_all_for_admin_roles_only() {
        for role in 0..=10 {
            let scope = ResolvedScope::resolve(&identity("77", role), None).unwrap();
            let expected = if role <= 1 { "ALL" } else { "77" };
            assert_eq!(scope.user_id_for_list_apis(), expected, "role {}", role);
        }
    }

    #[test]
    fn test_user_inc_id_defaults_by_role() {
        let platform = ResolvedScope::resolve(&identity("77", 0), None).unwrap();
        let incubator = ResolvedScope::resolve(&identity("77", 1), None).unwrap();
        let incubatee = ResolvedScope::resolve(&identity("77", 4), None).unwrap();

        assert_eq!(platform.user_inc_id_wire(), "ALL");
        assert_eq!(incubator.user_inc_id_wire(), "ALL");
        assert_eq!(incubatee.user_inc_id_wire(), "77");
        assert_eq!(incubatee.user_inc_id(), &TenantScope::OwnTenant);
    }

    #[test]
    fn test_selected_incubation_wins_for_every_role() {
        for role in [0, 1, 2, 4, 6, 9] {
            let scope = ResolvedScope::resolve(&identity("77", role), Some(31)).unwrap();
            assert_eq!(scope.user_inc_id_wire(), "31");
        }
    }

    #[test]
    fn test_general_apis_always_use_raw_user_id() {
        let scope = ResolvedScope::resolve(&identity("77", 0), Some(31)).unwrap();
        assert_eq!(scope.user_id_for_general_apis(), "77");
        assert_eq!(scope.user_id_for_list_apis(), "ALL");
    }

    #[test]
    fn test_unknown_role_is_scoped_to_own_id() {
        let identity = Identity::new(Some("5".to_string()), None, None);
        let scope = ResolvedScope::resolve(&identity, None).unwrap();
        assert_eq!(scope.user_inc_id_wire(), "5");
        assert_eq!(scope.user_id_for_list_apis(), "5");
    }

    #[test]
    fn test_no_user_means_no_scope() {
        assert!(ResolvedScope::resolve(&Identity::default(), Some(3)).is_none());
    }
}
