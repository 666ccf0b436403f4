// Session identity domain model
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Wire sentinel meaning "every tenant"
pub const ALL_TENANTS: &str = "ALL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleCode {
    PlatformAdmin,
    IncubatorAdmin,
    IncubatorManager,
    IncubatorOperator,
    IncubateeAdmin,
    IncubateeManager,
    IncubateeOperator,
    DdiAdmin,
    DdiManager,
    Other(u32),
}

impl RoleCode {
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::PlatformAdmin,
            1 => Self::IncubatorAdmin,
            2 => Self::IncubatorManager,
            3 => Self::IncubatorOperator,
            4 => Self::IncubateeAdmin,
            5 => Self::IncubateeManager,
            6 => Self::IncubateeOperator,
            7 => Self::DdiAdmin,
            8 => Self::DdiManager,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::PlatformAdmin => 0,
            Self::IncubatorAdmin => 1,
            Self::IncubatorManager => 2,
            Self::IncubatorOperator => 3,
            Self::IncubateeAdmin => 4,
            Self::IncubateeManager => 5,
            Self::IncubateeOperator => 6,
            Self::DdiAdmin => 7,
            Self::DdiManager => 8,
            Self::Other(code) => code,
        }
    }

    /// Parse a stored role value ("0", " 4 ", ...)
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<u32>().ok().map(Self::from_code)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::PlatformAdmin => "Platform admin",
            Self::IncubatorAdmin => "Incubator admin",
            Self::IncubatorManager => "Incubator manager",
            Self::IncubatorOperator => "Incubator operator",
            Self::IncubateeAdmin => "Incubatee admin",
            Self::IncubateeManager => "Incubatee manager",
            Self::IncubateeOperator => "Incubatee operator",
            Self::DdiAdmin => "DDI admin",
            Self::DdiManager => "DDI manager",
            Self::Other(_) => "Unknown Role",
        }
    }

    /// Platform and incubator admins see tenant-wide lists
    pub fn is_tenant_wide(self) -> bool {
        matches!(self, Self::PlatformAdmin | Self::IncubatorAdmin)
    }

    /// Roles that belong to a single incubatee (startup)
    pub fn is_incubatee(self) -> bool {
        matches!(
            self,
            Self::IncubateeAdmin | Self::IncubateeManager | Self::IncubateeOperator
        )
    }
}

impl fmt::Display for RoleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for RoleCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RoleCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Ok(Self::from_code(code)),
            Raw::Text(text) => Self::parse(&text)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid role code {:?}", text))),
        }
    }
}

/// Tenant filter attached to every backend query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenantScope {
    AllTenants,
    SpecificTenant(i64),
    /// Scoped to the caller's own user id
    OwnTenant,
}

impl TenantScope {
    /// Parse a stored tenant value. `OwnTenant` is never stored, so it is never parsed.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw == ALL_TENANTS {
            return Some(Self::AllTenants);
        }
        raw.parse::<i64>().ok().map(Self::SpecificTenant)
    }

    pub fn tenant_id(&self) -> Option<i64> {
        match self {
            Self::SpecificTenant(id) => Some(*id),
            _ => None,
        }
    }

    /// Render the value sent to the backend
    pub fn wire_value(&self, own_user_id: &str) -> String {
        match self {
            Self::AllTenants => ALL_TENANTS.to_string(),
            Self::SpecificTenant(id) => id.to_string(),
            Self::OwnTenant => own_user_id.to_string(),
        }
    }
}

impl Serialize for TenantScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::AllTenants => serializer.serialize_str(ALL_TENANTS),
            Self::SpecificTenant(id) => serializer.collect_str(id),
            Self::OwnTenant => serializer.serialize_str("OWN"),
        }
    }
}

/// Normalize a raw session value: absence, blank and the literal "null" all mean no value
pub fn normalize_session_value(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty() || value == "null" || value == "undefined" {
        None
    } else {
        Some(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: Option<String>,
    pub role_id: Option<RoleCode>,
    pub inc_user_id: Option<TenantScope>,
}

impl Identity {
    pub fn new(
        user_id: Option<String>,
        role_id: Option<RoleCode>,
        inc_user_id: Option<TenantScope>,
    ) -> Self {
        let inc_user_id = Self::scope_for_role(role_id, inc_user_id);
        Self {
            user_id,
            role_id,
            inc_user_id,
        }
    }

    /// A platform admin is always scoped to every tenant, whatever was requested
    pub fn scope_for_role(
        role_id: Option<RoleCode>,
        requested: Option<TenantScope>,
    ) -> Option<TenantScope> {
        if role_id == Some(RoleCode::PlatformAdmin) {
            Some(TenantScope::AllTenants)
        } else {
            requested
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_id.is_some() && self.role_id.is_some()
    }

    pub fn has_role(&self, role: RoleCode) -> bool {
        self.role_id == Some(role)
    }

    /// Stored tenant value as sent on the wire, if any
    pub fn inc_user_wire(&self) -> Option<String> {
        let own = self.user_id.as_deref().unwrap_or_default();
        self.inc_user_id.as_ref().map(|scope| scope.wire_value(own))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_codes_round_trip_through_parse() {
        assert_eq!(RoleCode::parse("0"), Some(RoleCode::PlatformAdmin));
        assert_eq!(RoleCode::parse(" 4 "), Some(RoleCode::IncubateeAdmin));
        assert_eq!(RoleCode::parse("12"), Some(RoleCode::Other(12)));
        assert_eq!(RoleCode::parse("admin"), None);
        assert_eq!(RoleCode::IncubatorAdmin.to_string(), "1");
    }

    #[test]
    fn test_role_display_names() {
        assert_eq!(RoleCode::from_code(1).display_name(), "Incubator admin");
        assert_eq!(RoleCode::from_code(6).display_name(), "Incubatee operator");
        assert_eq!(RoleCode::from_code(8).display_name(), "DDI manager");
        assert_eq!(RoleCode::from_code(42).display_name(), "Unknown Role");
    }

    #[test]
    fn test_platform_admin_is_always_all_tenants() {
        for requested in [
            None,
            Some(TenantScope::SpecificTenant(7)),
            Some(TenantScope::AllTenants),
        ] {
            let identity = Identity::new(
                Some("10".to_string()),
                Some(RoleCode::PlatformAdmin),
                requested,
            );
            assert_eq!(identity.inc_user_id, Some(TenantScope::AllTenants));
        }

        let identity = Identity::new(
            Some("10".to_string()),
            Some(RoleCode::IncubatorAdmin),
            Some(TenantScope::SpecificTenant(7)),
        );
        assert_eq!(identity.inc_user_id, Some(TenantScope::SpecificTenant(7)));
    }

    #[test]
    fn test_tenant_scope_parse_and_wire() {
        assert_eq!(TenantScope::parse("ALL"), Some(TenantScope::AllTenants));
        assert_eq!(TenantScope::parse("15"), Some(TenantScope::SpecificTenant(15)));
        assert_eq!(TenantScope::parse("abc"), None);
        assert_eq!(TenantScope::OwnTenant.wire_value("99"), "99");
        assert_eq!(TenantScope::SpecificTenant(3).wire_value("99"), "3");
    }

    #[test]
    fn test_normalize_session_value() {
        assert_eq!(normalize_session_value(None), None);
        assert_eq!(normalize_session_value(Some("null")), None);
        assert_eq!(normalize_session_value(Some("  ")), None);
        assert_eq!(normalize_session_value(Some("42")), Some("42".to_string()));
    }

    #[test]
    fn test_role_code_deserializes_from_number_or_string() {
        let from_number: RoleCode = serde_json::from_str("5").unwrap();
        let from_text: RoleCode = serde_json::from_str("\"1\"").unwrap();
        assert_eq!(from_number, RoleCode::IncubateeManager);
        assert_eq!(from_text, RoleCode::IncubatorAdmin);
    }
}
