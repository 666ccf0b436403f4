// User account domain model
use crate::domain::identity::RoleCode;
use crate::domain::table::{SortKey, TableRow};
use crate::domain::wire;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "usersrecid", deserialize_with = "wire::id")]
    pub id: i64,
    #[serde(rename = "usersname", default, deserialize_with = "wire::opt_text")]
    pub name: Option<String>,
    #[serde(rename = "usersemail", default, deserialize_with = "wire::opt_text")]
    pub email: Option<String>,
    #[serde(rename = "usersrolesrecid", default, deserialize_with = "wire::opt_id")]
    pub role_id: Option<i64>,
    #[serde(rename = "usersincubationsrecid", default, deserialize_with = "wire::opt_id")]
    pub incubation_id: Option<i64>,
    #[serde(rename = "usersincubateesrecid", default, deserialize_with = "wire::opt_id")]
    pub incubatee_id: Option<i64>,
    #[serde(rename = "userscreatedtime", default, deserialize_with = "wire::opt_text")]
    pub created_time: Option<String>,
    #[serde(rename = "usersmodifiedtime", default, deserialize_with = "wire::opt_text")]
    pub modified_time: Option<String>,
    #[serde(rename = "userscreatedby", default, deserialize_with = "wire::opt_text")]
    pub created_by: Option<String>,
    #[serde(rename = "usersmodifiedby", default, deserialize_with = "wire::opt_text")]
    pub modified_by: Option<String>,
}

impl User {
    pub fn role(&self) -> Option<RoleCode> {
        self.role_id
            .and_then(|code| u32::try_from(code).ok())
            .map(RoleCode::from_code)
    }

    pub fn role_name(&self) -> &'static str {
        self.role()
            .map(RoleCode::display_name)
            .unwrap_or("Unknown Role")
    }
}

impl TableRow for User {
    fn matches(&self, query: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(query))
    }

    fn sort_key(&self, column: &str) -> Option<SortKey> {
        let key = match column {
            "usersname" => SortKey::text(self.name.as_deref()),
            "usersemail" => SortKey::text(self.email.as_deref()),
            "usersrolesrecid" => SortKey::text(Some(self.role_name())),
            "userscreatedtime" => SortKey::time(self.created_time.as_deref()),
            "usersmodifiedtime" => SortKey::time(self.modified_time.as_deref()),
            "userscreatedby" => SortKey::text(self.created_by.as_deref()),
            "usersmodifiedby" => SortKey::text(self.modified_by.as_deref()),
            _ => return None,
        };
        Some(key)
    }
}

/// Role dropdown entry; `text` is rewritten to the console's display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleOption {
    #[serde(deserialize_with = "wire::id")]
    pub value: i64,
    #[serde(default)]
    pub text: String,
}

impl RoleOption {
    pub fn with_display_name(mut self) -> Self {
        self.text = u32::try_from(self.value)
            .map(|code| RoleCode::from_code(code).display_name())
            .unwrap_or("Unknown Role")
            .to_string();
        self
    }
}

/// Add/edit form for a user account
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserForm {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role_id: u32,
    #[serde(default)]
    pub incubation_id: Option<i64>,
    #[serde(default)]
    pub incubatee_id: Option<i64>,
}

impl UserForm {
    /// Only incubatee roles may be attached to an incubatee
    pub fn effective_incubatee_id(&self) -> Option<i64> {
        if RoleCode::from_code(self.role_id).is_incubatee() {
            self.incubatee_id
        } else {
            None
        }
    }
}

/// Single point of contact for a startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(rename = "usersrecid", deserialize_with = "wire::id")]
    pub id: i64,
    #[serde(rename = "usersname", default, deserialize_with = "wire::opt_text")]
    pub name: Option<String>,
    #[serde(rename = "usersemail", default, deserialize_with = "wire::opt_text")]
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(value: serde_json::Value) -> User {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_user_role_name() {
        let admin = user(json!({"usersrecid": 1, "usersname": "Ravi", "usersrolesrecid": "1"}));
        assert_eq!(admin.role_name(), "Incubator admin");

        let unknown = user(json!({"usersrecid": 2, "usersname": "Meena"}));
        assert_eq!(unknown.role_name(), "Unknown Role");
    }

    #[test]
    fn test_role_sort_uses_display_name() {
        let operator = user(json!({"usersrecid": 1, "usersrolesrecid": 6}));
        let admin = user(json!({"usersrecid": 2, "usersrolesrecid": 4}));
        assert_eq!(
            operator.sort_key("usersrolesrecid"),
            Some(SortKey::Text("Incubatee operator".to_string()))
        );
        assert_eq!(
            admin.sort_key("usersrolesrecid"),
            Some(SortKey::Text("Incubatee admin".to_string()))
        );
        assert_eq!(admin.sort_key("unknown"), None);
    }

    #[test]
    fn test_role_option_display_name() {
        let option: RoleOption = serde_json::from_value(json!({"value": 5, "text": "mgr"})).unwrap();
        assert_eq!(option.with_display_name().text, "Incubatee manager");
    }

    #[test]
    fn test_incubatee_only_kept_for_incubatee_roles() {
        let mut form = UserForm {
            email: "a@b.c".to_string(),
            password: "secret".to_string(),
            name: "Asha".to_string(),
            role_id: 5,
            incubation_id: Some(1),
            incubatee_id: Some(9),
        };
        assert_eq!(form.effective_incubatee_id(), Some(9));

        form.role_id = 2;
        assert_eq!(form.effective_incubatee_id(), None);
    }
}
