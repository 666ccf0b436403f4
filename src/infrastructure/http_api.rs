// HTTP implementation of the incubation backend port
use crate::application::incubation_api::{ApiError, IncubationApi, Scope, endpoints};
use crate::application::session_store::{SessionStore, TOKEN_KEY};
use crate::domain::dashboard::{DateRange, Row};
use crate::domain::incubation::{Incubation, IncubationForm};
use crate::domain::user::{Contact, RoleOption, User, UserForm};
use crate::infrastructure::config::ApiSettings;
use crate::infrastructure::envelope::{check_status, decode_envelope, decode_list, decode_rows, message_of};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;

/// Body key for the tenant filter. The backend is not consistent about it.
const USER_INC_ID: &str = "userIncId";
const INC_USER_ID: &str = "incUserId";

const ADMIN_STATE_ACTIVE: &str = "1";

pub struct HttpIncubationApi {
    client: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

fn scope_body(scope: Scope<'_>, tenant_key: &str) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("userId".to_string(), json!(scope.user_id));
    body.insert(tenant_key.to_string(), json!(scope.inc_user_id));
    body
}

/// Numeric ids for the incubation write endpoints, with the backend's defaults
fn numeric_scope_body(scope: Scope<'_>) -> Value {
    let parse = |raw: Option<&str>| raw.and_then(|v| v.trim().parse::<i64>().ok());
    json!({
        "userId": parse(scope.user_id).unwrap_or(1),
        "userIncId": parse(scope.inc_user_id).unwrap_or(0),
    })
}

fn query_string(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn incubation_params(form: &IncubationForm) -> Vec<(&'static str, String)> {
    vec![
        ("incubationsname", form.name.clone()),
        ("incubationshortname", form.short_name.clone()),
        ("incubationsemail", form.email.clone()),
        ("incubationswebsite", form.website.clone()),
        ("incubationsaddress", form.address.clone()),
        ("incubationsfounders", form.founders.clone()),
        ("incubationsnooffounders", form.founder_count.clone()),
    ]
}

fn user_params(form: &UserForm) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("usersemail", form.email.clone()),
        ("userspassword", form.password.clone()),
        ("usersname", form.name.clone()),
        ("usersrolesrecid", form.role_id.to_string()),
        ("usersadminstate", ADMIN_STATE_ACTIVE.to_string()),
        (
            "usersincubationsrecid",
            form.incubation_id.map(|id| id.to_string()).unwrap_or_default(),
        ),
    ];
    if let Some(incubatee) = form.effective_incubatee_id() {
        params.push(("usersincubateesrecid", incubatee.to_string()));
    }
    params
}

impl HttpIncubationApi {
    pub fn new(settings: &ApiSettings, session: Arc<dyn SessionStore>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: format!(
                "{}{}",
                settings.base_url.trim_end_matches('/'),
                settings.context_path.trim_end_matches('/')
            ),
            session,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn send(&self, endpoint: &str, request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
        let request = match self.session.get(TOKEN_KEY) {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        tracing::debug!(endpoint, "calling backend");
        let response = request.send().await.map_err(|e| ApiError::Transport {
            path: endpoint.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|value| message_of(&value))
                .unwrap_or_default();
            return Err(ApiError::Status {
                path: endpoint.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        response.json::<Value>().await.map_err(|e| ApiError::Decode {
            path: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    async fn post_json(&self, endpoint: &str, body: Map<String, Value>) -> Result<Value, ApiError> {
        let request = self.client.post(self.url(endpoint)).json(&body);
        self.send(endpoint, request).await
    }

    /// Write endpoints take their fields in the query string
    async fn post_action(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<(), ApiError> {
        let url = format!("{}?{}", self.url(endpoint), query_string(params));
        let request = match body {
            Some(body) => self.client.post(url).json(&body),
            None => self
                .client
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded"),
        };

        let response = self.send(endpoint, request).await?;
        check_status(endpoint, &response)
    }
}

#[async_trait]
impl IncubationApi for HttpIncubationApi {
    async fn stats(&self, scope: Scope<'_>) -> Result<Value, ApiError> {
        let body = self
            .post_json(endpoints::STATS, scope_body(scope, USER_INC_ID))
            .await?;
        decode_envelope(endpoints::STATS, body)
    }

    async fn companies_by_field(&self, scope: Scope<'_>) -> Result<Vec<Row>, ApiError> {
        let body = self
            .post_json(endpoints::BY_FIELD, scope_body(scope, USER_INC_ID))
            .await?;
        decode_rows(endpoints::BY_FIELD, body)
    }

    async fn companies_by_stage(&self, scope: Scope<'_>) -> Result<Vec<Row>, ApiError> {
        let body = self
            .post_json(endpoints::BY_STAGE, scope_body(scope, USER_INC_ID))
            .await?;
        decode_rows(endpoints::BY_STAGE, body)
    }

    async fn collected_documents(
        &self,
        scope: Scope<'_>,
        range: &DateRange,
    ) -> Result<Vec<Row>, ApiError> {
        let mut request = scope_body(scope, INC_USER_ID);
        request.insert("startYear".to_string(), json!(range.from_year));
        request.insert("endYear".to_string(), json!(range.to_year));

        let body = self.post_json(endpoints::DOCUMENTS, request).await?;
        decode_rows(endpoints::DOCUMENTS, body)
    }

    async fn incubatees(&self, scope: Scope<'_>) -> Result<Vec<Row>, ApiError> {
        let body = self
            .post_json(endpoints::INCUBATEES, scope_body(scope, INC_USER_ID))
            .await?;
        decode_rows(endpoints::INCUBATEES, body)
    }

    async fn incubation_list(&self, scope: Scope<'_>) -> Result<Vec<Incubation>, ApiError> {
        let body = self
            .post_json(endpoints::INCUBATION_LIST, scope_body(scope, USER_INC_ID))
            .await?;
        decode_list(endpoints::INCUBATION_LIST, body)
    }

    async fn incubation_details(&self, scope: Scope<'_>) -> Result<Vec<Incubation>, ApiError> {
        let body = self
            .post_json(endpoints::INCUBATION_DETAILS, scope_body(scope, USER_INC_ID))
            .await?;
        decode_list(endpoints::INCUBATION_DETAILS, body)
    }

    async fn contacts(&self, scope: Scope<'_>) -> Result<Vec<Contact>, ApiError> {
        let body = self
            .post_json(endpoints::CONTACTS, scope_body(scope, INC_USER_ID))
            .await?;
        decode_list(endpoints::CONTACTS, body)
    }

    async fn users(&self, scope: Scope<'_>) -> Result<Vec<User>, ApiError> {
        let body = self
            .post_json(endpoints::USERS, scope_body(scope, USER_INC_ID))
            .await?;
        decode_list(endpoints::USERS, body)
    }

    async fn roles(&self, scope: Scope<'_>) -> Result<Vec<RoleOption>, ApiError> {
        let body = self
            .post_json(endpoints::ROLES, scope_body(scope, INC_USER_ID))
            .await?;
        decode_list(endpoints::ROLES, body)
    }

    async fn incubatee_options(&self, scope: Scope<'_>) -> Result<Vec<Row>, ApiError> {
        let body = self
            .post_json(endpoints::INCUBATEE_OPTIONS, scope_body(scope, INC_USER_ID))
            .await?;
        decode_rows(endpoints::INCUBATEE_OPTIONS, body)
    }

    async fn add_user(&self, actor: &str, form: &UserForm) -> Result<(), ApiError> {
        let mut params = user_params(form);
        params.push(("userscreatedby", actor.to_string()));
        params.push(("usersmodifiedby", actor.to_string()));
        self.post_action(endpoints::ADD_USER, &params, None).await
    }

    async fn update_user(&self, actor: &str, user_id: i64, form: &UserForm) -> Result<(), ApiError> {
        let mut params = user_params(form);
        params.push(("usersmodifiedby", actor.to_string()));
        params.push(("usersrecid", user_id.to_string()));
        self.post_action(endpoints::UPDATE_USER, &params, None).await
    }

    async fn delete_user(&self, actor: &str, user_id: i64) -> Result<(), ApiError> {
        let params = [
            ("usersmodifiedby", actor.to_string()),
            ("usersrecid", user_id.to_string()),
        ];
        self.post_action(endpoints::DELETE_USER, &params, None).await
    }

    async fn add_incubation(
        &self,
        actor: &str,
        scope: Scope<'_>,
        form: &IncubationForm,
    ) -> Result<(), ApiError> {
        let mut params = incubation_params(form);
        params.push(("incubationslogopath", String::new()));
        params.push(("incubationsadminstate", ADMIN_STATE_ACTIVE.to_string()));
        params.push(("incubationscreatedby", actor.to_string()));
        params.push(("incubationsmodifiedby", actor.to_string()));
        self.post_action(endpoints::ADD_INCUBATION, &params, Some(numeric_scope_body(scope)))
            .await
    }

    async fn update_incubation(
        &self,
        actor: &str,
        scope: Scope<'_>,
        existing: &Incubation,
        form: &IncubationForm,
    ) -> Result<(), ApiError> {
        let mut params = vec![("incubationsrecid", existing.id.to_string())];
        params.extend(incubation_params(form));
        params.push((
            "incubationslogopath",
            existing.logo_path.clone().unwrap_or_default(),
        ));
        params.push(("incubationsmodifiedby", actor.to_string()));
        params.push(("incubationsadminstate", ADMIN_STATE_ACTIVE.to_string()));
        self.post_action(endpoints::UPDATE_INCUBATION, &params, Some(numeric_scope_body(scope)))
            .await
    }

    async fn delete_incubation(&self, actor: &str, incubation_id: i64) -> Result<(), ApiError> {
        let params = [
            ("incubationsmodifiedby", actor.to_string()),
            ("incubationsrecid", incubation_id.to_string()),
        ];
        self.post_action(endpoints::DELETE_INCUBATION, &params, None).await
    }
}
