// Scripted backend used by the application tests
use crate::application::incubation_api::{ApiError, IncubationApi, Scope, endpoints};
use crate::domain::dashboard::{DateRange, Row};
use crate::domain::incubation::{Incubation, IncubationForm};
use crate::domain::user::{Contact, RoleOption, User, UserForm};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub endpoint: &'static str,
    pub user_id: Option<String>,
    pub inc_user_id: Option<String>,
    pub detail: Option<String>,
}

type Reply = (Duration, Result<Value, ApiError>);

#[derive(Default)]
pub struct MockApi {
    sticky: Mutex<HashMap<&'static str, Result<Value, ApiError>>>,
    queued: Mutex<HashMap<&'static str, VecDeque<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `value` to every call of `endpoint`
    pub fn respond(&self, endpoint: &'static str, value: Value) {
        self.sticky.lock().unwrap().insert(endpoint, Ok(value));
    }

    pub fn fail(&self, endpoint: &'static str, error: ApiError) {
        self.sticky.lock().unwrap().insert(endpoint, Err(error));
    }

    /// Reply once, after `delay`, before falling back to the sticky reply
    pub fn respond_once(&self, endpoint: &'static str, delay: Duration, value: Value) {
        self.queued
            .lock()
            .unwrap()
            .entry(endpoint)
            .or_default()
            .push_back((delay, Ok(value)));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.endpoint == endpoint)
            .collect()
    }

    pub fn transport_error(endpoint: &str) -> ApiError {
        ApiError::Transport {
            path: endpoint.to_string(),
            message: "connection refused".to_string(),
        }
    }

    async fn handle(
        &self,
        endpoint: &'static str,
        scope: Scope<'_>,
        detail: Option<String>,
    ) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(Call {
            endpoint,
            user_id: scope.user_id.map(str::to_string),
            inc_user_id: scope.inc_user_id.map(str::to_string),
            detail,
        });

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(VecDeque::pop_front);
        if let Some((delay, reply)) = queued {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            return reply;
        }

        let sticky = self.sticky.lock().unwrap().get(endpoint).cloned();
        sticky.unwrap_or_else(|| Ok(json!([])))
    }

    fn decode<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<Vec<T>, ApiError> {
        serde_json::from_value(value).map_err(|e| ApiError::Decode {
            path: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    async fn rows(&self, endpoint: &'static str, scope: Scope<'_>) -> Result<Vec<Row>, ApiError> {
        let value = self.handle(endpoint, scope, None).await?;
        Self::decode(endpoint, value)
    }

    async fn action(&self, endpoint: &'static str, actor: &str, detail: String) -> Result<(), ApiError> {
        let scope = Scope {
            user_id: Some(actor),
            inc_user_id: None,
        };
        self.handle(endpoint, scope, Some(detail)).await.map(|_| ())
    }
}

#[async_trait]
impl IncubationApi for MockApi {
    async fn stats(&self, scope: Scope<'_>) -> Result<Value, ApiError> {
        self.handle(endpoints::STATS, scope, None).await
    }

    async fn companies_by_field(&self, scope: Scope<'_>) -> Result<Vec<Row>, ApiError> {
        self.rows(endpoints::BY_FIELD, scope).await
    }

    async fn companies_by_stage(&self, scope: Scope<'_>) -> Result<Vec<Row>, ApiError> {
        self.rows(endpoints::BY_STAGE, scope).await
    }

    async fn collected_documents(
        &self,
        scope: Scope<'_>,
        range: &DateRange,
    ) -> Result<Vec<Row>, ApiError> {
        let detail = format!("{}-{}", range.from_year, range.to_year);
        let value = self.handle(endpoints::DOCUMENTS, scope, Some(detail)).await?;
        Self::decode(endpoints::DOCUMENTS, value)
    }

    async fn incubatees(&self, scope: Scope<'_>) -> Result<Vec<Row>, ApiError> {
        self.rows(endpoints::INCUBATEES, scope).await
    }

    async fn incubation_list(&self, scope: Scope<'_>) -> Result<Vec<Incubation>, ApiError> {
        let value = self.handle(endpoints::INCUBATION_LIST, scope, None).await?;
        Self::decode(endpoints::INCUBATION_LIST, value)
    }

    async fn incubation_details(&self, scope: Scope<'_>) -> Result<Vec<Incubation>, ApiError> {
        let value = self.handle(endpoints::INCUBATION_DETAILS, scope, None).await?;
        Self::decode(endpoints::INCUBATION_DETAILS, value)
    }

    async fn contacts(&self, scope: Scope<'_>) -> Result<Vec<Contact>, ApiError> {
        let value = self.handle(endpoints::CONTACTS, scope, None).await?;
        Self::decode(endpoints::CONTACTS, value)
    }

    async fn users(&self, scope: Scope<'_>) -> Result<Vec<User>, ApiError> {
        let value = self.handle(endpoints::USERS, scope, None).await?;
        Self::decode(endpoints::USERS, value)
    }

    async fn roles(&self, scope: Scope<'_>) -> Result<Vec<RoleOption>, ApiError> {
        let value = self.handle(endpoints::ROLES, scope, None).await?;
        Self::decode(endpoints::ROLES, value)
    }

    async fn incubatee_options(&self, scope: Scope<'_>) -> Result<Vec<Row>, ApiError> {
        self.rows(endpoints::INCUBATEE_OPTIONS, scope).await
    }

    async fn add_user(&self, actor: &str, form: &UserForm) -> Result<(), ApiError> {
        let detail = format!(
            "{}:{}:{:?}:{:?}",
            form.email,
            form.role_id,
            form.incubation_id,
            form.effective_incubatee_id()
        );
        self.action(endpoints::ADD_USER, actor, detail).await
    }

    async fn update_user(&self, actor: &str, user_id: i64, form: &UserForm) -> Result<(), ApiError> {
        let detail = format!("{}:{}", user_id, form.email);
        self.action(endpoints::UPDATE_USER, actor, detail).await
    }

    async fn delete_user(&self, actor: &str, user_id: i64) -> Result<(), ApiError> {
        self.action(endpoints::DELETE_USER, actor, user_id.to_string()).await
    }

    async fn add_incubation(
        &self,
        actor: &str,
        scope: Scope<'_>,
        form: &IncubationForm,
    ) -> Result<(), ApiError> {
        let detail = format!("{}:{:?}", form.name, scope.inc_user_id);
        self.action(endpoints::ADD_INCUBATION, actor, detail).await
    }

    async fn update_incubation(
        &self,
        actor: &str,
        _scope: Scope<'_>,
        existing: &Incubation,
        form: &IncubationForm,
    ) -> Result<(), ApiError> {
        let detail = format!("{}:{}:{:?}", existing.id, form.name, existing.logo_path);
        self.action(endpoints::UPDATE_INCUBATION, actor, detail).await
    }

    async fn delete_incubation(&self, actor: &str, incubation_id: i64) -> Result<(), ApiError> {
        self.action(endpoints::DELETE_INCUBATION, actor, incubation_id.to_string())
            .await
    }
}
