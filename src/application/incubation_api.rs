// Port for the incubation backend REST API
use crate::domain::dashboard::{DateRange, Row};
use crate::domain::incubation::{Incubation, IncubationForm};
use crate::domain::user::{Contact, RoleOption, User, UserForm};
use async_trait::async_trait;
use serde_json::Value;

/// Resource paths, relative to the API context path
pub mod endpoints {
    pub const STATS: &str = "/resources/generic/getstatscom";
    pub const BY_FIELD: &str = "/resources/generic/getcombyfield";
    pub const BY_STAGE: &str = "/resources/generic/getcombystage";
    pub const DOCUMENTS: &str = "/resources/generic/getcollecteddocsdash";
    pub const INCUBATEES: &str = "/resources/generic/getincubatessdash";
    pub const INCUBATION_LIST: &str = "/resources/generic/getincubationlist";
    pub const INCUBATION_DETAILS: &str = "/resources/generic/getincubationdetails";
    pub const CONTACTS: &str = "/resources/generic/getspocs";
    pub const USERS: &str = "/resources/generic/getusers";
    pub const ROLES: &str = "/resources/generic/getrolelist";
    pub const INCUBATEE_OPTIONS: &str = "/resources/generic/getinclist";
    pub const ADD_USER: &str = "/addUser";
    pub const UPDATE_USER: &str = "/updateUser";
    pub const DELETE_USER: &str = "/deleteUser";
    pub const ADD_INCUBATION: &str = "/addIncubation";
    pub const UPDATE_INCUBATION: &str = "/updateIncubation";
    pub const DELETE_INCUBATION: &str = "/deleteIncubation";
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Network or transport failure
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },
    /// HTTP or envelope status other than success
    #[error("{path} returned status {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },
    /// Body carries no payload at any known location
    #[error("unexpected response shape from {path}")]
    UnexpectedShape { path: String },
    /// Payload found but records do not match the expected type
    #[error("failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },
}

impl ApiError {
    /// Message suitable for an end user
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Transport { message, .. } => format!("Network error: {}", message),
            Self::Status { message, .. } if !message.is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Who is asking and for which tenant, as sent in every JSON body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope<'a> {
    pub user_id: Option<&'a str>,
    pub inc_user_id: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn new(user_id: &'a str, inc_user_id: &'a str) -> Self {
        Self {
            user_id: Some(user_id),
            inc_user_id: Some(inc_user_id),
        }
    }
}

#[async_trait]
pub trait IncubationApi: Send + Sync {
    /// Aggregate company statistics (`/generic/getstatscom`)
    async fn stats(&self, scope: Scope<'_>) -> Result<Value, ApiError>;

    /// Companies grouped by field (`/generic/getcombyfield`)
    async fn companies_by_field(&self, scope: Scope<'_>) -> Result<Vec<Row>, ApiError>;

    /// Companies grouped by stage (`/generic/getcombystage`)
    async fn companies_by_stage(&self, scope: Scope<'_>) -> Result<Vec<Row>, ApiError>;

    /// Collected documents for the year range (`/generic/getcollecteddocsdash`)
    async fn collected_documents(
        &self,
        scope: Scope<'_>,
        range: &DateRange,
    ) -> Result<Vec<Row>, ApiError>;

    /// Incubatees shown on the dashboard (`/generic/getincubatessdash`)
    async fn incubatees(&self, scope: Scope<'_>) -> Result<Vec<Row>, ApiError>;

    async fn incubation_list(&self, scope: Scope<'_>) -> Result<Vec<Incubation>, ApiError>;

    /// Always a collection, even when one tenant is requested
    async fn incubation_details(&self, scope: Scope<'_>) -> Result<Vec<Incubation>, ApiError>;

    async fn contacts(&self, scope: Scope<'_>) -> Result<Vec<Contact>, ApiError>;

    async fn users(&self, scope: Scope<'_>) -> Result<Vec<User>, ApiError>;

    async fn roles(&self, scope: Scope<'_>) -> Result<Vec<RoleOption>, ApiError>;

    /// Incubatee dropdown entries (`/generic/getinclist`)
    async fn incubatee_options(&self, scope: Scope<'_>) -> Result<Vec<Row>, ApiError>;

    async fn add_user(&self, actor: &str, form: &UserForm) -> Result<(), ApiError>;

    async fn update_user(&self, actor: &str, user_id: i64, form: &UserForm) -> Result<(), ApiError>;

    async fn delete_user(&self, actor: &str, user_id: i64) -> Result<(), ApiError>;

    async fn add_incubation(
        &self,
        actor: &str,
        scope: Scope<'_>,
        form: &IncubationForm,
    ) -> Result<(), ApiError>;

    async fn update_incubation(
        &self,
        actor: &str,
        scope: Scope<'_>,
        existing: &Incubation,
        form: &IncubationForm,
    ) -> Result<(), ApiError>;

    async fn delete_incubation(&self, actor: &str, incubation_id: i64) -> Result<(), ApiError>;
}
