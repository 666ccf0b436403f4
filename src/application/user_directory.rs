// User directory - Listing and managing user accounts for the admin console
use crate::application::incubation_api::{ApiError, IncubationApi, Scope};
use crate::domain::dashboard::Row;
use crate::domain::identity::{ALL_TENANTS, Identity, RoleCode};
use crate::domain::incubation::Incubation;
use crate::domain::user::{RoleOption, User, UserForm};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Actor recorded on writes when nobody is signed in
const SYSTEM_ACTOR: &str = "system";

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0}")]
    Invalid(&'static str),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Options shown in the add/edit user form
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserDropdowns {
    pub roles: Vec<RoleOption>,
    pub incubatees: Vec<Row>,
    pub incubations: Vec<Incubation>,
}

#[derive(Clone)]
pub struct UserDirectory {
    api: Arc<dyn IncubationApi>,
}

fn tenant_for(identity: &Identity, selected_incubation: Option<i64>) -> Option<String> {
    selected_incubation
        .map(|id| id.to_string())
        .or_else(|| identity.inc_user_wire())
}

fn actor(identity: &Identity) -> &str {
    identity.user_id.as_deref().unwrap_or(SYSTEM_ACTOR)
}

fn validate(form: &UserForm, require_password: bool) -> Result<(), DirectoryError> {
    if form.name.trim().is_empty() {
        return Err(DirectoryError::Invalid("Name is required"));
    }
    if !form.email.contains('@') {
        return Err(DirectoryError::Invalid("A valid email is required"));
    }
    if require_password && form.password.is_empty() {
        return Err(DirectoryError::Invalid("Password is required"));
    }
    Ok(())
}

impl UserDirectory {
    pub fn new(api: Arc<dyn IncubationApi>) -> Self {
        Self { api }
    }

    pub async fn list_users(
        &self,
        identity: &Identity,
        selected_incubation: Option<i64>,
    ) -> Result<Vec<User>, ApiError> {
        let tenant = tenant_for(identity, selected_incubation);
        self.api
            .users(Scope {
                user_id: identity.user_id.as_deref(),
                inc_user_id: tenant.as_deref(),
            })
            .await
    }

    /// Role options, relabelled with the console's display names
    pub async fn roles(
        &self,
        identity: &Identity,
        selected_incubation: Option<i64>,
    ) -> Result<Vec<RoleOption>, ApiError> {
        let tenant = tenant_for(identity, selected_incubation);
        let roles = self
            .api
            .roles(Scope {
                user_id: identity.user_id.as_deref(),
                inc_user_id: tenant.as_deref(),
            })
            .await?;
        Ok(roles.into_iter().map(RoleOption::with_display_name).collect())
    }

    pub async fn incubatee_options(
        &self,
        identity: &Identity,
        incubation_id: Option<i64>,
    ) -> Result<Vec<Row>, ApiError> {
        let tenant = tenant_for(identity, incubation_id);
        self.api
            .incubatee_options(Scope {
                user_id: identity.user_id.as_deref(),
                inc_user_id: tenant.as_deref(),
            })
            .await
    }

    /// Only the platform admin picks an incubation; everyone else gets an empty list
    pub async fn incubation_options(&self, identity: &Identity) -> Result<Vec<Incubation>, ApiError> {
        if !identity.has_role(RoleCode::PlatformAdmin) {
            return Ok(Vec::new());
        }
        self.api
            .incubation_list(Scope {
                user_id: identity.user_id.as_deref(),
                inc_user_id: Some(ALL_TENANTS),
            })
            .await
    }

    /// Load every dropdown at once. A failed list is logged and left empty.
    pub async fn dropdowns(&self, identity: &Identity, selected_incubation: Option<i64>) -> UserDropdowns {
        let (roles, incubatees, incubations) = tokio::join!(
            self.roles(identity, selected_incubation),
            self.incubatee_options(identity, selected_incubation),
            self.incubation_options(identity),
        );

        UserDropdowns {
            roles: roles.unwrap_or_else(|e| {
                error!(error = %e, "failed to load roles");
                Vec::new()
            }),
            incubatees: incubatees.unwrap_or_else(|e| {
                error!(error = %e, "failed to load incubatees");
                Vec::new()
            }),
            incubations: incubations.unwrap_or_else(|e| {
                error!(error = %e, "failed to load incubations");
                Vec::new()
            }),
        }
    }

    /// Non-platform admins create users inside their own incubation
    fn with_default_incubation(identity: &Identity, form: &UserForm) -> UserForm {
        let mut form = form.clone();
        if form.incubation_id.is_none() && !identity.has_role(RoleCode::PlatformAdmin) {
            form.incubation_id = identity.inc_user_id.as_ref().and_then(|scope| scope.tenant_id());
        }
        form
    }

    pub async fn add_user(&self, identity: &Identity, form: &UserForm) -> Result<(), DirectoryError> {
        validate(form, true)?;
        let form = Self::with_default_incubation(identity, form);
        self.api.add_user(actor(identity), &form).await?;
        info!(email = %form.email, role_id = form.role_id, "user added");
        Ok(())
    }

    /// A blank password leaves the stored one unchanged
    pub async fn update_user(
        &self,
        identity: &Identity,
        user_id: i64,
        form: &UserForm,
    ) -> Result<(), DirectoryError> {
        validate(form, false)?;
        let form = Self::with_default_incubation(identity, form);
        self.api.update_user(actor(identity), user_id, &form).await?;
        info!(user_id, "user updated");
        Ok(())
    }

    pub async fn delete_user(&self, identity: &Identity, user_id: i64) -> Result<(), DirectoryError> {
        self.api.delete_user(actor(identity), user_id).await?;
        info!(user_id, "user deleted");
        Ok(())
    }
}
