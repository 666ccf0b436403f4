// Incubation admin - Tenant records management, selector cards and CSV export
use crate::application::incubation_api::{ApiError, IncubationApi, Scope};
use crate::domain::identity::{ALL_TENANTS, Identity};
use crate::domain::incubation::{Incubation, IncubationForm, merge_details, to_csv};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

// Fallbacks the backend expects when nobody is signed in
const FALLBACK_USER_ID: &str = "1";
const FALLBACK_INC_USER_ID: &str = "0";
const DELETE_ACTOR: &str = "system";

#[derive(Debug, thiserror::Error)]
pub enum IncubationAdminError {
    #[error("Please fill all required fields")]
    MissingFields,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Selector entry: the merged record plus its resolved logo
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncubationCard {
    #[serde(flatten)]
    pub incubation: Incubation,
    pub logo_url: String,
}

#[derive(Clone)]
pub struct IncubationAdmin {
    api: Arc<dyn IncubationApi>,
    asset_base_url: String,
}

struct Caller {
    user_id: String,
    inc_user_id: String,
}

impl Caller {
    fn of(identity: &Identity) -> Self {
        Self {
            user_id: identity
                .user_id
                .clone()
                .unwrap_or_else(|| FALLBACK_USER_ID.to_string()),
            inc_user_id: identity
                .inc_user_wire()
                .unwrap_or_else(|| FALLBACK_INC_USER_ID.to_string()),
        }
    }

    fn scope(&self) -> Scope<'_> {
        Scope::new(&self.user_id, &self.inc_user_id)
    }
}

impl IncubationAdmin {
    pub fn new(api: Arc<dyn IncubationApi>, asset_base_url: impl Into<String>) -> Self {
        Self {
            api,
            asset_base_url: asset_base_url.into(),
        }
    }

    pub async fn list(&self, identity: &Identity) -> Result<Vec<Incubation>, ApiError> {
        let caller = Caller::of(identity);
        self.api.incubation_details(caller.scope()).await
    }

    /// Merge the directory list with every detail record and resolve logos.
    /// A failed detail fetch leaves the list entries as they are.
    pub async fn selector_cards(&self, identity: &Identity, list: &[Incubation]) -> Vec<IncubationCard> {
        let details = match identity.user_id.as_deref() {
            Some(user_id) => self
                .api
                .incubation_details(Scope::new(user_id, ALL_TENANTS))
                .await
                .unwrap_or_else(|e| {
                    error!(error = %e, "failed to fetch incubation details for selector");
                    Vec::new()
                }),
            None => Vec::new(),
        };

        merge_details(list, &details)
            .into_iter()
            .map(|incubation| IncubationCard {
                logo_url: incubation.logo_url(&self.asset_base_url),
                incubation,
            })
            .collect()
    }

    pub async fn add(&self, identity: &Identity, form: &IncubationForm) -> Result<(), IncubationAdminError> {
        validate(form)?;
        let caller = Caller::of(identity);
        self.api
            .add_incubation(&caller.user_id, caller.scope(), form)
            .await?;
        info!(name = %form.name, "incubation added");
        Ok(())
    }

    /// The stored logo path is carried over unchanged
    pub async fn update(
        &self,
        identity: &Identity,
        existing: &Incubation,
        form: &IncubationForm,
    ) -> Result<(), IncubationAdminError> {
        validate(form)?;
        let caller = Caller::of(identity);
        self.api
            .update_incubation(&caller.user_id, caller.scope(), existing, form)
            .await?;
        info!(incubation_id = existing.id, "incubation updated");
        Ok(())
    }

    pub async fn delete(&self, identity: &Identity, incubation_id: i64) -> Result<(), ApiError> {
        let actor = identity.user_id.as_deref().unwrap_or(DELETE_ACTOR);
        self.api.delete_incubation(actor, incubation_id).await?;
        info!(incubation_id, "incubation deleted");
        Ok(())
    }

    pub fn export_csv<'a>(&self, rows: impl IntoIterator<Item = &'a Incubation>) -> String {
        to_csv(rows)
    }
}

fn validate(form: &IncubationForm) -> Result<(), IncubationAdminError> {
    if form.name.trim().is_empty() || form.short_name.trim().is_empty() {
        return Err(IncubationAdminError::MissingFields);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::incubation_api::endpoints;
    use crate::application::testing::MockApi;
    use crate::domain::identity::{RoleCode, TenantScope};
    use crate::domain::incubation::DEFAULT_LOGO;
    use serde_json::json;

    fn admin(api: &Arc<MockApi>) -> IncubationAdmin {
        IncubationAdmin::new(api.clone(), "http://backend:8085")
    }

    #[tokio::test]
    async fn test_list_falls_back_when_signed_out() {
        let api = Arc::new(MockApi::new());
        let service = admin(&api);

        service.list(&Identity::default()).await.unwrap();
        let signed_in = Identity::new(
            Some("4".to_string()),
            Some(RoleCode::IncubatorAdmin),
            Some(TenantScope::SpecificTenant(6)),
        );
        service.list(&signed_in).await.unwrap();

        let calls = api.calls_to(endpoints::INCUBATION_DETAILS);
        assert_eq!(calls[0].user_id.as_deref(), Some("1"));
        assert_eq!(calls[0].inc_user_id.as_deref(), Some("0"));
        assert_eq!(calls[1].user_id.as_deref(), Some("4"));
        assert_eq!(calls[1].inc_user_id.as_deref(), Some("6"));
    }

    #[tokio::test]
    async fn test_selector_cards_merge_details_and_logos() {
        let api = Arc::new(MockApi::new());
        api.respond(
            endpoints::INCUBATION_DETAILS,
            json!([{"incubationsrecid": 1, "incubationslogopath": "/logos/one.png", "incubationsemail": "one@x.org"}]),
        );
        let service = admin(&api);
        let identity = Identity::new(Some("4".to_string()), Some(RoleCode::IncubatorAdmin), None);
        let list = vec![Incubation::new(1, "One", "O"), Incubation::new(2, "Two", "T")];

        let cards = service.selector_cards(&identity, &list).await;

        assert_eq!(cards[0].logo_url, "http://backend:8085/logos/one.png");
        assert_eq!(cards[0].incubation.email.as_deref(), Some("one@x.org"));
        assert_eq!(cards[0].incubation.name.as_deref(), Some("One"));
        assert_eq!(cards[1].logo_url, DEFAULT_LOGO);
        let call = &api.calls_to(endpoints::INCUBATION_DETAILS)[0];
        assert_eq!(call.inc_user_id.as_deref(), Some("ALL"));
    }

    #[tokio::test]
    async fn test_add_requires_name_and_short_name() {
        let api = Arc::new(MockApi::new());
        let service = admin(&api);
        let form = IncubationForm {
            name: "Tech Hub".to_string(),
            ..Default::default()
        };

        let result = service.add(&Identity::default(), &form).await;
        assert!(matches!(result, Err(IncubationAdminError::MissingFields)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_existing_logo_and_reports_failures() {
        let api = Arc::new(MockApi::new());
        let service = admin(&api);
        let identity = Identity::new(Some("4".to_string()), Some(RoleCode::IncubatorAdmin), None);
        let mut existing = Incubation::new(3, "Old", "O");
        existing.logo_path = Some("/logos/three.png".to_string());
        let form = IncubationForm {
            name: "New".to_string(),
            short_name: "N".to_string(),
            ..Default::default()
        };

        service.update(&identity, &existing, &form).await.unwrap();
        let call = &api.calls_to(endpoints::UPDATE_INCUBATION)[0];
        assert_eq!(call.user_id.as_deref(), Some("4"));
        assert_eq!(call.detail.as_deref(), Some("3:New:Some(\"/logos/three.png\")"));

        api.fail(
            endpoints::DELETE_INCUBATION,
            MockApi::transport_error(endpoints::DELETE_INCUBATION),
        );
        assert!(service.delete(&identity, 3).await.is_err());
    }

    #[test]
    fn test_export_has_header_for_empty_table() {
        let api = Arc::new(MockApi::new());
        let rows: Vec<Incubation> = Vec::new();
        let csv = admin(&api).export_csv(&rows);
        assert!(csv.starts_with("Company ID,Short Name"));
        assert_eq!(csv.lines().count(), 1);
    }
}
