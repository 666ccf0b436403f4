// Data provider - Session-scoped orchestration of dashboard, directory and admin-override state
//
// All shared state lives in one watch channel and is written only here. Every
// public operation ends with `settle`, which re-runs the effects whose
// dependencies changed since they last ran.
use crate::application::dashboard_service::DashboardService;
use crate::application::incubation_api::{ApiError, IncubationApi, Scope};
use crate::application::scope::ResolvedScope;
use crate::application::session_store::{
    INC_USER_ID_KEY, ROLE_ID_KEY, SessionStore, TOKEN_KEY, USER_ID_KEY, read_identity,
};
use crate::domain::dashboard::{AdminOverride, DashboardSnapshot, DateRange, Row};
use crate::domain::identity::{
    ALL_TENANTS, Identity, RoleCode, TenantScope, normalize_session_value,
};
use crate::domain::incubation::{Incubation, find_by_id};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderState {
    pub identity: Identity,
    pub date_range: DateRange,
    pub dashboard: DashboardSnapshot,
    pub loading: bool,
    pub admin: AdminOverride,
    pub admin_startup_loading: bool,
    pub current_company_details: Option<Value>,
    pub incubation_list: Vec<Incubation>,
    pub selected_incubation: Option<Incubation>,
    pub incubation_details: Option<Incubation>,
    pub incubation_loading: bool,
}

impl ProviderState {
    fn initial(identity: Identity, date_range: DateRange) -> Self {
        Self {
            identity,
            date_range,
            dashboard: DashboardSnapshot::default(),
            loading: true,
            admin: AdminOverride::default(),
            admin_startup_loading: false,
            current_company_details: None,
            incubation_list: Vec::new(),
            selected_incubation: None,
            incubation_details: None,
            incubation_loading: false,
        }
    }

    pub fn selected_incubation_id(&self) -> Option<i64> {
        self.selected_incubation.as_ref().map(|incubation| incubation.id)
    }

    pub fn scope(&self) -> Option<ResolvedScope> {
        ResolvedScope::resolve(&self.identity, self.selected_incubation_id())
    }

    /// Tenant sent by the admin-override and refresh paths: the stored value, else the resolved one
    pub fn current_inc_user_id(&self) -> Option<String> {
        self.identity
            .inc_user_wire()
            .or_else(|| self.scope().map(|scope| scope.user_inc_id_wire()))
    }

    /// Dashboard, shadow and admin-view slots; the incubation directory is kept
    fn clear_data(&mut self) {
        self.dashboard = DashboardSnapshot::default();
        self.admin.clear();
        self.current_company_details = None;
        self.loading = false;
        self.admin_startup_loading = false;
    }

    fn clear_directory(&mut self) {
        self.incubation_list.clear();
        self.selected_incubation = None;
        self.incubation_details = None;
        self.incubation_loading = false;
    }
}

/// Values sent by the login screen
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLogin {
    pub user_id: String,
    pub role_id: String,
    #[serde(default)]
    pub inc_user_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct DashboardDeps {
    user_id: Option<String>,
    role_id: Option<RoleCode>,
    date_range: DateRange,
    viewing_startup_id: Option<String>,
    selected_incubation: Option<i64>,
}

impl DashboardDeps {
    fn of(state: &ProviderState) -> Self {
        Self {
            user_id: state.identity.user_id.clone(),
            role_id: state.identity.role_id,
            date_range: state.date_range.clone(),
            viewing_startup_id: state.admin.viewing_startup_id.clone(),
            selected_incubation: state.selected_incubation_id(),
        }
    }
}

/// Dependencies each effect last ran with; `None` means it never ran
#[derive(Debug, Default)]
struct EffectDeps {
    session: Option<Identity>,
    incubation_list: Option<Option<String>>,
    incubation_details: Option<Option<i64>>,
    admin_view: Option<(Option<String>, DateRange)>,
    dashboard: Option<DashboardDeps>,
}

fn record<T: PartialEq>(slot: &mut Option<T>, current: T) -> bool {
    if slot.as_ref() == Some(&current) {
        false
    } else {
        *slot = Some(current);
        true
    }
}

pub struct DataProvider {
    api: Arc<dyn IncubationApi>,
    session: Arc<dyn SessionStore>,
    dashboard_service: DashboardService,
    state: watch::Sender<ProviderState>,
    effects: Mutex<EffectDeps>,
    dashboard_epoch: AtomicU64,
}

impl DataProvider {
    pub fn new(
        api: Arc<dyn IncubationApi>,
        session: Arc<dyn SessionStore>,
        date_range: DateRange,
    ) -> Self {
        let identity = read_identity(session.as_ref());
        let (state, _) = watch::channel(ProviderState::initial(identity, date_range));

        Self {
            dashboard_service: DashboardService::new(api.clone()),
            api,
            session,
            state,
            effects: Mutex::new(EffectDeps::default()),
            dashboard_epoch: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> ProviderState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProviderState> {
        self.state.subscribe()
    }

    fn effect_changed(&self, update: impl FnOnce(&mut EffectDeps) -> bool) -> bool {
        let mut deps = self.effects.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut deps)
    }

    // ----- Identity store -----

    fn persist(&self, key: &str, value: Option<&str>) {
        if let Err(e) = self.session.set(key, value) {
            error!(key, error = %e, "failed to persist session value");
        }
    }

    fn write_user_id(&self, id: Option<&str>) {
        let value = normalize_session_value(id);
        self.persist(USER_ID_KEY, value.as_deref());
        self.state.send_modify(|s| s.identity.user_id = value);
    }

    fn write_role_id(&self, id: Option<&str>) {
        let role = normalize_session_value(id).and_then(|raw| {
            let role = RoleCode::parse(&raw);
            if role.is_none() {
                warn!(value = %raw, "rejecting non-numeric role id");
            }
            role
        });
        self.persist(ROLE_ID_KEY, role.map(|r| r.to_string()).as_deref());
        self.state.send_modify(|s| s.identity.role_id = role);

        if role == Some(RoleCode::PlatformAdmin) {
            self.write_inc_user_id(Some(ALL_TENANTS));
        }
    }

    fn write_inc_user_id(&self, id: Option<&str>) {
        let role = self.state.borrow().identity.role_id;
        let requested = normalize_session_value(id).and_then(|raw| {
            let scope = TenantScope::parse(&raw);
            if scope.is_none() {
                warn!(value = %raw, "rejecting unrecognised tenant id");
            }
            scope
        });
        let scope = Identity::scope_for_role(role, requested);
        let stored = scope.as_ref().map(|scope| scope.wire_value(""));

        self.persist(INC_USER_ID_KEY, stored.as_deref());
        self.state.send_modify(|s| s.identity.inc_user_id = scope);
    }

    pub async fn set_user_id(&self, id: Option<&str>) {
        self.write_user_id(id);
        self.settle().await;
    }

    pub async fn set_role_id(&self, id: Option<&str>) {
        self.write_role_id(id);
        self.settle().await;
    }

    pub async fn set_inc_user_id(&self, id: Option<&str>) {
        self.write_inc_user_id(id);
        self.settle().await;
    }

    pub async fn login(&self, login: &SessionLogin) {
        self.persist(TOKEN_KEY, normalize_session_value(login.token.as_deref()).as_deref());
        self.write_user_id(Some(&login.user_id));
        self.write_role_id(Some(&login.role_id));
        self.write_inc_user_id(login.inc_user_id.as_deref());
        info!(user_id = %login.user_id, role_id = %login.role_id, "session started");
        self.settle().await;
    }

    pub async fn logout(&self) {
        self.persist(TOKEN_KEY, None);
        self.write_user_id(None);
        self.write_role_id(None);
        self.write_inc_user_id(None);
        info!("session ended");
        self.settle().await;
    }

    // ----- Cross-tab reconciliation -----

    /// One-way copy from the durable store into memory. Never writes back.
    pub fn sync_from_session(&self) -> bool {
        let stored = read_identity(self.session.as_ref());
        self.state.send_if_modified(|s| {
            if s.identity == stored {
                false
            } else {
                s.identity = stored;
                true
            }
        })
    }

    /// Sync, then run whatever effects the new identity triggers
    pub async fn reconcile_session(&self) -> bool {
        let changed = self.sync_from_session();
        if changed {
            debug!("session identity changed outside this process");
            self.settle().await;
        }
        changed
    }

    // ----- Filters -----

    pub async fn set_date_range(&self, range: DateRange) {
        self.state.send_modify(|s| s.date_range = range);
        self.settle().await;
    }

    pub async fn set_from_year(&self, year: &str) {
        let mut range = self.state.borrow().date_range.clone();
        range.from_year = year.to_string();
        self.set_date_range(range).await;
    }

    pub async fn set_to_year(&self, year: &str) {
        let mut range = self.state.borrow().date_range.clone();
        range.to_year = year.to_string();
        self.set_date_range(range).await;
    }

    pub fn set_current_company_details(&self, details: Option<Value>) {
        self.state.send_modify(|s| s.current_company_details = details);
    }

    // ----- Effects -----

    pub async fn settle(&self) {
        let identity = self.state.borrow().identity.clone();
        if self.effect_changed(|d| record(&mut d.session, identity.clone())) {
            if !identity.is_signed_in() {
                debug!("no active session, clearing dashboard state");
                self.state.send_modify(|s| {
                    self.invalidate_dashboard(s);
                    s.clear_data();
                    s.clear_directory();
                });
            } else if identity.has_role(RoleCode::IncubateeAdmin)
                && self.state.borrow().admin.is_active()
            {
                info!("incubatee session cannot keep an admin view, resetting it");
                self.clear_admin_view();
            }
        }

        let user_id = self.state.borrow().identity.user_id.clone();
        if self.effect_changed(|d| record(&mut d.incubation_list, user_id.clone()))
            && user_id.is_some()
        {
            self.fetch_incubation_list().await;
        }

        let selected = self.state.borrow().selected_incubation_id();
        if self.effect_changed(|d| record(&mut d.incubation_details, selected)) {
            if let Some(id) = selected {
                self.fetch_incubation_details(id).await;
            }
        }

        let (view_data, range) = {
            let state = self.state.borrow();
            (state.admin.view_data.clone(), state.date_range.clone())
        };
        if self.effect_changed(|d| record(&mut d.admin_view, (view_data.clone(), range))) {
            if let Some(target) = view_data {
                self.load_startup_data(&target).await;
            }
        }

        let deps = DashboardDeps::of(&self.state.borrow());
        if self.effect_changed(|d| record(&mut d.dashboard, deps)) {
            self.fetch_dashboard().await;
        }
    }

    // ----- Dashboard batch -----

    async fn fetch_dashboard(&self) {
        let state = self.snapshot();
        if !state.identity.is_signed_in() {
            return;
        }
        if state.admin.viewing_startup_id.is_some() {
            debug!("admin view active, skipping dashboard batch");
            return;
        }
        let Some(scope) = state.scope() else {
            return;
        };

        let epoch = self.dashboard_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| s.loading = true);

        let batch = self
            .dashboard_service
            .fetch_batch(&scope, &state.date_range)
            .await;
        let mirror_shadow = !state.identity.has_role(RoleCode::IncubatorAdmin);

        let committed = self.state.send_if_modified(|s| {
            if self.dashboard_epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            batch.commit(&mut s.dashboard, &mut s.admin, mirror_shadow);
            s.loading = false;
            true
        });
        if !committed {
            debug!(epoch, "discarded superseded dashboard batch");
        }
    }

    /// Must run inside the same state write that replaces the dashboard slots
    fn invalidate_dashboard(&self, state: &mut ProviderState) {
        self.dashboard_epoch.fetch_add(1, Ordering::SeqCst);
        state.loading = false;
    }

    /// Empty the dashboard and admin-view slots without touching the session
    pub async fn clear_all_data(&self) {
        self.state.send_modify(|s| {
            self.invalidate_dashboard(s);
            s.clear_data();
        });
        self.settle().await;
    }

    /// Re-query documents for whatever the caller is currently looking at
    pub async fn refresh_company_documents(&self) -> Result<Vec<Row>, ApiError> {
        let state = self.snapshot();
        let viewing = state.admin.viewing_startup_id.clone();
        let user_id = match viewing {
            Some(target) => Some(target),
            None if state.identity.has_role(RoleCode::IncubatorAdmin) => {
                Some(ALL_TENANTS.to_string())
            }
            None => state.identity.user_id.clone(),
        };
        let inc_user_id = state.current_inc_user_id();
        let scope = Scope {
            user_id: user_id.as_deref(),
            inc_user_id: inc_user_id.as_deref(),
        };

        let rows = self
            .api
            .collected_documents(scope, &state.date_range)
            .await
            .inspect_err(|e| error!(error = %e, "failed to refresh company documents"))?;

        self.state.send_modify(|s| {
            s.dashboard.company_doc = rows.clone();
            s.admin.startup_company_doc = rows.clone();
        });
        Ok(rows)
    }

    // ----- Incubation directory -----

    pub async fn fetch_incubation_list(&self) -> Vec<Incubation> {
        let identity = self.state.borrow().identity.clone();
        let Some(user_id) = identity.user_id.clone() else {
            return Vec::new();
        };

        let list = match self
            .api
            .incubation_list(Scope::new(&user_id, ALL_TENANTS))
            .await
        {
            Ok(list) => list,
            Err(e) => {
                error!(error = %e, "failed to fetch incubation list");
                Vec::new()
            }
        };

        let preferred = identity
            .inc_user_id
            .as_ref()
            .and_then(TenantScope::tenant_id)
            .and_then(|id| find_by_id(&list, id).cloned());

        self.state.send_if_modified(|s| {
            if s.identity.user_id.as_deref() != Some(user_id.as_str()) {
                return false;
            }
            s.incubation_list = list.clone();
            if let Some(incubation) = preferred {
                s.selected_incubation = Some(incubation);
            }
            true
        });
        list
    }

    /// The endpoint answers with a collection; the record is located by id
    pub async fn fetch_incubation_details(&self, incubation_id: i64) -> Option<Incubation> {
        let user_id = self.state.borrow().identity.user_id.clone()?;

        self.state.send_modify(|s| s.incubation_loading = true);
        let tenant = incubation_id.to_string();
        let details = match self
            .api
            .incubation_details(Scope::new(&user_id, &tenant))
            .await
        {
            Ok(rows) => {
                let found = find_by_id(&rows, incubation_id).cloned();
                if found.is_none() {
                    debug!(incubation_id, "no detail record for incubation");
                }
                found
            }
            Err(e) => {
                error!(incubation_id, error = %e, "failed to fetch incubation details");
                None
            }
        };

        self.state.send_modify(|s| {
            s.incubation_details = details.clone();
            s.incubation_loading = false;
        });
        details
    }

    /// The one path that couples tenant selection to the stored identity
    pub async fn handle_incubation_select(&self, incubation: Incubation) -> Option<Incubation> {
        let id = incubation.id;
        self.state
            .send_modify(|s| s.selected_incubation = Some(incubation));
        self.write_inc_user_id(Some(&id.to_string()));

        self.effect_changed(|d| record(&mut d.incubation_details, Some(id)));
        let details = self.fetch_incubation_details(id).await;
        self.settle().await;
        details
    }

    /// Select a tenant from the loaded list; `None` if it is not listed
    pub async fn select_incubation_by_id(&self, incubation_id: i64) -> Option<Option<Incubation>> {
        let incubation = find_by_id(&self.state.borrow().incubation_list, incubation_id).cloned()?;
        Some(self.handle_incubation_select(incubation).await)
    }

    pub async fn reset_incubation_selection(&self) {
        self.state.send_modify(|s| {
            s.selected_incubation = None;
            s.incubation_details = None;
        });

        let is_platform_admin = self
            .state
            .borrow()
            .identity
            .has_role(RoleCode::PlatformAdmin);
        if is_platform_admin {
            self.write_inc_user_id(Some(ALL_TENANTS));
        } else {
            self.write_inc_user_id(None);
        }
        self.settle().await;
    }

    // ----- Admin override -----

    async fn load_startup_data(&self, target_user_id: &str) {
        if target_user_id.trim().is_empty() {
            return;
        }

        let state = self.snapshot();
        let inc_user_id = state.current_inc_user_id();
        self.state.send_modify(|s| {
            self.invalidate_dashboard(s);
            s.admin_startup_loading = true;
            s.admin.viewing_startup_id = Some(target_user_id.to_string());
        });

        let scope = Scope {
            user_id: Some(target_user_id),
            inc_user_id: inc_user_id.as_deref(),
        };
        let result = futures::try_join!(
            self.api.collected_documents(scope, &state.date_range),
            self.api.incubatees(scope),
        );

        let (documents, incubatees) = match result {
            Ok(rows) => {
                debug!(
                    target_user_id,
                    documents = rows.0.len(),
                    incubatees = rows.1.len(),
                    "fetched startup data"
                );
                rows
            }
            Err(e) => {
                error!(target_user_id, error = %e, "failed to fetch startup data");
                (Vec::new(), Vec::new())
            }
        };

        self.state.send_modify(|s| {
            if s.admin.viewing_startup_id.as_deref() == Some(target_user_id) {
                s.admin.startup_company_doc = documents;
                s.admin.startup_details = incubatees;
            }
            s.admin_startup_loading = false;
        });
    }

    /// Show one startup's documents and incubatees in the shadow slots
    pub async fn fetch_startup_data_by_id(&self, target_user_id: &str) {
        self.load_startup_data(target_user_id).await;
        self.settle().await;
    }

    /// Incubator admins only; anyone else gets a logged no-op
    pub async fn fetch_startup_data_for_admin(&self, target_user_id: &str) -> bool {
        if !self
            .state
            .borrow()
            .identity
            .has_role(RoleCode::IncubatorAdmin)
        {
            warn!(target_user_id, "only an incubator admin can view other startup data");
            return false;
        }
        self.fetch_startup_data_by_id(target_user_id).await;
        true
    }

    /// Setting the trigger loads that startup; changing the year range reloads it
    pub async fn set_admin_view_data(&self, target_user_id: Option<&str>) {
        let target = normalize_session_value(target_user_id);
        self.state.send_modify(|s| s.admin.view_data = target);
        self.settle().await;
    }

    fn clear_admin_view(&self) {
        self.state.send_modify(|s| s.admin.clear());
    }

    pub async fn reset_admin_view(&self) {
        self.clear_admin_view();
        self.settle().await;
    }
}
