// HTTP request handlers
use crate::application::contact_lookup::{ContactLookup, ContactState};
use crate::application::data_provider::{ProviderState, SessionLogin};
use crate::application::incubation_admin::{IncubationAdminError, IncubationCard};
use crate::application::incubation_api::ApiError;
use crate::application::user_directory::{DirectoryError, UserDropdowns};
use crate::domain::dashboard::{DateRange, Row};
use crate::domain::identity::Identity;
use crate::domain::incubation::{Incubation, IncubationForm, find_by_id};
use crate::domain::table::{PageMarker, SortDirection, TableRow, TableView};
use crate::domain::user::{RoleOption, UserForm};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt, wrappers::WatchStream};

const DEFAULT_PAGE_SIZE: usize = 5;

/// Error body returned to the UI shell
#[derive(Debug)]
pub struct HandlerError {
    status: StatusCode,
    message: String,
}

impl HandlerError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<ApiError> for HandlerError {
    fn from(e: ApiError) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, e.user_message("Something went wrong"))
    }
}

impl From<DirectoryError> for HandlerError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::Invalid(message) => Self::new(StatusCode::BAD_REQUEST, message),
            DirectoryError::Api(e) => e.into(),
        }
    }
}

impl From<IncubationAdminError> for HandlerError {
    fn from(e: IncubationAdminError) -> Self {
        let message = e.to_string();
        match e {
            IncubationAdminError::MissingFields => Self::new(StatusCode::BAD_REQUEST, message),
            IncubationAdminError::Api(e) => e.into(),
        }
    }
}

type HandlerResult<T> = Result<T, HandlerError>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<SortDirection>,
    /// Column header clicked on top of the current sort
    pub toggle: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<'a, T> {
    pub items: Vec<&'a T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_numbers: Vec<PageMarker>,
    pub search: String,
    pub sort: String,
    pub direction: SortDirection,
}

/// Search, sort and paginate; a page outside the result is clamped to page 1
fn table_page<'a, T: TableRow>(rows: &'a [T], query: &TableQuery) -> PageResponse<'a, T> {
    let mut view = TableView::new(DEFAULT_PAGE_SIZE);
    if let Some(page_size) = query.page_size {
        view.set_page_size(page_size);
    }
    if let Some(search) = &query.search {
        view.set_search(search.as_str());
    }
    if let Some(column) = &query.sort {
        view.set_sort(column, query.direction.unwrap_or_default());
    }
    if let Some(column) = &query.toggle {
        view.toggle_sort(column);
    }
    if let Some(page) = query.page {
        let total_pages = view.apply(rows).total_pages;
        view.go_to_page(page, total_pages);
    }

    let page = view.apply(rows);
    let (sort, direction) = view.sort();
    PageResponse {
        search: view.search().to_string(),
        sort: sort.to_string(),
        direction,
        page_numbers: page.page_numbers(),
        items: page.items,
        page: page.page,
        total_pages: page.total_pages,
        total_items: page.total_items,
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<ProviderState> {
    Json(state.provider.snapshot())
}

/// Current state first, then one event per change
pub async fn state_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = WatchStream::new(state.provider.subscribe())
        .map(|snapshot| Event::default().event("state").json_data(&snapshot));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(login): Json<SessionLogin>,
) -> Json<ProviderState> {
    state.provider.login(&login).await;
    Json(state.provider.snapshot())
}

pub async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    state.provider.logout().await;
    StatusCode::NO_CONTENT
}

/// Body of the single-value setters; `null` clears the value
#[derive(Debug, Deserialize)]
pub struct ValueUpdate {
    pub value: Option<String>,
}

pub async fn set_user_id(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ValueUpdate>,
) -> Json<Identity> {
    state.provider.set_user_id(update.value.as_deref()).await;
    Json(state.provider.snapshot().identity)
}

pub async fn set_role_id(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ValueUpdate>,
) -> Json<Identity> {
    state.provider.set_role_id(update.value.as_deref()).await;
    Json(state.provider.snapshot().identity)
}

pub async fn set_inc_user_id(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ValueUpdate>,
) -> Json<Identity> {
    state.provider.set_inc_user_id(update.value.as_deref()).await;
    Json(state.provider.snapshot().identity)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearsUpdate {
    pub from_year: Option<String>,
    pub to_year: Option<String>,
}

pub async fn set_years(
    State(state): State<Arc<AppState>>,
    Json(update): Json<YearsUpdate>,
) -> Json<DateRange> {
    let current = state.provider.snapshot().date_range;
    let range = DateRange::new(
        update.from_year.unwrap_or(current.from_year),
        update.to_year.unwrap_or(current.to_year),
    );
    state.provider.set_date_range(range.clone()).await;
    Json(range)
}

pub async fn set_from_year(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ValueUpdate>,
) -> HandlerResult<Json<DateRange>> {
    let year = update
        .value
        .ok_or_else(|| HandlerError::new(StatusCode::BAD_REQUEST, "fromYear is required"))?;
    state.provider.set_from_year(&year).await;
    Ok(Json(state.provider.snapshot().date_range))
}

pub async fn set_to_year(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ValueUpdate>,
) -> HandlerResult<Json<DateRange>> {
    let year = update
        .value
        .ok_or_else(|| HandlerError::new(StatusCode::BAD_REQUEST, "toYear is required"))?;
    state.provider.set_to_year(&year).await;
    Ok(Json(state.provider.snapshot().date_range))
}

pub async fn refresh_incubations(State(state): State<Arc<AppState>>) -> Json<Vec<Incubation>> {
    Json(state.provider.fetch_incubation_list().await)
}

pub async fn incubation_cards(State(state): State<Arc<AppState>>) -> Json<Vec<IncubationCard>> {
    let snapshot = state.provider.snapshot();
    Json(
        state
            .incubations
            .selector_cards(&snapshot.identity, &snapshot.incubation_list)
            .await,
    )
}

pub async fn select_incubation(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Json<Option<Incubation>>> {
    match state.provider.select_incubation_by_id(id).await {
        Some(details) => Ok(Json(details)),
        None => Err(HandlerError::new(
            StatusCode::NOT_FOUND,
            format!("incubation {} is not in the directory", id),
        )),
    }
}

pub async fn reset_incubation_selection(State(state): State<Arc<AppState>>) -> StatusCode {
    state.provider.reset_incubation_selection().await;
    StatusCode::NO_CONTENT
}

pub async fn view_startup(
    Path(user_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Json<ProviderState>> {
    if !state.provider.fetch_startup_data_for_admin(&user_id).await {
        return Err(HandlerError::new(
            StatusCode::FORBIDDEN,
            "Only admin can view other startup data",
        ));
    }
    Ok(Json(state.provider.snapshot()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDataUpdate {
    pub user_id: Option<String>,
}

pub async fn set_admin_view_data(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ViewDataUpdate>,
) -> Json<ProviderState> {
    state.provider.set_admin_view_data(update.user_id.as_deref()).await;
    Json(state.provider.snapshot())
}

pub async fn reset_admin_view(State(state): State<Arc<AppState>>) -> StatusCode {
    state.provider.reset_admin_view().await;
    StatusCode::NO_CONTENT
}

pub async fn clear_all_data(State(state): State<Arc<AppState>>) -> StatusCode {
    state.provider.clear_all_data().await;
    StatusCode::NO_CONTENT
}

pub async fn refresh_documents(State(state): State<Arc<AppState>>) -> HandlerResult<Json<Vec<Row>>> {
    Ok(Json(state.provider.refresh_company_documents().await?))
}

pub async fn set_current_company(
    State(state): State<Arc<AppState>>,
    Json(details): Json<Option<Value>>,
) -> StatusCode {
    state.provider.set_current_company_details(details);
    StatusCode::NO_CONTENT
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactQuery {
    pub inc_user_id: Option<String>,
}

/// Dropping this future (client gone) aborts the lookup
pub async fn contacts(
    Path(user_id): Path<String>,
    Query(query): Query<ContactQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<ContactState> {
    let inc_user_id = query
        .inc_user_id
        .or_else(|| state.provider.snapshot().current_inc_user_id());
    let mut lookup = ContactLookup::spawn(state.api.clone(), Some(user_id), inc_user_id);
    Json(lookup.finished().await)
}

pub async fn list_users(
    Query(query): Query<TableQuery>,
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Response> {
    let snapshot = state.provider.snapshot();
    let users = state
        .users
        .list_users(&snapshot.identity, snapshot.selected_incubation_id())
        .await?;
    Ok(Json(table_page(&users, &query)).into_response())
}

pub async fn roles(State(state): State<Arc<AppState>>) -> HandlerResult<Json<Vec<RoleOption>>> {
    let snapshot = state.provider.snapshot();
    let roles = state
        .users
        .roles(&snapshot.identity, snapshot.selected_incubation_id())
        .await?;
    Ok(Json(roles))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropdownQuery {
    pub incubation_id: Option<i64>,
}

pub async fn user_dropdowns(
    Query(query): Query<DropdownQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<UserDropdowns> {
    let snapshot = state.provider.snapshot();
    let incubation = query.incubation_id.or(snapshot.selected_incubation_id());
    Json(state.users.dropdowns(&snapshot.identity, incubation).await)
}

pub async fn add_user(
    State(state): State<Arc<AppState>>,
    Json(form): Json<UserForm>,
) -> HandlerResult<StatusCode> {
    let identity = state.provider.snapshot().identity;
    state.users.add_user(&identity, &form).await?;
    Ok(StatusCode::CREATED)
}

pub async fn update_user(
    Path(user_id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Json(form): Json<UserForm>,
) -> HandlerResult<StatusCode> {
    let identity = state.provider.snapshot().identity;
    state.users.update_user(&identity, user_id, &form).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user(
    Path(user_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> HandlerResult<StatusCode> {
    let identity = state.provider.snapshot().identity;
    state.users.delete_user(&identity, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_incubation_records(
    Query(query): Query<TableQuery>,
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Response> {
    let identity = state.provider.snapshot().identity;
    let records = state.incubations.list(&identity).await?;
    Ok(Json(table_page(&records, &query)).into_response())
}

pub async fn add_incubation_record(
    State(state): State<Arc<AppState>>,
    Json(form): Json<IncubationForm>,
) -> HandlerResult<StatusCode> {
    let identity = state.provider.snapshot().identity;
    state.incubations.add(&identity, &form).await?;
    Ok(StatusCode::CREATED)
}

pub async fn update_incubation_record(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Json(form): Json<IncubationForm>,
) -> HandlerResult<StatusCode> {
    let identity = state.provider.snapshot().identity;
    let records = state.incubations.list(&identity).await?;
    let existing = find_by_id(&records, id).ok_or_else(|| {
        HandlerError::new(StatusCode::NOT_FOUND, format!("incubation {} not found", id))
    })?;
    state.incubations.update(&identity, existing, &form).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_incubation_record(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> HandlerResult<StatusCode> {
    let identity = state.provider.snapshot().identity;
    state.incubations.delete(&identity, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The filtered and sorted table, every page
pub async fn export_incubation_records(
    Query(query): Query<TableQuery>,
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Response> {
    let identity = state.provider.snapshot().identity;
    let records = state.incubations.list(&identity).await?;

    let export = TableQuery {
        page: None,
        page_size: Some(records.len().max(1)),
        ..query
    };
    let page = table_page(&records, &export);
    let csv = state.incubations.export_csv(page.items);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"incubations.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::data_provider::DataProvider;
    use crate::application::incubation_api::endpoints;
    use crate::application::testing::MockApi;
    use crate::infrastructure::session_store::InMemorySessionStore;
    use crate::domain::identity::{RoleCode, TenantScope};

    fn app(api: Arc<MockApi>) -> Arc<AppState> {
        let provider = Arc::new(DataProvider::new(
            api.clone(),
            Arc::new(InMemorySessionStore::new()),
            DateRange::default(),
        ));
        Arc::new(AppState::new(provider, api, "http://backend:8085"))
    }

    fn login_as(role: &str) -> SessionLogin {
        SessionLogin {
            user_id: "4".to_string(),
            role_id: role.to_string(),
            inc_user_id: None,
            token: None,
        }
    }

    fn incubations(count: i64) -> Vec<Incubation> {
        (1..=count)
            .map(|id| Incubation::new(id, &format!("Hub {}", id), &format!("H{}", id)))
            .collect()
    }

    #[test]
    fn test_table_page_clamps_out_of_range_page() {
        let rows = incubations(12);
        let query = TableQuery {
            page: Some(9),
            ..Default::default()
        };
        let page = table_page(&rows, &query);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 5);

        let query = TableQuery {
            page: Some(3),
            ..Default::default()
        };
        assert_eq!(table_page(&rows, &query).items.len(), 2);
    }

    #[test]
    fn test_table_page_search_and_sort() {
        let rows = incubations(12);
        let query = TableQuery {
            search: Some("hub 1".to_string()),
            sort: Some("incubationsname".to_string()),
            direction: Some(SortDirection::Desc),
            page_size: Some(10),
            ..Default::default()
        };
        let page = table_page(&rows, &query);
        let ids: Vec<i64> = page.items.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![12, 11, 10, 1]);
    }

    #[test]
    fn test_table_page_toggles_clicked_column() {
        let rows = incubations(3);
        let query = TableQuery {
            sort: Some("incubationsname".to_string()),
            direction: Some(SortDirection::Asc),
            toggle: Some("incubationsname".to_string()),
            ..Default::default()
        };
        let page = table_page(&rows, &query);
        assert_eq!(page.direction, SortDirection::Desc);
        let ids: Vec<i64> = page.items.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let query = TableQuery {
            sort: Some("incubationsname".to_string()),
            direction: Some(SortDirection::Desc),
            toggle: Some("incubationshortname".to_string()),
            ..Default::default()
        };
        let page = table_page(&rows, &query);
        assert_eq!(page.sort, "incubationshortname");
        assert_eq!(page.direction, SortDirection::Asc);
    }

    #[test]
    fn test_table_page_size_change_starts_on_first_page() {
        let rows = incubations(12);
        let query = TableQuery {
            page_size: Some(4),
            ..Default::default()
        };
        let page = table_page(&rows, &query);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 4);
        assert_eq!(page.items[0].id, 1);
    }

    #[tokio::test]
    async fn test_view_startup_is_forbidden_for_incubatees() {
        let api = Arc::new(MockApi::new());
        let state = app(api);
        login(State(state.clone()), Json(login_as("4"))).await;

        let err = view_startup(Path("55".to_string()), State(state)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_select_unknown_incubation_is_not_found() {
        let api = Arc::new(MockApi::new());
        let state = app(api);
        login(State(state.clone()), Json(login_as("1"))).await;

        let err = select_incubation(Path(404), State(state)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_user_form_is_bad_request() {
        let api = Arc::new(MockApi::new());
        let state = app(api);
        let form = UserForm {
            email: "x@y.z".to_string(),
            password: String::new(),
            name: "X".to_string(),
            role_id: 2,
            incubation_id: None,
            incubatee_id: None,
        };

        let err = add_user(State(state), Json(form)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Password is required");
    }

    #[tokio::test]
    async fn test_backend_failure_is_bad_gateway() {
        let api = Arc::new(MockApi::new());
        api.fail(endpoints::DOCUMENTS, MockApi::transport_error(endpoints::DOCUMENTS));
        let state = app(api);

        let err = refresh_documents(State(state)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(err.message, "Network error: connection refused");
    }

    #[tokio::test]
    async fn test_identity_setters_apply_platform_admin_rule() {
        let api = Arc::new(MockApi::new());
        let state = app(api);
        let value = |v: Option<&str>| Json(ValueUpdate { value: v.map(str::to_string) });

        set_user_id(State(state.clone()), value(Some("4"))).await;
        set_role_id(State(state.clone()), value(Some("5"))).await;
        let Json(identity) = set_inc_user_id(State(state.clone()), value(Some("3"))).await;
        assert_eq!(identity.role_id, Some(RoleCode::IncubateeManager));
        assert_eq!(identity.inc_user_id, Some(TenantScope::SpecificTenant(3)));

        let Json(identity) = set_role_id(State(state.clone()), value(Some("0"))).await;
        assert_eq!(identity.inc_user_id, Some(TenantScope::AllTenants));

        let Json(identity) = set_user_id(State(state), value(None)).await;
        assert_eq!(identity.user_id, None);
    }

    #[tokio::test]
    async fn test_single_year_setters() {
        let api = Arc::new(MockApi::new());
        let state = app(api);
        let value = |v: Option<&str>| Json(ValueUpdate { value: v.map(str::to_string) });

        let Json(range) = set_from_year(State(state.clone()), value(Some("2021")))
            .await
            .unwrap();
        assert_eq!(range, DateRange::new("2021", "2026"));
        let Json(range) = set_to_year(State(state.clone()), value(Some("2022")))
            .await
            .unwrap();
        assert_eq!(range, DateRange::new("2021", "2022"));

        let err = set_to_year(State(state), value(None)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_years_update_is_partial() {
        let api = Arc::new(MockApi::new());
        let state = app(api);

        let Json(range) = set_years(
            State(state.clone()),
            Json(YearsUpdate {
                from_year: None,
                to_year: Some("2030".to_string()),
            }),
        )
        .await;
        assert_eq!(range, DateRange::new("2025", "2030"));
        assert_eq!(state.provider.snapshot().date_range, range);
    }
}
