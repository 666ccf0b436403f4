// Presentation layer - HTTP facade consumed by the UI shell
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::*;
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/state", get(get_state).delete(clear_all_data))
        .route("/state/events", get(state_events))
        .route("/session", post(login).delete(logout))
        .route("/session/user-id", put(set_user_id))
        .route("/session/role-id", put(set_role_id))
        .route("/session/inc-user-id", put(set_inc_user_id))
        .route("/filters/years", put(set_years))
        .route("/filters/from-year", put(set_from_year))
        .route("/filters/to-year", put(set_to_year))
        .route("/incubations/refresh", post(refresh_incubations))
        .route("/incubations/cards", get(incubation_cards))
        .route("/incubations/selection", delete(reset_incubation_selection))
        .route("/incubations/:id/select", post(select_incubation))
        .route(
            "/incubations/records",
            get(list_incubation_records).post(add_incubation_record),
        )
        .route("/incubations/records/export", get(export_incubation_records))
        .route(
            "/incubations/records/:id",
            put(update_incubation_record).delete(delete_incubation_record),
        )
        .route("/admin/view", put(set_admin_view_data).delete(reset_admin_view))
        .route("/admin/view/:user_id", post(view_startup))
        .route("/documents/refresh", post(refresh_documents))
        .route("/company/current", put(set_current_company))
        .route("/contacts/:user_id", get(contacts))
        .route("/users", get(list_users).post(add_user))
        .route("/users/dropdowns", get(user_dropdowns))
        .route("/users/:id", put(update_user).delete(delete_user))
        .route("/roles", get(roles))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
