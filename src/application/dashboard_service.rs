// Dashboard service - Concurrent batch of dashboard queries with per-query failure isolation
use crate::application::incubation_api::{ApiError, IncubationApi, Scope};
use crate::application::scope::ResolvedScope;
use crate::domain::dashboard::{AdminOverride, DashboardSnapshot, DateRange, Row};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardQuery {
    Stats,
    Field,
    Stage,
    Documents,
    Incubatees,
}

impl DashboardQuery {
    pub const ALL: [DashboardQuery; 5] = [
        Self::Stats,
        Self::Field,
        Self::Stage,
        Self::Documents,
        Self::Incubatees,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Stats => "stats",
            Self::Field => "field",
            Self::Stage => "stage",
            Self::Documents => "documents",
            Self::Incubatees => "incubatees",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryPayload {
    Stats(Value),
    Rows(Vec<Row>),
}

#[derive(Debug)]
pub struct QueryOutcome {
    pub query: DashboardQuery,
    pub result: Result<QueryPayload, ApiError>,
}

/// Every query of one batch, settled
#[derive(Debug)]
pub struct DashboardBatch {
    pub outcomes: Vec<QueryOutcome>,
}

impl DashboardBatch {
    /// Write each outcome into its slot; failures reset the slot and are logged.
    /// Documents and incubatees are mirrored into the shadow slots when `mirror_shadow` is set.
    pub fn commit(self, dashboard: &mut DashboardSnapshot, shadow: &mut AdminOverride, mirror_shadow: bool) {
        for QueryOutcome { query, result } in self.outcomes {
            let payload = match result {
                Ok(payload) => Some(payload),
                Err(e) => {
                    tracing::error!(query = query.name(), error = %e, "dashboard query failed");
                    None
                }
            };

            match (query, payload) {
                (DashboardQuery::Stats, Some(QueryPayload::Stats(value))) => {
                    dashboard.stats = Some(value);
                }
                (DashboardQuery::Stats, _) => dashboard.stats = None,
                (DashboardQuery::Field, payload) => dashboard.by_field = rows_or_empty(payload),
                (DashboardQuery::Stage, payload) => dashboard.by_stage = rows_or_empty(payload),
                (DashboardQuery::Documents, payload) => {
                    let rows = rows_or_empty(payload);
                    if mirror_shadow {
                        shadow.startup_company_doc = rows.clone();
                    }
                    dashboard.company_doc = rows;
                }
                (DashboardQuery::Incubatees, payload) => {
                    let rows = rows_or_empty(payload);
                    if mirror_shadow {
                        shadow.startup_details = rows.clone();
                    }
                    dashboard.list_of_incubatees = rows;
                }
            }
        }
    }
}

fn rows_or_empty(payload: Option<QueryPayload>) -> Vec<Row> {
    match payload {
        Some(QueryPayload::Rows(rows)) => rows,
        _ => Vec::new(),
    }
}

#[derive(Clone)]
pub struct DashboardService {
    api: Arc<dyn IncubationApi>,
}

impl DashboardService {
    pub fn new(api: Arc<dyn IncubationApi>) -> Self {
        Self { api }
    }

    /// Issue all five queries at once and wait for every one to settle
    pub async fn fetch_batch(&self, scope: &ResolvedScope, range: &DateRange) -> DashboardBatch {
        let outcomes = join_all(
            DashboardQuery::ALL
                .into_iter()
                .map(|query| self.run_query(query, scope, range)),
        )
        .await;

        DashboardBatch { outcomes }
    }

    async fn run_query(
        &self,
        query: DashboardQuery,
        scope: &ResolvedScope,
        range: &DateRange,
    ) -> QueryOutcome {
        let user_inc_id = scope.user_inc_id_wire();
        let list_user = scope.user_id_for_list_apis();
        let general = Scope::new(scope.user_id_for_general_apis(), &user_inc_id);
        let list = Scope::new(&list_user, &user_inc_id);

        tracing::debug!(
            query = query.name(),
            user_inc_id = %user_inc_id,
            list_user = %list_user,
            "issuing dashboard query"
        );

        let result = match query {
            DashboardQuery::Stats => self.api.stats(general).await.map(QueryPayload::Stats),
            DashboardQuery::Field => self
                .api
                .companies_by_field(general)
                .await
                .map(QueryPayload::Rows),
            DashboardQuery::Stage => self
                .api
                .companies_by_stage(general)
                .await
                .map(QueryPayload::Rows),
            DashboardQuery::Documents => self
                .api
                .collected_documents(list, range)
                .await
                .map(QueryPayload::Rows),
            DashboardQuery::Incubatees => self.api.incubatees(list).await.map(QueryPayload::Rows),
        };

        QueryOutcome { query, result }
    }
}
