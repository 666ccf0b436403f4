// Dashboard domain model
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One opaque backend record (document, incubatee, aggregate bucket)
pub type Row = Value;

pub const DEFAULT_FROM_YEAR: &str = "2025";
pub const DEFAULT_TO_YEAR: &str = "2026";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub from_year: String,
    pub to_year: String,
}

impl DateRange {
    pub fn new(from_year: impl Into<String>, to_year: impl Into<String>) -> Self {
        Self {
            from_year: from_year.into(),
            to_year: to_year.into(),
        }
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new(DEFAULT_FROM_YEAR, DEFAULT_TO_YEAR)
    }
}

/// Result of one dashboard batch. Replaced slot by slot as the batch settles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub stats: Option<Value>,
    pub by_field: Vec<Row>,
    pub by_stage: Vec<Row>,
    pub company_doc: Vec<Row>,
    pub list_of_incubatees: Vec<Row>,
}

/// "Viewing as" state plus the shadow slots it shares with the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverride {
    pub viewing_startup_id: Option<String>,
    /// Trigger value: setting it loads that startup into the shadow slots
    pub view_data: Option<String>,
    #[serde(rename = "startupcompanyDoc")]
    pub startup_company_doc: Vec<Row>,
    #[serde(rename = "startupdetails")]
    pub startup_details: Vec<Row>,
}

impl AdminOverride {
    pub fn is_active(&self) -> bool {
        self.viewing_startup_id.is_some() || self.view_data.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
