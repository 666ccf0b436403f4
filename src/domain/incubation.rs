// Incubation (tenant) domain model
use crate::domain::table::{SortKey, TableRow};
use crate::domain::wire;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_LOGO: &str = "/images/default-logo.png";

const CSV_HEADERS: [&str; 8] = [
    "Company ID",
    "Short Name",
    "Full Name",
    "Email",
    "Website",
    "Address",
    "Number of Founders",
    "Founders",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incubation {
    #[serde(rename = "incubationsrecid", deserialize_with = "wire::id")]
    pub id: i64,
    #[serde(rename = "incubationsname", default, deserialize_with = "wire::opt_text")]
    pub name: Option<String>,
    #[serde(rename = "incubationshortname", default, deserialize_with = "wire::opt_text")]
    pub short_name: Option<String>,
    #[serde(rename = "incubationsemail", default, deserialize_with = "wire::opt_text")]
    pub email: Option<String>,
    #[serde(rename = "incubationswebsite", default, deserialize_with = "wire::opt_text")]
    pub website: Option<String>,
    #[serde(rename = "incubationsaddress", default, deserialize_with = "wire::opt_text")]
    pub address: Option<String>,
    #[serde(rename = "incubationsfounders", default, deserialize_with = "wire::opt_text")]
    pub founders: Option<String>,
    #[serde(rename = "incubationsnooffounders", default, deserialize_with = "wire::opt_text")]
    pub founder_count: Option<String>,
    #[serde(rename = "incubationslogopath", default, deserialize_with = "wire::opt_text")]
    pub logo_path: Option<String>,
    #[serde(rename = "incubationscreatedtime", default, deserialize_with = "wire::opt_text")]
    pub created_time: Option<String>,
    #[serde(rename = "incubationsmodifiedtime", default, deserialize_with = "wire::opt_text")]
    pub modified_time: Option<String>,
    /// Columns this console does not interpret, kept for the views
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Incubation {
    pub fn new(id: i64, name: &str, short_name: &str) -> Self {
        Self {
            id,
            name: Some(name.to_string()),
            short_name: Some(short_name.to_string()),
            email: None,
            website: None,
            address: None,
            founders: None,
            founder_count: None,
            logo_path: None,
            created_time: None,
            modified_time: None,
            extra: Map::new(),
        }
    }

    /// Absolute logo URLs pass through, relative ones hang off the API host
    pub fn logo_url(&self, base_url: &str) -> String {
        match self.logo_path.as_deref().filter(|p| !p.is_empty()) {
            Some(path) if path.starts_with("http") => path.to_string(),
            Some(path) => format!("{}{}", base_url.trim_end_matches('/'), path),
            None => DEFAULT_LOGO.to_string(),
        }
    }

    /// Overlay the detail record's populated fields onto this list entry
    pub fn merged_with(&self, details: &Incubation) -> Incubation {
        fn pick(detail: &Option<String>, own: &Option<String>) -> Option<String> {
            detail.clone().or_else(|| own.clone())
        }

        let mut extra = self.extra.clone();
        extra.extend(details.extra.clone());

        Incubation {
            id: self.id,
            name: pick(&details.name, &self.name),
            short_name: pick(&details.short_name, &self.short_name),
            email: pick(&details.email, &self.email),
            website: pick(&details.website, &self.website),
            address: pick(&details.address, &self.address),
            founders: pick(&details.founders, &self.founders),
            founder_count: pick(&details.founder_count, &self.founder_count),
            logo_path: pick(&details.logo_path, &self.logo_path),
            created_time: pick(&details.created_time, &self.created_time),
            modified_time: pick(&details.modified_time, &self.modified_time),
            extra,
        }
    }
}

/// Locate a record by its numeric id inside a collection response
pub fn find_by_id(rows: &[Incubation], id: i64) -> Option<&Incubation> {
    rows.iter().find(|row| row.id == id)
}

/// Join the tenant list with the detail collection by id
pub fn merge_details(list: &[Incubation], details: &[Incubation]) -> Vec<Incubation> {
    list.iter()
        .map(|entry| match find_by_id(details, entry.id) {
            Some(detail) => entry.merged_with(detail),
            None => entry.clone(),
        })
        .collect()
}

impl TableRow for Incubation {
    fn matches(&self, query: &str) -> bool {
        [&self.name, &self.short_name]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(query))
    }

    fn sort_key(&self, column: &str) -> Option<SortKey> {
        let key = match column {
            "incubationsname" => SortKey::text(self.name.as_deref()),
            "incubationshortname" => SortKey::text(self.short_name.as_deref()),
            "incubationsemail" => SortKey::text(self.email.as_deref()),
            "incubationswebsite" => SortKey::text(self.website.as_deref()),
            "incubationscreatedtime" => SortKey::time(self.created_time.as_deref()),
            "incubationsmodifiedtime" => SortKey::time(self.modified_time.as_deref()),
            _ => return None,
        };
        Some(key)
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Export rows as CSV with the console's column headings
pub fn to_csv<'a>(rows: impl IntoIterator<Item = &'a Incubation>) -> String {
    fn or_na(value: &Option<String>) -> &str {
        value.as_deref().filter(|v| !v.is_empty()).unwrap_or("N/A")
    }

    let mut lines = vec![CSV_HEADERS.join(",")];
    for row in rows {
        let id = row.id.to_string();
        let fields = [
            id.as_str(),
            row.short_name.as_deref().unwrap_or_default(),
            or_na(&row.name),
            or_na(&row.email),
            or_na(&row.website),
            or_na(&row.address),
            or_na(&row.founder_count),
            or_na(&row.founders),
        ];
        lines.push(fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(","));
    }
    lines.join("\n")
}

/// Editable fields of an incubation record
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncubationForm {
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub founders: String,
    #[serde(default)]
    pub founder_count: String,
}
