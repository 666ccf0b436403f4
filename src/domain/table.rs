// Client-side table model: search, sort and pagination over small lists
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Column that keeps the fetch order
pub const SERIAL_COLUMN: &str = "sno";

const MAX_VISIBLE_PAGES: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Text(String),
    /// Milliseconds since the epoch; missing timestamps sort as the epoch
    Time(i64),
}

impl SortKey {
    pub fn text(value: Option<&str>) -> Self {
        Self::Text(value.unwrap_or_default().to_string())
    }

    pub fn time(value: Option<&str>) -> Self {
        Self::Time(value.and_then(parse_timestamp_ms).unwrap_or(0))
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            (Self::Text(_), Self::Time(_)) => Ordering::Greater,
            (Self::Time(_), Self::Text(_)) => Ordering::Less,
        }
    }
}

/// Accepts RFC 3339 and the backend's "YYYY-MM-DD HH:MM:SS" form
pub fn parse_timestamp_ms(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.timestamp_millis());
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

pub trait TableRow {
    /// Case-insensitive search; `query` is already lowercased and trimmed
    fn matches(&self, query: &str) -> bool;

    /// `None` for columns the row does not know, which leaves the order unchanged
    fn sort_key(&self, column: &str) -> Option<SortKey>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMarker {
    Page(usize),
    Ellipsis,
}

impl Serialize for PageMarker {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Page(page) => serializer.serialize_u64(*page as u64),
            Self::Ellipsis => serializer.serialize_str("..."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    search: String,
    sort_column: String,
    sort_direction: SortDirection,
    page: usize,
    page_size: usize,
}

#[derive(Debug)]
pub struct Page<'a, T> {
    pub items: Vec<&'a T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<'_, T> {
    pub fn page_numbers(&self) -> Vec<PageMarker> {
        page_numbers(self.page, self.total_pages)
    }
}

impl TableView {
    pub fn new(page_size: usize) -> Self {
        Self {
            search: String::new(),
            sort_column: SERIAL_COLUMN.to_string(),
            sort_direction: SortDirection::Asc,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> (&str, SortDirection) {
        (&self.sort_column, self.sort_direction)
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
        self.page = 1;
    }

    /// Same column flips the direction; a new column starts ascending
    pub fn toggle_sort(&mut self, column: &str) {
        if self.sort_column == column {
            self.sort_direction = self.sort_direction.toggled();
        } else {
            self.sort_column = column.to_string();
            self.sort_direction = SortDirection::Asc;
        }
        self.page = 1;
    }

    pub fn set_sort(&mut self, column: &str, direction: SortDirection) {
        self.sort_column = column.to_string();
        self.sort_direction = direction;
        self.page = 1;
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    /// Out-of-range pages are ignored
    pub fn go_to_page(&mut self, page: usize, total_pages: usize) -> bool {
        if page >= 1 && page <= total_pages {
            self.page = page;
            true
        } else {
            false
        }
    }

    pub fn apply<'a, T: TableRow>(&self, rows: &'a [T]) -> Page<'a, T> {
        let query = self.search.trim().to_lowercase();
        let mut filtered: Vec<(usize, &T)> = rows
            .iter()
            .filter(|row| query.is_empty() || row.matches(&query))
            .enumerate()
            .collect();

        filtered.sort_by(|(index_a, a), (index_b, b)| {
            let ordering = if self.sort_column == SERIAL_COLUMN {
                index_a.cmp(index_b)
            } else {
                match (a.sort_key(&self.sort_column), b.sort_key(&self.sort_column)) {
                    (Some(ka), Some(kb)) => ka.compare(&kb),
                    _ => Ordering::Equal,
                }
            };
            match self.sort_direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total_items = filtered.len();
        let total_pages = total_items.div_ceil(self.page_size);
        let start = (self.page - 1) * self.page_size;
        let items = filtered
            .into_iter()
            .skip(start)
            .take(self.page_size)
            .map(|(_, row)| row)
            .collect();

        Page {
            items,
            page: self.page,
            total_pages,
            total_items,
        }
    }
}

/// Five-slot page window with ellipses, e.g. `1 … 4 5 6 … 10`
pub fn page_numbers(current: usize, total: usize) -> Vec<PageMarker> {
    use PageMarker::{Ellipsis, Page};

    if total <= MAX_VISIBLE_PAGES {
        return (1..=total).map(Page).collect();
    }

    let mut pages = Vec::with_capacity(MAX_VISIBLE_PAGES + 2);
    if current <= 3 {
        pages.extend((1..=4).map(Page));
        pages.push(Ellipsis);
        pages.push(Page(total));
    } else if current >= total - 2 {
        pages.push(Page(1));
        pages.push(Ellipsis);
        pages.extend((total - 3..=total).map(Page));
    } else {
        pages.push(Page(1));
        pages.push(Ellipsis);
        pages.extend((current - 1..=current + 1).map(Page));
        pages.push(Ellipsis);
        pages.push(Page(total));
    }
    pages
}
