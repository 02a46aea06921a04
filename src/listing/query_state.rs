use serde::Serialize;

use crate::util::QueryParams;

pub const DEFAULT_YEAR_FROM: i32 = 1970;
pub const DEFAULT_YEAR_TO: i32 = 2025;
pub const ALL_GENRES: &str = "all";

/// What the UI is currently showing, as carried in the page URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState {
    pub query: Option<String>,
    /// Genre id; `None` means all genres.
    pub genre: Option<u32>,
    pub year_from: i32,
    pub year_to: i32,
    pub page: u32,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            query: None,
            genre: None,
            year_from: DEFAULT_YEAR_FROM,
            year_to: DEFAULT_YEAR_TO,
            page: 1,
        }
    }
}

impl QueryState {
    pub fn from_params(params: &QueryParams) -> Self {
        let defaults = Self::default();

        let query = params
            .get_non_empty("query")
            .map(|q| q.to_string());

        let genre = params
            .get_non_empty("genre")
            .filter(|g| !g.eq_ignore_ascii_case(ALL_GENRES))
            .and_then(|g| g.trim().parse::<u32>().ok());

        let year_from = params
            .get("yearFrom")
            .and_then(|y| y.trim().parse::<i32>().ok())
            .unwrap_or(defaults.year_from);

        let year_to = params
            .get("yearTo")
            .and_then(|y| y.trim().parse::<i32>().ok())
            .unwrap_or(defaults.year_to);

        let page = params
            .get("page")
            .and_then(|p| p.trim().parse::<u32>().ok())
            .unwrap_or(defaults.page)
            .max(1);

        Self {
            query,
            genre,
            year_from,
            year_to,
            page,
        }
    }

    pub fn from_url(raw: &str) -> Self {
        Self::from_params(&QueryParams::parse(raw))
    }

    /// Minimal URL form: the no-filter values (`genre=all`, empty query,
    /// first page) are left out; year bounds are always written.
    pub fn to_url_params(&self) -> String {
        let mut parts = Vec::with_capacity(5);

        if let Some(query) = self.query.as_deref().filter(|q| !q.trim().is_empty()) {
            parts.push(format!("query={}", urlencoding::encode(query)));
        }
        if let Some(genre) = self.genre {
            parts.push(format!("genre={}", genre));
        }
        parts.push(format!("yearFrom={}", self.year_from));
        parts.push(format!("yearTo={}", self.year_to));
        if self.page > 1 {
            parts.push(format!("page={}", self.page));
        }

        parts.join("&")
    }

    pub fn search_query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.trim().is_empty())
    }

    /// True when a genre or non-default year range is selected.
    pub fn has_filters(&self) -> bool {
        self.genre.is_some()
            || self.year_from != DEFAULT_YEAR_FROM
            || self.year_to != DEFAULT_YEAR_TO
    }
}
