use std::collections::BTreeMap;

use url::form_urlencoded;

use crate::domain::entities::row::Row;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnFilter {
    pub column: String,
    pub term: String,
}

/// Table position as it lives in the navigable query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub page: i64,
    pub page_size: i64,
    pub search: String,
    pub sort: Option<SortSpec>,
    pub filters: Vec<ColumnFilter>,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search: String::new(),
            sort: None,
            filters: Vec::new(),
        }
    }
}

impl TableQuery {
    pub fn search_term(&self) -> Option<&str> {
        let term = self.search.trim();
        if term.is_empty() {
            None
        } else {
            Some(term)
        }
    }

    pub fn range(&self) -> FetchRange {
        FetchRange::for_page(self.page, self.page_size)
    }

    /// Parses `page`, `pageSize` and `q`. The flag is true when either
    /// pagination parameter was missing and defaults were assigned.
    pub fn from_query_string(query: &str) -> (TableQuery, bool) {
        let params = parse_query_string(query);
        let page = params.get("page").and_then(|v| v.parse::<i64>().ok());
        let page_size = params.get("pageSize").and_then(|v| v.parse::<i64>().ok());
        let assigned_defaults = page.is_none() || page_size.is_none();

        let (page, page_size) = if assigned_defaults {
            (1, DEFAULT_PAGE_SIZE)
        } else {
            (
                page.unwrap_or(1).max(1),
                page_size.filter(|size| *size > 0).unwrap_or(DEFAULT_PAGE_SIZE),
            )
        };

        let query = TableQuery {
            page,
            page_size,
            search: params.get("q").cloned().unwrap_or_default(),
            ..TableQuery::default()
        };
        (query, assigned_defaults)
    }

    pub fn to_query_string(&self) -> String {
        let mut out = form_urlencoded::Serializer::new(String::new());
        out.append_pair("page", &self.page.to_string())
            .append_pair("pageSize", &self.page_size.to_string());
        if let Some(term) = self.search_term() {
            out.append_pair("q", term);
        }
        out.finish()
    }
}

/// Inclusive, zero-based row window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRange {
    pub from: i64,
    pub to: i64,
}

impl FetchRange {
    pub fn for_page(page: i64, page_size: i64) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let from = (page - 1) * page_size;
        Self {
            from,
            to: from + page_size - 1,
        }
    }

    pub fn len(&self) -> i64 {
        (self.to - self.from + 1).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageResult {
    pub count: i64,
    pub rows: Vec<Row>,
}

fn parse_query_string(query: &str) -> BTreeMap<String, String> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_range_matches_page_windows() {
        assert_eq!(FetchRange::for_page(1, 10), FetchRange { from: 0, to: 9 });
        assert_eq!(FetchRange::for_page(3, 20), FetchRange { from: 40, to: 59 });
        assert_eq!(FetchRange::for_page(0, 10), FetchRange { from: 0, to: 9 });
    }

    #[test]
    fn missing_pagination_params_assign_defaults() {
        let (query, assigned) = TableQuery::from_query_string("");
        assert!(assigned);
        assert_eq!((query.page, query.page_size), (1, 10));

        let (query, assigned) = TableQuery::from_query_string("?page=4");
        assert!(assigned);
        assert_eq!((query.page, query.page_size), (1, 10));
    }

    #[test]
    fn query_string_round_trips_position_and_search() {
        let query = TableQuery {
            page: 3,
            page_size: 20,
            search: "press kit".to_string(),
            ..TableQuery::default()
        };
        let encoded = query.to_query_string();
        assert_eq!(encoded, "page=3&pageSize=20&q=press+kit");

        let (decoded, assigned) = TableQuery::from_query_string(&encoded);
        assert!(!assigned);
        assert_eq!(decoded, query);
    }

    #[test]
    fn search_terms_with_reserved_characters_survive() {
        let query = TableQuery {
            search: "R&D = 100%".to_string(),
            ..TableQuery::default()
        };
        let encoded = query.to_query_string();
        assert_eq!(encoded, "page=1&pageSize=10&q=R%26D+%3D+100%25");
        assert_eq!(TableQuery::from_query_string(&encoded).0.search, "R&D = 100%");
    }
}
