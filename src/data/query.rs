//! Table API query builder
//!
//! Builds PostgREST query strings (`column=op.value` pairs). The
//! builder only produces parameters; sending them is the job of
//! [`super::RestClient`].

use super::models::NewsFilters;

/// Ordered list of query parameters for one table request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestQuery {
    params: Vec<(String, String)>,
}

impl RestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Case-insensitive pattern match; `*` is the wildcard
    pub fn ilike(mut self, column: &str, pattern: &str) -> Self {
        self.params.push((column.to_string(), format!("ilike.{pattern}")));
        self
    }

    pub fn in_list<S: AsRef<str>>(mut self, column: &str, values: &[S]) -> Self {
        let quoted: Vec<String> = values.iter().map(|v| quote_value(v.as_ref())).collect();
        self.params
            .push((column.to_string(), format!("in.({})", quoted.join(","))));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params
            .push(("order".to_string(), format!("{column}.{direction}")));
        self
    }

    /// Inclusive row range, same as `offset=from&limit=to-from+1`
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.params.push(("offset".to_string(), from.to_string()));
        self.params
            .push(("limit".to_string(), (to.saturating_sub(from) + 1).to_string()));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.params.push(("limit".to_string(), limit.to_string()));
        self
    }

    pub fn on_conflict(mut self, columns: &str) -> Self {
        self.params
            .push(("on_conflict".to_string(), columns.to_string()));
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Value of the first parameter with this key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Quote a value for use inside `in.(...)`
///
/// Double quotes and backslashes are escaped so values containing
/// commas or parentheses stay a single item.
fn quote_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// Strip the `ilike` wildcards from a search term
fn escape_pattern(term: &str) -> String {
    term.chars().filter(|c| !matches!(c, '*' | '%')).collect()
}

/// Listing query for the dashboard table
///
/// Filters are expected to be normalized already: `None` means the
/// filter is not applied.
pub fn news_list_query(filters: &NewsFilters) -> RestQuery {
    let mut query = RestQuery::new().select("*");

    if let Some(term) = filters.query.as_deref() {
        let term = escape_pattern(term.trim());
        if !term.is_empty() {
            query = query.ilike("headline", &format!("*{term}*"));
        }
    }

    if let Some(category) = filters.category.as_deref() {
        query = query.eq("category", category);
    }

    if let Some(source) = filters.source.as_deref() {
        query = query.eq("source_name", source);
    }

    let limit = u64::from(filters.limit.max(1));
    let offset = u64::from(filters.offset);
    query
        .order(filters.sort.column(), filters.order == super::SortOrder::Asc)
        .range(offset, offset + limit - 1)
}

/// Parse the total out of a `Content-Range` header
///
/// Accepts `0-19/123`, `*/0` and rejects an unknown total (`0-19/*`).
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    let (_, total) = header.trim().rsplit_once('/')?;
    total.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SortField, SortOrder};

    #[test]
    fn default_listing_orders_newest_first() {
        let query = news_list_query(&NewsFilters::default());

        assert_eq!(query.get("select"), Some("*"));
        assert_eq!(query.get("order"), Some("created_at.desc"));
        assert_eq!(query.get("offset"), Some("0"));
        assert_eq!(query.get("limit"), Some("20"));
        assert_eq!(query.get("headline"), None);
        assert_eq!(query.get("category"), None);
    }

    #[test]
    fn listing_applies_all_filters() {
        let filters = NewsFilters {
            limit: 10,
            offset: 30,
            query: Some("  election ".to_string()),
            sort: SortField::Headline,
            order: SortOrder::Asc,
            category: Some("World".to_string()),
            source: Some("BBC News".to_string()),
        };

        let query = news_list_query(&filters);
        assert_eq!(query.get("headline"), Some("ilike.*election*"));
        assert_eq!(query.get("category"), Some("eq.World"));
        assert_eq!(query.get("source_name"), Some("eq.BBC News"));
        assert_eq!(query.get("order"), Some("headline.asc"));
        assert_eq!(query.get("offset"), Some("30"));
        assert_eq!(query.get("limit"), Some("10"));
    }

    #[test]
    fn search_term_wildcards_are_stripped() {
        let filters = NewsFilters {
            query: Some("100% *up*".to_string()),
            ..Default::default()
        };

        let query = news_list_query(&filters);
        assert_eq!(query.get("headline"), Some("ilike.*100 up*"));
    }

    #[test]
    fn search_term_keeps_punctuation() {
        let filters = NewsFilters {
            query: Some("Strikes (again), today".to_string()),
            ..Default::default()
        };

        let query = news_list_query(&filters);
        assert_eq!(query.get("headline"), Some("ilike.*Strikes (again), today*"));
    }

    #[test]
    fn blank_search_term_is_ignored() {
        let filters = NewsFilters {
            query: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(news_list_query(&filters).get("headline"), None);
    }

    #[test]
    fn in_list_quotes_values() {
        let query = RestQuery::new().in_list(
            "source_link",
            &["https://a.example/x,y", "https://b.example/\"q\""],
        );
        assert_eq!(
            query.get("source_link"),
            Some(r#"in.("https://a.example/x,y","https://b.example/\"q\"")"#)
        );
    }

    #[test]
    fn range_is_inclusive() {
        let query = RestQuery::new().range(20, 39);
        assert_eq!(query.get("offset"), Some("20"));
        assert_eq!(query.get("limit"), Some("20"));
    }

    #[test]
    fn content_range_total_parsing() {
        assert_eq!(parse_content_range_total("0-19/123"), Some(123));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-19/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
