// src/query/mod.rs
//
// Translation of engine-level filters/sort/pagination into the remote
// service's ransack-style query dialect, plus the two query forms the remote
// client accepts: a structured parameter map and a raw pre-encoded string.

use crate::models::{Filter, FilterValue, Sort};
use serde::Serialize;
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Parameter carrying the sort expression.
pub const SORT_PARAM: &str = "q[s]";
pub const PAGE_PARAM: &str = "page";
pub const PER_PAGE_PARAM: &str = "per_page";
pub const INCLUDE_PARAM: &str = "include[]";

// =============================================================================
// Structured Parameters
// =============================================================================

/// A single value or a value list (encoded as repeated `key[]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    List(Vec<String>),
}

/// Flat key -> value(s) mapping already in the remote dialect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RemoteParams(BTreeMap<String, ParamValue>);

impl RemoteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), ParamValue::Single(value.into()));
    }

    pub fn insert_list(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.0.insert(key.into(), ParamValue::List(values));
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Value of a single-valued parameter.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            ParamValue::Single(s) => Some(s),
            ParamValue::List(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Expands into wire pairs; list values repeat as `key[]`.
    pub fn pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.0.len());
        for (key, value) in &self.0 {
            match value {
                ParamValue::Single(v) => pairs.push((key.clone(), v.clone())),
                ParamValue::List(values) => {
                    let list_key = format!("{}[]", key);
                    pairs.extend(values.iter().map(|v| (list_key.clone(), v.clone())));
                }
            }
        }
        pairs
    }

    pub fn to_query_string(&self) -> String {
        encode_pairs(&self.pairs())
    }
}

// =============================================================================
// Query Forms
// =============================================================================

/// What the remote client sends after the `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteQuery {
    /// Structured, single key per parameter.
    Params(RemoteParams),
    /// Pre-encoded query string; may repeat parameter names (`include[]`).
    Raw(String),
}

impl RemoteQuery {
    /// Wire pairs in send order.
    pub fn pairs(&self) -> Vec<(String, String)> {
        match self {
            RemoteQuery::Params(params) => params.pairs(),
            RemoteQuery::Raw(raw) => form_urlencoded::parse(raw.trim_start_matches('?').as_bytes())
                .into_owned()
                .collect(),
        }
    }

    pub fn to_query_string(&self) -> String {
        match self {
            RemoteQuery::Params(params) => params.to_query_string(),
            RemoteQuery::Raw(raw) => raw.trim_start_matches('?').to_string(),
        }
    }

    /// Same query addressed at `page`, replacing any existing page parameter.
    pub fn with_page(&self, page: u32) -> RemoteQuery {
        match self {
            RemoteQuery::Params(params) => {
                let mut params = params.clone();
                params.insert(PAGE_PARAM, page.to_string());
                RemoteQuery::Params(params)
            }
            RemoteQuery::Raw(_) => {
                let mut pairs: Vec<(String, String)> =
                    self.pairs().into_iter().filter(|(k, _)| k != PAGE_PARAM).collect();
                pairs.push((PAGE_PARAM.to_string(), page.to_string()));
                RemoteQuery::Raw(encode_pairs(&pairs))
            }
        }
    }

    /// The `per_page` the query asks for, if any.
    pub fn per_page(&self) -> Option<u32> {
        self.param(PER_PAGE_PARAM).and_then(|v| v.parse().ok())
    }

    pub fn page(&self) -> Option<u32> {
        self.param(PAGE_PARAM).and_then(|v| v.parse().ok())
    }

    fn param(&self, key: &str) -> Option<String> {
        match self {
            RemoteQuery::Params(params) => params.get_str(key).map(str::to_string),
            RemoteQuery::Raw(_) => self
                .pairs()
                .into_iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v),
        }
    }
}

impl From<RemoteParams> for RemoteQuery {
    fn from(params: RemoteParams) -> Self {
        RemoteQuery::Params(params)
    }
}

fn encode_pairs(pairs: &[(String, String)]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}

// =============================================================================
// Translator
// =============================================================================

/// Parameter name for a filter: `q[{field}_{predicate}]`.
pub fn filter_param_name(filter: &Filter) -> String {
    format!("q[{}_{}]", filter.field, filter.predicate.as_str())
}

/// Converts filters, sort and pagination into remote parameters.
///
/// Pure: no catalog validation happens here. The engine checks filter fields
/// and predicates before calling this, and rejects a repeated field and
/// predicate pair since a later value would replace the earlier one.
pub fn to_remote_params(
    filters: &[Filter],
    sort: Option<&Sort>,
    page: u32,
    per_page: u32,
) -> RemoteParams {
    let mut params = RemoteParams::new();

    for filter in filters {
        let name = filter_param_name(filter);
        match &filter.value {
            Some(FilterValue::List(values)) => params.insert_list(name, values.clone()),
            Some(FilterValue::Single(value)) => params.insert(name, value.clone()),
            // ransack reads `q[x_null]=true`
            None => params.insert(name, "true"),
        }
    }

    if let Some(sort) = sort {
        params.insert(SORT_PARAM, format!("{} {}", sort.field, sort.direction));
    }

    params.insert(PAGE_PARAM, page.to_string());
    params.insert(PER_PAGE_PARAM, per_page.to_string());
    params
}

/// Raw query form of `params` followed by one `include[]` per association.
pub fn raw_with_includes(params: &RemoteParams, includes: &[&str]) -> RemoteQuery {
    let mut pairs = params.pairs();
    pairs.extend(
        includes
            .iter()
            .map(|inc| (INCLUDE_PARAM.to_string(), inc.to_string())),
    );
    RemoteQuery::Raw(encode_pairs(&pairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Predicate;

    #[test]
    fn test_single_filter_translation() {
        let filters = vec![Filter::new("status", Predicate::Eq, "Confirmed")];
        let params = to_remote_params(&filters, None, 1, 25);
        assert_eq!(params.get_str("q[status_eq]"), Some("Confirmed"));
        assert_eq!(params.get_str("page"), Some("1"));
        assert_eq!(params.get_str("per_page"), Some("25"));
        assert!(params.get("q[s]").is_none());
    }

    #[test]
    fn test_sort_translation() {
        let params = to_remote_params(&[], Some(&Sort::desc("starts_at")), 2, 50);
        assert_eq!(params.get_str("q[s]"), Some("starts_at desc"));
        assert_eq!(params.get_str("page"), Some("2"));
    }

    #[test]
    fn test_list_and_presence_filters() {
        let filters = vec![
            Filter::list("status", Predicate::In, ["Open", "Confirmed"]),
            Filter::presence("venue_id", Predicate::NotNull),
        ];
        let params = to_remote_params(&filters, None, 1, 10);
        assert_eq!(params.get_str("q[venue_id_not_null]"), Some("true"));

        let pairs = params.pairs();
        let listed: Vec<&str> = pairs
            .iter()
            .filter(|(k, _)| k == "q[status_in][]")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(listed, vec!["Open", "Confirmed"]);
    }

    #[test]
    fn test_query_string_is_form_encoded() {
        let mut params = RemoteParams::new();
        params.insert("q[subject_cont]", "A & B");
        assert_eq!(params.to_query_string(), "q%5Bsubject_cont%5D=A+%26+B");
    }

    #[test]
    fn test_raw_with_includes_repeats_include() {
        let params = to_remote_params(&[], None, 1, 20);
        let query = raw_with_includes(&params, &["member", "owner"]);
        let includes: Vec<String> = query
            .pairs()
            .into_iter()
            .filter(|(k, _)| k == "include[]")
            .map(|(_, v)| v)
            .collect();
        assert_eq!(includes, vec!["member", "owner"]);
        assert_eq!(query.per_page(), Some(20));
    }

    #[test]
    fn test_with_page_replaces_page_in_both_forms() {
        let params = to_remote_params(&[], None, 1, 100);

        let structured = RemoteQuery::from(params.clone()).with_page(3);
        assert_eq!(structured.page(), Some(3));

        let raw = raw_with_includes(&params, &["member"]).with_page(4);
        assert_eq!(raw.page(), Some(4));
        let page_count = raw.pairs().iter().filter(|(k, _)| k == "page").count();
        assert_eq!(page_count, 1);
        assert!(raw.to_query_string().contains("include%5B%5D=member"));
    }
}
