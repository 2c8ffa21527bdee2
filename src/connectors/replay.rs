// src/connectors/replay.rs
//
// Offline remote source. Serves recorded collections from memory or from a
// JSON file and honours the same query dialect as the live API: ransack
// filters on top-level fields, `q[s]` sorting and page/per_page slicing.

use super::{parse_list_response, resource_key, Page};
use crate::error::{ReportError, Result};
use crate::models::{Predicate, SortDirection};
use crate::query::{RemoteQuery, PAGE_PARAM, PER_PAGE_PARAM, SORT_PARAM};
use crate::traits::{RemoteSource, SharedRemoteSource};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Page size the remote falls back to when `per_page` is omitted.
const REMOTE_DEFAULT_PER_PAGE: usize = 20;

/// In-memory stand-in for the remote API.
pub struct ReplaySource {
    collections: HashMap<String, Vec<Value>>,
    // Query strings received, in order, for inspection
    requests: Mutex<Vec<String>>,
}

impl ReplaySource {
    pub fn new() -> Self {
        Self {
            collections: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Registers the records served for `endpoint`.
    pub fn with_collection(mut self, endpoint: impl Into<String>, records: Vec<Value>) -> Self {
        self.collections.insert(endpoint.into(), records);
        self
    }

    /// Loads a JSON object mapping endpoint names to record arrays, e.g.
    /// `{"opportunities": [..], "invoices": [..]}`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)?;
        let source = Self::from_json_str(&contents)?;
        info!(
            "ReplaySource: loaded {} collections from {}",
            source.collections.len(),
            path.as_ref().display()
        );
        Ok(source)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        let parsed: Value = serde_json::from_str(contents)
            .map_err(|e| ReportError::Decode(format!("replay data is not valid JSON: {}", e)))?;
        let Value::Object(map) = parsed else {
            return Err(ReportError::Decode(
                "replay data must be an object of endpoint -> records".to_string(),
            ));
        };

        let mut source = Self::new();
        for (endpoint, records) in map {
            match records {
                Value::Array(records) => source.collections.insert(endpoint, records),
                _ => {
                    return Err(ReportError::Decode(format!(
                        "replay collection `{}` is not an array",
                        endpoint
                    )))
                }
            };
        }
        Ok(source)
    }

    pub fn shared(self) -> SharedRemoteSource {
        Arc::new(self)
    }

    /// Query strings received so far.
    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for ReplaySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteSource for ReplaySource {
    fn name(&self) -> &str {
        "ReplaySource"
    }

    async fn fetch_page(&self, endpoint: &str, query: &RemoteQuery) -> Result<Page> {
        self.requests.lock().await.push(query.to_query_string());

        let collection_key = resource_key(endpoint);
        let records = self
            .collections
            .get(endpoint)
            .or_else(|| self.collections.get(collection_key))
            .ok_or_else(|| ReportError::Remote {
                status: 404,
                detail: format!("no such endpoint `{}`", endpoint),
            })?;

        let pairs = query.pairs();
        let conditions = parse_conditions(&pairs)?;

        let mut matched: Vec<&Value> = records
            .iter()
            .filter(|record| conditions.iter().all(|c| c.matches(record)))
            .collect();

        if let Some((field, direction)) = sort_param(&pairs) {
            matched.sort_by(|a, b| {
                let ordering = compare_values(a.get(&field), b.get(&field));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let page = last_param(&pairs, PAGE_PARAM)
            .and_then(|p| p.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);
        let per_page = last_param(&pairs, PER_PAGE_PARAM)
            .and_then(|p| p.parse::<usize>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(REMOTE_DEFAULT_PER_PAGE);

        let total = matched.len();
        let slice: Vec<Value> = matched
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .cloned()
            .collect();

        debug!(
            "ReplaySource: {} page {} -> {} of {} matching records",
            endpoint,
            page,
            slice.len(),
            total
        );

        // Same envelope as the live API, without total_pages
        let meta = json!({
            "total_row_count": total,
            "row_count": slice.len(),
            "page": page,
            "per_page": per_page,
        });
        let mut body = Map::new();
        body.insert(collection_key.to_string(), Value::Array(slice));
        body.insert("meta".to_string(), meta);
        parse_list_response(Value::Object(body), collection_key, Some(per_page as u32))
    }
}

// =============================================================================
// Filter Evaluation
// =============================================================================

struct Condition {
    field: String,
    predicate: Predicate,
    values: Vec<String>,
}

impl Condition {
    fn matches(&self, record: &Value) -> bool {
        let field = record.get(&self.field).filter(|v| !v.is_null());
        let first = self.values.first().map(String::as_str).unwrap_or("");

        match self.predicate {
            Predicate::Null => field.is_none() == is_truthy(first),
            Predicate::NotNull => field.is_some() == is_truthy(first),
            Predicate::In => field.map_or(false, |v| self.values.iter().any(|x| equals(v, x))),
            Predicate::NotIn => field.map_or(true, |v| !self.values.iter().any(|x| equals(v, x))),
            Predicate::Eq => field.map_or(false, |v| equals(v, first)),
            Predicate::NotEq => field.map_or(true, |v| !equals(v, first)),
            Predicate::Cont => field.map_or(false, |v| lower(v).contains(&first.to_lowercase())),
            Predicate::NotCont => field.map_or(true, |v| !lower(v).contains(&first.to_lowercase())),
            Predicate::Start => field.map_or(false, |v| lower(v).starts_with(&first.to_lowercase())),
            Predicate::End => field.map_or(false, |v| lower(v).ends_with(&first.to_lowercase())),
            Predicate::Lt => field.map_or(false, |v| compare_to(v, first) == Ordering::Less),
            Predicate::Lteq => field.map_or(false, |v| compare_to(v, first) != Ordering::Greater),
            Predicate::Gt => field.map_or(false, |v| compare_to(v, first) == Ordering::Greater),
            Predicate::Gteq => field.map_or(false, |v| compare_to(v, first) != Ordering::Less),
        }
    }
}

fn parse_conditions(pairs: &[(String, String)]) -> Result<Vec<Condition>> {
    let mut conditions: Vec<Condition> = Vec::new();

    for (key, value) in pairs {
        if key == SORT_PARAM {
            continue;
        }
        let Some(inner) = key.strip_prefix("q[") else {
            continue;
        };
        let attribute = inner
            .strip_suffix("][]")
            .or_else(|| inner.strip_suffix(']'))
            .unwrap_or(inner);

        let (field, predicate) = Predicate::split_attribute(attribute).ok_or_else(|| ReportError::Remote {
            status: 400,
            detail: format!("unsupported search attribute `{}`", attribute),
        })?;

        // Repeated list keys accumulate into one condition
        match conditions
            .iter_mut()
            .find(|c| c.field == field && c.predicate == predicate)
        {
            Some(existing) => existing.values.push(value.clone()),
            None => conditions.push(Condition {
                field: field.to_string(),
                predicate,
                values: vec![value.clone()],
            }),
        }
    }

    Ok(conditions)
}

fn sort_param(pairs: &[(String, String)]) -> Option<(String, SortDirection)> {
    let spec = last_param(pairs, SORT_PARAM)?;
    let mut parts = spec.split_whitespace();
    let field = parts.next()?.to_string();
    let direction = match parts.next() {
        Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
        _ => SortDirection::Asc,
    };
    Some((field, direction))
}

fn last_param<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "false" | "0" | "f")
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn lower(value: &Value) -> String {
    text(value).to_lowercase()
}

fn equals(value: &Value, expected: &str) -> bool {
    compare_to(value, expected) == Ordering::Equal
}

/// Numeric comparison when both sides parse as numbers, lexical otherwise.
fn compare_to(value: &Value, expected: &str) -> Ordering {
    let actual = text(value);
    match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => actual.as_str().cmp(expected),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_to(a, &text(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Filter, Sort};
    use crate::query::{raw_with_includes, to_remote_params};

    fn source() -> ReplaySource {
        ReplaySource::new().with_collection(
            "opportunities",
            vec![
                json!({"id": 1, "subject": "Summer Festival", "status": "Confirmed", "charge_total": "1200"}),
                json!({"id": 2, "subject": "Winter Gala", "status": "Provisional", "charge_total": "300"}),
                json!({"id": 3, "subject": "Spring Fair", "status": "Confirmed", "charge_total": "90", "venue_name": null}),
            ],
        )
    }

    async fn fetch(source: &ReplaySource, filters: &[Filter], sort: Option<&Sort>) -> Page {
        let params = to_remote_params(filters, sort, 1, 25);
        source
            .fetch_page("opportunities", &RemoteQuery::Params(params))
            .await
            .unwrap()
    }

    fn ids(page: &Page) -> Vec<i64> {
        page.records.iter().filter_map(|r| r["id"].as_i64()).collect()
    }

    #[tokio::test]
    async fn test_eq_and_cont_filters() {
        let s = source();
        let page = fetch(&s, &[Filter::new("status", Predicate::Eq, "Confirmed")], None).await;
        assert_eq!(ids(&page), vec![1, 3]);
        assert_eq!(page.meta.total_count, 2);

        let page = fetch(&s, &[Filter::new("subject", Predicate::Cont, "gala")], None).await;
        assert_eq!(ids(&page), vec![2]);
    }

    #[tokio::test]
    async fn test_numeric_comparison_and_sort() {
        let s = source();
        let page = fetch(
            &s,
            &[Filter::new("charge_total", Predicate::Gteq, "300")],
            Some(&Sort::desc("charge_total")),
        )
        .await;
        assert_eq!(ids(&page), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_list_and_presence_filters() {
        let s = source();
        let page = fetch(
            &s,
            &[Filter::list("status", Predicate::NotIn, ["Provisional", "Lost"])],
            None,
        )
        .await;
        assert_eq!(ids(&page), vec![1, 3]);

        let page = fetch(&s, &[Filter::presence("venue_name", Predicate::Null)], None).await;
        assert_eq!(ids(&page), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_paging_over_raw_query() {
        let s = source();
        let params = to_remote_params(&[], Some(&Sort::asc("id")), 2, 2);
        let query = raw_with_includes(&params, &["member", "owner"]);
        let page = s.fetch_page("opportunities", &query).await.unwrap();
        assert_eq!(ids(&page), vec![3]);
        assert_eq!(page.meta.total_pages, 2);
        assert_eq!(s.request_count().await, 1);
        assert!(s.requests().await[0].contains("include%5B%5D=member"));
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_remote_404() {
        let result = source()
            .fetch_page("invoices", &RemoteQuery::Raw(String::new()))
            .await;
        assert!(matches!(result, Err(ReportError::Remote { status: 404, .. })));
    }

    #[test]
    fn test_from_json_str_rejects_non_arrays() {
        assert!(ReplaySource::from_json_str(r#"{"members": [{"id": 1}]}"#).is_ok());
        assert!(matches!(
            ReplaySource::from_json_str(r#"{"members": {"id": 1}}"#),
            Err(ReportError::Decode(_))
        ));
        assert!(matches!(ReplaySource::from_json_str("[]"), Err(ReportError::Decode(_))));
    }
}
