// src/connectors/mod.rs
//
// Remote sources: the live HTTP client and the offline replay source, plus
// the list-envelope and error-envelope parsing they share.

pub mod current_rms;
pub mod replay;

use crate::error::{ReportError, Result};
use log::warn;
use serde::Serialize;
use serde_json::Value;

pub use current_rms::RemoteApiClient;
pub use replay::ReplaySource;

// =============================================================================
// Page Types
// =============================================================================

/// Pagination metadata of one list response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    /// Total rows matching the query across all pages.
    pub total_count: u64,
    /// Number of pages at the requested page size.
    pub total_pages: u32,
}

/// One page of raw records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    pub meta: PageMeta,
}

// =============================================================================
// Envelope Parsing
// =============================================================================

/// Key under which a list response envelopes its records: the last path
/// segment of the endpoint (`setup/stores` -> `stores`).
pub fn resource_key(endpoint: &str) -> &str {
    endpoint.rsplit('/').next().unwrap_or(endpoint)
}

/// Extracts records and meta from a list response.
///
/// Records live under `resource_key`; meta carries `total_row_count` and
/// usually `total_pages`. When `total_pages` is missing it is derived from the
/// row count and the page size (from meta, else the one requested).
pub fn parse_list_response(body: Value, resource_key: &str, requested_per_page: Option<u32>) -> Result<Page> {
    let mut body = match body {
        Value::Object(map) => map,
        other => {
            return Err(ReportError::Decode(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )))
        }
    };

    let records = match body.remove(resource_key) {
        Some(Value::Array(records)) => records,
        Some(other) => {
            return Err(ReportError::Decode(format!(
                "`{}` is {}, expected an array",
                resource_key,
                json_kind(&other)
            )))
        }
        None => {
            return Err(ReportError::Decode(format!(
                "response has no `{}` collection",
                resource_key
            )))
        }
    };

    let meta = body.get("meta");
    if meta.is_none() {
        warn!("list response for `{}` has no meta block", resource_key);
    }

    let total_count = meta
        .and_then(|m| read_u64(m.get("total_row_count")))
        .unwrap_or(records.len() as u64);
    let per_page = meta
        .and_then(|m| read_u64(m.get("per_page")))
        .map(|p| p as u32)
        .or(requested_per_page)
        .filter(|p| *p > 0);

    let total_pages = match meta.and_then(|m| read_u64(m.get("total_pages"))) {
        Some(pages) => pages as u32,
        None => match per_page {
            Some(per_page) => total_count.div_ceil(per_page as u64) as u32,
            None if records.is_empty() => 0,
            None => 1,
        },
    };

    Ok(Page {
        records,
        meta: PageMeta {
            total_count,
            total_pages,
        },
    })
}

/// Human-readable detail from an error response body.
///
/// Looks for `{"errors":[{"detail":..}]}` first, then a bare `{"error":..}`,
/// and falls back to the status reason phrase.
pub fn remote_error_detail(status: u16, body: &str) -> String {
    let fallback = || {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status))
    };

    let parsed: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return fallback(),
    };

    let from_errors = parsed
        .get("errors")
        .and_then(|errors| errors.get(0))
        .and_then(|first| match first {
            Value::String(s) => Some(s.clone()),
            other => other.get("detail").and_then(text_of),
        });
    if let Some(detail) = from_errors {
        return detail;
    }

    match parsed.get("error") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(text_of)
            .unwrap_or_else(|| Value::Object(obj.clone()).to_string()),
        Some(other) if !other.is_null() => other.to_string(),
        _ => fallback(),
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn read_u64(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_key_is_last_endpoint_segment() {
        assert_eq!(resource_key("purchase_orders"), "purchase_orders");
        assert_eq!(resource_key("setup/stores"), "stores");
    }

    #[test]
    fn test_parse_list_response_with_total_pages() {
        let body = json!({
            "opportunities": [{"id": 1}, {"id": 2}],
            "meta": {"total_row_count": 30, "total_pages": 2, "per_page": 25}
        });
        let page = parse_list_response(body, "opportunities", Some(25)).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.meta, PageMeta { total_count: 30, total_pages: 2 });
    }

    #[test]
    fn test_parse_list_response_derives_total_pages() {
        let body = json!({
            "invoices": [],
            "meta": {"total_row_count": "201", "row_count": 0, "page": 9}
        });
        let page = parse_list_response(body, "invoices", Some(25)).unwrap();
        assert_eq!(page.meta.total_count, 201);
        assert_eq!(page.meta.total_pages, 9);
    }

    #[test]
    fn test_parse_list_response_without_meta() {
        let body = json!({"members": [{"id": 1}]});
        let page = parse_list_response(body, "members", None).unwrap();
        assert_eq!(page.meta, PageMeta { total_count: 1, total_pages: 1 });
    }

    #[test]
    fn test_parse_list_response_rejects_bad_envelopes() {
        assert!(matches!(
            parse_list_response(json!([1, 2]), "products", None),
            Err(ReportError::Decode(_))
        ));
        assert!(matches!(
            parse_list_response(json!({"product": []}), "products", None),
            Err(ReportError::Decode(_))
        ));
        assert!(matches!(
            parse_list_response(json!({"products": {"id": 1}}), "products", None),
            Err(ReportError::Decode(_))
        ));
    }

    #[test]
    fn test_remote_error_detail_envelopes() {
        assert_eq!(
            remote_error_detail(422, r#"{"errors":[{"detail":"Invalid filter"}]}"#),
            "Invalid filter"
        );
        assert_eq!(remote_error_detail(400, r#"{"errors":["Bad page"]}"#), "Bad page");
        assert_eq!(remote_error_detail(401, r#"{"error":"Not authenticated"}"#), "Not authenticated");
        assert_eq!(
            remote_error_detail(403, r#"{"error":{"message":"Forbidden store"}}"#),
            "Forbidden store"
        );
        assert_eq!(remote_error_detail(502, "<html>bad gateway</html>"), "Bad Gateway");
        assert_eq!(remote_error_detail(500, "{}"), "Internal Server Error");
    }
}
