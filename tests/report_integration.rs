// tests/report_integration.rs
//
// End-to-end report runs against the replay source and small hand-written
// remote fakes.

use async_trait::async_trait;
use rms_reports::connectors::{Page, PageMeta, ReplaySource};
use rms_reports::engine::{ReportQueryEngine, ReportRequest};
use rms_reports::error::{ReportError, Result};
use rms_reports::models::{Filter, Predicate, Sort};
use rms_reports::query::RemoteQuery;
use rms_reports::traits::RemoteSource;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn opportunities(count: usize) -> Vec<Value> {
    (1..=count)
        .map(|i| {
            json!({
                "id": i,
                "number": format!("OPP-{:04}", i),
                "subject": format!("Event {}", i),
                "starts_at": format!("2024-{:02}-10T09:00:00.000Z", (i % 12) + 1),
                "status": if i % 3 == 0 { "Confirmed" } else { "Provisional" },
                "member": { "name": format!("Customer {}", i % 4) },
                "totals": { "grand_total": format!("£{},000.00", i) }
            })
        })
        .collect()
}

#[tokio::test]
async fn test_first_page_of_filtered_opportunities() {
    // 30 records dated in 2024 plus 5 from 2023 that the filter drops
    let mut records = opportunities(30);
    records.extend((100..105).map(|i| json!({"id": i, "starts_at": "2023-06-01T00:00:00Z"})));
    let source = Arc::new(ReplaySource::new().with_collection("opportunities", records));
    let engine = ReportQueryEngine::new(source.clone());

    let request = ReportRequest::for_module("opportunities")
        .with_filter(Filter::new("starts_at", Predicate::Gteq, "2024-01-01"))
        .with_page(1)
        .with_per_page(25);
    let page = engine.execute(&request).await.unwrap();

    assert_eq!(page.total, 30);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.rows.len(), 25);
    assert_eq!(page.page, 1);

    let first = &page.rows[0];
    assert_eq!(first.get("member_name"), Some(&json!("Customer 1")));
    assert_eq!(first.get("grand_total"), Some(&json!(1000)));
    assert_eq!(page.columns.len(), page.column_schema.len());

    let sent = source.requests().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("q%5Bstarts_at_gteq%5D=2024-01-01"));
    assert!(sent[0].contains("include%5B%5D=member"));
}

#[tokio::test]
async fn test_fetch_all_truncates_to_max_rows() {
    let source = Arc::new(ReplaySource::new().with_collection("opportunities", opportunities(250)));
    let engine = ReportQueryEngine::new(source.clone());

    let rows = engine
        .fetch_all(&ReportRequest::for_module("opportunities").with_columns(["id"]), 150)
        .await
        .unwrap();
    assert_eq!(rows.len(), 150);
    assert_eq!(rows[149].get("id"), Some(&json!(150)));
    // ceil(150 / 100) pages of 100
    assert_eq!(source.request_count().await, 2);
}

#[tokio::test]
async fn test_fetch_all_stops_at_last_page() {
    let source = Arc::new(ReplaySource::new().with_collection("opportunities", opportunities(120)));
    let engine = ReportQueryEngine::new(source.clone());

    let rows = engine
        .fetch_all(&ReportRequest::for_module("opportunities"), 10_000)
        .await
        .unwrap();
    assert_eq!(rows.len(), 120);
    assert_eq!(source.request_count().await, 2);
}

#[tokio::test]
async fn test_filters_and_sort_reach_the_remote() {
    let source = Arc::new(ReplaySource::new().with_collection("opportunities", opportunities(12)));
    let engine = ReportQueryEngine::new(source);

    let request = ReportRequest::for_module("opportunities")
        .with_columns(["id", "subject"])
        .with_filter(Filter::new("status", Predicate::Eq, "Confirmed"))
        .with_sort(Sort::desc("id"));
    let page = engine.execute(&request).await.unwrap();

    let ids: Vec<i64> = page.rows.iter().filter_map(|r| r.get("id")?.as_i64()).collect();
    assert_eq!(ids, vec![12, 9, 6, 3]);
}

#[tokio::test]
async fn test_caller_errors() {
    let engine = ReportQueryEngine::new(ReplaySource::new().shared());

    assert_eq!(
        engine.execute(&ReportRequest::default()).await.unwrap_err(),
        ReportError::NoModuleSelected
    );
    assert_eq!(
        engine
            .execute(&ReportRequest::for_module("widgets"))
            .await
            .unwrap_err(),
        ReportError::InvalidModule("widgets".to_string())
    );
    let request = ReportRequest::for_module("invoices").with_filter(Filter::new("colour", Predicate::Eq, "red"));
    assert_eq!(
        engine.execute(&request).await.unwrap_err(),
        ReportError::InvalidFilterField {
            module: "invoices".to_string(),
            field: "colour".to_string()
        }
    );
}

/// Serves full pages until `fail_on`, then a 503.
struct FlakySource {
    fail_on: u32,
    calls: AtomicU32,
}

#[async_trait]
impl RemoteSource for FlakySource {
    fn name(&self) -> &str {
        "FlakySource"
    }

    async fn fetch_page(&self, _endpoint: &str, query: &RemoteQuery) -> Result<Page> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page = query.page().unwrap_or(1);
        if page == self.fail_on {
            return Err(ReportError::Remote {
                status: 503,
                detail: "Service Unavailable".to_string(),
            });
        }
        Ok(Page {
            records: (0..100).map(|i| json!({"id": page * 1000 + i})).collect(),
            meta: PageMeta {
                total_count: 1000,
                total_pages: 10,
            },
        })
    }
}

#[tokio::test]
async fn test_failing_page_aborts_crawl() {
    let source = Arc::new(FlakySource {
        fail_on: 3,
        calls: AtomicU32::new(0),
    });
    let engine = ReportQueryEngine::new(source.clone());

    let result = engine
        .fetch_all(&ReportRequest::for_module("projects"), 1000)
        .await;
    assert_eq!(
        result.unwrap_err(),
        ReportError::Remote {
            status: 503,
            detail: "Service Unavailable".to_string()
        }
    );
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_crawl_respects_max_pages_over_meta() {
    let source = Arc::new(FlakySource {
        fail_on: u32::MAX,
        calls: AtomicU32::new(0),
    });
    let rows = ReportQueryEngine::new(source.clone())
        .fetch_all(&ReportRequest::for_module("projects"), 250)
        .await
        .unwrap();
    assert_eq!(rows.len(), 250);
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
}

/// Claims ten pages but runs dry after `last_full` pages of 100.
struct ShortSource {
    last_full: u32,
    calls: AtomicU32,
}

#[async_trait]
impl RemoteSource for ShortSource {
    fn name(&self) -> &str {
        "ShortSource"
    }

    async fn fetch_page(&self, _endpoint: &str, query: &RemoteQuery) -> Result<Page> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let page = query.page().unwrap_or(1);
        let records = if page <= self.last_full {
            (0..100).map(|i| json!({"id": page * 1000 + i})).collect()
        } else {
            Vec::new()
        };
        Ok(Page {
            records,
            meta: PageMeta {
                total_count: 1000,
                total_pages: 10,
            },
        })
    }
}

#[tokio::test]
async fn test_crawl_stops_on_empty_page_before_meta_total() {
    let source = Arc::new(ShortSource {
        last_full: 2,
        calls: AtomicU32::new(0),
    });
    let rows = ReportQueryEngine::new(source.clone())
        .fetch_all(&ReportRequest::for_module("projects"), 1000)
        .await
        .unwrap();

    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    assert_eq!(rows.len(), 200);
    assert!(rows
        .iter()
        .filter_map(|r| r.get("id")?.as_u64())
        .all(|id| (1000..1100).contains(&id) || (2000..2100).contains(&id)));
}
