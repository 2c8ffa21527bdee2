// tests/analytics_integration.rs
//
// Aggregations, period comparison and widgets through the report service,
// served by an in-memory replay of invoices and opportunities.

use chrono::NaiveDate;
use rms_reports::analytics::{AggregateFn, Interval};
use rms_reports::connectors::ReplaySource;
use rms_reports::error::ReportError;
use rms_reports::models::{Filter, Predicate};
use rms_reports::service::{AggregateQuery, ReportDefinition, ReportService};
use serde_json::json;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 18).unwrap()
}

fn service() -> ReportService {
    let invoices = vec![
        json!({"id": 1, "number": "INV-1", "member": {"name": "Acme"}, "invoice_date": "2024-03-02", "grand_total": "150.00", "status": "Issued"}),
        json!({"id": 2, "number": "INV-2", "member": {"name": "Brightside"}, "invoice_date": "2024-03-15", "grand_total": "50.00", "status": "Paid"}),
        json!({"id": 3, "number": "INV-3", "member": {"name": "Acme"}, "invoice_date": "2024-02-20", "grand_total": "100.00", "status": "Paid"}),
        json!({"id": 4, "number": "INV-4", "member": {"name": "Cobalt"}, "invoice_date": "2023-12-01", "grand_total": "£1,000.00", "status": "Paid"}),
        json!({"id": 5, "number": "INV-5", "member": {"name": "Dunmore"}, "invoice_date": "2022-01-01", "grand_total": "9999", "status": "Paid"}),
    ];
    let opportunities = vec![
        json!({"id": 1, "status_name": "Confirmed", "starts_at": "2024-03-15T10:00:00"}),
        json!({"id": 2, "status_name": "Provisional", "starts_at": "2024-01-02T08:30:00"}),
        json!({"id": 3, "status_name": "Confirmed", "starts_at": "2023-11-30T23:00:00"}),
        json!({"id": 4, "status_name": null}),
    ];
    let source = ReplaySource::new()
        .with_collection("invoices", invoices)
        .with_collection("opportunities", opportunities);
    ReportService::new(source.shared(), 1000)
}

#[tokio::test]
async fn test_aggregate_sum_by_customer() {
    let result = service()
        .aggregate(
            &AggregateQuery::new("invoices").with_filter(Filter::new("invoice_date", Predicate::Gteq, "2023-01-01")),
            "member_name",
            Some("grand_total"),
            AggregateFn::Sum,
        )
        .await
        .unwrap();
    assert_eq!(result.labels, vec!["Acme", "Brightside", "Cobalt"]);
    assert_eq!(result.values, vec![250.0, 50.0, 1000.0]);
    assert_eq!(result.total, Some(1300.0));
}

#[tokio::test]
async fn test_count_by_status_groups_missing_values() {
    let result = service()
        .aggregate(&AggregateQuery::new("opportunities"), "status_name", None, AggregateFn::Count)
        .await
        .unwrap();
    assert_eq!(result.labels, vec!["Confirmed", "Provisional", "Unspecified"]);
    assert_eq!(result.values, vec![2.0, 1.0, 1.0]);
}

#[tokio::test]
async fn test_quarterly_series() {
    let result = service()
        .time_series(
            &AggregateQuery::new("opportunities"),
            "starts_at",
            None,
            AggregateFn::Count,
            Interval::Quarter,
        )
        .await
        .unwrap();
    assert_eq!(result.labels, vec!["2023-Q4", "2024-Q1"]);
    assert_eq!(result.values, vec![1.0, 2.0]);
}

#[tokio::test]
async fn test_compare_current_and_previous_month() {
    let comparison = service()
        .compare_period(
            &AggregateQuery::new("invoices"),
            "invoice_date",
            Some("grand_total"),
            AggregateFn::Sum,
            today(),
        )
        .await
        .unwrap();
    assert_eq!(comparison.current, 200.0);
    assert_eq!(comparison.previous, 100.0);
    assert_eq!(comparison.change, 100.0);
}

#[tokio::test]
async fn test_compare_needs_a_date_filter() {
    let result = service()
        .compare_period(
            &AggregateQuery::new("opportunities"),
            "status_name",
            None,
            AggregateFn::Count,
            today(),
        )
        .await;
    assert!(matches!(result, Err(ReportError::InvalidFilterField { .. })));
}

#[tokio::test]
async fn test_top_customers_widget() {
    let run = service().run_widget("top_customers", today()).await.unwrap();
    assert_eq!(run.widget.module, "invoices");
    // 2022 invoice is outside the twelve month lookback
    assert_eq!(run.result.labels, vec!["Cobalt", "Acme", "Brightside"]);
    assert_eq!(run.result.values, vec![1000.0, 250.0, 50.0]);
}

#[tokio::test]
async fn test_revenue_by_month_widget() {
    let run = service().run_widget("revenue_by_month", today()).await.unwrap();
    assert_eq!(run.result.labels, vec!["2023-12", "2024-02", "2024-03"]);
    assert_eq!(run.result.values, vec![1000.0, 100.0, 200.0]);
}

#[tokio::test]
async fn test_saved_definition_replay() {
    let definition = ReportDefinition::from_json(
        r#"{"module":"invoices","columns":["number","grand_total"],
            "filters":[{"field":"status","predicate":"eq","value":"Paid"}],
            "sorting":{"field":"id","direction":"desc"}}"#,
    )
    .unwrap();
    let page = service().run_definition(&definition, 1, 2).await.unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.total_pages, 2);
    let numbers: Vec<String> = page.rows.iter().filter_map(|r| r.get_str("number")).collect();
    assert_eq!(numbers, vec!["INV-5", "INV-4"]);
    assert_eq!(page.rows[1].get("grand_total"), Some(&json!(1000)));
}
