// src/service.rs
//
// The report service: module discovery, paged and full reports, ad-hoc
// aggregation, period comparison, widgets and saved-definition replay.
// Aggregations run over a capped full crawl of the filtered collection.

use crate::analytics::{
    self, compare_values, get_widget, month_ranges, top_n, AggregateFn, Interval, Widget, WidgetKind,
};
use crate::catalog::{ModuleRegistry, ModuleSchema, ModuleSummary};
use crate::config::Config;
use crate::connectors::RemoteApiClient;
use crate::engine::{ReportPage, ReportQueryEngine, ReportRequest};
use crate::error::{ReportError, Result};
use crate::models::{AggregationResult, Filter, FlattenedRow, PeriodComparison, Predicate, Sort};
use crate::traits::SharedRemoteSource;
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

// =============================================================================
// Inputs
// =============================================================================

/// Which rows an aggregation runs over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateQuery {
    pub module: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl AggregateQuery {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    fn request(&self) -> ReportRequest {
        ReportRequest::for_module(self.module.clone()).with_filters(self.filters.clone())
    }
}

/// A saved report as the persistence layer stores it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportDefinition {
    pub module: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sorting: Option<Sort>,
}

impl ReportDefinition {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ReportError::Decode(format!("invalid report definition: {}", e)))
    }

    pub fn to_request(&self, page: u32, per_page: u32) -> ReportRequest {
        let request = ReportRequest::for_module(self.module.clone())
            .with_columns(self.columns.clone())
            .with_filters(self.filters.clone())
            .with_page(page)
            .with_per_page(per_page);
        match &self.sorting {
            Some(sort) => request.with_sort(sort.clone()),
            None => request,
        }
    }
}

/// A widget together with its computed series.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WidgetResult {
    pub widget: &'static Widget,
    pub result: AggregationResult,
}

// =============================================================================
// Service
// =============================================================================

/// Entry point for callers; cheap to clone.
#[derive(Clone)]
pub struct ReportService {
    engine: ReportQueryEngine,
    /// Row cap for the crawls behind aggregations and widgets
    max_rows: usize,
}

impl ReportService {
    pub fn new(source: SharedRemoteSource, max_rows: usize) -> Self {
        Self {
            engine: ReportQueryEngine::new(source),
            max_rows,
        }
    }

    /// Service backed by the live API described in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = RemoteApiClient::new(&config.api)?;
        Ok(Self::new(client.shared(), config.report.max_rows))
    }

    pub fn engine(&self) -> &ReportQueryEngine {
        &self.engine
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn list_modules(&self) -> Vec<ModuleSummary> {
        ModuleRegistry::get_modules().iter().map(|m| m.summary()).collect()
    }

    pub fn get_module_schema(&self, key: &str) -> Result<ModuleSchema> {
        Ok(ModuleRegistry::get_module(key)?.schema())
    }

    pub async fn run_report(&self, request: &ReportRequest) -> Result<ReportPage> {
        self.engine.execute(request).await
    }

    pub async fn run_report_full(&self, request: &ReportRequest, max_rows: usize) -> Result<Vec<FlattenedRow>> {
        self.engine.fetch_all(request, max_rows).await
    }

    /// Groups the filtered collection by `group_by` and reduces each group.
    pub async fn aggregate(
        &self,
        query: &AggregateQuery,
        group_by: &str,
        aggregate_field: Option<&str>,
        function: AggregateFn,
    ) -> Result<AggregationResult> {
        let rows = self.crawl(query, &[Some(group_by), aggregate_field]).await?;
        let result = analytics::group_and_aggregate(&rows, group_by, aggregate_field, function);
        info!(
            "ReportService: {} {} by {} -> {} groups from {} rows",
            query.module,
            function,
            group_by,
            result.len(),
            rows.len()
        );
        Ok(result)
    }

    /// Buckets the filtered collection by `date_field` at `interval`.
    pub async fn time_series(
        &self,
        query: &AggregateQuery,
        date_field: &str,
        aggregate_field: Option<&str>,
        function: AggregateFn,
        interval: Interval,
    ) -> Result<AggregationResult> {
        let rows = self.crawl(query, &[Some(date_field), aggregate_field]).await?;
        let result = analytics::time_series(&rows, date_field, aggregate_field, function, interval);
        info!(
            "ReportService: {} {} per {} -> {} buckets from {} rows",
            query.module,
            function,
            interval,
            result.len(),
            rows.len()
        );
        Ok(result)
    }

    /// Current calendar month against the previous one, on `date_field`.
    ///
    /// Runs two crawls, each narrowed with `date_field >= start` and
    /// `date_field < end`, so `date_field` must be a filter accepting
    /// `gteq` and `lt`.
    pub async fn compare_period(
        &self,
        query: &AggregateQuery,
        date_field: &str,
        aggregate_field: Option<&str>,
        function: AggregateFn,
        today: NaiveDate,
    ) -> Result<PeriodComparison> {
        let (current_range, previous_range) = month_ranges(today);
        let mut totals = [0.0; 2];

        for (slot, (start, end)) in [current_range, previous_range].into_iter().enumerate() {
            let narrowed = query
                .clone()
                .with_filter(Filter::new(date_field, Predicate::Gteq, start.format("%Y-%m-%d").to_string()))
                .with_filter(Filter::new(date_field, Predicate::Lt, end.format("%Y-%m-%d").to_string()));
            let rows = self.crawl(&narrowed, &[aggregate_field]).await?;
            totals[slot] = analytics::reduce(&rows, aggregate_field, function);
        }

        let comparison = compare_values(totals[0], totals[1]);
        info!(
            "ReportService: {} {} this month {} vs last {} ({}%)",
            query.module, function, comparison.current, comparison.previous, comparison.change
        );
        Ok(comparison)
    }

    /// Runs a pre-built widget as of `today`.
    pub async fn run_widget(&self, key: &str, today: NaiveDate) -> Result<WidgetResult> {
        let widget = get_widget(key).ok_or_else(|| ReportError::UnknownWidget(key.to_string()))?;
        let query = AggregateQuery {
            module: widget.module.to_string(),
            filters: widget.filters(today),
        };

        let result = match widget.kind {
            WidgetKind::Grouped { group_by } => {
                self.aggregate(&query, group_by, widget.aggregate_field, widget.function)
                    .await?
            }
            WidgetKind::Series { date_field, interval } => {
                self.time_series(&query, date_field, widget.aggregate_field, widget.function, interval)
                    .await?
            }
        };

        let result = match widget.top {
            Some(n) => top_n(&result, n),
            None => result,
        };
        Ok(WidgetResult { widget, result })
    }

    /// Replays a saved report definition at the given page.
    pub async fn run_definition(&self, definition: &ReportDefinition, page: u32, per_page: u32) -> Result<ReportPage> {
        self.engine.execute(&definition.to_request(page, per_page)).await
    }

    /// Full crawl of the query, after checking that every named field is a
    /// declared column.
    async fn crawl(&self, query: &AggregateQuery, fields: &[Option<&str>]) -> Result<Vec<FlattenedRow>> {
        let module = ModuleRegistry::get_module(&query.module)?;
        if let Some(unknown) = fields.iter().flatten().find(|f| module.column(f).is_none()) {
            return Err(ReportError::InvalidColumn {
                module: module.key.to_string(),
                column: unknown.to_string(),
            });
        }
        self.engine.fetch_all(&query.request(), self.max_rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::ReplaySource;
    use serde_json::json;

    fn service() -> ReportService {
        let source = ReplaySource::new().with_collection(
            "stock_levels",
            vec![
                json!({"id": 1, "store": {"name": "Leeds"}, "quantity_held": "4"}),
                json!({"id": 2, "store_name": "Bristol", "quantity_held": 10}),
                json!({"id": 3, "store": {"name": "Leeds"}, "quantity_held": 6}),
            ],
        );
        ReportService::new(source.shared(), 1000)
    }

    #[test]
    fn test_list_modules_and_schema() {
        let s = service();
        let modules = s.list_modules();
        assert_eq!(modules.len(), 8);
        assert_eq!(modules[0].key, "opportunities");
        assert!(!s.get_module_schema("quarantines").unwrap().columns.is_empty());
        assert!(matches!(
            s.get_module_schema("Quarantines"),
            Err(ReportError::InvalidModule(_))
        ));
    }

    #[test]
    fn test_definition_round_trips_to_request() {
        let definition = ReportDefinition::from_json(
            r#"{"module":"invoices","columns":["number","grand_total"],
                "filters":[{"field":"status","predicate":"in","value":["Issued","Paid"]}],
                "sorting":{"field":"invoice_date","direction":"desc"}}"#,
        )
        .unwrap();
        let request = definition.to_request(3, 50);
        assert_eq!(request.module.as_deref(), Some("invoices"));
        assert_eq!(request.page, 3);
        assert_eq!(request.sort, Some(Sort::desc("invoice_date")));
        assert!(matches!(
            ReportDefinition::from_json("{\"columns\":[]}"),
            Err(ReportError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_aggregate_uses_normalized_fields() {
        let result = service()
            .aggregate(
                &AggregateQuery::new("stock_levels"),
                "store_name",
                Some("quantity_held"),
                AggregateFn::Sum,
            )
            .await
            .unwrap();
        assert_eq!(result.labels, vec!["Bristol", "Leeds"]);
        assert_eq!(result.values, vec![10.0, 10.0]);
    }

    #[tokio::test]
    async fn test_aggregate_rejects_undeclared_field() {
        let result = service()
            .aggregate(&AggregateQuery::new("stock_levels"), "warehouse", None, AggregateFn::Count)
            .await;
        assert!(matches!(result, Err(ReportError::InvalidColumn { .. })));
    }

    #[tokio::test]
    async fn test_unknown_widget() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(
            service().run_widget("churn", today).await.unwrap_err(),
            ReportError::UnknownWidget("churn".to_string())
        );
    }
}
