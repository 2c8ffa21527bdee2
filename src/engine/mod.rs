// src/engine/mod.rs
//
// Report query engine.
// Validates a request against the module registry, translates it into the
// remote dialect, fetches one page or crawls a capped collection, and
// returns normalized rows projected onto the requested columns.

use crate::catalog::{Module, ModuleRegistry};
use crate::error::{ReportError, Result};
use crate::models::{
    ColumnSpec, Filter, FlattenedRow, Pagination, Sort, DEFAULT_PER_PAGE, MAX_PER_PAGE,
};
use crate::normalize::normalize_all;
use crate::query::{raw_with_includes, to_remote_params, RemoteQuery};
use crate::traits::SharedRemoteSource;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// =============================================================================
// Request
// =============================================================================

/// One report request.
///
/// Built with the `with_*` methods and never mutated afterwards; start over
/// from `ReportRequest::default()` to reset. An empty `columns` list means
/// every declared column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: Option<Sort>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for ReportRequest {
    fn default() -> Self {
        Self {
            module: None,
            columns: Vec::new(),
            filters: Vec::new(),
            sort: None,
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl ReportRequest {
    pub fn for_module(module: impl Into<String>) -> Self {
        Self::default().with_module(module)
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one more conjunctive filter.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = filters;
        self
    }

    /// Sets the single sort, replacing any previous one.
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn with_pagination(self, pagination: Pagination) -> Self {
        self.with_page(pagination.page).with_per_page(pagination.per_page)
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// One page of a report.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportPage {
    pub rows: Vec<FlattenedRow>,
    /// Matching rows across all pages.
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    /// Column keys of every row, in order.
    pub columns: Vec<String>,
    pub column_schema: Vec<ColumnSpec>,
}

/// A request checked against its module.
struct ValidatedRequest {
    module: &'static Module,
    columns: Vec<String>,
}

// =============================================================================
// Engine
// =============================================================================

/// Stateless report engine; share it freely across requests.
#[derive(Clone)]
pub struct ReportQueryEngine {
    source: SharedRemoteSource,
}

impl ReportQueryEngine {
    pub fn new(source: SharedRemoteSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &SharedRemoteSource {
        &self.source
    }

    /// Fetches the requested page.
    pub async fn execute(&self, request: &ReportRequest) -> Result<ReportPage> {
        let validated = self.validate(request)?;
        let pagination = request.pagination();
        if !pagination.is_valid() {
            return Err(ReportError::InvalidPagination {
                page: request.page,
                per_page: request.per_page,
            });
        }

        let query = remote_query(validated.module, request, request.page, request.per_page);
        let page = self
            .source
            .fetch_page(validated.module.endpoint, &query)
            .await?;

        let rows = project_rows(normalize_all(&page.records, validated.module), &validated.columns);

        info!(
            "ReportQueryEngine: {} page {}/{} -> {} rows ({} total)",
            validated.module.key,
            request.page,
            page.meta.total_pages,
            rows.len(),
            page.meta.total_count
        );

        Ok(ReportPage {
            rows,
            total: page.meta.total_count,
            page: request.page,
            per_page: request.per_page,
            total_pages: page.meta.total_pages,
            column_schema: column_schema(validated.module, &validated.columns),
            columns: validated.columns,
        })
    }

    /// Crawls the whole filtered collection, at most `max_rows` rows.
    ///
    /// Pages of 100 are requested one after another; the request's own page
    /// and per_page are ignored. A failing page fails the whole call.
    pub async fn fetch_all(&self, request: &ReportRequest, max_rows: usize) -> Result<Vec<FlattenedRow>> {
        let validated = self.validate(request)?;
        if max_rows == 0 {
            return Ok(Vec::new());
        }

        let per_page = MAX_PER_PAGE as usize;
        let max_pages = u32::try_from(max_rows.div_ceil(per_page)).unwrap_or(u32::MAX);
        let query = remote_query(validated.module, request, 1, MAX_PER_PAGE);

        debug!(
            "ReportQueryEngine: crawling {} (max {} rows, {} pages)",
            validated.module.key, max_rows, max_pages
        );

        let records = self
            .source
            .fetch_all(validated.module.endpoint, &query, max_pages)
            .await?;

        let mut rows = project_rows(normalize_all(&records, validated.module), &validated.columns);
        rows.truncate(max_rows);

        info!(
            "ReportQueryEngine: {} full crawl -> {} rows",
            validated.module.key,
            rows.len()
        );
        Ok(rows)
    }

    /// The first-page remote query a request translates to.
    pub fn build_query(&self, request: &ReportRequest) -> Result<RemoteQuery> {
        let validated = self.validate(request)?;
        Ok(remote_query(validated.module, request, request.page, request.per_page))
    }

    fn validate(&self, request: &ReportRequest) -> Result<ValidatedRequest> {
        let key = request.module.as_deref().ok_or(ReportError::NoModuleSelected)?;
        let module = ModuleRegistry::get_module(key)?;

        let mut seen = HashSet::new();
        for filter in &request.filters {
            let spec = module
                .filter(&filter.field)
                .ok_or_else(|| ReportError::InvalidFilterField {
                    module: module.key.to_string(),
                    field: filter.field.clone(),
                })?;
            if !spec.allows(filter.predicate) {
                return Err(ReportError::InvalidPredicate {
                    field: filter.field.clone(),
                    predicate: filter.predicate.to_string(),
                });
            }
            if !seen.insert((filter.field.as_str(), filter.predicate)) {
                return Err(ReportError::DuplicateFilter {
                    field: filter.field.clone(),
                    predicate: filter.predicate.to_string(),
                });
            }
        }

        let columns = if request.columns.is_empty() {
            module.column_keys()
        } else {
            if let Some(unknown) = request.columns.iter().find(|c| module.column(c).is_none()) {
                return Err(ReportError::InvalidColumn {
                    module: module.key.to_string(),
                    column: unknown.clone(),
                });
            }
            request.columns.clone()
        };

        Ok(ValidatedRequest { module, columns })
    }
}

fn remote_query(module: &Module, request: &ReportRequest, page: u32, per_page: u32) -> RemoteQuery {
    let params = to_remote_params(&request.filters, request.sort.as_ref(), page, per_page);
    if module.includes.is_empty() {
        RemoteQuery::Params(params)
    } else {
        raw_with_includes(&params, module.includes)
    }
}

fn project_rows(rows: Vec<FlattenedRow>, columns: &[String]) -> Vec<FlattenedRow> {
    rows.iter().map(|row| row.project(columns)).collect()
}

fn column_schema(module: &Module, columns: &[String]) -> Vec<ColumnSpec> {
    columns
        .iter()
        .filter_map(|key| module.column(key))
        .cloned()
        .collect()
}
