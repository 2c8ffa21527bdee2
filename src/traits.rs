// src/traits.rs

use crate::connectors::Page;
use crate::error::Result;
use crate::query::RemoteQuery;
use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;
use std::sync::Arc;

/// A paginated source of raw records speaking the remote query dialect.
///
/// Implemented by the live HTTP client and by the offline replay source.
/// Implementations must be Send + Sync so one source can back many engines.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Returns the name of this source (for logging).
    fn name(&self) -> &str;

    /// Issues one request and returns its records and pagination meta.
    async fn fetch_page(&self, endpoint: &str, query: &RemoteQuery) -> Result<Page>;

    /// Crawls successive pages starting at 1.
    ///
    /// Stops after `min(meta.total_pages, max_pages)` pages or at the first
    /// empty page. Pages are fetched one after another; the first failing page
    /// aborts the crawl and nothing collected so far is returned.
    async fn fetch_all(&self, endpoint: &str, query: &RemoteQuery, max_pages: u32) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        let mut page = 1;

        while page <= max_pages {
            let result = self.fetch_page(endpoint, &query.with_page(page)).await?;
            let fetched = result.records.len();
            debug!(
                "{}: {} page {}/{} -> {} records",
                self.name(),
                endpoint,
                page,
                result.meta.total_pages.min(max_pages),
                fetched
            );
            records.extend(result.records);

            if fetched == 0 || page >= result.meta.total_pages {
                break;
            }
            page += 1;
        }

        info!(
            "{}: crawled {} records from {} ({} pages max)",
            self.name(),
            records.len(),
            endpoint,
            max_pages
        );
        Ok(records)
    }
}

/// Shared remote source; engines and services hold this.
pub type SharedRemoteSource = Arc<dyn RemoteSource>;
