// src/connectors/current_rms.rs
//
// Authenticated HTTP client for the rental-management REST API.
// One GET per page; errors are normalized into the report error taxonomy.

use super::{parse_list_response, remote_error_detail, resource_key, Page};
use crate::config::ApiConfig;
use crate::error::{ReportError, Result};
use crate::query::RemoteQuery;
use crate::traits::{RemoteSource, SharedRemoteSource};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const SUBDOMAIN_HEADER: &str = "X-SUBDOMAIN";
const TOKEN_HEADER: &str = "X-AUTH-TOKEN";

/// Live remote source.
///
/// Timeouts are fixed at construction and apply per request. The underlying
/// `reqwest::Client` pools connections, so one client serves every report.
pub struct RemoteApiClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl RemoteApiClient {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let mut base_url = Url::parse(&api.base_url)
            .map_err(|e| ReportError::Config(format!("invalid base_url `{}`: {}", api.base_url, e)))?;
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        if !api.has_credentials() {
            warn!("RemoteApiClient: subdomain or token missing, requests will likely be rejected");
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(SUBDOMAIN_HEADER, header_value(&api.subdomain, "subdomain")?);
        let mut token = header_value(&api.token, "token")?;
        token.set_sensitive(true);
        headers.insert(TOKEN_HEADER, token);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(api.user_agent.clone())
            .connect_timeout(Duration::from_secs(api.connect_timeout_secs))
            .timeout(Duration::from_secs(api.timeout_secs))
            .build()
            .map_err(|e| ReportError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Wraps the client for sharing across engines.
    pub fn shared(self) -> SharedRemoteSource {
        Arc::new(self)
    }

    /// Full URL of an endpoint, without query.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| ReportError::Config(format!("invalid endpoint `{}`: {}", endpoint, e)))
    }

    /// Fetches one page using a pre-encoded query string, for parameters that
    /// repeat (`include[]=member&include[]=owner`).
    pub async fn fetch_page_raw(&self, endpoint: &str, raw_query: &str) -> Result<Page> {
        self.fetch_page(endpoint, &RemoteQuery::Raw(raw_query.to_string())).await
    }
}

#[async_trait]
impl RemoteSource for RemoteApiClient {
    fn name(&self) -> &str {
        "RemoteApiClient"
    }

    async fn fetch_page(&self, endpoint: &str, query: &RemoteQuery) -> Result<Page> {
        let mut url = self.endpoint_url(endpoint)?;
        let request = match query {
            RemoteQuery::Params(params) => self.http_client.get(url).query(&params.pairs()),
            RemoteQuery::Raw(raw) => {
                url.set_query(Some(raw.trim_start_matches('?')));
                self.http_client.get(url)
            }
        };

        debug!("RemoteApiClient: GET {} ?{}", endpoint, query.to_query_string());

        let response = request
            .send()
            .await
            .map_err(|e| ReportError::Network(format!("request to {} failed: {}", endpoint, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ReportError::Network(format!("reading {} response failed: {}", endpoint, e)))?;

        if !status.is_success() {
            let detail = remote_error_detail(status.as_u16(), &body);
            warn!("RemoteApiClient: {} returned {}: {}", endpoint, status, detail);
            return Err(ReportError::Remote {
                status: status.as_u16(),
                detail,
            });
        }

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ReportError::Decode(format!("{} returned invalid JSON: {}", endpoint, e)))?;

        parse_list_response(json, resource_key(endpoint), query.per_page())
    }
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ReportError::Config(format!("{} contains characters not allowed in a header", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            subdomain: "acme".to_string(),
            token: "secret".to_string(),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let client = RemoteApiClient::new(&api("https://api.current-rms.com/api/v1")).unwrap();
        assert_eq!(
            client.endpoint_url("opportunities").unwrap().as_str(),
            "https://api.current-rms.com/api/v1/opportunities"
        );
        assert_eq!(
            client.endpoint_url("/stock_levels").unwrap().as_str(),
            "https://api.current-rms.com/api/v1/stock_levels"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        assert!(matches!(
            RemoteApiClient::new(&api("not a url")),
            Err(ReportError::Config(_))
        ));
    }

    #[test]
    fn test_header_unsafe_token_is_config_error() {
        let mut config = api("https://example.com/api/v1");
        config.token = "bad\ntoken".to_string();
        assert!(matches!(RemoteApiClient::new(&config), Err(ReportError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let mut config = api("http://127.0.0.1:9/api/v1");
        config.connect_timeout_secs = 1;
        config.timeout_secs = 2;
        let client = RemoteApiClient::new(&config).unwrap();
        let result = client.fetch_page_raw("opportunities", "page=1&per_page=1").await;
        assert!(matches!(result, Err(ReportError::Network(_))));
    }
}
