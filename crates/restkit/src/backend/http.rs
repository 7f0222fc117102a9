//! HTTP(S) gateway backed by `ureq`.
//!
//! Requests carry `Authorization` and `Accept: application/json` headers.
//! Status codes are never turned into transport errors by the agent; they
//! are classified here so the raw body is preserved for diagnostics.
//!
//! # Pagination
//!
//! Listings follow the `next` link of each page until it is null.
//!
//! # Retries
//!
//! `GET` and `PATCH` are retried per [`RetryConfig`]; `POST` never is.

use crate::backend::Gateway;
use crate::error::{Error, Result};
use crate::retry::{LogCallback, with_retry};
use crate::types::{Collection, Filter, GatewayConfig, Record, RetryConfig};
use serde::Deserialize;
use serde_json::Value;
use ureq::http::Response;
use ureq::tls::TlsConfig;
use ureq::{Agent, Body};

/// Upper bound on pages followed for a single listing.
const MAX_PAGES: usize = 1000;

const USER_AGENT: &str = concat!("netbox-seed/", env!("CARGO_PKG_VERSION"));

/// Gateway speaking JSON over HTTP(S).
///
/// # Example
///
/// ```no_run
/// use restkit::{Collection, Filter, GatewayConfig};
/// use restkit::backend::Gateway;
/// use restkit::backend::http::HttpGateway;
///
/// let config = GatewayConfig::new("http://localhost:8000", "0123456789abcdef");
/// let gateway = HttpGateway::new(&config).unwrap();
/// let vrfs = gateway.query(Collection::Vrfs, &Filter::new().eq("name", "nhc")).unwrap();
/// println!("Found {} VRFs", vrfs.len());
/// ```
pub struct HttpGateway {
    /// HTTP agent for requests.
    agent: Agent,
    /// API root URL, without trailing slash.
    api_base: String,
    /// Full `Authorization` header value.
    authorization: String,
    /// Retry policy for transient failures.
    retry: RetryConfig,
}

impl HttpGateway {
    /// Create a gateway from resolved connection settings.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let endpoint = config.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(Error::Config(format!(
                "endpoint must start with http:// or https:// (got '{}')",
                endpoint
            )));
        }
        if config.token.trim().is_empty() {
            return Err(Error::Config("API token is empty".to_string()));
        }

        if !config.verify_tls {
            log::warn!("TLS certificate verification is disabled for {}", endpoint);
        }

        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .tls_config(
                TlsConfig::builder()
                    .disable_verification(!config.verify_tls)
                    .build(),
            )
            .build();

        Ok(Self {
            agent: Agent::new_with_config(agent_config),
            api_base: config.api_base(),
            authorization: config.auth_scheme.header_value(config.token.trim()),
            retry: config.retry.clone(),
        })
    }

    /// Get the API root URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build the URL of a collection.
    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}/", self.api_base, collection.path())
    }

    /// Build the URL of a single record.
    fn record_url(&self, collection: Collection, id: u64) -> String {
        format!("{}/{}/{}/", self.api_base, collection.path(), id)
    }

    /// Fetch one page of a listing.
    fn fetch_page(&self, url: &str, filter: Option<&Filter>) -> Result<Page> {
        with_retry(&self.retry, Some(&LogCallback), || {
            let mut request = self
                .agent
                .get(url)
                .header("Authorization", &self.authorization)
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT);
            if let Some(filter) = filter {
                for (key, value) in filter.params() {
                    request = request.query(key, value);
                }
            }
            log::debug!("GET {}", url);
            let (status, body) = read_response(url, request.call())?;
            serde_json::from_str(&body).map_err(|e| Error::decode(status, body, e))
        })
    }

    /// Send a JSON body and decode the returned record.
    ///
    /// Only `PATCH` goes through the retry policy. A `POST` whose response
    /// was lost may already have committed, so it is sent once and the
    /// next run's lookup finds the record.
    fn send(&self, verb: Verb, url: &str, body: &Value) -> Result<Record> {
        let attempt = || {
            log::debug!("{:?} {} {}", verb, url, body);
            let request = match verb {
                Verb::Post => self.agent.post(url),
                Verb::Patch => self.agent.patch(url),
            };
            let result = request
                .header("Authorization", &self.authorization)
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .send_json(body);
            let (status, raw) = read_response(url, result)?;
            serde_json::from_str(&raw).map_err(|e| Error::decode(status, raw, e))
        };

        match verb {
            Verb::Post => attempt(),
            Verb::Patch => with_retry(&self.retry, Some(&LogCallback), attempt),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Verb {
    Post,
    Patch,
}

/// Read a response, classifying non-success statuses.
fn read_response(
    url: &str,
    result: std::result::Result<Response<Body>, ureq::Error>,
) -> Result<(u16, String)> {
    let mut response = result.map_err(|e| Error::connectivity(url, e))?;
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| Error::connectivity(url, e))?;

    if status >= 400 {
        log::debug!("HTTP {} from {}: {}", status, url, body);
        return Err(Error::status(status, body));
    }
    Ok((status, body))
}

impl Gateway for HttpGateway {
    fn ping(&self) -> Result<()> {
        let url = format!("{}/", self.api_base);
        with_retry(&self.retry, Some(&LogCallback), || {
            let result = self
                .agent
                .get(&url)
                .header("Authorization", &self.authorization)
                .header("Accept", "application/json")
                .header("User-Agent", USER_AGENT)
                .call();
            read_response(&url, result).map(|_| ())
        })
    }

    fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>> {
        let first_url = self.collection_url(collection);
        let mut page = self.fetch_page(&first_url, Some(filter))?;
        let mut records = std::mem::take(&mut page.results);

        let mut pages = 1;
        while let Some(next) = page.next.take() {
            if pages >= MAX_PAGES {
                log::warn!("Stopped following {} after {} pages", collection, pages);
                break;
            }
            page = self.fetch_page(&next, None)?;
            records.append(&mut page.results);
            pages += 1;
        }

        Ok(records)
    }

    fn create(&self, collection: Collection, body: &Value) -> Result<Record> {
        self.send(Verb::Post, &self.collection_url(collection), body)
    }

    fn update(&self, collection: Collection, id: u64, body: &Value) -> Result<Record> {
        self.send(Verb::Patch, &self.record_url(collection, id), body)
    }
}

// =============================================================================
// API response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    next: Option<String>,
    results: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::types::AuthScheme;

    fn gateway() -> HttpGateway {
        HttpGateway::new(&GatewayConfig::new("http://localhost:8000/", "secret")).unwrap()
    }

    #[test]
    fn test_collection_and_record_urls() {
        let gateway = gateway();
        assert_eq!(gateway.api_base(), "http://localhost:8000/api");
        assert_eq!(
            gateway.collection_url(Collection::Prefixes),
            "http://localhost:8000/api/ipam/prefixes/"
        );
        assert_eq!(
            gateway.record_url(Collection::TenantGroups, 12),
            "http://localhost:8000/api/tenancy/tenant-groups/12/"
        );
    }

    #[test]
    fn test_authorization_header() {
        assert_eq!(gateway().authorization, "Token secret");

        let mut config = GatewayConfig::new("https://nb.example.com", "secret");
        config.auth_scheme = AuthScheme::Bearer;
        let gateway = HttpGateway::new(&config).unwrap();
        assert_eq!(gateway.authorization, "Bearer secret");
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        let err = HttpGateway::new(&GatewayConfig::new("localhost:8000", "t"))
            .err()
            .unwrap();
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_rejects_empty_token() {
        let err = HttpGateway::new(&GatewayConfig::new("http://localhost:8000", "  "))
            .err()
            .unwrap();
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn test_page_deserialization() {
        let page: Page = serde_json::from_str(
            r#"{"count": 2, "next": "http://nb/api/ipam/vrfs/?limit=1&offset=1", "previous": null,
                "results": [{"id": 1, "name": "nhc"}]}"#,
        )
        .unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id(), Some(1));
        assert!(page.next.is_some());

        let last: Page = serde_json::from_str(r#"{"next": null, "results": []}"#).unwrap();
        assert!(last.next.is_none());
    }

    #[test]
    fn test_unreachable_endpoint_is_connectivity_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let mut config = GatewayConfig::new("http://127.0.0.1:9", "secret");
        config.timeout = Some(std::time::Duration::from_secs(2));
        let gateway = HttpGateway::new(&config).unwrap();
        let err = gateway.ping().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Connectivity);
    }
}
