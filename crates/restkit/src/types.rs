//! Core types shared by all gateway backends.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// A named resource collection on the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Tenant groups (`tenancy/tenant-groups`).
    TenantGroups,
    /// Tenants (`tenancy/tenants`).
    Tenants,
    /// Routing domains (`ipam/vrfs`).
    Vrfs,
    /// Prefix and VLAN roles (`ipam/roles`).
    Roles,
    /// Custom field choice sets (`extras/custom-field-choice-sets`).
    ChoiceSets,
    /// Custom field definitions (`extras/custom-fields`).
    CustomFields,
    /// Address containers (`ipam/prefixes`).
    Prefixes,
    /// Users (`users/users`).
    Users,
    /// API tokens (`users/tokens`).
    Tokens,
}

impl Collection {
    /// All collections, in path order.
    pub const ALL: [Collection; 9] = [
        Collection::TenantGroups,
        Collection::Tenants,
        Collection::Vrfs,
        Collection::Roles,
        Collection::ChoiceSets,
        Collection::CustomFields,
        Collection::Prefixes,
        Collection::Users,
        Collection::Tokens,
    ];

    /// Path of this collection below the API root, without slashes.
    #[must_use]
    pub fn path(&self) -> &'static str {
        match self {
            Self::TenantGroups => "tenancy/tenant-groups",
            Self::Tenants => "tenancy/tenants",
            Self::Vrfs => "ipam/vrfs",
            Self::Roles => "ipam/roles",
            Self::ChoiceSets => "extras/custom-field-choice-sets",
            Self::CustomFields => "extras/custom-fields",
            Self::Prefixes => "ipam/prefixes",
            Self::Users => "users/users",
            Self::Tokens => "users/tokens",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Query-string filter for listing a collection.
///
/// Parameters keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    params: Vec<(String, String)>,
}

impl Filter {
    /// An empty filter (full listing).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality parameter.
    #[must_use]
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Filter parameters in insertion order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Check if the filter has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{}", joined.join("&"))
    }
}

/// A record returned by the remote system.
///
/// Records are kept as raw JSON objects; only the identifier and a few
/// display helpers are interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Wrap a JSON object.
    #[must_use]
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build a record from any JSON value, returning `None` for non-objects.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Remote-assigned identifier.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.0.get("id").and_then(Value::as_u64)
    }

    /// Raw field access.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// String field access.
    #[must_use]
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Borrow the underlying JSON object.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutable access to the underlying JSON object.
    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Convert into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Authorization header scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthScheme {
    /// `Authorization: Token <key>` (NetBox v1 tokens).
    #[default]
    Token,
    /// `Authorization: Bearer <key>`.
    Bearer,
}

impl AuthScheme {
    /// Build the full header value for a credential.
    #[must_use]
    pub fn header_value(&self, token: &str) -> String {
        match self {
            Self::Token => format!("Token {}", token),
            Self::Bearer => format!("Bearer {}", token),
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token => write!(f, "Token"),
            Self::Bearer => write!(f, "Bearer"),
        }
    }
}

/// Configuration for retrying transient failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (1 means no retry)
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::no_retry()
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_factor,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Create a config that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

/// Fully resolved connection settings for a gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the remote system (without `/api`)
    pub endpoint: String,
    /// API credential
    pub token: String,
    /// Authorization header scheme
    pub auth_scheme: AuthScheme,
    /// Verify TLS certificates
    pub verify_tls: bool,
    /// Global per-request timeout (transport default when `None`)
    pub timeout: Option<Duration>,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

impl GatewayConfig {
    /// Create a config with default scheme, TLS verification and no retry.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: token.into(),
            auth_scheme: AuthScheme::default(),
            verify_tls: true,
            timeout: None,
            retry: RetryConfig::no_retry(),
        }
    }

    /// API root URL (`<endpoint>/api`), without a trailing slash.
    #[must_use]
    pub fn api_base(&self) -> String {
        format!("{}/api", self.endpoint.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_paths() {
        assert_eq!(Collection::TenantGroups.path(), "tenancy/tenant-groups");
        assert_eq!(Collection::ChoiceSets.path(), "extras/custom-field-choice-sets");
        assert_eq!(Collection::Prefixes.to_string(), "ipam/prefixes");
        for collection in Collection::ALL {
            assert!(!collection.path().starts_with('/'));
            assert!(!collection.path().ends_with('/'));
        }
    }

    #[test]
    fn test_filter_display() {
        let filter = Filter::new().eq("prefix", "10.0.0.0/8").eq("vrf_id", "3");
        assert_eq!(filter.to_string(), "prefix=10.0.0.0/8&vrf_id=3");
        assert_eq!(filter.params().len(), 2);
        assert!(Filter::new().is_empty());
    }

    #[test]
    fn test_record_accessors() {
        let record = Record::from_value(json!({"id": 7, "name": "DCN", "slug": "dcn"})).unwrap();
        assert_eq!(record.id(), Some(7));
        assert_eq!(record.str_field("name"), Some("DCN"));
        assert_eq!(record.str_field("missing"), None);
        assert!(Record::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn test_auth_scheme_header() {
        assert_eq!(AuthScheme::Token.header_value("abc"), "Token abc");
        assert_eq!(AuthScheme::Bearer.header_value("abc"), "Bearer abc");
    }

    #[test]
    fn test_retry_config_delays() {
        let config = RetryConfig::new(4, Duration::from_secs(1), 2.0);
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));

        let capped = RetryConfig {
            max_delay: Duration::from_secs(3),
            ..config
        };
        assert_eq!(capped.delay_for_attempt(5), Duration::from_secs(3));
    }

    #[test]
    fn test_retry_config_default_is_single_attempt() {
        assert_eq!(RetryConfig::default().max_attempts, 1);
        assert_eq!(RetryConfig::new(0, Duration::ZERO, 1.0).max_attempts, 1);
    }

    #[test]
    fn test_api_base() {
        let config = GatewayConfig::new("http://localhost:8000/", "t");
        assert_eq!(config.api_base(), "http://localhost:8000/api");
        assert!(config.verify_tls);
    }
}
