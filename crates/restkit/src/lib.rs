//! # restkit
//!
//! Blocking REST gateway for NetBox-style inventory collections.
//!
//! This crate provides:
//! - A [`Gateway`] trait with `ping`, `query`, `create` and `update`
//! - [`HttpGateway`], a `ureq` implementation with token auth, optional TLS
//!   verification, pagination and bounded retry
//! - [`MockGateway`], an in-memory implementation for tests
//! - A single [`Error`] type classified by [`ErrorCategory`]
//!
//! ## Example
//!
//! ```no_run
//! use restkit::{Collection, Filter, GatewayConfig, HttpGateway};
//! use restkit::backend::Gateway;
//! use serde_json::json;
//!
//! let config = GatewayConfig::new("http://localhost:8000", "0123456789abcdef");
//! let gateway = HttpGateway::new(&config).expect("invalid configuration");
//!
//! gateway.ping().expect("NetBox not reachable");
//! let role = gateway
//!     .create(Collection::Roles, &json!({"name": "datacenter", "slug": "datacenter"}))
//!     .expect("create failed");
//! println!("Created role {:?}", role.id());
//!
//! let found = gateway
//!     .query(Collection::Roles, &Filter::new().eq("name", "datacenter"))
//!     .expect("query failed");
//! assert_eq!(found.len(), 1);
//! ```
//!
//! ## Error Handling
//!
//! Remote failures never panic. A 4xx maps to [`ErrorCategory::Client`], a
//! 5xx to [`ErrorCategory::Server`], a transport failure to
//! [`ErrorCategory::Connectivity`] and an unparseable success body to
//! [`ErrorCategory::Decode`]. Status code and raw body stay attached to the
//! error for diagnostics.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod retry;
pub mod types;

pub use backend::http::HttpGateway;
pub use backend::{Call, Failure, Gateway, Method, MockGateway};
pub use error::{Error, ErrorCategory, Result};
pub use types::{AuthScheme, Collection, Filter, GatewayConfig, Record, RetryConfig};
