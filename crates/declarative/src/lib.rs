//! # Declarative
//!
//! A framework for declarative reconciliation against a remote inventory.
//!
//! This crate provides the core abstractions for declaring desired
//! records, finding them remotely by natural key, and converging the
//! remote system by creating or overwriting them.
//!
//! ## Core Concepts
//!
//! - **Resource**: One declared record with a natural key and a full body
//! - **Resolver**: Turns references into identifiers from the current run
//! - **Pipeline**: Ordered stages so referenced kinds are reconciled first
//! - **Reconciler**: Check-then-write (or create-first) for one resource
//! - **verify**: Read-only audit of found vs expected natural keys
//!
//! ## Example
//!
//! ```
//! use declarative::{
//!     BoxedResource, ExecuteOptions, Pipeline, Resolver, Resource, Stage, execute_simple,
//! };
//! use restkit::{Collection, MockGateway};
//! use serde_json::{Value, json};
//!
//! #[derive(Debug)]
//! struct Role(&'static str);
//!
//! impl Resource for Role {
//!     fn kind(&self) -> &'static str { "role" }
//!     fn collection(&self) -> Collection { Collection::Roles }
//!     fn natural_key(&self) -> String { self.0.to_string() }
//!     fn body(&self, _refs: &mut Resolver) -> Value {
//!         json!({"name": self.0, "slug": self.0})
//!     }
//! }
//!
//! let pipeline = Pipeline::new().stage(
//!     Stage::new("roles")
//!         .produces(Collection::Roles)
//!         .with_resources([Box::new(Role("datacenter")) as BoxedResource]),
//! );
//!
//! let gateway = MockGateway::netbox();
//! let first = execute_simple(&pipeline, &gateway, &ExecuteOptions::default()).unwrap();
//! let second = execute_simple(&pipeline, &gateway, &ExecuteOptions::default()).unwrap();
//!
//! assert_eq!(first.summary.totals().created, 1);
//! assert_eq!(second.summary.totals().updated, 1);
//! ```
//!
//! ## Failure Containment
//!
//! A failed resource is logged and reported in its [`Outcome`]; it never
//! stops sibling resources or later stages. A reference to a resource that
//! failed is sent as `null` and listed in [`Outcome::unresolved`], unless
//! [`ExecuteOptions::strict_refs`] is set.
//!
//! ## Provider Traits
//!
//! - [`Observer`]: Receives progress updates
//! - [`ResultSink`]: Receives the final result tables for persistence
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks or state file formats.

pub mod context;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod reconciler;
pub mod resource;
pub mod table;
pub mod types;
pub mod verify;

// Re-export main types at crate root
pub use context::{NoObserver, NoSink, Observer, ResultSink};
pub use error::{PipelineError, ReconcileError};
pub use executor::{Execution, execute, execute_simple};
pub use pipeline::{Pipeline, Stage};
pub use reconciler::{Reconciled, Reconciler};
pub use resource::{BoxedResource, Resolver, Resource, Scope, Strategy};
pub use table::{RefTables, ResultTable};
pub use types::{Action, ExecuteOptions, KindSummary, Outcome, RunSummary, UnresolvedRef};
pub use verify::{ExpectedKey, Expectation, KindReport, VerifyReport, verify};
