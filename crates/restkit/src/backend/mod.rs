//! Gateway trait and implementations.
//!
//! This module provides the [`Gateway`] trait and its implementations. The
//! production implementation is [`http::HttpGateway`], which speaks JSON
//! over HTTP(S).
//!
//! # Testing
//!
//! Use [`MockGateway`] to run reconciliation logic without a network:
//!
//! ```
//! use restkit::backend::{Gateway, MockGateway};
//! use restkit::{Collection, Filter};
//! use serde_json::json;
//!
//! let mock = MockGateway::netbox();
//! mock.create(Collection::Vrfs, &json!({"name": "nhc"})).unwrap();
//!
//! let found = mock.query(Collection::Vrfs, &Filter::new().eq("name", "nhc")).unwrap();
//! assert_eq!(found.len(), 1);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{Collection, Filter, Record};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Gateway to the remote inventory system.
///
/// All calls are blocking. Every failure is returned as an [`Error`]
/// value; implementations never panic on remote misbehavior.
pub trait Gateway: Send + Sync {
    /// Check that the API root answers with a success status.
    fn ping(&self) -> Result<()>;

    /// List the records of a collection matching a filter.
    ///
    /// Records are returned in the order the remote system lists them.
    fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>>;

    /// Create a record and return it as stored (including its identifier).
    fn create(&self, collection: Collection, body: &Value) -> Result<Record>;

    /// Overwrite the given fields of an existing record.
    fn update(&self, collection: Collection, id: u64, body: &Value) -> Result<Record>;
}

impl<G: Gateway + ?Sized> Gateway for &G {
    fn ping(&self) -> Result<()> {
        (**self).ping()
    }

    fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>> {
        (**self).query(collection, filter)
    }

    fn create(&self, collection: Collection, body: &Value) -> Result<Record> {
        (**self).create(collection, body)
    }

    fn update(&self, collection: Collection, id: u64, body: &Value) -> Result<Record> {
        (**self).update(collection, id, body)
    }
}

// =============================================================================
// Mock gateway
// =============================================================================

/// Kind of gateway call, as recorded by [`MockGateway`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET` of the API root
    Ping,
    /// Filtered listing
    Query,
    /// `POST` to a collection
    Create,
    /// `PATCH` of a record
    Update,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Ping => write!(f, "ping"),
            Method::Query => write!(f, "query"),
            Method::Create => write!(f, "create"),
            Method::Update => write!(f, "update"),
        }
    }
}

/// A call received by [`MockGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Kind of call
    pub method: Method,
    /// Target collection (`None` for pings)
    pub collection: Option<Collection>,
    /// Record identifier for updates
    pub id: Option<u64>,
    /// Request body for creates and updates
    pub body: Option<Value>,
    /// Filter for queries
    pub filter: Option<Filter>,
}

/// A failure injected into [`MockGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Answer with an HTTP status and body.
    Status { status: u16, body: String },
    /// Fail without a response.
    Connectivity,
    /// Answer 200 with an undecodable body.
    Decode,
}

impl Failure {
    /// Shorthand for a status failure with an empty JSON body.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            body: "{}".to_string(),
        }
    }

    fn to_error(&self) -> Error {
        match self {
            Failure::Status { status, body } => Error::status(*status, body.clone()),
            Failure::Connectivity => Error::connectivity("mock://", "connection refused"),
            Failure::Decode => Error::decode(200, "<html>", "expected value at line 1 column 1"),
        }
    }
}

#[derive(Debug)]
struct Injected {
    method: Method,
    collection: Option<Collection>,
    failure: Failure,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct MockState {
    records: HashMap<Collection, Vec<Record>>,
    unique: HashMap<Collection, Vec<String>>,
    injected: Vec<Injected>,
    calls: Vec<Call>,
    next_id: u64,
}

impl MockState {
    fn take_failure(&mut self, method: Method, collection: Option<Collection>) -> Option<Error> {
        let position = self
            .injected
            .iter()
            .position(|i| i.method == method && i.collection == collection)?;

        let injected = &mut self.injected[position];
        let error = injected.failure.to_error();
        if let Some(remaining) = injected.remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                self.injected.remove(position);
            }
        }
        Some(error)
    }

    fn insert(&mut self, collection: Collection, mut fields: Map<String, Value>) -> Record {
        self.next_id += 1;
        let id = self.next_id;
        fields.insert("id".to_string(), json!(id));
        if collection == Collection::Tokens && !fields.contains_key("key") {
            fields.insert("key".to_string(), json!(format!("{:040x}", id)));
        }
        let record = Record::new(fields);
        self.records
            .entry(collection)
            .or_default()
            .push(record.clone());
        record
    }

    fn conflict(&self, collection: Collection, fields: &Map<String, Value>) -> Option<String> {
        let unique = self.unique.get(&collection)?;
        let records = self.records.get(&collection)?;
        unique.iter().find_map(|field| {
            let value = fields.get(field)?;
            records
                .iter()
                .any(|r| r.get(field) == Some(value))
                .then(|| field.clone())
        })
    }
}

/// In-memory gateway for testing without network access.
///
/// Records are stored per collection with sequential identifiers. Every
/// call is recorded, failures can be injected per method and collection,
/// and uniqueness can be enforced on chosen fields so that duplicate
/// creates are rejected with a 400 the way the real system does.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    /// Create an empty mock with no uniqueness constraints.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock enforcing NetBox's uniqueness constraints.
    #[must_use]
    pub fn netbox() -> Self {
        let mock = Self::new();
        for collection in [
            Collection::TenantGroups,
            Collection::Tenants,
            Collection::Roles,
            Collection::ChoiceSets,
            Collection::CustomFields,
        ] {
            mock.enforce_unique(collection, "name");
        }
        mock.enforce_unique(Collection::Users, "username");
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reject creates that repeat the value of `field` in `collection`.
    pub fn enforce_unique(&self, collection: Collection, field: impl Into<String>) {
        self.state()
            .unique
            .entry(collection)
            .or_default()
            .push(field.into());
    }

    /// Insert a record directly, bypassing call recording. Returns its id.
    ///
    /// # Panics
    ///
    /// Panics if `fields` is not a JSON object.
    pub fn seed(&self, collection: Collection, fields: Value) -> u64 {
        let Value::Object(map) = fields else {
            panic!("seeded records must be JSON objects");
        };
        self.state().insert(collection, map).id().unwrap_or_default()
    }

    /// Fail every matching call with `failure`.
    pub fn fail(&self, method: Method, collection: Collection, failure: Failure) {
        self.state().injected.push(Injected {
            method,
            collection: Some(collection),
            failure,
            remaining: None,
        });
    }

    /// Fail the next `times` matching calls with `failure`.
    pub fn fail_times(
        &self,
        method: Method,
        collection: Collection,
        failure: Failure,
        times: usize,
    ) {
        if times == 0 {
            return;
        }
        self.state().injected.push(Injected {
            method,
            collection: Some(collection),
            failure,
            remaining: Some(times),
        });
    }

    /// Make pings fail as if the endpoint were down.
    pub fn set_unreachable(&self) {
        self.state().injected.push(Injected {
            method: Method::Ping,
            collection: None,
            failure: Failure::Connectivity,
            remaining: None,
        });
    }

    /// Snapshot of the records stored in a collection.
    #[must_use]
    pub fn records(&self, collection: Collection) -> Vec<Record> {
        self.state()
            .records
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// All calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Number of calls of a kind made against a collection.
    #[must_use]
    pub fn count(&self, method: Method, collection: Collection) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.method == method && c.collection == Some(collection))
            .count()
    }

    /// Forget recorded calls (records are kept).
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }
}

/// Check a record against filter parameters.
///
/// `<field>_id` parameters match the identifier of a reference field, and
/// the value `null` matches absent or null fields.
fn matches_filter(record: &Record, filter: &Filter) -> bool {
    filter.params().iter().all(|(key, expected)| {
        let field = record.get(key).or_else(|| {
            key.strip_suffix("_id")
                .and_then(|base| record.get(base))
        });
        value_matches(field, expected)
    })
}

fn value_matches(field: Option<&Value>, expected: &str) -> bool {
    match field {
        None | Some(Value::Null) => expected == "null",
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        Some(Value::Bool(b)) => b.to_string() == expected,
        Some(Value::Object(o)) => value_matches(o.get("id"), expected),
        Some(Value::Array(_)) => false,
    }
}

impl Gateway for MockGateway {
    fn ping(&self) -> Result<()> {
        let mut state = self.state();
        state.calls.push(Call {
            method: Method::Ping,
            collection: None,
            id: None,
            body: None,
            filter: None,
        });
        match state.take_failure(Method::Ping, None) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>> {
        let mut state = self.state();
        state.calls.push(Call {
            method: Method::Query,
            collection: Some(collection),
            id: None,
            body: None,
            filter: Some(filter.clone()),
        });
        if let Some(err) = state.take_failure(Method::Query, Some(collection)) {
            return Err(err);
        }

        Ok(state
            .records
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| matches_filter(r, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn create(&self, collection: Collection, body: &Value) -> Result<Record> {
        let mut state = self.state();
        state.calls.push(Call {
            method: Method::Create,
            collection: Some(collection),
            id: None,
            body: Some(body.clone()),
            filter: None,
        });
        if let Some(err) = state.take_failure(Method::Create, Some(collection)) {
            return Err(err);
        }

        let Value::Object(fields) = body else {
            return Err(Error::status(400, r#"{"non_field_errors":["Invalid data."]}"#));
        };
        if let Some(field) = state.conflict(collection, fields) {
            return Err(Error::status(
                400,
                format!(r#"{{"{}":["record with this {} already exists."]}}"#, field, field),
            ));
        }

        Ok(state.insert(collection, fields.clone()))
    }

    fn update(&self, collection: Collection, id: u64, body: &Value) -> Result<Record> {
        let mut state = self.state();
        state.calls.push(Call {
            method: Method::Update,
            collection: Some(collection),
            id: Some(id),
            body: Some(body.clone()),
            filter: None,
        });
        if let Some(err) = state.take_failure(Method::Update, Some(collection)) {
            return Err(err);
        }

        let Value::Object(fields) = body else {
            return Err(Error::status(400, r#"{"non_field_errors":["Invalid data."]}"#));
        };
        let record = state
            .records
            .get_mut(&collection)
            .and_then(|records| records.iter_mut().find(|r| r.id() == Some(id)))
            .ok_or_else(|| Error::status(404, r#"{"detail":"Not found."}"#))?;

        for (key, value) in fields {
            if key != "id" {
                record.fields_mut().insert(key.clone(), value.clone());
            }
        }
        Ok(record.clone())
    }
}
