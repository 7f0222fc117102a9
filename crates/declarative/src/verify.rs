//! Post-run verification
//!
//! Re-lists each declared collection and checks which natural keys are
//! present. Read-only: a shortfall is reported, never retried.
//!
//! Scoped keys (a prefix within a VRF) only count as found when the
//! record's reference points at the declared scope, or is null when the
//! declaration has none.

use crate::resource::Scope;
use restkit::{Collection, ErrorCategory, Filter, Gateway, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One declared natural key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedKey {
    pub key: String,
    /// Reference the key is scoped by, if any
    pub scope: Option<Scope>,
}

/// Natural keys expected in one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    /// Human-readable kind
    pub kind: String,
    /// Collection to list
    pub collection: Collection,
    /// Record field holding the natural key
    pub key_field: String,
    /// Declared natural keys
    pub keys: Vec<ExpectedKey>,
}

/// Verification result for one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindReport {
    pub kind: String,
    pub collection: Collection,
    /// Keys present remotely, in declared order
    pub found: Vec<String>,
    /// Keys absent remotely, in declared order
    pub missing: Vec<String>,
    /// Why the listing could not be trusted, if it could not
    pub error: Option<String>,
}

impl KindReport {
    /// Number of declared keys
    pub fn expected(&self) -> usize {
        self.found.len() + self.missing.len()
    }

    /// Check if every declared key was found
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Verification result for a whole declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub kinds: Vec<KindReport>,
}

impl VerifyReport {
    /// Check if every declared key of every kind was found
    pub fn is_complete(&self) -> bool {
        self.kinds.iter().all(KindReport::is_complete)
    }

    /// Found and expected counts over all kinds
    pub fn totals(&self) -> (usize, usize) {
        self.kinds.iter().fold((0, 0), |(found, expected), k| {
            (found + k.found.len(), expected + k.expected())
        })
    }
}

/// Full listing of one collection
#[derive(Debug, Default)]
struct Listing {
    records: Vec<Record>,
    error: Option<String>,
}

impl Listing {
    fn fetch<G: Gateway + ?Sized>(gateway: &G, collection: Collection) -> Self {
        match gateway.query(collection, &Filter::new()) {
            Ok(records) => Self {
                records,
                error: None,
            },
            Err(e) if e.category() == ErrorCategory::Decode => {
                log::warn!("Undecodable listing of {} treated as empty: {}", collection, e);
                Self {
                    records: Vec::new(),
                    error: Some(format!("treated as empty: {}", e)),
                }
            }
            Err(e) => {
                log::error!("Failed to list {}: {}", collection, e);
                Self {
                    records: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// List every expected collection and report found vs expected keys
///
/// Each collection is listed once, including collections that only
/// appear as a scope. An undecodable listing degrades to an empty one, so
/// its keys show up as missing; the report notes it. Other failures are
/// noted the same way.
pub fn verify<G: Gateway + ?Sized>(gateway: &G, expectations: &[Expectation]) -> VerifyReport {
    let mut listings: BTreeMap<Collection, Listing> = BTreeMap::new();
    for expectation in expectations {
        let scopes = expectation.keys.iter().filter_map(|k| k.scope.as_ref());
        let needed = std::iter::once(expectation.collection).chain(scopes.map(|s| s.collection));
        for collection in needed {
            listings
                .entry(collection)
                .or_insert_with(|| Listing::fetch(gateway, collection));
        }
    }

    let mut report = VerifyReport::default();
    for expectation in expectations {
        let empty = Listing::default();
        let listing = listings.get(&expectation.collection).unwrap_or(&empty);

        let mut found = Vec::new();
        let mut missing = Vec::new();
        for expected in &expectation.keys {
            let present = listing.records.iter().any(|record| {
                let key = key_of(record, &expectation.key_field);
                let scope = expected.scope.as_ref();
                key.as_deref() == Some(expected.key.as_str())
                    && scope.is_none_or(|s| in_scope(record, s, &listings))
            });
            if present {
                found.push(expected.key.clone());
            } else {
                missing.push(expected.key.clone());
            }
        }

        let scope_error = expectation
            .keys
            .iter()
            .filter_map(|k| k.scope.as_ref())
            .find_map(|scope| {
                listings
                    .get(&scope.collection)
                    .and_then(|l| l.error.as_ref())
                    .map(|e| format!("could not list {}: {}", scope.collection, e))
            });

        report.kinds.push(KindReport {
            kind: expectation.kind.clone(),
            collection: expectation.collection,
            found,
            missing,
            error: listing.error.clone().or(scope_error),
        });
    }

    report
}

/// Check that a record's scope reference matches the declared one
fn in_scope(record: &Record, scope: &Scope, listings: &BTreeMap<Collection, Listing>) -> bool {
    let actual = record.get(&scope.field).and_then(reference_id);
    match (&scope.key, actual) {
        (None, None) => true,
        (Some(key), Some(id)) => listings.get(&scope.collection).is_some_and(|listing| {
            listing.records.iter().any(|r| {
                let name = key_of(r, &scope.key_field);
                r.id() == Some(id) && name.as_deref() == Some(key.as_str())
            })
        }),
        _ => false,
    }
}

/// Identifier of a reference, written either as an id or as a nested object
fn reference_id(value: &Value) -> Option<u64> {
    match value {
        Value::Object(map) => map.get("id").and_then(Value::as_u64),
        other => other.as_u64(),
    }
}

fn key_of(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
