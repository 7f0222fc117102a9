//! Resource trait for declarative reconciliation
//!
//! A Resource is one declared record: it knows its collection, its natural
//! key and how to render its full body once references are resolved.

use crate::table::RefTables;
use crate::types::UnresolvedRef;
use restkit::{Collection, Filter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// How a resource establishes whether it already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Query by natural key, then update the first match or create.
    #[default]
    CheckThenWrite,
    /// Create straight away; any 4xx means "already exists" and the
    /// identifier is recovered with a query by natural key. The existing
    /// record is left untouched.
    CreateFirst,
}

/// A reference that narrows a natural key, such as a prefix within a VRF
///
/// Two records with the same natural key but different scopes are
/// different records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Record field holding the reference
    pub field: String,
    /// Collection the reference points into
    pub collection: Collection,
    /// Field holding the natural key in that collection
    pub key_field: String,
    /// Natural key of the referenced record; `None` requires a null field
    pub key: Option<String>,
}

/// Core trait for declared resources
///
/// # Example
///
/// ```
/// use declarative::{Resolver, Resource};
/// use restkit::Collection;
/// use serde_json::{Value, json};
///
/// #[derive(Debug)]
/// struct Tenant {
///     name: String,
///     group: Option<String>,
/// }
///
/// impl Resource for Tenant {
///     fn kind(&self) -> &'static str {
///         "tenant"
///     }
///
///     fn collection(&self) -> Collection {
///         Collection::Tenants
///     }
///
///     fn natural_key(&self) -> String {
///         self.name.clone()
///     }
///
///     fn body(&self, refs: &mut Resolver) -> Value {
///         json!({
///             "name": self.name,
///             "group": refs.reference("group", Collection::TenantGroups, self.group.as_deref()),
///         })
///     }
/// }
/// ```
pub trait Resource: fmt::Debug {
    /// Human-readable kind, used for grouping and display
    fn kind(&self) -> &'static str;

    /// Collection this resource is stored in
    fn collection(&self) -> Collection;

    /// Business key that identifies the record across runs
    fn natural_key(&self) -> String;

    /// Record field holding the natural key
    fn key_field(&self) -> &'static str {
        "name"
    }

    /// Query filter that finds the record by natural key
    ///
    /// Receives the rendered body so scoping fields (such as a routing
    /// domain) use the same resolved identifiers that will be written.
    fn key_filter(&self, _body: &Value) -> Filter {
        Filter::new().eq(self.key_field(), self.natural_key())
    }

    /// Reference that scopes the natural key, if any
    ///
    /// Must agree with [`Resource::key_filter`] so verification finds the
    /// same record the reconciler would.
    fn scope(&self) -> Option<Scope> {
        None
    }

    /// Full declared body with references resolved
    ///
    /// Every declared field must be present so an update overwrites the
    /// remote record completely.
    fn body(&self, refs: &mut Resolver) -> Value;

    /// Existence strategy
    fn strategy(&self) -> Strategy {
        Strategy::CheckThenWrite
    }

    /// Human-readable description
    fn description(&self) -> String {
        format!("{} '{}'", self.kind(), self.natural_key())
    }
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Resolves reference fields against the tables of the current run
///
/// Misses are recorded rather than raised: the field renders as `null`
/// and the miss is reported on the resource's outcome.
#[derive(Debug)]
pub struct Resolver<'a> {
    tables: &'a RefTables,
    unresolved: Vec<UnresolvedRef>,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over the current tables
    pub fn new(tables: &'a RefTables) -> Self {
        Self {
            tables,
            unresolved: Vec::new(),
        }
    }

    /// Resolve an optional reference into an identifier or `null`
    ///
    /// `None` means the reference is explicitly absent and is not a miss.
    pub fn reference(&mut self, field: &str, collection: Collection, key: Option<&str>) -> Value {
        let Some(key) = key else {
            return Value::Null;
        };

        match self.tables.lookup(collection, key) {
            Some(id) => Value::from(id),
            None => {
                self.unresolved.push(UnresolvedRef {
                    field: field.to_string(),
                    collection,
                    key: key.to_string(),
                });
                Value::Null
            }
        }
    }

    /// References that missed so far
    pub fn unresolved(&self) -> &[UnresolvedRef] {
        &self.unresolved
    }

    /// Consume the resolver, returning its misses
    pub fn into_unresolved(self) -> Vec<UnresolvedRef> {
        self.unresolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restkit::Record;
    use serde_json::json;

    #[derive(Debug)]
    struct Role(&'static str);

    impl Resource for Role {
        fn kind(&self) -> &'static str {
            "role"
        }

        fn collection(&self) -> Collection {
            Collection::Roles
        }

        fn natural_key(&self) -> String {
            self.0.to_string()
        }

        fn body(&self, _refs: &mut Resolver) -> Value {
            json!({"name": self.0, "slug": self.0})
        }
    }

    #[test]
    fn test_defaults() {
        let role = Role("datacenter");
        assert_eq!(role.strategy(), Strategy::CheckThenWrite);
        assert_eq!(role.key_field(), "name");
        assert_eq!(role.description(), "role 'datacenter'");
        assert_eq!(role.key_filter(&json!({})).to_string(), "name=datacenter");
        assert!(role.scope().is_none());
    }

    #[test]
    fn test_resolver_hit_miss_and_absent() {
        let mut tables = RefTables::new();
        tables.insert(
            Collection::TenantGroups,
            "DCN",
            Record::from_value(json!({"id": 3})).unwrap(),
        );

        let mut resolver = Resolver::new(&tables);
        assert_eq!(
            resolver.reference("group", Collection::TenantGroups, Some("DCN")),
            json!(3)
        );
        assert_eq!(
            resolver.reference("parent", Collection::TenantGroups, None),
            Value::Null
        );
        assert!(resolver.unresolved().is_empty());

        assert_eq!(
            resolver.reference("vrf", Collection::Vrfs, Some("nhc")),
            Value::Null
        );
        let unresolved = resolver.into_unresolved();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].field, "vrf");
        assert_eq!(unresolved[0].key, "nhc");
    }
}
