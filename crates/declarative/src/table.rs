//! Per-run result tables
//!
//! Each reconciled record is stored under the natural key it was declared
//! with, so later stages resolve references without asking the remote
//! system again.

use restkit::{Collection, Record};
use std::collections::BTreeMap;

/// Records reconciled for one kind, keyed by declared natural key
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    entries: Vec<(String, Record)>,
}

impl ResultTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record, replacing any earlier entry with the same key
    pub fn insert(&mut self, key: impl Into<String>, record: Record) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = record,
            None => self.entries.push((key, record)),
        }
    }

    /// Look up a record by natural key
    pub fn get(&self, key: &str) -> Option<&Record> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, record)| record)
    }

    /// Look up the remote identifier for a natural key
    pub fn id(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Record::id)
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.entries.iter().map(|(k, r)| (k.as_str(), r))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// All result tables of a run, one per collection
#[derive(Debug, Clone, Default)]
pub struct RefTables {
    tables: BTreeMap<Collection, ResultTable>,
}

impl RefTables {
    /// Create an empty set of tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for a collection, if anything was stored in it
    pub fn table(&self, collection: Collection) -> Option<&ResultTable> {
        self.tables.get(&collection)
    }

    /// Store a reconciled record
    pub fn insert(&mut self, collection: Collection, key: impl Into<String>, record: Record) {
        self.tables
            .entry(collection)
            .or_default()
            .insert(key, record);
    }

    /// Resolve a natural key to a remote identifier
    pub fn lookup(&self, collection: Collection, key: &str) -> Option<u64> {
        self.table(collection).and_then(|t| t.id(key))
    }

    /// Tables in collection order
    pub fn iter(&self) -> impl Iterator<Item = (Collection, &ResultTable)> {
        self.tables.iter().map(|(c, t)| (*c, t))
    }

    /// Total number of stored records
    pub fn len(&self) -> usize {
        self.tables.values().map(ResultTable::len).sum()
    }

    /// Check if no record was stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: u64) -> Record {
        Record::from_value(json!({"id": id})).unwrap()
    }

    #[test]
    fn test_result_table_insert_and_lookup() {
        let mut table = ResultTable::new();
        table.insert("DCN", record(4));
        table.insert("NHN", record(9));

        assert_eq!(table.id("DCN"), Some(4));
        assert_eq!(table.id("missing"), None);
        assert_eq!(table.len(), 2);

        table.insert("DCN", record(5));
        assert_eq!(table.id("DCN"), Some(5));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_ref_tables_are_scoped_by_collection() {
        let mut tables = RefTables::new();
        tables.insert(Collection::Vrfs, "nhc", record(1));
        tables.insert(Collection::Roles, "datacenter", record(2));

        assert_eq!(tables.lookup(Collection::Vrfs, "nhc"), Some(1));
        // Same key in another collection never resolves.
        assert_eq!(tables.lookup(Collection::Tenants, "nhc"), None);
        assert_eq!(tables.len(), 2);
        assert!(!tables.is_empty());
    }
}
