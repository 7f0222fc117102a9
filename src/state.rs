use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::{RefTables, ResultSink};
use restkit::Collection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

// ============================================================================
// State Structures
// ============================================================================

/// What the last `apply` left in NetBox
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SeedState {
    /// When the results were written
    pub last_applied: DateTime<Utc>,

    /// NetBox base URL the run talked to
    pub endpoint: String,

    /// Record identifiers: table name -> natural key -> id
    #[serde(default)]
    pub tables: BTreeMap<String, BTreeMap<String, u64>>,

    /// Prefix container aliases -> CIDR (e.g. "internet" -> "10.0.0.0/8")
    #[serde(default)]
    pub prefix_containers: BTreeMap<String, String>,
}

impl SeedState {
    /// Build state from a run's final tables
    pub fn from_tables(
        endpoint: &str,
        tables: &RefTables,
        prefix_containers: &BTreeMap<String, String>,
    ) -> Self {
        let mut ids: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
        for (collection, table) in tables.iter() {
            let entry = ids.entry(table_name(collection).to_string()).or_default();
            for (key, record) in table.iter() {
                if let Some(id) = record.id() {
                    entry.insert(key.to_string(), id);
                }
            }
        }

        // Only containers that made it into NetBox are recorded
        let reconciled = tables.table(Collection::Prefixes);
        let prefix_containers = prefix_containers
            .iter()
            .filter(|(_, cidr)| reconciled.is_some_and(|t| t.get(cidr).is_some()))
            .map(|(alias, cidr)| (alias.clone(), cidr.clone()))
            .collect();

        Self {
            last_applied: Utc::now(),
            endpoint: endpoint.to_string(),
            tables: ids,
            prefix_containers,
        }
    }

    /// Get the state directory path (~/.local/state/netbox-seed)
    pub fn state_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".local").join("state").join("netbox-seed"))
    }

    /// Get the default state file path
    pub fn state_file() -> Result<PathBuf> {
        Ok(Self::state_dir()?.join("state.toml"))
    }

    /// Load state from `path`, returning `None` if nothing was saved yet
    pub fn load(path: &std::path::Path) -> Result<Option<Self>> {
        if !path.exists() {
            log::debug!("State file does not exist");
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;
        let state: SeedState = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(Some(state))
    }

    /// Save state to `path`
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;
        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }
}

/// Name of a collection's table in the state file
fn table_name(collection: Collection) -> &'static str {
    match collection {
        Collection::TenantGroups => "tenant_groups",
        Collection::Tenants => "tenants",
        Collection::Vrfs => "vrfs",
        Collection::Roles => "roles",
        Collection::ChoiceSets => "choice_sets",
        Collection::CustomFields => "custom_fields",
        Collection::Prefixes => "prefixes",
        Collection::Users => "users",
        Collection::Tokens => "tokens",
    }
}

// ============================================================================
// Result Sink
// ============================================================================

/// Writes the final tables of a run to the state file
pub struct StateFile {
    path: PathBuf,
    endpoint: String,
    prefix_containers: BTreeMap<String, String>,
}

impl StateFile {
    pub fn new(
        path: PathBuf,
        endpoint: impl Into<String>,
        prefix_containers: BTreeMap<String, String>,
    ) -> Self {
        Self {
            path,
            endpoint: endpoint.into(),
            prefix_containers,
        }
    }
}

impl ResultSink for StateFile {
    fn persist(&mut self, tables: &RefTables) -> Result<()> {
        let state = SeedState::from_tables(&self.endpoint, tables, &self.prefix_containers);
        state.save(&self.path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use restkit::Record;
    use serde_json::json;
    use tempfile::TempDir;

    fn tables() -> RefTables {
        let mut tables = RefTables::new();
        let record = |id: u64| Record::from_value(json!({"id": id})).unwrap();
        tables.insert(Collection::TenantGroups, "DCN", record(1));
        tables.insert(Collection::Vrfs, "nhc", record(4));
        tables.insert(Collection::Prefixes, "10.0.0.0/8", record(9));
        tables
    }

    fn containers() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("internet".to_string(), "10.0.0.0/8".to_string()),
            ("helsenett_private".to_string(), "172.16.0.0/12".to_string()),
        ])
    }

    #[test]
    fn test_from_tables() {
        let state = SeedState::from_tables("http://localhost:8000", &tables(), &containers());

        assert_eq!(state.tables["tenant_groups"]["DCN"], 1);
        assert_eq!(state.tables["vrfs"]["nhc"], 4);
        assert_eq!(state.tables["prefixes"]["10.0.0.0/8"], 9);
        assert_eq!(state.prefix_containers.len(), 1);
        assert_eq!(state.prefix_containers["internet"], "10.0.0.0/8");
    }

    #[test]
    fn test_sink_writes_state_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state").join("state.toml");

        let mut sink = StateFile::new(path.clone(), "http://nb", containers());
        sink.persist(&tables()).unwrap();

        let loaded = SeedState::load(&path).unwrap().unwrap();
        assert_eq!(loaded.endpoint, "http://nb");
        assert_eq!(loaded.tables["prefixes"]["10.0.0.0/8"], 9);

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("last_applied"));
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(SeedState::load(&dir.path().join("state.toml")).unwrap().is_none());
    }

    #[test]
    fn test_sink_error_has_context() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let mut sink = StateFile::new(blocker.join("state.toml"), "http://nb", containers());
        let err = sink.persist(&tables()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to create state directory"));
    }
}
