//! Desired-state manifest
//!
//! The manifest is a TOML document with one array of tables per entity kind.
//! When no manifest is given, [`Manifest::builtin`] provides the standard
//! datacenter seed (tenant group DCN, tenant NHN, VRF nhc, role datacenter,
//! the Kubernetes zone choice set, the prefix custom fields and three
//! container prefixes).

use crate::resource::{
    Choice, ChoiceSet, CustomField, FieldType, PREFIX_OBJECT_TYPE, Prefix, PrefixStatus, Role,
    Tenant, TenantGroup, Vrf,
};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

const SLUG_PATTERN: &str = r"^[-a-zA-Z0-9_]+$";

// ============================================================================
// Manifest
// ============================================================================

/// Everything that should exist in NetBox
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub tenant_groups: Vec<TenantGroup>,
    pub tenants: Vec<Tenant>,
    pub vrfs: Vec<Vrf>,
    pub roles: Vec<Role>,
    pub choice_sets: Vec<ChoiceSet>,
    pub custom_fields: Vec<CustomField>,
    pub prefixes: Vec<Prefix>,
}

impl Manifest {
    /// The standard datacenter seed
    pub fn builtin() -> Self {
        let text_field = |name: &str, label: &str, required: bool, description: &str| CustomField {
            name: name.to_string(),
            label: label.to_string(),
            field_type: FieldType::Text,
            object_types: vec![PREFIX_OBJECT_TYPE.to_string()],
            required,
            description: description.to_string(),
            choice_set: None,
        };

        let container = |cidr: &str, description: &str, zone: &str, alias: &str| Prefix {
            prefix: cidr.to_string(),
            description: description.to_string(),
            status: PrefixStatus::Container,
            is_pool: false,
            vrf: Some("nhc".to_string()),
            role: Some("datacenter".to_string()),
            tenant: Some("NHN".to_string()),
            custom_fields: BTreeMap::from([
                ("k8s_zone".to_string(), json!(zone)),
                ("domain".to_string(), json!("na")),
                ("env".to_string(), json!("na")),
                ("infra".to_string(), json!("na")),
                ("purpose".to_string(), json!("na")),
            ]),
            alias: Some(alias.to_string()),
        };

        Self {
            tenant_groups: vec![TenantGroup {
                name: "DCN".to_string(),
                slug: "dcn".to_string(),
                description: "Datacenter Network".to_string(),
                parent: None,
            }],
            tenants: vec![Tenant {
                name: "NHN".to_string(),
                slug: "NHN".to_string(),
                description: String::new(),
                comments: String::new(),
                group: Some("DCN".to_string()),
            }],
            vrfs: vec![Vrf {
                name: "nhc".to_string(),
                rd: None,
                description: String::new(),
            }],
            roles: vec![Role {
                name: "datacenter".to_string(),
                slug: "datacenter".to_string(),
                description: String::new(),
            }],
            choice_sets: vec![ChoiceSet {
                name: "k8s_zone_choices".to_string(),
                description: "Kubernetes zone choices".to_string(),
                choices: vec![
                    Choice::new("inet", "Internet"),
                    Choice::new("hnet-private", "Helsenett Private"),
                    Choice::new("hnet-public", "Helsenett Public"),
                ],
            }],
            custom_fields: vec![
                text_field("k8s_uuid", "Kubernetes UUID", false, "Kubernetes UUID for the prefix"),
                CustomField {
                    name: "k8s_zone".to_string(),
                    label: "Kubernetes Zone".to_string(),
                    field_type: FieldType::Select,
                    object_types: vec![PREFIX_OBJECT_TYPE.to_string()],
                    required: false,
                    description: "Kubernetes zone classification".to_string(),
                    choice_set: Some("k8s_zone_choices".to_string()),
                },
                text_field("domain", "Domain", true, ""),
                text_field("env", "Environment", true, ""),
                text_field("infra", "Infrastructure", true, ""),
                text_field("purpose", "Purpose", true, ""),
            ],
            prefixes: vec![
                container("10.0.0.0/8", "Internet prefix container", "inet", "internet"),
                container(
                    "172.16.0.0/12",
                    "Helsenett Private prefix container",
                    "hnet-private",
                    "helsenett_private",
                ),
                container(
                    "192.168.0.0/16",
                    "Helsenett Public prefix container",
                    "hnet-public",
                    "helsenett_public",
                ),
            ],
        }
    }

    /// Load a manifest from a TOML file (`~` is expanded)
    pub fn load(path: &str) -> Result<Self> {
        let path = expand_path(path);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid manifest format: {}", path.display()))
    }

    /// Load the given manifest, or the built-in one when no path is given
    pub fn resolve(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                log::debug!("Loading manifest from {}", path);
                Self::load(path)
            }
            None => {
                log::debug!("Using built-in manifest");
                Ok(Self::builtin())
            }
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize manifest to TOML")
    }

    /// Number of declared entities per kind, in reconciliation order
    pub fn counts(&self) -> [(&'static str, usize); 7] {
        [
            ("tenant groups", self.tenant_groups.len()),
            ("tenants", self.tenants.len()),
            ("vrfs", self.vrfs.len()),
            ("roles", self.roles.len()),
            ("choice sets", self.choice_sets.len()),
            ("custom fields", self.custom_fields.len()),
            ("prefixes", self.prefixes.len()),
        ]
    }

    /// Total number of declared entities
    pub fn len(&self) -> usize {
        self.counts().iter().map(|(_, n)| n).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prefix aliases mapped to their CIDR
    pub fn prefix_containers(&self) -> BTreeMap<String, String> {
        self.prefixes
            .iter()
            .filter_map(|p| p.alias.as_ref().map(|a| (a.clone(), p.prefix.clone())))
            .collect()
    }

    /// Check the manifest, returning an error listing every problem
    pub fn validate(&self) -> Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            return Ok(());
        }

        let listing: Vec<String> = problems.iter().map(|p| format!("  - {}", p)).collect();
        anyhow::bail!(
            "Manifest has {} problem(s):\n{}",
            problems.len(),
            listing.join("\n")
        )
    }

    /// Every problem found in the manifest, in declaration order
    pub fn problems(&self) -> Vec<ValidationError> {
        let mut problems = Vec::new();

        // Tenant groups: a parent must be declared before its children
        let mut groups_seen: HashSet<&str> = HashSet::new();
        for group in &self.tenant_groups {
            check_name(&mut problems, "tenant group", &group.name);
            check_slug(&mut problems, "tenant group", &group.name, &group.slug);
            if let Some(parent) = &group.parent
                && !groups_seen.contains(parent.as_str())
            {
                if self.tenant_groups.iter().any(|g| &g.name == parent) {
                    problems.push(ValidationError::ParentOrder {
                        group: group.name.clone(),
                        parent: parent.clone(),
                    });
                } else {
                    problems.push(unknown(
                        "tenant group",
                        &group.name,
                        "parent",
                        "tenant group",
                        parent,
                    ));
                }
            }
            if !groups_seen.insert(&group.name) {
                problems.push(duplicate("tenant group", &group.name));
            }
        }

        let tenants = unique_keys(&mut problems, "tenant", self.tenants.iter().map(|t| &t.name));
        for tenant in &self.tenants {
            check_name(&mut problems, "tenant", &tenant.name);
            check_slug(&mut problems, "tenant", &tenant.name, &tenant.slug);
            if let Some(group) = &tenant.group
                && !groups_seen.contains(group.as_str())
            {
                problems.push(unknown("tenant", &tenant.name, "group", "tenant group", group));
            }
        }

        let vrfs = unique_keys(&mut problems, "vrf", self.vrfs.iter().map(|v| &v.name));
        for vrf in &self.vrfs {
            check_name(&mut problems, "vrf", &vrf.name);
        }

        let roles = unique_keys(&mut problems, "role", self.roles.iter().map(|r| &r.name));
        for role in &self.roles {
            check_name(&mut problems, "role", &role.name);
            check_slug(&mut problems, "role", &role.name, &role.slug);
        }

        unique_keys(&mut problems, "choice set", self.choice_sets.iter().map(|c| &c.name));
        for set in &self.choice_sets {
            check_name(&mut problems, "choice set", &set.name);
            if set.choices.is_empty() {
                problems.push(ValidationError::EmptyChoiceSet(set.name.clone()));
            }
        }

        unique_keys(&mut problems, "custom field", self.custom_fields.iter().map(|f| &f.name));
        for field in &self.custom_fields {
            check_name(&mut problems, "custom field", &field.name);
            match (&field.choice_set, field.field_type.is_selectable()) {
                (Some(_), false) => problems.push(ValidationError::ChoiceSetOnPlainField {
                    field: field.name.clone(),
                    field_type: field.field_type,
                }),
                (None, true) => {
                    problems.push(ValidationError::MissingChoiceSet(field.name.clone()));
                }
                (Some(set), true) if !self.choice_sets.iter().any(|c| &c.name == set) => {
                    problems.push(unknown(
                        "custom field",
                        &field.name,
                        "choice_set",
                        "choice set",
                        set,
                    ));
                }
                _ => {}
            }
        }

        unique_keys(&mut problems, "prefix", self.prefixes.iter().map(|p| &p.prefix));
        unique_keys(
            &mut problems,
            "prefix alias",
            self.prefixes.iter().filter_map(|p| p.alias.as_ref()),
        );
        for prefix in &self.prefixes {
            if let Err(reason) = parse_cidr(&prefix.prefix) {
                problems.push(ValidationError::InvalidCidr {
                    cidr: prefix.prefix.clone(),
                    reason,
                });
            }

            let refs = [
                ("vrf", "vrf", prefix.vrf.as_ref(), &vrfs),
                ("role", "role", prefix.role.as_ref(), &roles),
                ("tenant", "tenant", prefix.tenant.as_ref(), &tenants),
            ];
            for (field, kind, key, declared) in refs {
                if let Some(key) = key
                    && !declared.contains(key.as_str())
                {
                    problems.push(unknown("prefix", &prefix.prefix, field, kind, key));
                }
            }

            self.check_prefix_custom_fields(&mut problems, prefix);
        }

        problems
    }

    fn check_prefix_custom_fields(&self, problems: &mut Vec<ValidationError>, prefix: &Prefix) {
        for (name, value) in &prefix.custom_fields {
            let Some(field) = self.custom_fields.iter().find(|f| &f.name == name) else {
                problems.push(ValidationError::UnknownCustomField {
                    prefix: prefix.prefix.clone(),
                    field: name.clone(),
                });
                continue;
            };

            if !field.applies_to(PREFIX_OBJECT_TYPE) {
                problems.push(ValidationError::FieldNotOnPrefixes(field.name.clone()));
            }

            if let Some(set_name) = &field.choice_set
                && let Some(set) = self.choice_sets.iter().find(|c| &c.name == set_name)
            {
                let values: Vec<&Value> = match value {
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                for value in values {
                    let ok = value.as_str().is_some_and(|v| set.contains(v));
                    if !ok {
                        problems.push(ValidationError::InvalidChoice {
                            prefix: prefix.prefix.clone(),
                            field: field.name.clone(),
                            value: value.to_string(),
                        });
                    }
                }
            }
        }

        for field in &self.custom_fields {
            if field.required
                && field.applies_to(PREFIX_OBJECT_TYPE)
                && !prefix.custom_fields.contains_key(&field.name)
            {
                problems.push(ValidationError::MissingRequiredField {
                    prefix: prefix.prefix.clone(),
                    field: field.name.clone(),
                });
            }
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// A problem that would make a run fail or write inconsistent data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{kind} has an empty name")]
    EmptyName { kind: &'static str },

    #[error("{kind} '{key}' is declared more than once")]
    Duplicate { kind: &'static str, key: String },

    #[error("{kind} '{name}' has invalid slug '{slug}' (letters, digits, '-' and '_' only)")]
    InvalidSlug {
        kind: &'static str,
        name: String,
        slug: String,
    },

    #[error("{kind} '{name}' references unknown {target} '{key}' in '{field}'")]
    UnknownReference {
        kind: &'static str,
        name: String,
        field: &'static str,
        target: &'static str,
        key: String,
    },

    #[error("tenant group '{group}' must be declared after its parent '{parent}'")]
    ParentOrder { group: String, parent: String },

    #[error("choice set '{0}' has no choices")]
    EmptyChoiceSet(String),

    #[error("custom field '{field}' of type '{field_type}' cannot have a choice set")]
    ChoiceSetOnPlainField { field: String, field_type: FieldType },

    #[error("custom field '{0}' is selectable but has no choice set")]
    MissingChoiceSet(String),

    #[error("prefix '{cidr}' is not a valid CIDR: {reason}")]
    InvalidCidr { cidr: String, reason: String },

    #[error("prefix '{prefix}' sets unknown custom field '{field}'")]
    UnknownCustomField { prefix: String, field: String },

    #[error("custom field '{0}' is set on prefixes but does not target ipam.prefix")]
    FieldNotOnPrefixes(String),

    #[error("prefix '{prefix}' sets '{field}' to {value}, which is not in its choice set")]
    InvalidChoice {
        prefix: String,
        field: String,
        value: String,
    },

    #[error("prefix '{prefix}' is missing required custom field '{field}'")]
    MissingRequiredField { prefix: String, field: String },
}

fn duplicate(kind: &'static str, key: &str) -> ValidationError {
    ValidationError::Duplicate {
        kind,
        key: key.to_string(),
    }
}

fn unknown(
    kind: &'static str,
    name: &str,
    field: &'static str,
    target: &'static str,
    key: &str,
) -> ValidationError {
    ValidationError::UnknownReference {
        kind,
        name: name.to_string(),
        field,
        target,
        key: key.to_string(),
    }
}

fn check_name(problems: &mut Vec<ValidationError>, kind: &'static str, name: &str) {
    if name.trim().is_empty() {
        problems.push(ValidationError::EmptyName { kind });
    }
}

fn check_slug(problems: &mut Vec<ValidationError>, kind: &'static str, name: &str, slug: &str) {
    if !Regex::new(SLUG_PATTERN).is_ok_and(|re| re.is_match(slug)) {
        problems.push(ValidationError::InvalidSlug {
            kind,
            name: name.to_string(),
            slug: slug.to_string(),
        });
    }
}

/// Record duplicates and return the set of declared keys
fn unique_keys<'a>(
    problems: &mut Vec<ValidationError>,
    kind: &'static str,
    keys: impl Iterator<Item = &'a String>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key.as_str()) {
            problems.push(duplicate(kind, key));
        }
    }
    seen
}

/// Parse "address/length", checking the length against the address family
fn parse_cidr(cidr: &str) -> std::result::Result<(IpAddr, u8), String> {
    let (addr, len) = cidr
        .split_once('/')
        .ok_or_else(|| "missing '/<length>'".to_string())?;
    let addr: IpAddr = addr
        .parse()
        .map_err(|_| format!("'{}' is not an IP address", addr))?;
    let len: u8 = len
        .parse()
        .map_err(|_| format!("'{}' is not a prefix length", len))?;

    let max = if addr.is_ipv4() { 32 } else { 128 };
    if len > max {
        return Err(format!("prefix length {} exceeds {}", len, max));
    }
    Ok((addr, len))
}

/// Expand `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Write the built-in manifest to `path`
pub fn write_builtin(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let content = Manifest::builtin().to_toml()?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    log::debug!("Wrote built-in manifest to {}", path.display());
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
