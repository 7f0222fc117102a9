//! Prefix (address container) resource
//!
//! A prefix is identified by its CIDR within its VRF. The lookup filter is
//! scoped by the VRF identifier that will be written, or by `vrf_id=null`
//! when no VRF is set.

use declarative::{Resolver, Resource, Scope};
use restkit::{Collection, Filter};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// Operational status of a prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefixStatus {
    #[default]
    Container,
    Active,
    Reserved,
    Deprecated,
}

impl PrefixStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Active => "active",
            Self::Reserved => "reserved",
            Self::Deprecated => "deprecated",
        }
    }
}

impl fmt::Display for PrefixStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An address container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefix {
    /// CIDR, e.g. "10.0.0.0/8"
    pub prefix: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: PrefixStatus,
    #[serde(default)]
    pub is_pool: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vrf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    /// Custom field values by field name
    #[serde(default)]
    pub custom_fields: BTreeMap<String, Value>,
    /// Short name recorded in the state file (e.g. "internet")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Resource for Prefix {
    fn kind(&self) -> &'static str {
        "prefix"
    }

    fn collection(&self) -> Collection {
        Collection::Prefixes
    }

    fn natural_key(&self) -> String {
        self.prefix.clone()
    }

    fn key_field(&self) -> &'static str {
        "prefix"
    }

    fn key_filter(&self, body: &Value) -> Filter {
        let vrf_id = match body.get("vrf").and_then(Value::as_u64) {
            Some(id) => id.to_string(),
            None => "null".to_string(),
        };
        Filter::new()
            .eq("prefix", self.prefix.as_str())
            .eq("vrf_id", vrf_id)
    }

    fn scope(&self) -> Option<Scope> {
        Some(Scope {
            field: "vrf".to_string(),
            collection: Collection::Vrfs,
            key_field: "name".to_string(),
            key: self.vrf.clone(),
        })
    }

    fn body(&self, refs: &mut Resolver) -> Value {
        let custom_fields: Map<String, Value> = self
            .custom_fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        json!({
            "prefix": self.prefix,
            "description": self.description,
            "status": self.status.as_str(),
            "is_pool": self.is_pool,
            "vrf": refs.reference("vrf", Collection::Vrfs, self.vrf.as_deref()),
            "role": refs.reference("role", Collection::Roles, self.role.as_deref()),
            "tenant": refs.reference("tenant", Collection::Tenants, self.tenant.as_deref()),
            "custom_fields": custom_fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{render, tables};

    fn internet() -> Prefix {
        Prefix {
            prefix: "10.0.0.0/8".into(),
            description: "Internet prefix container".into(),
            status: PrefixStatus::Container,
            is_pool: false,
            vrf: Some("nhc".into()),
            role: Some("datacenter".into()),
            tenant: Some("NHN".into()),
            custom_fields: BTreeMap::from([
                ("k8s_zone".to_string(), json!("inet")),
                ("domain".to_string(), json!("na")),
            ]),
            alias: Some("internet".into()),
        }
    }

    #[test]
    fn test_body_resolves_all_references() {
        let refs = tables(&[
            (Collection::Vrfs, "nhc", 1),
            (Collection::Roles, "datacenter", 2),
            (Collection::Tenants, "NHN", 3),
        ]);
        let (body, unresolved) = render(&internet(), &refs);

        assert_eq!(unresolved, 0);
        assert_eq!(
            body,
            json!({
                "prefix": "10.0.0.0/8",
                "description": "Internet prefix container",
                "status": "container",
                "is_pool": false,
                "vrf": 1,
                "role": 2,
                "tenant": 3,
                "custom_fields": {"domain": "na", "k8s_zone": "inet"},
            })
        );
        assert_eq!(
            internet().key_filter(&body).to_string(),
            "prefix=10.0.0.0/8&vrf_id=1"
        );
    }

    #[test]
    fn test_unresolved_vrf_is_null_and_filter_is_unscoped_vrf() {
        let refs = tables(&[(Collection::Roles, "datacenter", 2), (Collection::Tenants, "NHN", 3)]);
        let (body, unresolved) = render(&internet(), &refs);

        assert_eq!(unresolved, 1);
        assert_eq!(body["vrf"], Value::Null);
        assert_eq!(
            internet().key_filter(&body).to_string(),
            "prefix=10.0.0.0/8&vrf_id=null"
        );
    }

    #[test]
    fn test_defaults_from_toml() {
        let prefix: Prefix = toml::from_str(r#"prefix = "192.168.0.0/16""#).unwrap();
        assert_eq!(prefix.status, PrefixStatus::Container);
        assert!(!prefix.is_pool);
        assert!(prefix.custom_fields.is_empty());
        assert_eq!(prefix.key_field(), "prefix");
    }
}
