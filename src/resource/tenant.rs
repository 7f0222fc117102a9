//! Tenant resource

use declarative::{Resolver, Resource};
use restkit::Collection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A tenant, optionally assigned to a tenant group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub comments: String,
    /// Name of the tenant group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Resource for Tenant {
    fn kind(&self) -> &'static str {
        "tenant"
    }

    fn collection(&self) -> Collection {
        Collection::Tenants
    }

    fn natural_key(&self) -> String {
        self.name.clone()
    }

    fn body(&self, refs: &mut Resolver) -> Value {
        json!({
            "name": self.name,
            "slug": self.slug,
            "description": self.description,
            "comments": self.comments,
            "group": refs.reference("group", Collection::TenantGroups, self.group.as_deref()),
        })
    }
}
