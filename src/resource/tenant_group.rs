//! Tenant group resource

use declarative::{Resolver, Resource};
use restkit::Collection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A tenant group, optionally nested under another group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantGroup {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Name of the parent group, declared earlier in the manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl Resource for TenantGroup {
    fn kind(&self) -> &'static str {
        "tenant group"
    }

    fn collection(&self) -> Collection {
        Collection::TenantGroups
    }

    fn natural_key(&self) -> String {
        self.name.clone()
    }

    fn body(&self, refs: &mut Resolver) -> Value {
        json!({
            "name": self.name,
            "slug": self.slug,
            "description": self.description,
            "parent": refs.reference("parent", Collection::TenantGroups, self.parent.as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{render, tables};

    #[test]
    fn test_body_without_parent_sends_null() {
        let group = TenantGroup {
            name: "DCN".into(),
            slug: "dcn".into(),
            description: "Datacenter Network".into(),
            parent: None,
        };
        let (body, unresolved) = render(&group, &tables(&[]));

        assert_eq!(
            body,
            json!({
                "name": "DCN",
                "slug": "dcn",
                "description": "Datacenter Network",
                "parent": null,
            })
        );
        assert_eq!(unresolved, 0);
    }

    #[test]
    fn test_body_resolves_parent() {
        let group = TenantGroup {
            name: "DCN-East".into(),
            slug: "dcn-east".into(),
            description: String::new(),
            parent: Some("DCN".into()),
        };
        let (body, _) = render(&group, &tables(&[(Collection::TenantGroups, "DCN", 4)]));
        assert_eq!(body["parent"], json!(4));
    }
}
