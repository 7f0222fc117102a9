//! Prefix/VLAN role resource

use declarative::{Resolver, Resource};
use restkit::Collection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

impl Resource for Role {
    fn kind(&self) -> &'static str {
        "role"
    }

    fn collection(&self) -> Collection {
        Collection::Roles
    }

    fn natural_key(&self) -> String {
        self.name.clone()
    }

    fn body(&self, _refs: &mut Resolver) -> Value {
        json!({
            "name": self.name,
            "slug": self.slug,
            "description": self.description,
        })
    }
}
