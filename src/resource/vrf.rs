//! Routing domain (VRF) resource

use declarative::{Resolver, Resource};
use restkit::Collection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A VRF
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vrf {
    pub name: String,
    /// Route distinguisher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rd: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl Resource for Vrf {
    fn kind(&self) -> &'static str {
        "vrf"
    }

    fn collection(&self) -> Collection {
        Collection::Vrfs
    }

    fn natural_key(&self) -> String {
        self.name.clone()
    }

    fn body(&self, _refs: &mut Resolver) -> Value {
        json!({
            "name": self.name,
            "rd": self.rd,
            "description": self.description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{render, tables};

    #[test]
    fn test_body_sends_every_field() {
        let vrf = Vrf {
            name: "nhc".into(),
            rd: None,
            description: String::new(),
        };
        let (body, _) = render(&vrf, &tables(&[]));
        assert_eq!(body, json!({"name": "nhc", "rd": null, "description": ""}));
    }
}
