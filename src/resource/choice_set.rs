//! Custom field choice set resource
//!
//! Choice sets are created first and only looked up when creation is
//! rejected; an existing set is adopted as is.

use declarative::{Resolver, Resource, Strategy};
use restkit::Collection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One selectable value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// A named, ordered list of choices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceSet {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub choices: Vec<Choice>,
}

impl ChoiceSet {
    /// Check if `value` is one of the declared choices
    pub fn contains(&self, value: &str) -> bool {
        self.choices.iter().any(|c| c.value == value)
    }
}

impl Resource for ChoiceSet {
    fn kind(&self) -> &'static str {
        "choice set"
    }

    fn collection(&self) -> Collection {
        Collection::ChoiceSets
    }

    fn natural_key(&self) -> String {
        self.name.clone()
    }

    fn body(&self, _refs: &mut Resolver) -> Value {
        let extra_choices: Vec<[&str; 2]> = self
            .choices
            .iter()
            .map(|c| [c.value.as_str(), c.label.as_str()])
            .collect();

        json!({
            "name": self.name,
            "description": self.description,
            "extra_choices": extra_choices,
        })
    }

    fn strategy(&self) -> Strategy {
        Strategy::CreateFirst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{render, tables};

    #[test]
    fn test_body_keeps_choice_order_as_pairs() {
        let set = ChoiceSet {
            name: "k8s_zone_choices".into(),
            description: "Kubernetes zone choices".into(),
            choices: vec![
                Choice::new("inet", "Internet"),
                Choice::new("hnet-private", "Helsenett Private"),
            ],
        };
        let (body, _) = render(&set, &tables(&[]));

        assert_eq!(
            body["extra_choices"],
            json!([["inet", "Internet"], ["hnet-private", "Helsenett Private"]])
        );
        assert_eq!(set.strategy(), Strategy::CreateFirst);
        assert!(set.contains("inet"));
        assert!(!set.contains("Internet"));
    }
}
