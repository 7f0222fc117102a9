//! Custom field definition resource

use declarative::{Resolver, Resource};
use restkit::Collection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Custom field value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Longtext,
    Integer,
    Decimal,
    Boolean,
    Date,
    Datetime,
    Url,
    Json,
    Select,
    Multiselect,
}

impl FieldType {
    /// Whether values are picked from a choice set
    pub fn is_selectable(&self) -> bool {
        matches!(self, Self::Select | Self::Multiselect)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Longtext => "longtext",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Url => "url",
            Self::Json => "json",
            Self::Select => "select",
            Self::Multiselect => "multiselect",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A custom field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Object types the field applies to (e.g. "ipam.prefix")
    pub object_types: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
    /// Name of the choice set; only for selectable types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice_set: Option<String>,
}

impl CustomField {
    /// Check if the field can be set on objects of `object_type`
    pub fn applies_to(&self, object_type: &str) -> bool {
        self.object_types.iter().any(|t| t == object_type)
    }
}

impl Resource for CustomField {
    fn kind(&self) -> &'static str {
        "custom field"
    }

    fn collection(&self) -> Collection {
        Collection::CustomFields
    }

    fn natural_key(&self) -> String {
        self.name.clone()
    }

    fn body(&self, refs: &mut Resolver) -> Value {
        // Non-selectable fields never carry a choice set.
        let choice_set = if self.field_type.is_selectable() {
            refs.reference(
                "choice_set",
                Collection::ChoiceSets,
                self.choice_set.as_deref(),
            )
        } else {
            Value::Null
        };

        json!({
            "name": self.name,
            "label": self.label,
            "type": self.field_type.as_str(),
            "object_types": self.object_types,
            "required": self.required,
            "description": self.description,
            "choice_set": choice_set,
        })
    }
}
