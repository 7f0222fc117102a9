//! Declared NetBox records
//!
//! Every entity kind is a plain serde record (as written in the manifest)
//! that implements [`declarative::Resource`]:
//! - Natural key and the collection it lives in
//! - Full body with references resolved from the current run
//! - Existence strategy (choice sets create first)

pub mod choice_set;
pub mod custom_field;
pub mod prefix;
pub mod role;
pub mod tenant;
pub mod tenant_group;
pub mod vrf;

pub use choice_set::{Choice, ChoiceSet};
pub use custom_field::{CustomField, FieldType};
pub use prefix::{Prefix, PrefixStatus};
pub use role::Role;
pub use tenant::Tenant;
pub use tenant_group::TenantGroup;
pub use vrf::Vrf;

/// Object type that custom fields must target to be set on prefixes
pub const PREFIX_OBJECT_TYPE: &str = "ipam.prefix";
