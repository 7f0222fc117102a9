//! Reconciliation stages for a manifest
//!
//! Kinds are reconciled in dependency order so every reference can be
//! resolved from records produced earlier in the same run:
//!
//! 1. tenant groups (parents first, in declared order)
//! 2. tenants
//! 3. VRFs and roles
//! 4. choice sets
//! 5. custom fields
//! 6. prefixes

use crate::manifest::Manifest;
use declarative::{BoxedResource, Pipeline, Resource, Stage};
use restkit::Collection;

fn boxed<R: Resource + Clone + 'static>(items: &[R]) -> Vec<BoxedResource> {
    items
        .iter()
        .map(|item| Box::new(item.clone()) as BoxedResource)
        .collect()
}

/// Build the staged pipeline for a manifest
pub fn build(manifest: &Manifest) -> Pipeline {
    let mut vrfs_and_roles = boxed(&manifest.vrfs);
    vrfs_and_roles.extend(boxed(&manifest.roles));

    Pipeline::new()
        .stage(
            Stage::new("tenant-groups")
                .produces(Collection::TenantGroups)
                .with_resources(boxed(&manifest.tenant_groups)),
        )
        .stage(
            Stage::new("tenants")
                .produces(Collection::Tenants)
                .depends_on(Collection::TenantGroups)
                .with_resources(boxed(&manifest.tenants)),
        )
        .stage(
            Stage::new("vrfs-and-roles")
                .produces(Collection::Vrfs)
                .produces(Collection::Roles)
                .with_resources(vrfs_and_roles),
        )
        .stage(
            Stage::new("choice-sets")
                .produces(Collection::ChoiceSets)
                .with_resources(boxed(&manifest.choice_sets)),
        )
        .stage(
            Stage::new("custom-fields")
                .produces(Collection::CustomFields)
                .depends_on(Collection::ChoiceSets)
                .with_resources(boxed(&manifest.custom_fields)),
        )
        .stage(
            Stage::new("prefixes")
                .produces(Collection::Prefixes)
                .depends_on(Collection::Vrfs)
                .depends_on(Collection::Roles)
                .depends_on(Collection::Tenants)
                .with_resources(boxed(&manifest.prefixes)),
        )
}
