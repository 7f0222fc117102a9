//! Pipeline - ordered stages of declared resources

use crate::error::PipelineError;
use crate::resource::BoxedResource;
use crate::verify::{ExpectedKey, Expectation};
use restkit::Collection;

/// A group of resources reconciled together
///
/// Resources inside a stage must not reference each other; references
/// into other collections must be produced by an earlier stage.
#[derive(Debug)]
pub struct Stage {
    name: String,
    produces: Vec<Collection>,
    depends_on: Vec<Collection>,
    resources: Vec<BoxedResource>,
}

impl Stage {
    /// Create an empty stage
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            produces: Vec::new(),
            depends_on: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Declare a collection this stage fills
    pub fn produces(mut self, collection: Collection) -> Self {
        if !self.produces.contains(&collection) {
            self.produces.push(collection);
        }
        self
    }

    /// Declare a collection this stage resolves references into
    pub fn depends_on(mut self, collection: Collection) -> Self {
        if !self.depends_on.contains(&collection) {
            self.depends_on.push(collection);
        }
        self
    }

    /// Add a resource
    pub fn add(&mut self, resource: BoxedResource) {
        self.resources.push(resource);
    }

    /// Add resources, builder style
    pub fn with_resources(mut self, resources: impl IntoIterator<Item = BoxedResource>) -> Self {
        self.resources.extend(resources);
        self
    }

    /// Stage name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resources in declared order
    pub fn resources(&self) -> &[BoxedResource] {
        &self.resources
    }

    /// Collections this stage fills
    pub fn produced(&self) -> &[Collection] {
        &self.produces
    }

    /// Collections this stage needs
    pub fn dependencies(&self) -> &[Collection] {
        &self.depends_on
    }
}

/// Stages in execution order
#[derive(Debug, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Create an empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    /// Append a stage, builder style
    pub fn stage(mut self, stage: Stage) -> Self {
        self.push(stage);
        self
    }

    /// Stages in execution order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Check that stages are ordered so every dependency is produced
    /// before it is needed, and every resource sits in a stage that
    /// produces its collection.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let mut produced: Vec<Collection> = Vec::new();
        let mut names: Vec<&str> = Vec::new();

        for stage in &self.stages {
            if names.contains(&stage.name()) {
                return Err(PipelineError::DuplicateStage(stage.name.clone()));
            }
            names.push(stage.name());

            if let Some(missing) = stage
                .depends_on
                .iter()
                .find(|c| !produced.contains(c))
            {
                return Err(PipelineError::MissingDependency {
                    stage: stage.name.clone(),
                    dependency: *missing,
                });
            }

            if let Some(resource) = stage
                .resources
                .iter()
                .find(|r| !stage.produces.contains(&r.collection()))
            {
                return Err(PipelineError::MisplacedResource {
                    stage: stage.name.clone(),
                    collection: resource.collection(),
                    resource: resource.description(),
                });
            }

            produced.extend(stage.produces.iter().copied());
        }

        Ok(())
    }

    /// Total number of resources
    pub fn total_resources(&self) -> usize {
        self.stages.iter().map(|s| s.resources.len()).sum()
    }

    /// Check if the pipeline declares nothing
    pub fn is_empty(&self) -> bool {
        self.total_resources() == 0
    }

    /// What verification should find, one entry per declared collection
    pub fn expectations(&self) -> Vec<Expectation> {
        let mut expectations: Vec<Expectation> = Vec::new();
        for resource in self.stages.iter().flat_map(|s| s.resources.iter()) {
            let collection = resource.collection();
            let key = ExpectedKey {
                key: resource.natural_key(),
                scope: resource.scope(),
            };
            match expectations.iter_mut().find(|e| e.collection == collection) {
                Some(expectation) => expectation.keys.push(key),
                None => expectations.push(Expectation {
                    kind: resource.kind().to_string(),
                    collection,
                    key_field: resource.key_field().to_string(),
                    keys: vec![key],
                }),
            }
        }
        expectations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Resolver, Resource};
    use serde_json::{Value, json};

    #[derive(Debug)]
    struct Named(Collection, &'static str);

    impl Resource for Named {
        fn kind(&self) -> &'static str {
            "named"
        }

        fn collection(&self) -> Collection {
            self.0
        }

        fn natural_key(&self) -> String {
            self.1.to_string()
        }

        fn body(&self, _refs: &mut Resolver) -> Value {
            json!({"name": self.1})
        }
    }

    #[test]
    fn test_validate_accepts_dependency_order() {
        let pipeline = Pipeline::new()
            .stage(Stage::new("groups").produces(Collection::TenantGroups))
            .stage(
                Stage::new("tenants")
                    .produces(Collection::Tenants)
                    .depends_on(Collection::TenantGroups),
            );
        assert!(pipeline.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_forward_dependency() {
        let pipeline = Pipeline::new()
            .stage(
                Stage::new("tenants")
                    .produces(Collection::Tenants)
                    .depends_on(Collection::TenantGroups),
            )
            .stage(Stage::new("groups").produces(Collection::TenantGroups));

        assert!(matches!(
            pipeline.validate(),
            Err(PipelineError::MissingDependency {
                dependency: Collection::TenantGroups,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_misplaced_resource() {
        let stage = Stage::new("vrfs")
            .produces(Collection::Vrfs)
            .with_resources([Box::new(Named(Collection::Roles, "datacenter")) as BoxedResource]);
        let pipeline = Pipeline::new().stage(stage);

        assert!(matches!(
            pipeline.validate(),
            Err(PipelineError::MisplacedResource { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_stage() {
        let pipeline = Pipeline::new()
            .stage(Stage::new("vrfs").produces(Collection::Vrfs))
            .stage(Stage::new("vrfs").produces(Collection::Vrfs));
        assert!(matches!(
            pipeline.validate(),
            Err(PipelineError::DuplicateStage(_))
        ));
    }

    #[test]
    fn test_expectations_group_by_collection() {
        let mut stage = Stage::new("ipam")
            .produces(Collection::Vrfs)
            .produces(Collection::Roles);
        stage.add(Box::new(Named(Collection::Vrfs, "nhc")));
        stage.add(Box::new(Named(Collection::Roles, "datacenter")));
        stage.add(Box::new(Named(Collection::Vrfs, "mgmt")));
        let pipeline = Pipeline::new().stage(stage);

        let expectations = pipeline.expectations();
        assert_eq!(expectations.len(), 2);
        assert_eq!(expectations[0].collection, Collection::Vrfs);
        let keys: Vec<&str> = expectations[0].keys.iter().map(|k| k.key.as_str()).collect();
        assert_eq!(keys, vec!["nhc", "mgmt"]);
        assert!(expectations[0].keys.iter().all(|k| k.scope.is_none()));
        assert_eq!(expectations[1].key_field, "name");
        assert_eq!(pipeline.total_resources(), 3);
    }
}
