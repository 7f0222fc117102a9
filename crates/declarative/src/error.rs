//! Error types for reconciliation and pipeline setup

use restkit::Collection;

/// Why a single resource failed to reconcile
///
/// These never abort a run; they become [`crate::Action::Failed`] on the
/// resource's outcome.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The existence query by natural key failed.
    #[error("lookup failed: {0}")]
    Query(#[source] restkit::Error),

    /// Creating the record failed.
    #[error("create failed: {0}")]
    Create(#[source] restkit::Error),

    /// Overwriting the matched record failed.
    #[error("update of #{id} failed: {source}")]
    Update {
        id: u64,
        #[source]
        source: restkit::Error,
    },

    /// Creation was rejected as a client error but no record matched
    /// the natural key afterwards.
    #[error("create rejected ({0}) and no existing record matched")]
    NotFound(#[source] restkit::Error),

    /// A record came back without an identifier.
    #[error("record returned by {0} has no id")]
    MissingId(Collection),

    /// References could not be resolved and strict mode is on.
    #[error("unresolved references: {0}")]
    Unresolved(String),
}

impl ReconcileError {
    /// The underlying gateway error, if any
    pub fn gateway_error(&self) -> Option<&restkit::Error> {
        match self {
            Self::Query(e) | Self::Create(e) | Self::NotFound(e) => Some(e),
            Self::Update { source, .. } => Some(source),
            Self::MissingId(_) | Self::Unresolved(_) => None,
        }
    }
}

/// Pipeline construction errors
///
/// These are programming errors in how stages were assembled and are
/// reported before any remote call is made.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A stage depends on a collection no earlier stage produces.
    #[error("stage '{stage}' depends on {dependency}, which no earlier stage produces")]
    MissingDependency {
        stage: String,
        dependency: Collection,
    },

    /// A resource was placed in a stage that does not produce its collection.
    #[error("stage '{stage}' does not produce {collection} (resource {resource})")]
    MisplacedResource {
        stage: String,
        collection: Collection,
        resource: String,
    },

    /// Two stages share a name.
    #[error("duplicate stage name '{0}'")]
    DuplicateStage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_error_carries_status_and_body() {
        let err = ReconcileError::Update {
            id: 7,
            source: restkit::Error::status(400, r#"{"slug":["invalid"]}"#),
        };
        assert_eq!(
            err.to_string(),
            r#"update of #7 failed: HTTP 400: {"slug":["invalid"]}"#
        );
        assert_eq!(err.gateway_error().and_then(|e| e.status_code()), Some(400));
        assert!(ReconcileError::Unresolved("vrf".into()).gateway_error().is_none());
    }

    #[test]
    fn test_pipeline_error_display() {
        let err = PipelineError::MissingDependency {
            stage: "prefixes".into(),
            dependency: Collection::Vrfs,
        };
        assert_eq!(
            err.to_string(),
            "stage 'prefixes' depends on ipam/vrfs, which no earlier stage produces"
        );
    }
}
