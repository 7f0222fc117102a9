//! Per-entity reconciliation
//!
//! One declared resource at a time: resolve references from the current
//! run's tables, find the remote record by natural key, then overwrite it
//! or create it. A failure only affects the resource at hand.

use crate::error::ReconcileError;
use crate::resource::{Resolver, Resource, Strategy};
use crate::table::RefTables;
use crate::types::{Action, ExecuteOptions, Outcome};
use restkit::{Gateway, Record};
use serde_json::Value;

/// Result of reconciling one resource
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// What happened
    pub outcome: Outcome,
    /// Record to store in the result table, if any
    pub record: Option<Record>,
}

type Step = Result<(Action, Option<Record>), ReconcileError>;

/// Reconciles declared resources against a gateway
pub struct Reconciler<'g, G: Gateway + ?Sized> {
    gateway: &'g G,
    options: ExecuteOptions,
}

impl<'g, G: Gateway + ?Sized> Reconciler<'g, G> {
    /// Create a reconciler
    pub fn new(gateway: &'g G, options: ExecuteOptions) -> Self {
        Self { gateway, options }
    }

    /// Reconcile one resource against the tables built so far
    ///
    /// Never fails: errors are logged and reported as [`Action::Failed`].
    pub fn reconcile(&self, resource: &dyn Resource, tables: &RefTables) -> Reconciled {
        let description = resource.description();

        let mut resolver = Resolver::new(tables);
        let body = resource.body(&mut resolver);
        let unresolved = resolver.into_unresolved();
        for miss in &unresolved {
            log::warn!("{}: unresolved reference {}, sending null", description, miss);
        }

        let step = if self.options.strict_refs && !unresolved.is_empty() {
            let list: Vec<String> = unresolved.iter().map(ToString::to_string).collect();
            Err(ReconcileError::Unresolved(list.join(", ")))
        } else if self.options.dry_run {
            self.plan(resource, &body)
        } else {
            match resource.strategy() {
                Strategy::CheckThenWrite => self.check_then_write(resource, &body),
                Strategy::CreateFirst => self.create_first(resource, &body),
            }
        };

        let (action, record) = match step.and_then(|(action, record)| {
            require_id(resource, record.as_ref())?;
            Ok((action, record))
        }) {
            Ok(pair) => pair,
            Err(e) => {
                log::error!("{}: {}", description, e);
                (Action::Failed { error: e.to_string() }, None)
            }
        };

        if action.is_success() {
            log::info!("{}: {}", description, action.verb());
        }

        Reconciled {
            outcome: Outcome {
                kind: resource.kind().to_string(),
                collection: resource.collection(),
                key: resource.natural_key(),
                id: record.as_ref().and_then(Record::id),
                action,
                unresolved,
            },
            record,
        }
    }

    /// Look up by natural key, then update the first match or create.
    fn check_then_write(&self, resource: &dyn Resource, body: &Value) -> Step {
        let collection = resource.collection();
        match self.find(resource, body)? {
            Some(existing) => {
                let id = existing
                    .id()
                    .ok_or(ReconcileError::MissingId(collection))?;
                let updated = self
                    .gateway
                    .update(collection, id, body)
                    .map_err(|source| ReconcileError::Update { id, source })?;
                Ok((Action::Updated, Some(updated)))
            }
            None => {
                let created = self
                    .gateway
                    .create(collection, body)
                    .map_err(ReconcileError::Create)?;
                Ok((Action::Created, Some(created)))
            }
        }
    }

    /// Create first; read any client error as "already exists".
    fn create_first(&self, resource: &dyn Resource, body: &Value) -> Step {
        match self.gateway.create(resource.collection(), body) {
            Ok(created) => Ok((Action::Created, Some(created))),
            Err(e) if e.is_client_error() => {
                log::info!(
                    "{}: create rejected ({}), looking up existing record",
                    resource.description(),
                    e
                );
                match self.find(resource, body)? {
                    Some(existing) => Ok((Action::Existing, Some(existing))),
                    None => Err(ReconcileError::NotFound(e)),
                }
            }
            Err(e) => Err(ReconcileError::Create(e)),
        }
    }

    /// Dry run: query only.
    fn plan(&self, resource: &dyn Resource, body: &Value) -> Step {
        Ok(match self.find(resource, body)? {
            Some(existing) if resource.strategy() == Strategy::CreateFirst => {
                (Action::Existing, Some(existing))
            }
            Some(existing) => (Action::WouldUpdate, Some(existing)),
            None => (Action::WouldCreate, None),
        })
    }

    /// First record matching the natural key, if any.
    fn find(
        &self,
        resource: &dyn Resource,
        body: &Value,
    ) -> Result<Option<Record>, ReconcileError> {
        let filter = resource.key_filter(body);
        let matches = self
            .gateway
            .query(resource.collection(), &filter)
            .map_err(ReconcileError::Query)?;
        if matches.len() > 1 {
            log::warn!(
                "{}: {} records match {}, using the first",
                resource.description(),
                matches.len(),
                filter
            );
        }
        Ok(matches.into_iter().next())
    }
}

fn require_id(resource: &dyn Resource, record: Option<&Record>) -> Result<(), ReconcileError> {
    match record {
        Some(r) if r.id().is_none() => Err(ReconcileError::MissingId(resource.collection())),
        _ => Ok(()),
    }
}
