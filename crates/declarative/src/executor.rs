//! Execution engine - runs pipeline stages strictly in order

use crate::context::{NoObserver, NoSink, Observer, ResultSink};
use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::reconciler::Reconciler;
use crate::table::RefTables;
use crate::types::{ExecuteOptions, KindSummary, RunSummary};
use restkit::Gateway;

/// Result of running a pipeline
#[derive(Debug, Clone, Default)]
pub struct Execution {
    /// Outcomes and counts
    pub summary: RunSummary,
    /// Final result tables
    pub tables: RefTables,
    /// Error reported by the result sink, if persisting failed
    pub persist_error: Option<String>,
}

impl Execution {
    /// Check if every resource reconciled and the results were persisted
    pub fn is_success(&self) -> bool {
        self.summary.is_success() && self.persist_error.is_none()
    }
}

/// Execute a pipeline with the given options and callbacks
///
/// Every stage runs to completion, one resource at a time, before the
/// next starts. A failed resource never stops its siblings or later
/// stages; dependents simply see fewer resolvable references.
///
/// # Arguments
/// * `pipeline` - Stages to run
/// * `gateway` - Remote system
/// * `opts` - Execution options (dry_run, strict_refs)
/// * `observer` - Progress callback
/// * `sink` - Receives the final tables (not called on dry runs)
///
/// # Errors
/// Only pipeline construction errors; these are reported before any
/// remote call.
pub fn execute<G, O, S>(
    pipeline: &Pipeline,
    gateway: &G,
    opts: &ExecuteOptions,
    observer: &mut O,
    sink: &mut S,
) -> Result<Execution, PipelineError>
where
    G: Gateway + ?Sized,
    O: Observer + ?Sized,
    S: ResultSink + ?Sized,
{
    pipeline.validate()?;

    let reconciler = Reconciler::new(gateway, opts.clone());
    let mut execution = Execution::default();

    for stage in pipeline.stages() {
        log::debug!(
            "Stage '{}': {} resource(s)",
            stage.name(),
            stage.resources().len()
        );
        observer.on_stage_start(stage.name(), stage.resources().len());

        let mut stage_summary = KindSummary::default();
        for resource in stage.resources() {
            observer.on_resource_start(&resource.description());

            let reconciled = reconciler.reconcile(resource.as_ref(), &execution.tables);
            if let Some(record) = reconciled.record {
                execution
                    .tables
                    .insert(resource.collection(), resource.natural_key(), record);
            }

            stage_summary.add_outcome(&reconciled.outcome);
            observer.on_outcome(&reconciled.outcome);
            execution.summary.push(reconciled.outcome);
        }

        observer.on_stage_complete(stage.name(), &stage_summary);
    }

    if !opts.dry_run
        && let Err(e) = sink.persist(&execution.tables)
    {
        log::error!("Failed to persist results: {:#}", e);
        execution.persist_error = Some(format!("{:#}", e));
    }

    Ok(execution)
}

/// Simple execution without callbacks
///
/// For basic use cases where you don't need progress or persistence.
pub fn execute_simple<G: Gateway + ?Sized>(
    pipeline: &Pipeline,
    gateway: &G,
    opts: &ExecuteOptions,
) -> Result<Execution, PipelineError> {
    execute(pipeline, gateway, opts, &mut NoObserver, &mut NoSink)
}
