//! Observer and sink traits
//!
//! These traits allow the declarative crate to be used without
//! depending on a specific terminal UI or state file format.

use crate::table::RefTables;
use crate::types::{KindSummary, Outcome};
use anyhow::Result;

/// Progress callback for pipeline runs
///
/// Implement this trait to receive progress updates during execution.
pub trait Observer {
    /// Called when a stage starts
    fn on_stage_start(&mut self, stage: &str, count: usize);

    /// Called before a resource is reconciled
    fn on_resource_start(&mut self, description: &str);

    /// Called when a resource has been reconciled
    fn on_outcome(&mut self, outcome: &Outcome);

    /// Called when every resource of a stage has been processed
    fn on_stage_complete(&mut self, stage: &str, summary: &KindSummary);
}

/// No-op observer
pub struct NoObserver;

impl Observer for NoObserver {
    fn on_stage_start(&mut self, _stage: &str, _count: usize) {}
    fn on_resource_start(&mut self, _description: &str) {}
    fn on_outcome(&mut self, _outcome: &Outcome) {}
    fn on_stage_complete(&mut self, _stage: &str, _summary: &KindSummary) {}
}

/// Receiver for the final result tables of a run
///
/// Persistence (caching identifiers, recording containers) lives behind
/// this trait; the engine never knows the storage format.
pub trait ResultSink {
    /// Persist the result tables
    fn persist(&mut self, tables: &RefTables) -> Result<()>;
}

/// Sink that discards the tables
pub struct NoSink;

impl ResultSink for NoSink {
    fn persist(&mut self, _tables: &RefTables) -> Result<()> {
        Ok(())
    }
}

