//! Core types for declarative reconciliation

use restkit::Collection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference field that could not be resolved from earlier stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedRef {
    /// Body field that was left null (e.g. "vrf")
    pub field: String,
    /// Collection the reference points into
    pub collection: Collection,
    /// Natural key that was looked up
    pub key: String,
}

impl fmt::Display for UnresolvedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} '{}'", self.field, self.collection, self.key)
    }
}

/// What reconciliation did (or would do) for one declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// No record matched; one was created
    Created,
    /// A record matched and was overwritten with the declared body
    Updated,
    /// Creation was rejected and the pre-existing record was adopted as is
    Existing,
    /// Dry run: no record matches, one would be created
    WouldCreate,
    /// Dry run: a record matches and would be overwritten
    WouldUpdate,
    /// Reconciliation failed; nothing enters the result table
    Failed { error: String },
}

impl Action {
    /// Check if the action produced (or found) a usable record
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the action wrote to the remote system
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Created | Self::Updated)
    }

    /// Short verb for display
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Existing => "exists",
            Self::WouldCreate => "would create",
            Self::WouldUpdate => "would update",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Outcome of reconciling one declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Human-readable kind (e.g. "tenant group")
    pub kind: String,
    /// Collection the resource lives in
    pub collection: Collection,
    /// Declared natural key
    pub key: String,
    /// What happened
    pub action: Action,
    /// Remote identifier of the resulting record, if any
    pub id: Option<u64>,
    /// References that were sent as null
    pub unresolved: Vec<UnresolvedRef>,
}

impl Outcome {
    /// Check if the resource reconciled
    pub fn is_success(&self) -> bool {
        self.action.is_success()
    }

    /// Check if any reference could not be resolved
    pub fn has_unresolved(&self) -> bool {
        !self.unresolved.is_empty()
    }
}

/// Per-kind counts of reconciliation outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSummary {
    pub created: usize,
    pub updated: usize,
    pub existing: usize,
    pub planned: usize,
    pub failed: usize,
    /// Resources written with at least one null reference
    pub unresolved: usize,
}

impl KindSummary {
    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.created + self.updated + self.existing + self.planned + self.failed
    }

    /// Check if no resource of this kind failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &KindSummary) {
        self.created += other.created;
        self.updated += other.updated;
        self.existing += other.existing;
        self.planned += other.planned;
        self.failed += other.failed;
        self.unresolved += other.unresolved;
    }

    /// Add an outcome to the summary
    pub fn add_outcome(&mut self, outcome: &Outcome) {
        match outcome.action {
            Action::Created => self.created += 1,
            Action::Updated => self.updated += 1,
            Action::Existing => self.existing += 1,
            Action::WouldCreate | Action::WouldUpdate => self.planned += 1,
            Action::Failed { .. } => self.failed += 1,
        }
        if outcome.has_unresolved() {
            self.unresolved += 1;
        }
    }
}

/// Summary of a whole pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Every outcome, in execution order
    pub outcomes: Vec<Outcome>,
}

impl RunSummary {
    /// Record an outcome
    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    /// Counts per kind, in first-seen order
    pub fn by_kind(&self) -> Vec<(String, KindSummary)> {
        let mut kinds: Vec<(String, KindSummary)> = Vec::new();
        for outcome in &self.outcomes {
            match kinds.iter_mut().find(|(kind, _)| *kind == outcome.kind) {
                Some((_, summary)) => summary.add_outcome(outcome),
                None => {
                    let mut summary = KindSummary::default();
                    summary.add_outcome(outcome);
                    kinds.push((outcome.kind.clone(), summary));
                }
            }
        }
        kinds
    }

    /// Counts over all kinds
    pub fn totals(&self) -> KindSummary {
        let mut totals = KindSummary::default();
        for outcome in &self.outcomes {
            totals.add_outcome(outcome);
        }
        totals
    }

    /// Outcomes that failed
    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Check if every declared resource reconciled
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(Outcome::is_success)
    }
}

/// Options for a pipeline run
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Only query; report what would be written
    pub dry_run: bool,
    /// Fail a resource instead of writing it with a null reference
    pub strict_refs: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(kind: &str, action: Action, unresolved: usize) -> Outcome {
        Outcome {
            kind: kind.to_string(),
            collection: Collection::Prefixes,
            key: "10.0.0.0/8".to_string(),
            action,
            id: None,
            unresolved: (0..unresolved)
                .map(|_| UnresolvedRef {
                    field: "vrf".to_string(),
                    collection: Collection::Vrfs,
                    key: "nhc".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_kind_summary_counts() {
        let mut summary = KindSummary::default();
        summary.add_outcome(&outcome("prefix", Action::Created, 1));
        summary.add_outcome(&outcome("prefix", Action::Updated, 0));
        summary.add_outcome(&outcome("prefix", Action::WouldCreate, 0));
        summary.add_outcome(&outcome(
            "prefix",
            Action::Failed {
                error: "HTTP 500".into(),
            },
            0,
        ));

        assert_eq!(summary.created, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.planned, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.total(), 4);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_run_summary_groups_by_kind_in_order() {
        let mut run = RunSummary::default();
        run.push(outcome("vrf", Action::Created, 0));
        run.push(outcome("role", Action::Existing, 0));
        run.push(outcome("vrf", Action::Updated, 0));

        let kinds = run.by_kind();
        assert_eq!(kinds.len(), 2);
        assert_eq!(kinds[0].0, "vrf");
        assert_eq!(kinds[0].1.total(), 2);
        assert_eq!(kinds[1].1.existing, 1);
        assert!(run.is_success());
        assert_eq!(run.totals().total(), 3);
    }

    #[test]
    fn test_run_summary_failures() {
        let mut run = RunSummary::default();
        run.push(outcome("vrf", Action::Created, 0));
        run.push(outcome(
            "vrf",
            Action::Failed {
                error: "boom".into(),
            },
            0,
        ));
        assert!(!run.is_success());
        assert_eq!(run.failures().count(), 1);
    }

    #[test]
    fn test_action_predicates() {
        assert!(Action::Created.is_write());
        assert!(!Action::Existing.is_write());
        assert!(Action::Existing.is_success());
        assert_eq!(Action::WouldUpdate.verb(), "would update");
    }

    #[test]
    fn test_unresolved_display() {
        let unresolved = UnresolvedRef {
            field: "vrf".into(),
            collection: Collection::Vrfs,
            key: "nhc".into(),
        };
        assert_eq!(unresolved.to_string(), "vrf -> ipam/vrfs 'nhc'");
    }
}
