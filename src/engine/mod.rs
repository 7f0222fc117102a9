//! NetBox-specific wiring of the reconciliation engine
//!
//! - [`pipeline`]: stages and dependency order for a manifest
//! - [`report`]: terminal observer and summaries

pub mod pipeline;
pub mod report;

pub use pipeline::build;
pub use report::{TerminalObserver, print_summary, print_verify};
