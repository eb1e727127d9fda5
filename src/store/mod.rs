mod snapshot;
#[cfg(test)]
pub mod testing;
mod types;

pub use snapshot::SnapshotStore;
pub use types::{Build, BuildResult, Job};
#[cfg(test)]
pub use types::Causation;

use crate::error::Result;

/// Read-only view of a CI server's jobs, dependency graph and build history.
///
/// Every traversal receives the store explicitly. Implementations must be safe
/// for concurrent readers if callers share them across threads.
pub trait BuildStore {
    /// Looks up a job by name.
    fn job(&self, name: &str) -> Result<Job>;

    /// All jobs known to the store, in a stable order.
    fn jobs(&self) -> Vec<Job>;

    /// Immediate downstream jobs of `job`, in declaration order.
    fn downstream_jobs_of(&self, job: &Job) -> Result<Vec<Job>>;

    /// Whether the edge from `upstream` to `downstream` requires manual promotion.
    fn is_manual_edge(&self, upstream: &Job, downstream: &Job) -> Result<bool>;

    /// Build history of `job`, newest first.
    fn builds_of(&self, job: &Job) -> Result<Vec<Build>>;
}
