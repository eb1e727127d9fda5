//! In-memory store helpers shared by unit tests.

use std::collections::HashSet;

use super::{Build, BuildResult, BuildStore, Causation, Job, SnapshotStore};
use crate::error::{PipelensError, Result};

/// Builder for small job graphs and build histories.
#[derive(Default)]
pub struct TestStore {
    jobs: Vec<Job>,
    builds: Vec<Build>,
    failing: HashSet<String>,
}

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(mut self, name: &str, downstream: &[&str]) -> Self {
        self.jobs.push(Job {
            name: name.to_string(),
            downstream: downstream.iter().map(ToString::to_string).collect(),
            manual: vec![],
        });
        self
    }

    pub fn manual(mut self, upstream: &str, downstream: &str) -> Self {
        if let Some(job) = self.jobs.iter_mut().find(|job| job.name == upstream) {
            job.manual.push(downstream.to_string());
        }
        self
    }

    /// Adds a finished build triggered by `cause` (or by nothing).
    pub fn build(
        mut self,
        job: &str,
        number: u32,
        result: BuildResult,
        cause: Option<(&str, u32)>,
    ) -> Self {
        let mut build = Build::new(job, number);
        build.result = Some(result);
        build.cause = cause.map(|(upstream_job, upstream_build)| Causation {
            upstream_job: upstream_job.to_string(),
            upstream_build,
        });
        self.builds.push(build);
        self
    }

    pub fn running(mut self, job: &str, number: u32, cause: Option<(&str, u32)>) -> Self {
        let mut build = Build::new(job, number);
        build.building = true;
        build.cause = cause.map(|(upstream_job, upstream_build)| Causation {
            upstream_job: upstream_job.to_string(),
            upstream_build,
        });
        self.builds.push(build);
        self
    }

    /// Every read touching `job` fails with a lookup error.
    pub fn failing(mut self, job: &str) -> Self {
        self.failing.insert(job.to_string());
        self
    }

    pub fn finish(self) -> FlakyStore {
        FlakyStore {
            inner: SnapshotStore::from_parts(self.jobs, self.builds)
                .expect("test graph should be well formed"),
            failing: self.failing,
        }
    }
}

/// Snapshot store whose reads fail for selected jobs.
pub struct FlakyStore {
    inner: SnapshotStore,
    failing: HashSet<String>,
}

impl FlakyStore {
    fn check(&self, job: &Job) -> Result<()> {
        if self.failing.contains(&job.name) {
            return Err(PipelensError::LookupFailed {
                job: job.name.clone(),
                reason: "connection reset".to_string(),
            });
        }
        Ok(())
    }
}

impl BuildStore for FlakyStore {
    fn job(&self, name: &str) -> Result<Job> {
        self.inner.job(name)
    }

    fn jobs(&self) -> Vec<Job> {
        self.inner.jobs()
    }

    fn downstream_jobs_of(&self, job: &Job) -> Result<Vec<Job>> {
        self.check(job)?;
        self.inner.downstream_jobs_of(job)
    }

    fn is_manual_edge(&self, upstream: &Job, downstream: &Job) -> Result<bool> {
        self.check(downstream)?;
        self.inner.is_manual_edge(upstream, downstream)
    }

    fn builds_of(&self, job: &Job) -> Result<Vec<Build>> {
        self.check(job)?;
        self.inner.builds_of(job)
    }
}

/// Store whose job graph loops `A -> B -> C -> A`.
pub fn cyclic_store() -> FlakyStore {
    TestStore::new()
        .job("A", &["B"])
        .job("B", &["C"])
        .job("C", &["A"])
        .build("A", 1, BuildResult::Success, None)
        .build("B", 1, BuildResult::Success, Some(("A", 1)))
        .build("C", 1, BuildResult::Success, Some(("B", 1)))
        .build("A", 2, BuildResult::Success, Some(("C", 1)))
        .finish()
}
