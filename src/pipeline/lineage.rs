use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;

use super::resolver::BuildCausalityResolver;
use super::status::{derive_status, progress_percent, PipelineStatus, Upstream};
use crate::error::{PipelensError, Result};
use crate::store::{Build, BuildStore, Job};

/// Reference from a node to the node directly upstream of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamRef {
    pub job: String,
    pub build: Option<u32>,
}

/// One job and its resolved build within a single pipeline instance.
///
/// `downstream` holds exactly one entry per downstream job of `job`, in declaration
/// order, whether or not that job has run yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineNode {
    pub job: Job,
    pub build: Option<Build>,
    pub upstream: Option<UpstreamRef>,
    pub status: PipelineStatus,
    /// Percent complete, only for running builds
    pub progress: Option<u8>,
    pub downstream: Vec<PipelineNode>,
}

impl PipelineNode {
    pub fn job_name(&self) -> &str {
        &self.job.name
    }

    pub fn build_number(&self) -> Option<u32> {
        self.build.as_ref().map(Build::number)
    }

    /// Human readable label, e.g. `deploy #12` or `Pending build of project: deploy`.
    pub fn description(&self) -> String {
        match &self.build {
            Some(build) => build.to_string(),
            None => format!("Pending build of project: {}", self.job.name),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.downstream.iter().map(PipelineNode::node_count).sum::<usize>()
    }
}

/// Walks the job graph from a root job, pairing each job with the build that the
/// upstream build triggered.
pub struct LineageAssembler<'s, S: BuildStore + ?Sized> {
    store: &'s S,
    resolver: BuildCausalityResolver<'s, S>,
    now: DateTime<Utc>,
}

impl<'s, S: BuildStore + ?Sized> LineageAssembler<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            resolver: BuildCausalityResolver::new(store),
            now: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: BuildCausalityResolver<'s, S>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Fixes the clock used for progress of running builds.
    #[cfg(test)]
    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Builds the pipeline tree rooted at `root_job` / `root_build`.
    ///
    /// Every declared downstream job gets a node. Jobs that have not run for this
    /// pipeline instance, or whose history could not be read, get a node without a
    /// build and a `Pending` or `Manual` status.
    ///
    /// # Errors
    ///
    /// Returns [`PipelensError::Configuration`] if the job graph loops back to a job
    /// already on the current root-to-node path.
    pub fn build_pipeline(&self, root_job: &Job, root_build: Option<&Build>) -> Result<PipelineNode> {
        let mut path = Vec::new();
        self.assemble(root_job, root_build.cloned(), None, &mut path)
    }

    /// Builds one pipeline tree per recent build of `root_job`, newest first.
    ///
    /// At most `count` trees are produced; a shorter history yields fewer. Trees are
    /// assembled lazily as the iterator is advanced, and calling this again starts a
    /// fresh traversal.
    ///
    /// # Errors
    ///
    /// Returns an error if the root job's history cannot be read. Each yielded tree
    /// carries its own [`PipelensError::Configuration`] on a cyclic graph.
    pub fn build_pipeline_history(
        &self,
        root_job: &Job,
        count: usize,
    ) -> Result<PipelineHistory<'_, 's, S>> {
        let mut builds = self.store.builds_of(root_job)?;
        builds.truncate(count);

        debug!(
            "Assembling {} pipeline instances of {}",
            builds.len(),
            root_job.name
        );

        Ok(PipelineHistory {
            assembler: self,
            root_job: root_job.clone(),
            builds: builds.into_iter(),
        })
    }

    fn assemble(
        &self,
        job: &Job,
        build: Option<Build>,
        upstream: Option<Upstream<'_>>,
        path: &mut Vec<String>,
    ) -> Result<PipelineNode> {
        if path.contains(&job.name) {
            return Err(PipelensError::Configuration(format!(
                "job '{}' is its own downstream via {}",
                job.name,
                path.join(" -> ")
            )));
        }

        let status = derive_status(self.store, job, build.as_ref(), upstream.as_ref());
        let progress = build
            .as_ref()
            .filter(|_| status == PipelineStatus::Building)
            .map(|b| {
                let elapsed = b.elapsed_ms(self.now).unwrap_or(0);
                progress_percent(elapsed, b.estimated_duration_ms)
            });

        let downstream_jobs = self.store.downstream_jobs_of(job).unwrap_or_else(|e| {
            warn!("Cannot list downstream jobs of {}: {e}", job.name);
            Vec::new()
        });

        path.push(job.name.clone());

        let this = Upstream {
            job,
            build: build.as_ref(),
            status,
        };

        let mut downstream = Vec::with_capacity(downstream_jobs.len());
        for downstream_job in &downstream_jobs {
            let resolved = match &build {
                Some(build) => self
                    .resolver
                    .resolve_downstream_build(build, downstream_job)
                    .unwrap_or_else(|e| {
                        warn!(
                            "Treating {} as not yet built for {build}: {e}",
                            downstream_job.name
                        );
                        None
                    }),
                None => None,
            };

            downstream.push(self.assemble(downstream_job, resolved, Some(this), path)?);
        }

        path.pop();

        Ok(PipelineNode {
            job: job.clone(),
            upstream: upstream.map(|up| UpstreamRef {
                job: up.job.name.clone(),
                build: up.build.map(Build::number),
            }),
            build,
            status,
            progress,
            downstream,
        })
    }
}

/// Lazily assembled pipeline trees, one per historical root build.
pub struct PipelineHistory<'a, 's, S: BuildStore + ?Sized> {
    assembler: &'a LineageAssembler<'s, S>,
    root_job: Job,
    builds: std::vec::IntoIter<Build>,
}

impl<S: BuildStore + ?Sized> Iterator for PipelineHistory<'_, '_, S> {
    type Item = Result<PipelineNode>;

    fn next(&mut self) -> Option<Self::Item> {
        let build = self.builds.next()?;
        Some(self.assembler.build_pipeline(&self.root_job, Some(&build)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.builds.size_hint()
    }
}
